// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! The ten `op:*` wire operations, as a closed enum keyed on the record's
//! label symbol.

use crate::codec::Value;

use super::descriptors::{Import, Target};
use super::ProtocolError;

/// One CapTP wire operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// `<op:start-session captp-version session-pubkey location location-sig>`
    /// — the handshake's single message, sent by both sides.
    StartSession {
        /// The sender's claimed CapTP version string.
        captp_version: String,
        /// The sender's public key, in its `(public-key ...)` record form.
        session_pubkey: Value,
        /// The sender's own `(ocapn-peer ...)` location record.
        location: Value,
        /// Signature over `(my-location location)`, in `(sig-val ...)` form.
        location_sig: Value,
    },
    /// `<op:bootstrap answer-position resolve-me-desc>` — ask for the
    /// peer's bootstrap object.
    Bootstrap {
        /// Position this bootstrap's answer will be exported at.
        answer_position: u64,
        /// Where to deliver the resolution.
        resolve_me_desc: Import,
    },
    /// `<op:deliver-only to args>` — fire-and-forget method invocation.
    DeliverOnly {
        /// The target object or answer.
        to: Target,
        /// Positional arguments.
        args: Vec<Value>,
    },
    /// `<op:deliver to args answer-position resolve-me-desc>` — a method
    /// invocation whose result is wanted.
    Deliver {
        /// The target object or answer.
        to: Target,
        /// Positional arguments.
        args: Vec<Value>,
        /// Position the result answer will be exported at, if any
        /// (`None` encodes as the Syrup boolean `false`).
        answer_position: Option<u64>,
        /// Where to deliver the resolution.
        resolve_me_desc: Import,
    },
    /// `<op:listen to resolve-me-desc wants-partial>` — subscribe to a
    /// promise's resolution without sending a message.
    Listen {
        /// The promise being listened to.
        to: Target,
        /// Where to deliver the resolution.
        resolve_me_desc: Import,
        /// Whether partial (broken-with-reason) resolutions are wanted.
        wants_partial: bool,
    },
    /// `<op:abort reason>` — terminate the session immediately.
    Abort {
        /// Human-readable reason.
        reason: String,
    },
    /// `<op:gc-export export-position wire-delta>` — release references to
    /// one of the peer's exports.
    GcExport {
        /// The export position being released.
        export_position: u64,
        /// How many outstanding references are being released.
        wire_delta: u64,
    },
    /// `<op:gc-answer answer-position>` — release an answer position once
    /// its result is no longer needed.
    GcAnswer {
        /// The answer position being released.
        answer_position: u64,
    },
    /// `<op:index target index new-answer-position>` — pipeline into a
    /// positional field of a promise's eventual result.
    Index {
        /// The promise being indexed into.
        target: Target,
        /// Which positional field.
        index: u64,
        /// Position the indexed value is exported at.
        new_answer_position: u64,
    },
    /// `<op:get target field new-answer-position>` — pipeline into a named
    /// field of a promise's eventual result.
    Get {
        /// The promise being projected.
        target: Target,
        /// Which named field.
        field: String,
        /// Position the projected value is exported at.
        new_answer_position: u64,
    },
}

impl Op {
    /// Parse any `op:*` record.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let r = value.as_record().ok_or(ProtocolError::BadArity)?;
        let label = r.label_symbol().ok_or(ProtocolError::UnknownOpLabel)?;
        match label {
            "op:start-session" => {
                let a = require_arity(&r.args, 4)?;
                Ok(Op::StartSession {
                    captp_version: require_str(&a[0])?,
                    session_pubkey: a[1].clone(),
                    location: a[2].clone(),
                    location_sig: a[3].clone(),
                })
            }
            "op:bootstrap" => {
                let a = require_arity(&r.args, 2)?;
                Ok(Op::Bootstrap {
                    answer_position: require_u64(&a[0])?,
                    resolve_me_desc: Import::from_value(&a[1])?,
                })
            }
            "op:deliver-only" => {
                let a = require_arity(&r.args, 2)?;
                Ok(Op::DeliverOnly {
                    to: Target::from_value(&a[0])?,
                    args: require_list(&a[1])?,
                })
            }
            "op:deliver" => {
                let a = require_arity(&r.args, 4)?;
                Ok(Op::Deliver {
                    to: Target::from_value(&a[0])?,
                    args: require_list(&a[1])?,
                    answer_position: require_optional_u64(&a[2])?,
                    resolve_me_desc: Import::from_value(&a[3])?,
                })
            }
            "op:listen" => {
                let a = require_arity(&r.args, 3)?;
                Ok(Op::Listen {
                    to: Target::from_value(&a[0])?,
                    resolve_me_desc: Import::from_value(&a[1])?,
                    wants_partial: a[2].as_bool().ok_or(ProtocolError::BadArity)?,
                })
            }
            "op:abort" => {
                let a = require_arity(&r.args, 1)?;
                Ok(Op::Abort {
                    reason: require_str(&a[0])?,
                })
            }
            "op:gc-export" => {
                let a = require_arity(&r.args, 2)?;
                Ok(Op::GcExport {
                    export_position: require_u64(&a[0])?,
                    wire_delta: require_u64(&a[1])?,
                })
            }
            "op:gc-answer" => {
                let a = require_arity(&r.args, 1)?;
                Ok(Op::GcAnswer {
                    answer_position: require_u64(&a[0])?,
                })
            }
            "op:index" => {
                let a = require_arity(&r.args, 3)?;
                Ok(Op::Index {
                    target: Target::from_value(&a[0])?,
                    index: require_u64(&a[1])?,
                    new_answer_position: require_u64(&a[2])?,
                })
            }
            "op:get" => {
                let a = require_arity(&r.args, 3)?;
                Ok(Op::Get {
                    target: Target::from_value(&a[0])?,
                    field: require_str(&a[1])?,
                    new_answer_position: require_u64(&a[2])?,
                })
            }
            _ => Err(ProtocolError::UnknownOpLabel),
        }
    }

    /// Serialize to its wire record.
    pub fn to_value(&self) -> Value {
        match self {
            Op::StartSession {
                captp_version,
                session_pubkey,
                location,
                location_sig,
            } => Value::record(
                "op:start-session",
                vec![
                    Value::Str(captp_version.clone()),
                    session_pubkey.clone(),
                    location.clone(),
                    location_sig.clone(),
                ],
            ),
            Op::Bootstrap {
                answer_position,
                resolve_me_desc,
            } => Value::record(
                "op:bootstrap",
                vec![Value::Int(*answer_position as i128), resolve_me_desc.to_value()],
            ),
            Op::DeliverOnly { to, args } => Value::record(
                "op:deliver-only",
                vec![to.to_value(), Value::List(args.clone())],
            ),
            Op::Deliver {
                to,
                args,
                answer_position,
                resolve_me_desc,
            } => Value::record(
                "op:deliver",
                vec![
                    to.to_value(),
                    Value::List(args.clone()),
                    match answer_position {
                        Some(p) => Value::Int(*p as i128),
                        None => Value::Bool(false),
                    },
                    resolve_me_desc.to_value(),
                ],
            ),
            Op::Listen {
                to,
                resolve_me_desc,
                wants_partial,
            } => Value::record(
                "op:listen",
                vec![to.to_value(), resolve_me_desc.to_value(), Value::Bool(*wants_partial)],
            ),
            Op::Abort { reason } => Value::record("op:abort", vec![Value::Str(reason.clone())]),
            Op::GcExport {
                export_position,
                wire_delta,
            } => Value::record(
                "op:gc-export",
                vec![Value::Int(*export_position as i128), Value::Int(*wire_delta as i128)],
            ),
            Op::GcAnswer { answer_position } => {
                Value::record("op:gc-answer", vec![Value::Int(*answer_position as i128)])
            }
            Op::Index {
                target,
                index,
                new_answer_position,
            } => Value::record(
                "op:index",
                vec![
                    target.to_value(),
                    Value::Int(*index as i128),
                    Value::Int(*new_answer_position as i128),
                ],
            ),
            Op::Get {
                target,
                field,
                new_answer_position,
            } => Value::record(
                "op:get",
                vec![
                    target.to_value(),
                    Value::Str(field.clone()),
                    Value::Int(*new_answer_position as i128),
                ],
            ),
        }
    }
}

fn require_arity(args: &[Value], n: usize) -> Result<&[Value], ProtocolError> {
    if args.len() != n {
        return Err(ProtocolError::BadArity);
    }
    Ok(args)
}

fn require_str(v: &Value) -> Result<String, ProtocolError> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        _ => Err(ProtocolError::BadArity),
    }
}

fn require_u64(v: &Value) -> Result<u64, ProtocolError> {
    let n = v.as_int().ok_or(ProtocolError::BadArity)?;
    u64::try_from(n).map_err(|_| ProtocolError::BadArity)
}

fn require_optional_u64(v: &Value) -> Result<Option<u64>, ProtocolError> {
    match v {
        Value::Bool(false) => Ok(None),
        other => Ok(Some(require_u64(other)?)),
    }
}

fn require_list(v: &Value) -> Result<Vec<Value>, ProtocolError> {
    match v {
        Value::List(items) => Ok(items.clone()),
        _ => Err(ProtocolError::BadArity),
    }
}
