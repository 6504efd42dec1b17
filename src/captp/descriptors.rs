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

//! CapTP descriptors: the reference forms a message can point at.
//!
//! Each variant provides `to_value`/`from_value`, a closed-sum-type
//! replacement for the reference implementation's per-label class dispatch.

use crate::crypto::{self, CryptoError};
use crate::uri::{PeerLocator, UriError};
use crate::codec::{Record, Value};

use super::ProtocolError;

/// A position-addressed reference: an import of mine, or an import of a
/// promise of mine, as seen from my side of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Import {
    /// `<desc:import-object position>`
    Object(u64),
    /// `<desc:import-promise position>`
    Promise(u64),
}

impl Import {
    /// The position this import names.
    pub fn position(&self) -> u64 {
        match self {
            Import::Object(p) | Import::Promise(p) => *p,
        }
    }

    /// The peer's view of the same position.
    pub fn to_export(&self) -> Export {
        Export(self.position())
    }

    /// Parse `<desc:import-object position>` or `<desc:import-promise position>`.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let r = value.as_record().ok_or(ProtocolError::BadArity)?;
        let position = require_u64_arg(r, 0)?;
        match r.label_symbol() {
            Some("desc:import-object") if r.args.len() == 1 => Ok(Import::Object(position)),
            Some("desc:import-promise") if r.args.len() == 1 => Ok(Import::Promise(position)),
            _ => Err(ProtocolError::UnknownOpLabel),
        }
    }

    /// Serialize to its record form.
    pub fn to_value(&self) -> Value {
        match self {
            Import::Object(p) => Value::record("desc:import-object", vec![Value::Int(*p as i128)]),
            Import::Promise(p) => Value::record("desc:import-promise", vec![Value::Int(*p as i128)]),
        }
    }
}

/// `<desc:export position>` — a reference from the peer's perspective, naming
/// one of my objects or promises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Export(pub u64);

impl Export {
    /// Parse `<desc:export position>`.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let r = value.as_record().ok_or(ProtocolError::BadArity)?;
        if r.label_symbol() != Some("desc:export") || r.args.len() != 1 {
            return Err(ProtocolError::UnknownOpLabel);
        }
        Ok(Export(require_u64_arg(r, 0)?))
    }

    /// Serialize to its record form.
    pub fn to_value(&self) -> Value {
        Value::record("desc:export", vec![Value::Int(self.0 as i128)])
    }
}

/// `<desc:answer position>` — references the result promise of a specific
/// `op:deliver`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Answer(pub u64);

impl Answer {
    /// Parse `<desc:answer position>`.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let r = value.as_record().ok_or(ProtocolError::BadArity)?;
        if r.label_symbol() != Some("desc:answer") || r.args.len() != 1 {
            return Err(ProtocolError::UnknownOpLabel);
        }
        Ok(Answer(require_u64_arg(r, 0)?))
    }

    /// Serialize to its record form.
    pub fn to_value(&self) -> Value {
        Value::record("desc:answer", vec![Value::Int(self.0 as i128)])
    }
}

/// Either an [`Export`] or an [`Answer`] — the two things a `deliver`/
/// `deliver-only` can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    /// Targets an export.
    Export(Export),
    /// Targets an in-flight answer (promise pipelining).
    Answer(Answer),
}

impl Target {
    /// Parse either a `desc:export` or `desc:answer` record.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        Export::from_value(value)
            .map(Target::Export)
            .or_else(|_| Answer::from_value(value).map(Target::Answer))
    }

    /// Serialize to its record form.
    pub fn to_value(&self) -> Value {
        match self {
            Target::Export(e) => e.to_value(),
            Target::Answer(a) => a.to_value(),
        }
    }
}

/// `<desc:sig-envelope data signature>` — an inner value plus an Ed25519
/// signature over its canonical encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct SigEnvelope {
    /// The signed payload.
    pub inner: Box<Value>,
    /// Raw 64-byte Ed25519 signature over `encode(*inner)`.
    pub signature: [u8; 64],
}

impl SigEnvelope {
    /// Sign `inner`'s canonical encoding and wrap it.
    pub fn seal(inner: Value, sign: impl FnOnce(&[u8]) -> [u8; 64]) -> Self {
        let bytes = crate::codec::encode(&inner);
        let signature = sign(&bytes);
        Self {
            inner: Box::new(inner),
            signature,
        }
    }

    /// Verify the envelope's signature against a raw public key.
    pub fn verify(&self, public_key: &[u8; 32]) -> Result<(), CryptoError> {
        let bytes = crate::codec::encode(&self.inner);
        crypto::verify(public_key, &bytes, &self.signature)
    }

    /// Parse `<desc:sig-envelope data signature>`.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let r = value.as_record().ok_or(ProtocolError::BadArity)?;
        if r.label_symbol() != Some("desc:sig-envelope") || r.args.len() != 2 {
            return Err(ProtocolError::UnknownOpLabel);
        }
        let signature =
            crypto::signature_from_value(&r.args[1]).map_err(|_| ProtocolError::BadArity)?;
        Ok(Self {
            inner: Box::new(r.args[0].clone()),
            signature,
        })
    }

    /// Serialize to its record form.
    pub fn to_value(&self) -> Value {
        Value::record(
            "desc:sig-envelope",
            vec![(*self.inner).clone(), crypto::signature_to_value(&self.signature)],
        )
    }
}

/// `<desc:handoff-give receiver-key exporter-location session gifter-side gift-id>`
///
/// Created by the Gifter and handed to the Receiver off-session; see
/// SPEC_FULL.md §4.6.
#[derive(Clone, Debug, PartialEq)]
pub struct HandoffGive {
    /// The Receiver's public key, as known to the Gifter.
    pub receiver_key: [u8; 32],
    /// Where to find the Exporter.
    pub exporter_location: PeerLocator,
    /// The Gifter<->Exporter session-id.
    pub session: [u8; 32],
    /// The Gifter's side-id on the Gifter<->Exporter session.
    pub gifter_side: [u8; 32],
    /// Fresh bytes identifying this particular gift.
    pub gift_id: Vec<u8>,
}

impl HandoffGive {
    /// Parse `<desc:handoff-give receiver-key exporter-location session gifter-side gift-id>`.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let r = value.as_record().ok_or(ProtocolError::BadArity)?;
        if r.label_symbol() != Some("desc:handoff-give") || r.args.len() != 5 {
            return Err(ProtocolError::UnknownOpLabel);
        }
        let receiver_key =
            crypto::public_key_from_value(&r.args[0]).map_err(|_| ProtocolError::BadArity)?;
        let exporter_location =
            PeerLocator::from_value(&r.args[1]).map_err(|_: UriError| ProtocolError::BadArity)?;
        let session = require_bytes32(&r.args[2])?;
        let gifter_side = require_bytes32(&r.args[3])?;
        let gift_id = r.args[4].as_bytes().ok_or(ProtocolError::BadArity)?.to_vec();
        Ok(Self {
            receiver_key,
            exporter_location,
            session,
            gifter_side,
            gift_id,
        })
    }

    /// Serialize to its record form.
    pub fn to_value(&self) -> Value {
        Value::record(
            "desc:handoff-give",
            vec![
                crypto::public_key_to_value(&self.receiver_key),
                self.exporter_location.to_value(),
                Value::Bytes(self.session.to_vec()),
                Value::Bytes(self.gifter_side.to_vec()),
                Value::Bytes(self.gift_id.clone()),
            ],
        )
    }
}

/// `<desc:handoff-receive receiving-session receiving-side handoff-count signed-give>`
///
/// Created by the Receiver and presented to the Exporter via `withdraw-gift`.
#[derive(Clone, Debug, PartialEq)]
pub struct HandoffReceive {
    /// The Receiver<->Exporter session-id.
    pub receiving_session: [u8; 32],
    /// The Receiver's side-id on the Receiver<->Exporter session.
    pub receiving_side: [u8; 32],
    /// The Receiver's next handoff counter; guards replay.
    pub handoff_count: u64,
    /// The Gifter's signed `HandoffGive`, relayed unmodified.
    pub signed_give: Box<SigEnvelope>,
}

impl HandoffReceive {
    /// Parse `<desc:handoff-receive receiving-session receiving-side handoff-count signed-give>`.
    pub fn from_value(value: &Value) -> Result<Self, ProtocolError> {
        let r = value.as_record().ok_or(ProtocolError::BadArity)?;
        if r.label_symbol() != Some("desc:handoff-receive") || r.args.len() != 4 {
            return Err(ProtocolError::UnknownOpLabel);
        }
        let receiving_session = require_bytes32(&r.args[0])?;
        let receiving_side = require_bytes32(&r.args[1])?;
        let handoff_count = r.args[2].as_int().ok_or(ProtocolError::BadArity)? as u64;
        let signed_give = SigEnvelope::from_value(&r.args[3])?;
        Ok(Self {
            receiving_session,
            receiving_side,
            handoff_count,
            signed_give: Box::new(signed_give),
        })
    }

    /// Serialize to its record form.
    pub fn to_value(&self) -> Value {
        Value::record(
            "desc:handoff-receive",
            vec![
                Value::Bytes(self.receiving_session.to_vec()),
                Value::Bytes(self.receiving_side.to_vec()),
                Value::Int(self.handoff_count as i128),
                self.signed_give.to_value(),
            ],
        )
    }
}

fn require_u64_arg(r: &Record, idx: usize) -> Result<u64, ProtocolError> {
    let n = r.args.get(idx).and_then(Value::as_int).ok_or(ProtocolError::BadArity)?;
    u64::try_from(n).map_err(|_| ProtocolError::BadArity)
}

fn require_bytes32(value: &Value) -> Result<[u8; 32], ProtocolError> {
    let bytes = value.as_bytes().ok_or(ProtocolError::BadArity)?;
    if bytes.len() != 32 {
        return Err(ProtocolError::BadArity);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_round_trips() {
        let v = Import::Object(7).to_value();
        assert_eq!(Import::from_value(&v).unwrap(), Import::Object(7));
    }

    #[test]
    fn export_to_import_is_wire_symmetric() {
        let imp = Import::Promise(3);
        assert_eq!(imp.to_export(), Export(3));
    }

    #[test]
    fn sig_envelope_round_trips_and_verifies() {
        let id = crate::crypto::SessionIdentity::generate().unwrap();
        let inner = Value::Str("payload".into());
        let pk = id.public_key_bytes();
        let envelope = SigEnvelope::seal(inner, |bytes| id.sign(bytes));
        envelope.verify(&pk).unwrap();

        let value = envelope.to_value();
        let parsed = SigEnvelope::from_value(&value).unwrap();
        parsed.verify(&pk).unwrap();
    }

    #[test]
    fn handoff_give_round_trips() {
        let give = HandoffGive {
            receiver_key: [9u8; 32],
            exporter_location: PeerLocator::new("tcp", "exporter.example"),
            session: [1u8; 32],
            gifter_side: [2u8; 32],
            gift_id: b"gift".to_vec(),
        };
        let value = give.to_value();
        assert_eq!(HandoffGive::from_value(&value).unwrap(), give);
    }
}
