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

//! The CapTP value model: descriptors and wire operations, and the errors
//! that arise from parsing them off a decoded [`crate::codec::Value`].

pub mod descriptors;
pub mod ops;

use thiserror::Error;

pub use descriptors::{Answer, Export, HandoffGive, HandoffReceive, Import, SigEnvelope, Target};
pub use ops::Op;

/// Failures turning a decoded [`crate::codec::Value`] into a CapTP
/// descriptor or operation. Distinct from [`crate::codec::CodecError`],
/// which only concerns the underlying byte grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A record's label symbol did not match any known descriptor or
    /// `op:*` operation.
    #[error("unknown operation or descriptor label")]
    UnknownOpLabel,
    /// A record had the right label but the wrong number or shape of
    /// arguments.
    #[error("wrong arity or malformed argument")]
    BadArity,
    /// The peer's `captp_version` did not match ours during the handshake.
    #[error("captp version mismatch")]
    VersionMismatch,
    /// A second `op:start-session` arrived on a session that has already
    /// completed its handshake.
    #[error("duplicate op:start-session on an already-started session")]
    DuplicateStartSession,
    /// This side lost the crossed-hellos tie-break and must abort.
    #[error("lost the crossed-hellos tie-break")]
    CrossedHellosLoser,
}
