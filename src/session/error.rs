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

//! The composed error type for the handshake, send/receive loop, and
//! message-filter operations.

use thiserror::Error;

use crate::captp::ProtocolError;
use crate::crypto::CryptoError;
use crate::netlayer::TransportError;

/// Anything that can go wrong running a CapTP session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A transport-level failure (closed connection, timeout, malformed
    /// bytes).
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A well-formed message with the wrong shape for its label.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// A cryptographic failure verifying a signature or key.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    /// The peer's location signature did not verify during the handshake.
    #[error("peer's location signature is invalid")]
    InvalidLocationSignature,
    /// The first message on a session was not `op:start-session`.
    #[error("expected op:start-session as the first message")]
    HandshakeExpected,
    /// A handoff count already seen on this session was received again.
    #[error("received a handoff count already seen on this session")]
    ReplayedHandoffCount,
    /// The peer sent `op:abort`.
    #[error("session aborted by peer: {0}")]
    AbortedByPeer(String),
    /// An operation was attempted on a session that has already aborted.
    #[error("session is already aborted")]
    SessionAborted,
    /// A wait for a specific message or promise resolution ran out of
    /// retries without being satisfied.
    #[error("expected message was not received before giving up")]
    ExpectationUnmet,
}
