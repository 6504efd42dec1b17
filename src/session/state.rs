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

//! Per-session bookkeeping: position allocators, the bootstrap cache, and
//! the replay guard.

use std::collections::HashSet;

use crate::captp::{Answer, Export, Import};
use crate::crypto::{self, SessionIdentity};
use crate::uri::PeerLocator;

use super::SessionError;

/// Where a session currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// The handshake has not yet run.
    Unstarted,
    /// `op:start-session` has been exchanged both ways.
    Started,
    /// The session has been aborted, by either side.
    Aborted,
}

/// Mutable session state: identity, position counters, and the handoff
/// replay guard. One per connection.
pub struct SessionState {
    identity: SessionIdentity,
    our_location: PeerLocator,
    peer_location: Option<PeerLocator>,
    peer_public_key: Option<[u8; 32]>,
    is_outbound: bool,
    role: Role,
    // Resolve-me positions are allocated from the same space the peer
    // later addresses back as `desc:export` (captp.py's `next_import_object`).
    next_import_position: u64,
    next_answer_position: u64,
    next_handoff_count: u64,
    seen_handoff_counts: HashSet<u64>,
    bootstrap_cache: Option<Export>,
}

impl SessionState {
    /// Start fresh session state for a connection we either dialed or
    /// accepted.
    pub fn new(identity: SessionIdentity, our_location: PeerLocator, is_outbound: bool) -> Self {
        Self {
            identity,
            our_location,
            peer_location: None,
            peer_public_key: None,
            is_outbound,
            role: Role::Unstarted,
            next_import_position: 0,
            next_answer_position: 0,
            next_handoff_count: 0,
            seen_handoff_counts: HashSet::new(),
            bootstrap_cache: None,
        }
    }

    /// Our Ed25519 session identity.
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Our own advertised location.
    pub fn our_location(&self) -> &PeerLocator {
        &self.our_location
    }

    /// The peer's location, once the handshake has recorded it.
    pub fn peer_location(&self) -> Option<&PeerLocator> {
        self.peer_location.as_ref()
    }

    /// Whether we dialed out (`true`) or accepted (`false`) this connection.
    pub fn is_outbound(&self) -> bool {
        self.is_outbound
    }

    /// Current handshake/session role.
    pub fn role(&self) -> Role {
        self.role
    }

    pub(super) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(super) fn set_peer(&mut self, public_key: [u8; 32], location: PeerLocator) {
        self.peer_public_key = Some(public_key);
        self.peer_location = Some(location);
    }

    /// The peer's session public key, once the handshake has recorded it.
    pub fn peer_public_key(&self) -> Option<[u8; 32]> {
        self.peer_public_key
    }

    /// `side_id` for our own session key.
    pub fn our_side_id(&self) -> [u8; 32] {
        let encoded = crate::codec::encode(&crypto::public_key_to_value(&self.identity.public_key_bytes()));
        crypto::side_id(&encoded)
    }

    /// `side_id` for the peer's session key, once known.
    pub fn peer_side_id(&self) -> Option<[u8; 32]> {
        self.peer_public_key.map(|pk| {
            let encoded = crate::codec::encode(&crypto::public_key_to_value(&pk));
            crypto::side_id(&encoded)
        })
    }

    /// This session's `session_id`, once the peer's key is known.
    pub fn session_id(&self) -> Option<[u8; 32]> {
        self.peer_side_id().map(|peer| crypto::session_id(&self.our_side_id(), &peer))
    }

    /// Allocate the next resolve-me position.
    pub fn next_resolver(&mut self) -> Import {
        let position = self.next_import_position;
        self.next_import_position += 1;
        Import::Object(position)
    }

    /// Allocate the next answer position.
    pub fn next_answer(&mut self) -> Answer {
        let position = self.next_answer_position;
        self.next_answer_position += 1;
        Answer(position)
    }

    /// Allocate the next handoff count for a gift we give.
    pub fn next_handoff_count(&mut self) -> u64 {
        let count = self.next_handoff_count;
        self.next_handoff_count += 1;
        count
    }

    /// Record a handoff count seen from the peer on this session, failing
    /// if it has been seen before.
    pub fn record_handoff_count(&mut self, count: u64) -> Result<(), SessionError> {
        if !self.seen_handoff_counts.insert(count) {
            return Err(SessionError::ReplayedHandoffCount);
        }
        Ok(())
    }

    /// The cached bootstrap export, if `get_bootstrap_object` has already
    /// resolved one.
    pub fn bootstrap_cache(&self) -> Option<Export> {
        self.bootstrap_cache
    }

    /// Cache the resolved bootstrap export.
    pub fn cache_bootstrap(&mut self, export: Export) {
        self.bootstrap_cache = Some(export);
    }
}
