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

//! Tracks live sessions by peer so concurrent inbound and outbound
//! connections to the same peer can be resolved by the crossed-hellos
//! tie-break (SPEC_FULL.md §4.5).
//!
//! Session keys are generated fresh per session (§3.4), so the ephemeral
//! session public key cannot identify "the same peer" across two
//! connections the way a long-lived identity would. This harness instead
//! keys the table on the peer's advertised location designator, which is
//! the stable handle a scenario actually dials and accepts against.

use std::collections::HashMap;
use std::sync::Mutex;

use super::crossed_hellos_loses;

struct LiveSession {
    our_side_id: [u8; 32],
}

/// Outcome of checking a newly-handshaken session against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossedHellosOutcome {
    /// No other live session to this peer was registered.
    NoConflict,
    /// Both an inbound and outbound session to this peer are live; this
    /// side's `side_id` sorts first, so this session must abort.
    WeLose,
    /// Both an inbound and outbound session to this peer are live, but the
    /// other registered session loses instead; this session survives and
    /// replaces the registry entry.
    OtherLoses,
}

/// Shared table of live sessions, keyed by peer location designator.
#[derive(Default)]
pub struct PeerSessionRegistry {
    live: Mutex<HashMap<String, LiveSession>>,
}

impl PeerSessionRegistry {
    /// Build an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a just-handshaken session against the peer named by
    /// `peer_designator`, resolving any crossed-hellos conflict against a
    /// session already registered there.
    pub fn resolve(&self, peer_designator: &str, our_side_id: [u8; 32], peer_side_id: [u8; 32]) -> CrossedHellosOutcome {
        let mut live = self.live.lock().expect("peer session registry mutex poisoned");
        match live.get(peer_designator) {
            None => {
                live.insert(peer_designator.to_string(), LiveSession { our_side_id });
                CrossedHellosOutcome::NoConflict
            }
            Some(_existing) => {
                if crossed_hellos_loses(&our_side_id, &peer_side_id) {
                    CrossedHellosOutcome::WeLose
                } else {
                    live.insert(peer_designator.to_string(), LiveSession { our_side_id });
                    CrossedHellosOutcome::OtherLoses
                }
            }
        }
    }

    /// Release the slot held for `peer_designator`, e.g. once a session
    /// aborts or its transport closes.
    pub fn release(&self, peer_designator: &str) {
        self.live.lock().expect("peer session registry mutex poisoned").remove(peer_designator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_registration_has_no_conflict() {
        let registry = PeerSessionRegistry::new();
        let outcome = registry.resolve("peer", [1u8; 32], [2u8; 32]);
        assert_eq!(outcome, CrossedHellosOutcome::NoConflict);
    }

    #[test]
    fn second_registration_resolves_by_side_id() {
        let registry = PeerSessionRegistry::new();
        // Outbound session registers first with side_id [2; 32].
        registry.resolve("peer", [2u8; 32], [1u8; 32]);
        // Inbound session to the same peer: its side_id [1; 32] is smaller
        // than the peer's side_id [2; 32], so it loses.
        let outcome = registry.resolve("peer", [1u8; 32], [2u8; 32]);
        assert_eq!(outcome, CrossedHellosOutcome::WeLose);
    }

    #[test]
    fn a_session_that_would_win_replaces_the_registered_loser() {
        let registry = PeerSessionRegistry::new();
        registry.resolve("peer", [1u8; 32], [2u8; 32]);
        let outcome = registry.resolve("peer", [2u8; 32], [1u8; 32]);
        assert_eq!(outcome, CrossedHellosOutcome::OtherLoses);
    }
}
