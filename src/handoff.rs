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

//! Third-party handoffs: the Gifter/Receiver/Exporter rendezvous that lets a
//! capability move between two sessions that never talk to each other
//! directly.
//!
//! The Exporter holds a table from `gift_id` to a deposited object
//! descriptor (filled in by `deposit-gift`) and drains it on a verified
//! `withdraw-gift`. Verification has two legs:
//! - the inner [`HandoffGive`] must carry the Gifter's signature, checked
//!   against the Gifter's session public key on the Gifter<->Exporter
//!   session named by `handoff_give.session`;
//! - the outer [`HandoffReceive`] envelope must carry a signature that
//!   verifies against `handoff_give.receiver_key` — proof the withdrawer
//!   holds the private key the Gifter vouched for.
//!
//! `handoff_count` must strictly increase per receiving side-id; a reused
//! count is rejected as a replay.
//!
//! A `withdraw-gift` that arrives before the matching `deposit-gift` is not
//! an error: every other check (signatures, session, replay) still runs up
//! front, and the withdrawer gets back a [`Withdrawal::Pending`] handle to
//! poll once the deposit lands, rather than the final object.

use std::collections::HashMap;

use thiserror::Error;

use crate::captp::{HandoffGive, HandoffReceive, SigEnvelope};
use crate::codec::Value;
use crate::monitoring::metrics::Metrics;

/// Handoff verification and bookkeeping failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandoffError {
    /// The Gifter's signature over the embedded `HandoffGive` did not verify.
    #[error("handoff-give signature invalid")]
    InvalidGiveSignature,
    /// The outer envelope's signature did not verify against the
    /// `HandoffGive`'s `receiver_key`.
    #[error("handoff-receive signature invalid")]
    InvalidReceiveSignature,
    /// `handoff_give.session` does not match the Gifter<->Exporter session
    /// this handoff claims to have been minted on.
    #[error("handoff-give session mismatch")]
    SessionMismatch,
    /// This side has already used this (or a greater) `handoff_count`.
    #[error("handoff count already used")]
    ReplayedHandoffCount,
}

/// The result of a verified `withdraw-gift`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Withdrawal {
    /// The gift was already deposited; here it is.
    Ready(Value),
    /// Every check passed but no `deposit-gift` has arrived yet. Poll
    /// [`GiftTable::poll_pending`] once the deposit is expected to have
    /// landed.
    Pending(PendingWithdrawal),
}

/// A verified withdrawal waiting on a `deposit-gift` that hasn't arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWithdrawal {
    gift_id: Vec<u8>,
}

/// Per-exporter state: deposited gifts awaiting withdrawal, and the highest
/// `handoff_count` seen from each receiving side-id.
#[derive(Default)]
pub struct GiftTable {
    deposited: HashMap<Vec<u8>, Value>,
    seen_handoff_counts: HashMap<[u8; 32], u64>,
    metrics: Option<Metrics>,
}

impl GiftTable {
    /// Build an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count completed and rejected handoffs against `metrics`.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Record a gift so a later `withdraw-gift` can claim it, resolving any
    /// withdrawal that was already verified and is waiting on this deposit.
    pub fn deposit(&mut self, gift_id: Vec<u8>, object: Value) {
        tracing::debug!(gift_id = %hex::encode(&gift_id), "gift deposited");
        self.deposited.insert(gift_id, object);
    }

    /// Poll a pending withdrawal for its deposit. Returns `None` if the
    /// matching `deposit-gift` still hasn't arrived.
    pub fn poll_pending(&mut self, pending: &PendingWithdrawal) -> Option<Value> {
        self.deposited.remove(&pending.gift_id)
    }

    /// Verify a withdraw-gift, given the Gifter's public key as known on
    /// the session named by `handoff_give.session`, and the session-id this
    /// `withdraw-gift` message actually arrived on. Verification always runs
    /// to completion before the deposit is checked.
    pub fn withdraw(
        &mut self,
        signed_receive: &SigEnvelope,
        gifter_public_key: &[u8; 32],
        arrived_on_session: &[u8; 32],
    ) -> Result<Withdrawal, HandoffError> {
        match self.verify_and_drain(signed_receive, gifter_public_key, arrived_on_session) {
            Ok(withdrawal) => {
                if let (Some(metrics), Withdrawal::Ready(_)) = (&self.metrics, &withdrawal) {
                    metrics.handoffs_completed_total.inc();
                }
                Ok(withdrawal)
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.handoffs_rejected_total.inc();
                }
                tracing::warn!(op = "withdraw-gift", error = %err, "handoff rejected");
                Err(err)
            }
        }
    }

    fn verify_and_drain(
        &mut self,
        signed_receive: &SigEnvelope,
        gifter_public_key: &[u8; 32],
        arrived_on_session: &[u8; 32],
    ) -> Result<Withdrawal, HandoffError> {
        let receive = HandoffReceive::from_value(&signed_receive.inner)
            .map_err(|_| HandoffError::InvalidReceiveSignature)?;

        let give = HandoffGive::from_value(&receive.signed_give.inner)
            .map_err(|_| HandoffError::InvalidGiveSignature)?;

        receive
            .signed_give
            .verify(gifter_public_key)
            .map_err(|_| HandoffError::InvalidGiveSignature)?;

        if &give.session != arrived_on_session {
            return Err(HandoffError::SessionMismatch);
        }

        signed_receive
            .verify(&give.receiver_key)
            .map_err(|_| HandoffError::InvalidReceiveSignature)?;

        let last_seen = self
            .seen_handoff_counts
            .get(&receive.receiving_side)
            .copied();
        if last_seen.is_some_and(|seen| receive.handoff_count <= seen) {
            return Err(HandoffError::ReplayedHandoffCount);
        }
        self.seen_handoff_counts
            .insert(receive.receiving_side, receive.handoff_count);

        match self.deposited.remove(&give.gift_id) {
            Some(object) => Ok(Withdrawal::Ready(object)),
            None => {
                tracing::info!(
                    gift_id = %hex::encode(&give.gift_id),
                    op = "withdraw-gift",
                    "withdraw arrived before deposit, returning a pending promise"
                );
                Ok(Withdrawal::Pending(PendingWithdrawal { gift_id: give.gift_id }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SessionIdentity;
    use crate::uri::PeerLocator;

    fn seal_give(gifter: &SessionIdentity, give: HandoffGive) -> SigEnvelope {
        SigEnvelope::seal(give.to_value(), |bytes| gifter.sign(bytes))
    }

    #[test]
    fn valid_withdrawal_drains_the_deposit() {
        let gifter = SessionIdentity::generate().unwrap();
        let receiver = SessionIdentity::generate().unwrap();

        let session = [7u8; 32];
        let signed_give = seal_give(
            &gifter,
            HandoffGive {
                receiver_key: receiver.public_key_bytes(),
                exporter_location: PeerLocator::new("tcp", "exporter.example"),
                session,
                gifter_side: [1u8; 32],
                gift_id: b"gift".to_vec(),
            },
        );

        let receive = HandoffReceive {
            receiving_session: [9u8; 32],
            receiving_side: [2u8; 32],
            handoff_count: 0,
            signed_give: Box::new(signed_give),
        };
        let signed_receive = SigEnvelope::seal(receive.to_value(), |bytes| receiver.sign(bytes));

        let mut table = GiftTable::new();
        table.deposit(b"gift".to_vec(), Value::Str("the-prize".into()));

        let gifter_key = gifter.public_key_bytes();
        let got = table.withdraw(&signed_receive, &gifter_key, &session).unwrap();
        assert_eq!(got, Withdrawal::Ready(Value::Str("the-prize".into())));
    }

    #[test]
    fn withdraw_before_deposit_returns_a_pending_promise_resolved_by_a_later_deposit() {
        let gifter = SessionIdentity::generate().unwrap();
        let receiver = SessionIdentity::generate().unwrap();
        let session = [7u8; 32];

        let signed_give = seal_give(
            &gifter,
            HandoffGive {
                receiver_key: receiver.public_key_bytes(),
                exporter_location: PeerLocator::new("tcp", "exporter.example"),
                session,
                gifter_side: [1u8; 32],
                gift_id: b"gift".to_vec(),
            },
        );
        let receive = HandoffReceive {
            receiving_session: [9u8; 32],
            receiving_side: [2u8; 32],
            handoff_count: 0,
            signed_give: Box::new(signed_give),
        };
        let signed_receive = SigEnvelope::seal(receive.to_value(), |bytes| receiver.sign(bytes));

        let mut table = GiftTable::new();
        let gifter_key = gifter.public_key_bytes();

        let pending = match table.withdraw(&signed_receive, &gifter_key, &session).unwrap() {
            Withdrawal::Pending(pending) => pending,
            Withdrawal::Ready(_) => panic!("expected a pending withdrawal before any deposit"),
        };
        assert!(table.poll_pending(&pending).is_none());

        table.deposit(b"gift".to_vec(), Value::Str("the-prize".into()));
        assert_eq!(table.poll_pending(&pending), Some(Value::Str("the-prize".into())));
    }

    #[test]
    fn reused_handoff_count_is_rejected() {
        let gifter = SessionIdentity::generate().unwrap();
        let receiver = SessionIdentity::generate().unwrap();
        let session = [7u8; 32];

        let make_receive = || {
            let signed_give = seal_give(
                &gifter,
                HandoffGive {
                    receiver_key: receiver.public_key_bytes(),
                    exporter_location: PeerLocator::new("tcp", "exporter.example"),
                    session,
                    gifter_side: [1u8; 32],
                    gift_id: b"gift".to_vec(),
                },
            );
            let receive = HandoffReceive {
                receiving_session: [9u8; 32],
                receiving_side: [2u8; 32],
                handoff_count: 0,
                signed_give: Box::new(signed_give),
            };
            SigEnvelope::seal(receive.to_value(), |bytes| receiver.sign(bytes))
        };

        let mut table = GiftTable::new();
        table.deposit(b"gift".to_vec(), Value::Str("first".into()));
        let gifter_key = gifter.public_key_bytes();
        table.withdraw(&make_receive(), &gifter_key, &session).unwrap();

        table.deposit(b"gift".to_vec(), Value::Str("second".into()));
        assert_eq!(
            table.withdraw(&make_receive(), &gifter_key, &session),
            Err(HandoffError::ReplayedHandoffCount)
        );
    }

    #[test]
    fn tampered_receive_signature_is_rejected() {
        let gifter = SessionIdentity::generate().unwrap();
        let receiver = SessionIdentity::generate().unwrap();
        let impostor = SessionIdentity::generate().unwrap();
        let session = [7u8; 32];

        let signed_give = seal_give(
            &gifter,
            HandoffGive {
                receiver_key: receiver.public_key_bytes(),
                exporter_location: PeerLocator::new("tcp", "exporter.example"),
                session,
                gifter_side: [1u8; 32],
                gift_id: b"gift".to_vec(),
            },
        );
        let receive = HandoffReceive {
            receiving_session: [9u8; 32],
            receiving_side: [2u8; 32],
            handoff_count: 0,
            signed_give: Box::new(signed_give),
        };
        // Signed by the wrong key.
        let signed_receive = SigEnvelope::seal(receive.to_value(), |bytes| impostor.sign(bytes));

        let mut table = GiftTable::new();
        table.deposit(b"gift".to_vec(), Value::Str("the-prize".into()));
        let gifter_key = gifter.public_key_bytes();
        assert_eq!(
            table.withdraw(&signed_receive, &gifter_key, &session),
            Err(HandoffError::InvalidReceiveSignature)
        );
    }
}
