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

//! The handshake, send/receive loop, and message-filter helpers that drive
//! one CapTP session to completion.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::captp::{Export, HandoffReceive, Import, Op, ProtocolError, SigEnvelope, Target};
use crate::codec::Value;
use crate::crypto::{self, SessionIdentity};
use crate::monitoring::metrics::Metrics;
use crate::netlayer::NetlayerSession;
use crate::uri::PeerLocator;

use super::registry::CrossedHellosOutcome;
use super::{PeerSessionRegistry, Role, SessionError, SessionState};

/// Signs the textual label a peer's location signature is computed over:
/// `(my-location <location-record>)`.
fn location_signature_payload(location: &Value) -> Vec<u8> {
    crate::codec::encode(&Value::record("my-location", vec![location.clone()]))
}

/// A live CapTP session: bookkeeping plus one connected netlayer session.
pub struct Session<N: NetlayerSession> {
    state: SessionState,
    conn: N,
    metrics: Option<Metrics>,
    registry: Option<Arc<PeerSessionRegistry>>,
}

impl<N: NetlayerSession> Session<N> {
    /// Wrap a connected netlayer session with fresh CapTP state.
    pub fn new(identity: SessionIdentity, our_location: PeerLocator, is_outbound: bool, conn: N) -> Self {
        Self {
            state: SessionState::new(identity, our_location, is_outbound),
            conn,
            metrics: None,
            registry: None,
        }
    }

    /// Count session and handoff events against `metrics`.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolve crossed-hellos against `registry` once the handshake
    /// completes.
    pub fn with_peer_registry(mut self, registry: Arc<PeerSessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Read-only access to session bookkeeping.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn side(&self) -> &'static str {
        if self.state.is_outbound() { "outbound" } else { "inbound" }
    }

    /// Run the `op:start-session` handshake. Accepts the session iff the
    /// peer's `captp_version` matches `captp_version`; otherwise sends
    /// `op:abort` and fails with [`SessionError::Protocol`]
    /// ([`ProtocolError::VersionMismatch`]).
    pub fn setup_session(&mut self, captp_version: &str) -> Result<(), SessionError> {
        tracing::info!(side = self.side(), op = "start-session", "beginning captp handshake");

        let our_pubkey = self.state.identity().public_key_bytes();
        let our_location_value = self.state.our_location().to_value();
        let our_sig = self.state.identity().sign(&location_signature_payload(&our_location_value));

        let remote = if self.state.is_outbound() {
            self.send_start_session(captp_version, &our_pubkey, &our_location_value, &our_sig)?;
            self.expect_start_session()?
        } else {
            let remote = self.expect_start_session()?;
            self.send_start_session(captp_version, &our_pubkey, &our_location_value, &our_sig)?;
            remote
        };

        let (remote_version, remote_pubkey_value, remote_location_value, remote_sig_value) = remote;

        if remote_version != captp_version {
            tracing::warn!(
                side = self.side(),
                op = "start-session",
                ours = captp_version,
                theirs = %remote_version,
                "captp version mismatch, aborting"
            );
            self.abort("version-mismatch")?;
            return Err(SessionError::Protocol(ProtocolError::VersionMismatch));
        }

        let remote_pubkey = crypto::public_key_from_value(&remote_pubkey_value)?;
        let remote_location = PeerLocator::from_value(&remote_location_value).map_err(|_| SessionError::InvalidLocationSignature)?;
        let remote_sig = crypto::signature_from_value(&remote_sig_value)?;

        let payload = location_signature_payload(&remote_location_value);
        crypto::verify(&remote_pubkey, &payload, &remote_sig).map_err(|_| SessionError::InvalidLocationSignature)?;

        let peer_designator = remote_location.designator.clone();
        self.state.set_peer(remote_pubkey, remote_location);
        self.state.set_role(Role::Started);

        if let Some(registry) = self.registry.clone() {
            let our_side_id = self.state.our_side_id();
            let peer_side_id = self.state.peer_side_id().expect("peer side id known once peer key is set");
            match registry.resolve(&peer_designator, our_side_id, peer_side_id) {
                CrossedHellosOutcome::NoConflict | CrossedHellosOutcome::OtherLoses => {}
                CrossedHellosOutcome::WeLose => {
                    tracing::warn!(side = self.side(), op = "start-session", "lost crossed-hellos tie-break, aborting");
                    self.abort("crossed-hellos")?;
                    return Err(SessionError::Protocol(ProtocolError::CrossedHellosLoser));
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.sessions_started_total.inc();
        }
        tracing::info!(
            session_id = %self.state.session_id().map(hex::encode).unwrap_or_default(),
            side = self.side(),
            op = "start-session",
            "handshake complete"
        );
        Ok(())
    }

    fn send_start_session(
        &mut self,
        version: &str,
        pubkey: &[u8; 32],
        location: &Value,
        sig: &[u8; 64],
    ) -> Result<(), SessionError> {
        self.send(&Op::StartSession {
            captp_version: version.to_string(),
            session_pubkey: crypto::public_key_to_value(pubkey),
            location: location.clone(),
            location_sig: crypto::signature_to_value(sig),
        })
    }

    fn expect_start_session(&mut self) -> Result<(String, Value, Value, Value), SessionError> {
        match self.receive(Duration::from_secs(60))? {
            Op::StartSession {
                captp_version,
                session_pubkey,
                location,
                location_sig,
            } => Ok((captp_version, session_pubkey, location, location_sig)),
            _ => Err(SessionError::HandshakeExpected),
        }
    }

    /// Send one operation.
    pub fn send(&mut self, op: &Op) -> Result<(), SessionError> {
        self.conn.send_message(op)?;
        Ok(())
    }

    /// Block for up to `timeout` for the next operation, applying the
    /// handoff replay guard and treating `op:abort` as a terminal error.
    pub fn receive(&mut self, timeout: Duration) -> Result<Op, SessionError> {
        let op = self.conn.receive_message(timeout)?;
        if matches!(op, Op::StartSession { .. }) && self.state.role() == Role::Started {
            tracing::warn!(side = self.side(), op = "start-session", "duplicate op:start-session, aborting");
            self.abort("duplicate-session")?;
            return Err(SessionError::Protocol(ProtocolError::DuplicateStartSession));
        }
        self.scan_for_handoff_replay(&op)?;
        if let Op::Abort { reason } = &op {
            self.state.set_role(Role::Aborted);
            return Err(SessionError::AbortedByPeer(reason.clone()));
        }
        Ok(op)
    }

    fn scan_for_handoff_replay(&mut self, op: &Op) -> Result<(), SessionError> {
        let args = match op {
            Op::Deliver { args, .. } | Op::DeliverOnly { args, .. } => args,
            _ => return Ok(()),
        };
        for arg in args {
            let Ok(envelope) = SigEnvelope::from_value(arg) else { continue };
            let Ok(receive) = HandoffReceive::from_value(&envelope.inner) else { continue };
            if let Err(err) = self.state.record_handoff_count(receive.handoff_count) {
                if let Some(metrics) = &self.metrics {
                    metrics.replayed_handoffs_total.inc();
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Send `op:abort` and mark the session aborted.
    pub fn abort(&mut self, reason: &str) -> Result<(), SessionError> {
        tracing::warn!(side = self.side(), op = "abort", reason, "aborting session");
        self.send(&Op::Abort { reason: reason.to_string() })?;
        self.state.set_role(Role::Aborted);
        self.conn.close();
        if let Some(metrics) = &self.metrics {
            metrics.sessions_aborted_total.inc();
        }
        if let (Some(registry), Some(peer_location)) = (&self.registry, self.state.peer_location()) {
            registry.release(&peer_location.designator);
        }
        Ok(())
    }

    /// Read messages until one satisfies `predicate`, or `timeout` elapses.
    pub fn expect_message_type(
        &mut self,
        timeout: Duration,
        mut predicate: impl FnMut(&Op) -> bool,
    ) -> Result<Op, SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SessionError::ExpectationUnmet);
            }
            let op = self.receive(remaining)?;
            if predicate(&op) {
                return Ok(op);
            }
        }
    }

    /// Read messages until a `deliver`/`deliver-only` addressed to `target`
    /// arrives.
    pub fn expect_message_to(&mut self, target: Target, timeout: Duration) -> Result<Op, SessionError> {
        self.expect_message_type(timeout, |op| match op {
            Op::Deliver { to, .. } | Op::DeliverOnly { to, .. } => *to == target,
            _ => false,
        })
    }

    /// Follow a promise to its final (non-promise) resolution, issuing
    /// `op:listen` for each intermediate promise handed back.
    pub fn expect_promise_resolution(&mut self, resolve_me: Export, timeout: Duration) -> Result<Op, SessionError> {
        let mut waiting_on = resolve_me;
        loop {
            let op = self.expect_message_to(Target::Export(waiting_on), timeout)?;
            let args = match &op {
                Op::Deliver { args, .. } | Op::DeliverOnly { args, .. } => args,
                _ => return Err(SessionError::ExpectationUnmet),
            };
            match args.first().and_then(Value::as_symbol) {
                Some("break") => return Ok(op),
                Some("fulfill") => {
                    if let Some(Ok(Import::Promise(pos))) = args.get(1).map(Import::from_value) {
                        let resolver = self.state.next_resolver();
                        let next_export = resolver.to_export();
                        self.send(&Op::Listen {
                            to: Target::Export(Export(pos)),
                            resolve_me_desc: resolver,
                            wants_partial: true,
                        })?;
                        waiting_on = next_export;
                        continue;
                    }
                    return Ok(op);
                }
                _ => return Err(SessionError::ExpectationUnmet),
            }
        }
    }

    /// Fetch (and cache) the peer's bootstrap object.
    pub fn get_bootstrap_object(&mut self, pipeline: bool, timeout: Duration) -> Result<Target, SessionError> {
        if let Some(cached) = self.state.bootstrap_cache() {
            return Ok(Target::Export(cached));
        }

        let answer = self.state.next_answer();
        let resolve_me_desc = self.state.next_resolver();
        self.send(&Op::Bootstrap {
            answer_position: answer.0,
            resolve_me_desc,
        })?;

        if pipeline {
            return Ok(Target::Answer(answer));
        }

        let resolution = self.expect_promise_resolution(resolve_me_desc.to_export(), timeout)?;
        let args = match &resolution {
            Op::Deliver { args, .. } | Op::DeliverOnly { args, .. } => args,
            _ => return Err(SessionError::ExpectationUnmet),
        };
        if args.first().and_then(Value::as_symbol) != Some("fulfill") {
            return Err(SessionError::ExpectationUnmet);
        }
        let export = match args.get(1).map(Import::from_value) {
            Some(Ok(Import::Object(pos))) => Export(pos),
            _ => return Err(SessionError::ExpectationUnmet),
        };
        self.state.cache_bootstrap(export);
        Ok(Target::Export(export))
    }

    /// Emit `op:gc-export`, releasing references to one of the peer's
    /// exports.
    pub fn gc_export(&mut self, export_position: u64, wire_delta: u64) -> Result<(), SessionError> {
        tracing::debug!(side = self.side(), op = "gc-export", export_position, wire_delta, "emitting gc-export");
        self.send(&Op::GcExport { export_position, wire_delta })?;
        if let Some(metrics) = &self.metrics {
            metrics.gc_exports_emitted_total.inc();
        }
        Ok(())
    }

    /// Emit `op:gc-answer`, releasing an answer position whose result is no
    /// longer needed.
    pub fn gc_answer(&mut self, answer_position: u64) -> Result<(), SessionError> {
        self.send(&Op::GcAnswer { answer_position })
    }
}

/// Pure tie-break for crossed hellos: the side with the lexicographically
/// smaller `side_id` loses and must send `op:abort("crossed-hellos")`.
pub fn crossed_hellos_loses(our_side_id: &[u8; 32], peer_side_id: &[u8; 32]) -> bool {
    our_side_id < peer_side_id
}
