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

use prometheus::{IntCounter, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Sessions that completed the handshake.
    pub sessions_started_total: IntCounter,
    /// Sessions that ended via `op:abort`, by either side.
    pub sessions_aborted_total: IntCounter,
    /// Handoffs successfully withdrawn.
    pub handoffs_completed_total: IntCounter,
    /// Handoffs rejected (bad signature, session mismatch, replay).
    pub handoffs_rejected_total: IntCounter,
    /// `op:gc-export` messages emitted.
    pub gc_exports_emitted_total: IntCounter,
    /// Handoff-receive messages rejected for reusing a handoff count.
    pub replayed_handoffs_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let sessions_started_total =
            IntCounter::new("captp_sessions_started_total", "Sessions that completed the handshake")
                .map_err(|_| MetricsError::Prom)?;
        let sessions_aborted_total =
            IntCounter::new("captp_sessions_aborted_total", "Sessions ended via op:abort")
                .map_err(|_| MetricsError::Prom)?;
        let handoffs_completed_total = IntCounter::new(
            "captp_handoffs_completed_total",
            "Handoffs successfully withdrawn",
        )
        .map_err(|_| MetricsError::Prom)?;
        let handoffs_rejected_total = IntCounter::new(
            "captp_handoffs_rejected_total",
            "Handoffs rejected (bad signature, session mismatch, replay)",
        )
        .map_err(|_| MetricsError::Prom)?;
        let gc_exports_emitted_total =
            IntCounter::new("captp_gc_exports_emitted_total", "op:gc-export messages emitted")
                .map_err(|_| MetricsError::Prom)?;
        let replayed_handoffs_total = IntCounter::new(
            "captp_replayed_handoffs_total",
            "Handoff-receive messages rejected for reusing a handoff count",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(sessions_started_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sessions_aborted_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(handoffs_completed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(handoffs_rejected_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(gc_exports_emitted_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(replayed_handoffs_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            sessions_started_total,
            sessions_aborted_total,
            handoffs_completed_total,
            handoffs_rejected_total,
            gc_exports_emitted_total,
            replayed_handoffs_total,
        })
    }
}
