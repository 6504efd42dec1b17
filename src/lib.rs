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

//! A CapTP-over-OCapN conformance test harness.
//!
//! This repository provides:
//! - A canonical Syrup codec (`codec`)
//! - OCapN peer locators and sturdyrefs (`uri`)
//! - Ed25519 session identities and CapTP's key/signature wire forms (`crypto`)
//! - The CapTP value model: descriptors and wire operations (`captp`)
//! - Session state and the handshake/delivery/GC protocol (`session`)
//! - The three-party cryptographic handoff protocol (`handoff`)
//! - A netlayer abstraction plus an in-memory test double (`netlayer`)
//! - Monitoring via Prometheus metrics and structured logging (`monitoring`)

/// The canonical Syrup binary codec.
pub mod codec;
/// OCapN peer locators and sturdyrefs.
pub mod uri;
/// Ed25519 session identities and CapTP key/signature wire forms.
pub mod crypto;
/// CapTP descriptors and wire operations.
pub mod captp;
/// The three-party cryptographic handoff protocol.
pub mod handoff;
/// The netlayer abstraction and an in-memory test double.
pub mod netlayer;
/// Session state and the handshake/delivery/GC protocol loop.
pub mod session;
/// Harness configuration, loadable from TOML.
pub mod config;
/// Observability (metrics, structured logging helpers).
pub mod monitoring;
