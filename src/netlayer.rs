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

//! The netlayer abstraction: how a session sends and receives whole
//! messages, independent of the underlying transport.
//!
//! Real transports (TCP, Tor onion services) are out of scope for this
//! repository; only the interface and one in-memory test double
//! (`InMemoryNetlayer`) are provided, mirroring a loopback-only transport
//! used for conformance testing.

use std::collections::HashMap;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::captp::{Op, ProtocolError};
use crate::codec::CodecError;
use crate::uri::PeerLocator;

/// Transport-level failures, distinct from [`ProtocolError`] (a malformed
/// message) and [`CodecError`] (malformed bytes).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer closed the connection, or no listener was registered for
    /// the requested location.
    #[error("connection closed")]
    ConnectionClosed,
    /// No message arrived before the timeout elapsed.
    #[error("receive timed out")]
    Timeout,
    /// The bytes received did not decode as a Syrup value.
    #[error("malformed message bytes: {0}")]
    Codec(#[from] CodecError),
    /// The decoded value was not a recognized CapTP operation.
    #[error("malformed operation: {0}")]
    Protocol(#[from] ProtocolError),
}

/// One side of an established connection: send and receive whole CapTP
/// operations.
pub trait NetlayerSession {
    /// Send one operation to the peer.
    fn send_message(&mut self, op: &Op) -> Result<(), TransportError>;
    /// Block for up to `timeout` waiting for the next operation.
    fn receive_message(&mut self, timeout: Duration) -> Result<Op, TransportError>;
    /// Tear down the connection. Idempotent.
    fn close(&mut self);
    /// Whether this side initiated the connection.
    fn is_outbound(&self) -> bool;
}

/// A transport that can connect out to a peer or accept an inbound
/// connection, and that knows its own location.
pub trait Netlayer {
    /// The concrete session type this transport produces.
    type Session: NetlayerSession;

    /// This transport's own advertised location.
    fn location(&self) -> &PeerLocator;
    /// Connect out to a peer at the given location.
    fn connect(&self, peer: &PeerLocator) -> Result<Self::Session, TransportError>;
    /// Block for up to `timeout` waiting for an inbound connection.
    fn accept(&self, timeout: Duration) -> Result<Self::Session, TransportError>;
    /// Tear down this transport and any connections it produced.
    fn shutdown(&self);
}

type Frame = Vec<u8>;

/// A registry of in-memory listeners, shared between every
/// [`InMemoryNetlayer`] that should be able to reach each other — the
/// in-memory analogue of binding several `TestingOnlyTCPNetlayer`s to the
/// same loopback interface.
pub type Registry = Arc<Mutex<HashMap<String, Sender<InMemorySession>>>>;

/// Build a fresh, empty registry.
pub fn new_registry() -> Registry {
    Arc::new(Mutex::new(HashMap::new()))
}

/// An in-memory, same-process netlayer: two ends of an `mpsc` channel pair
/// standing in for a socket. Connections are addressed by designator
/// within a shared [`Registry`]; there is no real network I/O.
pub struct InMemoryNetlayer {
    location: PeerLocator,
    registry: Registry,
    accept_rx: Mutex<mpsc::Receiver<InMemorySession>>,
}

impl InMemoryNetlayer {
    /// Register a listener under `designator` in `registry`.
    pub fn new(designator: impl Into<String>, registry: &Registry) -> Self {
        let location = PeerLocator::new("loopback-testing-only", designator.into());
        let (tx, rx) = mpsc::channel();
        registry
            .lock()
            .expect("registry mutex poisoned")
            .insert(location.designator.clone(), tx);
        Self {
            location,
            registry: registry.clone(),
            accept_rx: Mutex::new(rx),
        }
    }
}

impl Netlayer for InMemoryNetlayer {
    type Session = InMemorySession;

    fn location(&self) -> &PeerLocator {
        &self.location
    }

    fn connect(&self, peer: &PeerLocator) -> Result<Self::Session, TransportError> {
        let listener_tx = {
            let registry = self.registry.lock().expect("registry mutex poisoned");
            registry
                .get(&peer.designator)
                .cloned()
                .ok_or(TransportError::ConnectionClosed)?
        };

        let (tx_to_peer, rx_from_us) = mpsc::channel::<Frame>();
        let (tx_to_us, rx_from_peer) = mpsc::channel::<Frame>();

        let their_end = InMemorySession {
            tx: tx_to_us,
            rx: rx_from_us,
            is_outbound: false,
        };
        listener_tx
            .send(their_end)
            .map_err(|_| TransportError::ConnectionClosed)?;

        Ok(InMemorySession {
            tx: tx_to_peer,
            rx: rx_from_peer,
            is_outbound: true,
        })
    }

    fn accept(&self, timeout: Duration) -> Result<Self::Session, TransportError> {
        self.accept_rx
            .lock()
            .expect("accept mutex poisoned")
            .recv_timeout(timeout)
            .map_err(|_| TransportError::Timeout)
    }

    fn shutdown(&self) {
        self.registry
            .lock()
            .expect("registry mutex poisoned")
            .remove(&self.location.designator);
    }
}

/// One side of an in-memory connection.
pub struct InMemorySession {
    tx: mpsc::Sender<Frame>,
    rx: mpsc::Receiver<Frame>,
    is_outbound: bool,
}

impl NetlayerSession for InMemorySession {
    fn send_message(&mut self, op: &Op) -> Result<(), TransportError> {
        let bytes = crate::codec::encode(&op.to_value());
        self.tx.send(bytes).map_err(|_| TransportError::ConnectionClosed)
    }

    fn receive_message(&mut self, timeout: Duration) -> Result<Op, TransportError> {
        let bytes = self.rx.recv_timeout(timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => TransportError::Timeout,
            mpsc::RecvTimeoutError::Disconnected => TransportError::ConnectionClosed,
        })?;
        let value = crate::codec::decode_exact(&bytes, crate::codec::DecodeOptions::default())?;
        Ok(Op::from_value(&value)?)
    }

    fn close(&mut self) {
        let (empty_tx, _empty_rx) = mpsc::channel();
        self.tx = empty_tx;
    }

    fn is_outbound(&self) -> bool {
        self.is_outbound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captp::Op;

    #[test]
    fn connect_and_accept_exchange_a_message() {
        let registry = new_registry();
        let server = InMemoryNetlayer::new("server", &registry);
        let client = InMemoryNetlayer::new("client", &registry);

        let mut client_session = client.connect(server.location()).unwrap();
        let mut server_session = server.accept(Duration::from_secs(1)).unwrap();
        assert!(client_session.is_outbound());
        assert!(!server_session.is_outbound());

        let op = Op::Abort { reason: "shutdown".into() };
        client_session.send_message(&op).unwrap();
        let received = server_session.receive_message(Duration::from_secs(1)).unwrap();
        assert_eq!(received, op);
    }

    #[test]
    fn connecting_to_an_unregistered_peer_fails() {
        let registry = new_registry();
        let client = InMemoryNetlayer::new("client", &registry);
        let nobody = PeerLocator::new("loopback-testing-only", "nobody");
        assert!(matches!(client.connect(&nobody), Err(TransportError::ConnectionClosed)));
    }

    #[test]
    fn accept_times_out_with_no_connection() {
        let registry = new_registry();
        let server = InMemoryNetlayer::new("server", &registry);
        assert!(matches!(
            server.accept(Duration::from_millis(10)),
            Err(TransportError::Timeout)
        ));
    }
}
