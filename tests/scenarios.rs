// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use captp_harness::captp::{Export, Import, Op, ProtocolError, Target};
use captp_harness::codec::{Symbol, Value};
use captp_harness::crypto::{self, SessionIdentity};
use captp_harness::netlayer::{new_registry, InMemoryNetlayer, InMemorySession, Netlayer};
use captp_harness::session::{PeerSessionRegistry, Session, SessionError};
use captp_harness::uri::PeerLocator;

fn connected_pair() -> (Session<InMemorySession>, Session<InMemorySession>) {
    let registry = new_registry();
    let server_layer = InMemoryNetlayer::new("server", &registry);
    let client_layer = InMemoryNetlayer::new("client", &registry);

    let client_conn = client_layer.connect(server_layer.location()).unwrap();
    let server_conn = server_layer.accept(Duration::from_secs(1)).unwrap();

    let client = Session::new(
        SessionIdentity::generate().unwrap(),
        client_layer.location().clone(),
        true,
        client_conn,
    );
    let server = Session::new(
        SessionIdentity::generate().unwrap(),
        server_layer.location().clone(),
        false,
        server_conn,
    );
    (client, server)
}

fn handshake(client: &mut Session<InMemorySession>, server: &mut Session<InMemorySession>) {
    std::thread::scope(|scope| {
        let c = scope.spawn(|| client.setup_session("1.0").unwrap());
        let s = scope.spawn(|| server.setup_session("1.0").unwrap());
        c.join().unwrap();
        s.join().unwrap();
    });
}

#[test]
fn bootstrap_resolves_and_is_then_served_from_cache() {
    let (mut client, mut server) = connected_pair();
    handshake(&mut client, &mut server);

    let resolved = std::thread::scope(|scope| {
        let server_handle = scope.spawn(|| {
            let request = server.receive(Duration::from_secs(1)).unwrap();
            let Op::Bootstrap { resolve_me_desc, .. } = request else {
                panic!("expected op:bootstrap, got {request:?}");
            };
            server
                .send(&Op::DeliverOnly {
                    to: Target::Export(resolve_me_desc.to_export()),
                    args: vec![
                        Value::Symbol(Symbol::new("fulfill")),
                        Import::Object(42).to_value(),
                    ],
                })
                .unwrap();
        });
        let client_handle =
            scope.spawn(|| client.get_bootstrap_object(false, Duration::from_secs(1)).unwrap());

        server_handle.join().unwrap();
        client_handle.join().unwrap()
    });

    assert_eq!(resolved, Target::Export(Export(42)));

    // Second call must be served from the cache: no message is sent and no
    // server cooperation is needed, so this cannot block.
    let cached = client.get_bootstrap_object(false, Duration::from_secs(1)).unwrap();
    assert_eq!(cached, resolved);
}

#[test]
fn pipelined_bootstrap_returns_an_answer_without_waiting() {
    let (mut client, mut server) = connected_pair();
    handshake(&mut client, &mut server);

    let target = client.get_bootstrap_object(true, Duration::from_secs(1)).unwrap();
    assert!(matches!(target, Target::Answer(_)));

    // The server never has to respond for the pipelined call to return; it
    // does still see the `op:bootstrap` request on the wire.
    let request = server.receive(Duration::from_secs(1)).unwrap();
    assert!(matches!(request, Op::Bootstrap { .. }));
}

#[test]
fn handshake_rejects_a_forged_location_signature() {
    let (mut client, mut server) = connected_pair();

    // Send a syntactically valid `op:start-session` whose signature does not
    // cover the claimed location, instead of going through `setup_session`.
    let pubkey = client.state().identity().public_key_bytes();
    let location = client.state().our_location().to_value();
    client
        .send(&Op::StartSession {
            captp_version: "1.0".into(),
            session_pubkey: captp_harness::crypto::public_key_to_value(&pubkey),
            location,
            location_sig: captp_harness::crypto::signature_to_value(&[0u8; 64]),
        })
        .unwrap();

    let err = server.setup_session("1.0").unwrap_err();
    assert!(matches!(err, SessionError::InvalidLocationSignature));
}

#[test]
fn gc_export_is_delivered_verbatim() {
    let (mut client, mut server) = connected_pair();
    handshake(&mut client, &mut server);

    client.gc_export(3, 1).unwrap();
    let op = server.receive(Duration::from_secs(1)).unwrap();
    assert_eq!(
        op,
        Op::GcExport {
            export_position: 3,
            wire_delta: 1,
        }
    );
}

#[test]
fn abort_tears_down_the_session_for_both_sides() {
    let (mut client, mut server) = connected_pair();
    handshake(&mut client, &mut server);

    client.abort("conformance-check-complete").unwrap();
    let err = server.receive(Duration::from_secs(1)).unwrap_err();
    assert!(matches!(
        err,
        SessionError::AbortedByPeer(reason) if reason == "conformance-check-complete"
    ));
}

#[test]
fn unregistered_peer_location_is_unreachable() {
    let registry = new_registry();
    let client_layer = InMemoryNetlayer::new("client", &registry);
    let nobody = PeerLocator::new("loopback-testing-only", "nobody-home");
    assert!(client_layer.connect(&nobody).is_err());
}

#[test]
fn a_second_start_session_on_an_established_session_is_rejected() {
    let (mut client, mut server) = connected_pair();
    handshake(&mut client, &mut server);

    // The peer sends a second op:start-session after the handshake already
    // completed; `client` must reject it without re-running the handshake.
    let pubkey = server.state().identity().public_key_bytes();
    let location = server.state().our_location().to_value();
    let sig = server.state().identity().sign(&[]);
    server
        .send(&Op::StartSession {
            captp_version: "1.0".into(),
            session_pubkey: captp_harness::crypto::public_key_to_value(&pubkey),
            location,
            location_sig: captp_harness::crypto::signature_to_value(&sig),
        })
        .unwrap();

    let err = client.receive(Duration::from_secs(1)).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::DuplicateStartSession)
    ));
}

#[test]
fn mismatched_captp_version_aborts_the_handshake() {
    let (mut client, mut server) = connected_pair();

    let results = std::thread::scope(|scope| {
        let client_handle = scope.spawn(|| client.setup_session("1.0"));
        let server_handle = scope.spawn(|| server.setup_session("2.0"));
        (client_handle.join().unwrap(), server_handle.join().unwrap())
    });

    assert!(matches!(
        results.0,
        Err(SessionError::Protocol(ProtocolError::VersionMismatch))
    ));
    assert!(matches!(
        results.1,
        Err(SessionError::Protocol(ProtocolError::VersionMismatch))
    ));
}

fn side_id_of(identity: &SessionIdentity) -> [u8; 32] {
    let encoded = captp_harness::codec::encode(&crypto::public_key_to_value(&identity.public_key_bytes()));
    crypto::side_id(&encoded)
}

#[test]
fn crossed_hellos_aborts_the_side_with_the_smaller_side_id() {
    let net_registry = new_registry();
    let alice_layer = InMemoryNetlayer::new("alice", &net_registry);
    let bob_layer = InMemoryNetlayer::new("bob", &net_registry);
    let peer_registry = Arc::new(PeerSessionRegistry::new());

    // Connection 1 (registers first, no conflict yet): identities don't
    // matter for its outcome.
    let alice_to_bob = alice_layer.connect(bob_layer.location()).unwrap();
    let bob_side_1 = bob_layer.accept(Duration::from_secs(1)).unwrap();
    let mut alice1 = Session::new(SessionIdentity::generate().unwrap(), alice_layer.location().clone(), true, alice_to_bob)
        .with_peer_registry(peer_registry.clone());
    let mut bob1 = Session::new(SessionIdentity::generate().unwrap(), bob_layer.location().clone(), false, bob_side_1);
    std::thread::scope(|scope| {
        let a = scope.spawn(|| alice1.setup_session("1.0").unwrap());
        let b = scope.spawn(|| bob1.setup_session("1.0").unwrap());
        a.join().unwrap();
        b.join().unwrap();
    });
    assert_eq!(alice1.state().role(), captp_harness::session::Role::Started);

    // Connection 2 (registers second, conflicts with connection 1): bob
    // dials alice. The tie-break compares alice's own side_id on this
    // connection against bob's side_id on this same connection, so pick
    // identities so alice's side_id sorts first and her side loses.
    let mut alice_id = SessionIdentity::generate().unwrap();
    let mut bob_id = SessionIdentity::generate().unwrap();
    if side_id_of(&alice_id) > side_id_of(&bob_id) {
        std::mem::swap(&mut alice_id, &mut bob_id);
    }
    // alice_id's side_id now sorts first (smaller) than bob_id's.

    let bob_to_alice = bob_layer.connect(alice_layer.location()).unwrap();
    let alice_side_2 = alice_layer.accept(Duration::from_secs(1)).unwrap();
    let mut bob2 = Session::new(bob_id, bob_layer.location().clone(), true, bob_to_alice);
    let mut alice2 =
        Session::new(alice_id, alice_layer.location().clone(), false, alice_side_2).with_peer_registry(peer_registry.clone());
    let alice2_result = std::thread::scope(|scope| {
        let b = scope.spawn(|| bob2.setup_session("1.0"));
        let a = scope.spawn(|| alice2.setup_session("1.0"));
        let alice2_result = a.join().unwrap();
        b.join().unwrap().ok();
        alice2_result
    });

    assert!(matches!(
        alice2_result,
        Err(SessionError::Protocol(ProtocolError::CrossedHellosLoser))
    ));
}
