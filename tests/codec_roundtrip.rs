// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;

use captp_harness::codec::{decode, encode, CodecError, Value};

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| Value::Int(n as i128)),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
        ".*".prop_map(Value::Str),
        any::<bool>().prop_map(Value::Bool),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
        ]
    })
}

proptest! {
    #[test]
    fn any_value_round_trips_through_canonical_bytes(value in arb_value()) {
        let bytes = encode(&value);
        let decoded = decode(&bytes).expect("encoded bytes must decode");
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn encoding_is_deterministic(value in arb_value()) {
        let a = encode(&value);
        let b = encode(&value);
        prop_assert_eq!(a, b);
    }
}

#[test]
fn sets_with_different_insertion_order_encode_identically() {
    let a = Value::Set(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    let b = Value::Set(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(encode(&a), encode(&b));
}

#[test]
fn maps_are_encoded_in_byte_order_of_their_keys() {
    let map = Value::Map(vec![
        (Value::Str("b".into()), Value::Int(2)),
        (Value::Str("a".into()), Value::Int(1)),
    ]);
    let bytes = encode(&map);
    let a_pos = bytes.windows(2).position(|w| w == b"\"a").unwrap();
    let b_pos = bytes.windows(2).position(|w| w == b"\"b").unwrap();
    assert!(a_pos < b_pos, "key 'a' must sort before key 'b' in canonical form");
}

#[test]
fn duplicate_map_keys_are_a_decode_error() {
    let mut bytes = vec![b'{'];
    bytes.extend(encode(&Value::Int(1)));
    bytes.extend(encode(&Value::Str("a".into())));
    bytes.extend(encode(&Value::Int(1)));
    bytes.extend(encode(&Value::Str("b".into())));
    bytes.push(b'}');
    assert_eq!(decode(&bytes), Err(CodecError::DuplicateKey));
}

#[test]
fn truncated_input_is_unexpected_eof() {
    let bytes = encode(&Value::List(vec![Value::Int(1), Value::Int(2)]));
    let truncated = &bytes[..bytes.len() - 2];
    assert!(decode(truncated).is_err());
}
