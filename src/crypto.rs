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

//! Ed25519 session identities and the CapTP wire forms for keys and
//! signatures.
//!
//! Session keys are generated fresh per session and never persisted, so there
//! is no at-rest encryption, rate limiting, or audit trail here — those solve
//! a key-custody problem this module doesn't have.

use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};
use thiserror::Error;
use zeroize::Zeroize;

use crate::codec::{Record, Symbol, Value};

/// Crypto failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key generation or parsing failed.
    #[error("key generation failed")]
    KeyGen,
    /// A `(public-key (ecc (curve Ed25519) (flags eddsa) (q ...)))` record
    /// was malformed.
    #[error("malformed public-key record")]
    MalformedPublicKey,
    /// A `(sig-val (eddsa (r ...) (s ...)))` record was malformed.
    #[error("malformed signature record")]
    MalformedSignature,
    /// Signature did not verify.
    #[error("signature verification failed")]
    BadSignature,
}

/// An Ed25519 keypair generated for the lifetime of one session.
pub struct SessionIdentity {
    keypair: Ed25519KeyPair,
}

impl SessionIdentity {
    /// Generate a fresh keypair.
    pub fn generate() -> Result<Self, CryptoError> {
        let rng = SystemRandom::new();
        let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).map_err(|_| CryptoError::KeyGen)?;
        let mut buf = pkcs8.as_ref().to_vec();
        let keypair = Ed25519KeyPair::from_pkcs8(&buf).map_err(|_| CryptoError::KeyGen)?;
        buf.zeroize();
        Ok(Self { keypair })
    }

    /// The raw 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.keypair.public_key().as_ref());
        out
    }

    /// Sign a message, returning the raw 64-byte Ed25519 signature.
    pub fn sign(&self, msg: &[u8]) -> [u8; 64] {
        let sig = self.keypair.sign(msg);
        let mut out = [0u8; 64];
        out.copy_from_slice(sig.as_ref());
        out
    }
}

/// Verify a raw signature against a raw public key.
pub fn verify(public_key: &[u8; 32], msg: &[u8], signature: &[u8; 64]) -> Result<(), CryptoError> {
    let key = UnparsedPublicKey::new(&ED25519, public_key);
    key.verify(msg, signature).map_err(|_| CryptoError::BadSignature)
}

/// Wrap a raw public key in its CapTP gcrypt-style record form:
/// `(public-key (ecc (curve Ed25519) (flags eddsa) (q <32 bytes>)))`.
pub fn public_key_to_value(public_key: &[u8; 32]) -> Value {
    let ecc = Value::Record(Record {
        label: Box::new(Value::Symbol(Symbol::new("ecc"))),
        args: vec![
            Value::Record(Record::new("curve", vec![Value::symbol("Ed25519")])),
            Value::Record(Record::new("flags", vec![Value::symbol("eddsa")])),
            Value::Record(Record::new("q", vec![Value::Bytes(public_key.to_vec())])),
        ],
    });
    Value::Record(Record {
        label: Box::new(Value::Symbol(Symbol::new("public-key"))),
        args: vec![ecc],
    })
}

/// Extract the raw public key from its CapTP record form.
pub fn public_key_from_value(value: &Value) -> Result<[u8; 32], CryptoError> {
    let outer = value.as_record().ok_or(CryptoError::MalformedPublicKey)?;
    if outer.label_symbol() != Some("public-key") || outer.args.len() != 1 {
        return Err(CryptoError::MalformedPublicKey);
    }
    let ecc = outer.args[0].as_record().ok_or(CryptoError::MalformedPublicKey)?;
    if ecc.label_symbol() != Some("ecc") {
        return Err(CryptoError::MalformedPublicKey);
    }
    for field in &ecc.args {
        let Some(r) = field.as_record() else { continue };
        if r.label_symbol() == Some("q") {
            let bytes = r.args.first().and_then(Value::as_bytes).ok_or(CryptoError::MalformedPublicKey)?;
            if bytes.len() != 32 {
                return Err(CryptoError::MalformedPublicKey);
            }
            let mut out = [0u8; 32];
            out.copy_from_slice(bytes);
            return Ok(out);
        }
    }
    Err(CryptoError::MalformedPublicKey)
}

/// Wrap a raw 64-byte signature in its CapTP record form, splitting it into
/// `r` (first 32 bytes) and `s` (last 32 bytes):
/// `(sig-val (eddsa (r <32 bytes>) (s <32 bytes>)))`.
pub fn signature_to_value(signature: &[u8; 64]) -> Value {
    let eddsa = Value::Record(Record {
        label: Box::new(Value::Symbol(Symbol::new("eddsa"))),
        args: vec![
            Value::Record(Record::new("r", vec![Value::Bytes(signature[..32].to_vec())])),
            Value::Record(Record::new("s", vec![Value::Bytes(signature[32..].to_vec())])),
        ],
    });
    Value::Record(Record {
        label: Box::new(Value::Symbol(Symbol::new("sig-val"))),
        args: vec![eddsa],
    })
}

/// Extract the raw 64-byte signature from its CapTP record form. `r` and `s`
/// must each be exactly 32 bytes — a peer that stripped leading zero bytes
/// off a short component must zero-pad back to 32 before sending.
pub fn signature_from_value(value: &Value) -> Result<[u8; 64], CryptoError> {
    let outer = value.as_record().ok_or(CryptoError::MalformedSignature)?;
    if outer.label_symbol() != Some("sig-val") || outer.args.len() != 1 {
        return Err(CryptoError::MalformedSignature);
    }
    let eddsa = outer.args[0].as_record().ok_or(CryptoError::MalformedSignature)?;
    if eddsa.label_symbol() != Some("eddsa") {
        return Err(CryptoError::MalformedSignature);
    }
    let mut r: Option<&[u8]> = None;
    let mut s: Option<&[u8]> = None;
    for field in &eddsa.args {
        let Some(rec) = field.as_record() else { continue };
        match rec.label_symbol() {
            Some("r") => r = rec.args.first().and_then(Value::as_bytes),
            Some("s") => s = rec.args.first().and_then(Value::as_bytes),
            _ => {}
        }
    }
    let (r, s) = (r.ok_or(CryptoError::MalformedSignature)?, s.ok_or(CryptoError::MalformedSignature)?);
    if r.len() != 32 || s.len() != 32 {
        return Err(CryptoError::MalformedSignature);
    }
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(r);
    out[32..].copy_from_slice(s);
    Ok(out)
}

/// `side_id = SHA-256(SHA-256(encoded_pubkey_record))` — a peer's stable
/// hash for one session.
pub fn side_id(encoded_pubkey_record: &[u8]) -> [u8; 32] {
    double_sha256(encoded_pubkey_record)
}

/// `session_id = SHA-256(SHA-256("prot0" || lo || hi))` where `lo`/`hi` are
/// the two sides' `side_id`s sorted byte-wise. Symmetric: either party
/// computes the same value regardless of which side they are.
pub fn session_id(side_a: &[u8; 32], side_b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if side_a <= side_b { (side_a, side_b) } else { (side_b, side_a) };
    let mut preimage = Vec::with_capacity(5 + 32 + 32);
    preimage.extend_from_slice(b"prot0");
    preimage.extend_from_slice(lo);
    preimage.extend_from_slice(hi);
    double_sha256(&preimage)
}

fn double_sha256(bytes: &[u8]) -> [u8; 32] {
    let first = ring::digest::digest(&ring::digest::SHA256, bytes);
    let second = ring::digest::digest(&ring::digest::SHA256, first.as_ref());
    let mut out = [0u8; 32];
    out.copy_from_slice(second.as_ref());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs_and_verifies() {
        let id = SessionIdentity::generate().unwrap();
        let sig = id.sign(b"hello");
        verify(&id.public_key_bytes(), b"hello", &sig).unwrap();
        assert_eq!(verify(&id.public_key_bytes(), b"tampered", &sig), Err(CryptoError::BadSignature));
    }

    #[test]
    fn public_key_record_round_trips() {
        let id = SessionIdentity::generate().unwrap();
        let pk = id.public_key_bytes();
        let value = public_key_to_value(&pk);
        assert_eq!(public_key_from_value(&value).unwrap(), pk);
    }

    #[test]
    fn signature_record_round_trips() {
        let id = SessionIdentity::generate().unwrap();
        let sig = id.sign(b"hello");
        let value = signature_to_value(&sig);
        assert_eq!(signature_from_value(&value).unwrap(), sig);
    }

    #[test]
    fn session_id_is_symmetric() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(session_id(&a, &b), session_id(&b, &a));
    }
}
