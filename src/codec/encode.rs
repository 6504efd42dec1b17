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
#![deny(missing_docs)]

//! Canonical Syrup encoding.

use super::value::Value;

/// Encode a value to its canonical Syrup byte representation.
///
/// Sets and mapping keys are always emitted in byte-wise lexicographic order
/// of their own encoded form, so `encode` never needs a "was this already
/// canonical" check on the way in — it produces the one canonical byte
/// string for any abstract value.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(n) => encode_int(*n, out),
        Value::Bytes(b) => {
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(b);
        }
        Value::Str(s) => {
            let bytes = s.as_bytes();
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b'"');
            out.extend_from_slice(bytes);
        }
        Value::Symbol(sym) => {
            let bytes = sym.as_str().as_bytes();
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b'\'');
            out.extend_from_slice(bytes);
        }
        Value::Bool(true) => out.push(b't'),
        Value::Bool(false) => out.push(b'f'),
        Value::Double(d) => {
            out.push(b'D');
            out.extend_from_slice(&d.to_be_bytes());
        }
        Value::List(items) => {
            out.push(b'[');
            for item in items {
                encode_into(item, out);
            }
            out.push(b']');
        }
        Value::Set(items) => {
            let mut encoded: Vec<Vec<u8>> = items.iter().map(encode).collect();
            encoded.sort();
            out.push(b'#');
            for item in &encoded {
                out.extend_from_slice(item);
            }
            out.push(b'$');
        }
        Value::Map(pairs) => {
            let mut encoded: Vec<(Vec<u8>, Vec<u8>)> = pairs
                .iter()
                .map(|(k, v)| (encode(k), encode(v)))
                .collect();
            encoded.sort_by(|a, b| a.0.cmp(&b.0));
            out.push(b'{');
            for (k, v) in &encoded {
                out.extend_from_slice(k);
                out.extend_from_slice(v);
            }
            out.push(b'}');
        }
        Value::Record(r) => {
            out.push(b'<');
            encode_into(&r.label, out);
            for arg in &r.args {
                encode_into(arg, out);
            }
            out.push(b'>');
        }
    }
}

fn encode_int(n: i128, out: &mut Vec<u8>) {
    if n >= 0 {
        out.extend_from_slice(n.to_string().as_bytes());
        out.push(b'+');
    } else {
        // n.unsigned_abs() avoids overflow at i128::MIN.
        out.extend_from_slice(n.unsigned_abs().to_string().as_bytes());
        out.push(b'-');
    }
}
