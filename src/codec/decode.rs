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

//! Syrup decoding: a cursor with single-byte lookahead over a byte slice.

use super::error::CodecError;
use super::value::{Record, Symbol, Value};

/// Decoder options. Threaded through rather than read from a global, since a
/// single process may run harness and peer-under-test sessions with
/// different settings.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    /// If true, tag `F` (single-precision float) decodes as a widened
    /// double instead of erroring.
    pub convert_single_floats: bool,
    /// Maximum container nesting depth before `CodecError::DepthExceeded`.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            convert_single_floats: false,
            max_depth: 128,
        }
    }
}

/// Decode a single top-level Syrup value from `bytes` using default options.
///
/// Trailing bytes after the first complete value are ignored by design —
/// callers that need "decode exactly one frame, no trailer" should check
/// [`decode_exact`].
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    let mut cursor = Cursor::new(bytes, DecodeOptions::default());
    cursor.parse_value(0)
}

/// Decode with explicit options (single-precision coercion, depth bound).
pub fn decode_with_options(bytes: &[u8], opts: DecodeOptions) -> Result<Value, CodecError> {
    let mut cursor = Cursor::new(bytes, opts);
    cursor.parse_value(0)
}

/// Decode exactly one value and require the input be fully consumed.
pub fn decode_exact(bytes: &[u8], opts: DecodeOptions) -> Result<Value, CodecError> {
    let mut cursor = Cursor::new(bytes, opts);
    let value = cursor.parse_value(0)?;
    if cursor.pos != cursor.buf.len() {
        return Err(CodecError::MalformedFraming(cursor.pos));
    }
    Ok(value)
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    opts: DecodeOptions,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], opts: DecodeOptions) -> Self {
        Self { buf, pos: 0, opts }
    }

    fn peek(&self) -> Result<u8, CodecError> {
        self.buf.get(self.pos).copied().ok_or(CodecError::UnexpectedEof)
    }

    fn advance(&mut self) -> Result<u8, CodecError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + n > self.buf.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, CodecError> {
        let start = self.pos;
        let tag = self.peek()?;

        match tag {
            b't' => {
                self.advance()?;
                Ok(Value::Bool(true))
            }
            b'f' => {
                self.advance()?;
                Ok(Value::Bool(false))
            }
            b'D' => {
                self.advance()?;
                let bytes = self.take(8)?;
                let arr: [u8; 8] = bytes.try_into().expect("take(8) returns 8 bytes");
                Ok(Value::Double(f64::from_be_bytes(arr)))
            }
            b'F' => {
                self.advance()?;
                if !self.opts.convert_single_floats {
                    return Err(CodecError::SinglePrecisionUnsupported);
                }
                let bytes = self.take(4)?;
                let arr: [u8; 4] = bytes.try_into().expect("take(4) returns 4 bytes");
                Ok(Value::Double(f32::from_be_bytes(arr) as f64))
            }
            b'[' => {
                self.advance()?;
                let next_depth = Self::descend(depth, self.opts.max_depth)?;
                let mut items = Vec::new();
                while self.peek()? != b']' {
                    items.push(self.parse_value(next_depth)?);
                }
                self.advance()?;
                Ok(Value::List(items))
            }
            b'#' => {
                self.advance()?;
                let next_depth = Self::descend(depth, self.opts.max_depth)?;
                let mut items = Vec::new();
                while self.peek()? != b'$' {
                    items.push(self.parse_value(next_depth)?);
                }
                self.advance()?;
                Ok(Value::Set(items))
            }
            b'{' => {
                self.advance()?;
                let next_depth = Self::descend(depth, self.opts.max_depth)?;
                let mut pairs: Vec<(Value, Value)> = Vec::new();
                let mut seen_keys: Vec<Vec<u8>> = Vec::new();
                while self.peek()? != b'}' {
                    let key = self.parse_value(next_depth)?;
                    let value = self.parse_value(next_depth)?;
                    let key_bytes = super::encode::encode(&key);
                    if seen_keys.contains(&key_bytes) {
                        return Err(CodecError::DuplicateKey);
                    }
                    seen_keys.push(key_bytes);
                    pairs.push((key, value));
                }
                self.advance()?;
                Ok(Value::Map(pairs))
            }
            b'<' => {
                self.advance()?;
                let next_depth = Self::descend(depth, self.opts.max_depth)?;
                let label = self.parse_value(next_depth)?;
                let mut args = Vec::new();
                while self.peek()? != b'>' {
                    args.push(self.parse_value(next_depth)?);
                }
                self.advance()?;
                Ok(Value::Record(Record {
                    label: Box::new(label),
                    args,
                }))
            }
            b'0'..=b'9' => self.parse_length_prefixed(start),
            other => Err(CodecError::UnknownTag(other, start)),
        }
    }

    fn descend(depth: usize, max_depth: usize) -> Result<usize, CodecError> {
        if depth >= max_depth {
            return Err(CodecError::DepthExceeded);
        }
        Ok(depth + 1)
    }

    /// Parses the shared `<digits><joiner>` production: byte strings,
    /// strings, symbols, and integers all start this way.
    fn parse_length_prefixed(&mut self, start: usize) -> Result<Value, CodecError> {
        let mut digits = String::new();
        while let Ok(b) = self.peek() {
            if b.is_ascii_digit() {
                digits.push(b as char);
                self.advance()?;
            } else {
                break;
            }
        }
        let joiner = self.advance()?;
        let magnitude: i128 = digits
            .parse()
            .map_err(|_| CodecError::IntegerOverflow)?;

        match joiner {
            b':' => {
                let len = usize::try_from(magnitude).map_err(|_| CodecError::IntegerOverflow)?;
                let bytes = self.take(len)?;
                Ok(Value::Bytes(bytes.to_vec()))
            }
            b'"' => {
                let len = usize::try_from(magnitude).map_err(|_| CodecError::IntegerOverflow)?;
                let bytes = self.take(len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| CodecError::BadUtf8)?;
                Ok(Value::Str(s.to_string()))
            }
            b'\'' => {
                let len = usize::try_from(magnitude).map_err(|_| CodecError::IntegerOverflow)?;
                let bytes = self.take(len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| CodecError::BadUtf8)?;
                Ok(Value::Symbol(Symbol::new(s.to_string())))
            }
            b'+' => Ok(Value::Int(magnitude)),
            b'-' => Ok(Value::Int(magnitude.checked_neg().ok_or(CodecError::IntegerOverflow)?)),
            _ => Err(CodecError::MalformedFraming(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode::encode;

    #[test]
    fn round_trips_scalars() {
        for v in [Value::Int(0), Value::Int(-42), Value::Bool(true), Value::Bool(false)] {
            let bytes = encode(&v);
            assert_eq!(decode(&bytes).unwrap(), v);
        }
    }

    #[test]
    fn round_trips_containers() {
        let v = Value::record(
            "op:deliver-only",
            vec![
                Value::symbol("echo"),
                Value::List(vec![Value::Str("foo".into()), Value::Int(1)]),
            ],
        );
        let bytes = encode(&v);
        assert_eq!(decode(&bytes).unwrap(), v);
    }

    #[test]
    fn rejects_duplicate_map_keys() {
        let mut bytes = Vec::new();
        bytes.push(b'{');
        bytes.extend_from_slice(&encode(&Value::Int(1)));
        bytes.extend_from_slice(&encode(&Value::Str("a".into())));
        bytes.extend_from_slice(&encode(&Value::Int(1)));
        bytes.extend_from_slice(&encode(&Value::Str("b".into())));
        bytes.push(b'}');
        assert_eq!(decode(&bytes), Err(CodecError::DuplicateKey));
    }

    #[test]
    fn rejects_single_precision_by_default() {
        let mut bytes = vec![b'F'];
        bytes.extend_from_slice(&1.0f32.to_be_bytes());
        assert_eq!(decode(&bytes), Err(CodecError::SinglePrecisionUnsupported));
    }

    #[test]
    fn coerces_single_precision_when_configured() {
        let mut bytes = vec![b'F'];
        bytes.extend_from_slice(&1.5f32.to_be_bytes());
        let opts = DecodeOptions {
            convert_single_floats: true,
            ..DecodeOptions::default()
        };
        assert_eq!(decode_with_options(&bytes, opts).unwrap(), Value::Double(1.5));
    }

    #[test]
    fn unknown_tag_is_a_decode_error_not_an_encode_error() {
        let bytes = [b'z'];
        assert_eq!(decode(&bytes), Err(CodecError::UnknownTag(b'z', 0)));
    }

    #[test]
    fn enforces_depth_bound() {
        let mut bytes = Vec::new();
        for _ in 0..200 {
            bytes.push(b'[');
        }
        assert_eq!(decode(&bytes), Err(CodecError::DepthExceeded));
    }
}
