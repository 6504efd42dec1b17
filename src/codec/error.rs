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

//! Syrup codec errors.

use thiserror::Error;

/// Syrup encode/decode failures.
///
/// All variants are decode-side: encoding only ever consumes already-typed
/// `Value`s and cannot itself fail on malformed input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A length/joiner byte combination doesn't match any production.
    #[error("malformed framing at offset {0}")]
    MalformedFraming(usize),
    /// Input ended mid-value.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// Leading byte doesn't start any known production.
    #[error("unknown tag byte {0:#04x} at offset {1}")]
    UnknownTag(u8, usize),
    /// A string atom's bytes were not valid UTF-8.
    #[error("invalid utf-8 in string atom")]
    BadUtf8,
    /// A mapping's encoded keys were not unique.
    #[error("duplicate key in mapping")]
    DuplicateKey,
    /// A decimal digit run described an integer outside `i128`'s range.
    #[error("integer literal overflows i128")]
    IntegerOverflow,
    /// Container nesting exceeded the configured bound.
    #[error("container nesting exceeded depth bound")]
    DepthExceeded,
    /// Tag `F` (single-precision float) seen without `convert_single_floats` set.
    #[error("single-precision floats are not supported")]
    SinglePrecisionUnsupported,
}
