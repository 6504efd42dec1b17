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

//! Syrup: the self-describing binary encoding CapTP messages are framed in.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_exact, decode_with_options, DecodeOptions};
pub use encode::encode;
pub use error::CodecError;
pub use value::{Record, Symbol, Value};
