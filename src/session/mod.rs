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

//! Session state and the protocol loop built on top of a [`crate::netlayer`]
//! connection.

mod error;
mod protocol;
mod registry;
mod state;

pub use error::SessionError;
pub use protocol::{crossed_hellos_loses, Session};
pub use registry::{CrossedHellosOutcome, PeerSessionRegistry};
pub use state::{Role, SessionState};
