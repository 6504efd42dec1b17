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

//! OCapN peer locators and sturdyrefs.
//!
//! Wire form is `(ocapn-peer transport designator hints)` with `hints` a full
//! string-to-string mapping. An older predecessor form, `(ocapn-machine
//! transport address <bool>)`, never carried real hint data and is not
//! parsed or emitted here.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::codec::{Record, Symbol, Value};

/// URI/record parsing failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UriError {
    /// The textual URI did not match `ocapn://designator.transport[?k=v&...]`.
    #[error("malformed ocapn uri: {0}")]
    MalformedUri(String),
    /// A record did not have the shape `(ocapn-peer transport designator hints)`.
    #[error("malformed ocapn-peer record")]
    MalformedRecord,
    /// A sturdyref record did not have the shape `(ocapn-sturdyref peer swiss-num)`.
    #[error("malformed sturdyref record")]
    MalformedSturdyref,
}

/// A peer locator: how to reach one OCapN machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerLocator {
    /// Transport name, e.g. `tcp`, `onion`.
    pub transport: String,
    /// Opaque address/designator within that transport.
    pub designator: String,
    /// Transport-specific hints.
    pub hints: BTreeMap<String, String>,
}

impl PeerLocator {
    /// Build a locator with no hints.
    pub fn new(transport: impl Into<String>, designator: impl Into<String>) -> Self {
        Self {
            transport: transport.into(),
            designator: designator.into(),
            hints: BTreeMap::new(),
        }
    }

    /// Parse `ocapn://designator.transport[?k=v&...]`.
    pub fn parse(uri: &str) -> Result<Self, UriError> {
        let rest = uri
            .strip_prefix("ocapn://")
            .ok_or_else(|| UriError::MalformedUri(uri.to_string()))?;

        let (authority, query) = match rest.split_once('?') {
            Some((a, q)) => (a, Some(q)),
            None => (rest, None),
        };

        let (designator, transport) = authority
            .rsplit_once('.')
            .ok_or_else(|| UriError::MalformedUri(uri.to_string()))?;
        if designator.is_empty() || transport.is_empty() {
            return Err(UriError::MalformedUri(uri.to_string()));
        }

        let mut hints = BTreeMap::new();
        if let Some(q) = query {
            for pair in q.split('&').filter(|p| !p.is_empty()) {
                let (k, v) = pair
                    .split_once('=')
                    .ok_or_else(|| UriError::MalformedUri(uri.to_string()))?;
                hints.insert(percent_decode(k), percent_decode(v));
            }
        }

        Ok(Self {
            transport: transport.to_string(),
            designator: designator.to_string(),
            hints,
        })
    }

    /// Serialize as a textual URI.
    pub fn to_uri(&self) -> String {
        let mut s = format!("ocapn://{}.{}", self.designator, self.transport);
        if !self.hints.is_empty() {
            s.push('?');
            let parts: Vec<String> = self
                .hints
                .iter()
                .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
                .collect();
            s.push_str(&parts.join("&"));
        }
        s
    }

    /// Build from the wire record form `(ocapn-peer transport designator hints)`.
    pub fn from_value(value: &Value) -> Result<Self, UriError> {
        let record = value.as_record().ok_or(UriError::MalformedRecord)?;
        if record.label_symbol() != Some("ocapn-peer") || record.args.len() != 3 {
            return Err(UriError::MalformedRecord);
        }
        let transport = record.args[0].as_symbol().ok_or(UriError::MalformedRecord)?;
        let designator = match &record.args[1] {
            Value::Str(s) => s.clone(),
            _ => return Err(UriError::MalformedRecord),
        };
        let hints_map = match &record.args[2] {
            Value::Map(pairs) => pairs,
            _ => return Err(UriError::MalformedRecord),
        };
        let mut hints = BTreeMap::new();
        for (k, v) in hints_map {
            let (Value::Str(k), Value::Str(v)) = (k, v) else {
                return Err(UriError::MalformedRecord);
            };
            hints.insert(k.clone(), v.clone());
        }

        Ok(Self {
            transport: transport.to_string(),
            designator,
            hints,
        })
    }

    /// Build the wire record form `(ocapn-peer transport designator hints)`.
    pub fn to_value(&self) -> Value {
        let hints = Value::Map(
            self.hints
                .iter()
                .map(|(k, v)| (Value::Str(k.clone()), Value::Str(v.clone())))
                .collect(),
        );
        Value::Record(Record {
            label: Box::new(Value::Symbol(Symbol::new("ocapn-peer"))),
            args: vec![
                Value::Symbol(Symbol::new(self.transport.clone())),
                Value::Str(self.designator.clone()),
                hints,
            ],
        })
    }
}

/// A peer locator plus a swiss number: a re-presentable capability reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sturdyref {
    /// The peer to connect to.
    pub peer: PeerLocator,
    /// The swiss number identifying the object at that peer's bootstrap.
    pub swiss_num: Vec<u8>,
}

impl Sturdyref {
    /// Parse `ocapn://designator.transport[?k=v&...]/s/<swiss-num>`.
    pub fn parse(uri: &str) -> Result<Self, UriError> {
        let (peer_part, swiss_part) = uri
            .split_once("/s/")
            .ok_or_else(|| UriError::MalformedUri(uri.to_string()))?;
        let peer = PeerLocator::parse(peer_part)?;
        Ok(Self {
            peer,
            swiss_num: swiss_part.as_bytes().to_vec(),
        })
    }

    /// Serialize as a textual sturdyref URI.
    pub fn to_uri(&self) -> String {
        format!(
            "{}/s/{}",
            self.peer.to_uri(),
            String::from_utf8_lossy(&self.swiss_num)
        )
    }
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(v) = u8::from_str_radix(std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or(""), 16) {
                out.push(v);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_uri_without_hints() {
        let loc = PeerLocator::parse("ocapn://abc123.tcp").unwrap();
        assert_eq!(loc.transport, "tcp");
        assert_eq!(loc.designator, "abc123");
        assert!(loc.hints.is_empty());
    }

    #[test]
    fn round_trips_uri_with_hints() {
        let loc = PeerLocator::parse("ocapn://abc123.onion?host=example&port=1234").unwrap();
        assert_eq!(loc.hints.get("host").unwrap(), "example");
        let back = PeerLocator::parse(&loc.to_uri()).unwrap();
        assert_eq!(loc, back);
    }

    #[test]
    fn round_trips_record_form() {
        let mut loc = PeerLocator::new("tcp", "abc123");
        loc.hints.insert("port".to_string(), "1234".to_string());
        let value = loc.to_value();
        let back = PeerLocator::from_value(&value).unwrap();
        assert_eq!(loc, back);
    }

    #[test]
    fn parses_sturdyref() {
        let s = Sturdyref::parse("ocapn://abc123.tcp/s/swissnum").unwrap();
        assert_eq!(s.swiss_num, b"swissnum");
        assert_eq!(s.peer.designator, "abc123");
    }
}
