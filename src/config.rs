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

//! Harness configuration, loadable from TOML.

use serde::Deserialize;
use thiserror::Error;

/// Configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file's contents did not parse as valid TOML for this shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level harness configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// CapTP settings.
    #[serde(default)]
    pub captp: CaptpSettings,
    /// Codec settings.
    #[serde(default)]
    pub codec: CodecSettings,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// CapTP protocol-level knobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CaptpSettings {
    /// The version string advertised in `op:start-session`.
    pub captp_version: String,
    /// Default timeout, in seconds, for blocking receives.
    pub default_timeout_secs: u64,
    /// Let the netlayer pick an ephemeral port/designator rather than a
    /// fixed one.
    pub autoport: bool,
}

impl Default for CaptpSettings {
    fn default() -> Self {
        Self {
            captp_version: "1.0".to_string(),
            default_timeout_secs: 60,
            autoport: true,
        }
    }
}

/// Codec-level knobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CodecSettings {
    /// Accept single-precision (`F`) doubles, widening them to `f64`,
    /// instead of rejecting them.
    pub convert_single_floats: bool,
    /// Maximum nesting depth for lists/sets/maps/records before decode
    /// fails with `CodecError::DepthExceeded`.
    pub max_container_depth: usize,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            convert_single_floats: false,
            max_container_depth: 128,
        }
    }
}

/// Logging knobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `"json"` or `"pretty"`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { format: "json".to_string() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            captp: CaptpSettings::default(),
            codec: CodecSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load configuration from a file on disk.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = Config::default();
        assert_eq!(cfg.captp.captp_version, "1.0");
        assert_eq!(cfg.codec.max_container_depth, 128);
        assert!(!cfg.codec.convert_single_floats);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = Config::from_toml_str("[codec]\nconvert_single_floats = true\n").unwrap();
        assert!(cfg.codec.convert_single_floats);
        assert_eq!(cfg.captp.captp_version, "1.0");
    }
}
