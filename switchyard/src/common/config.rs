/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::common::ConfigError;

/// Configuration for switchyard endpoints.
///
/// Loaded from TOML in XDG-compliant directories; every section and field is
/// optional and falls back to its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchyardConfig {
    /// Request timeouts
    pub timeouts: TimeoutConfig,
    /// Header namespacing and filtering
    pub headers: HeaderConfig,
    /// Message/event binding behaviour
    pub binding: BindingConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a producer waits for a reply, in milliseconds
    pub request_timeout_ms: u64,
}

/// Header namespacing and deny rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Prefix put in front of event header names on messages
    pub namespace: String,
    /// Compare deny names case-insensitively
    pub lower_case: bool,
    /// Regular expressions (full match, case-insensitive) for message headers kept off the bus
    pub outbound_deny_patterns: Vec<String>,
    /// Exact message header names kept off the bus
    pub outbound_deny_names: Vec<String>,
    /// Regular expressions for event headers not copied onto messages
    pub inbound_deny_patterns: Vec<String>,
    /// Exact event header names not copied onto messages
    pub inbound_deny_names: Vec<String>,
}

/// Binding behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Ship the whole message (headers and body) as a structured payload
    pub transfer_envelope: bool,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            namespace: "bus.".to_string(),
            lower_case: true,
            outbound_deny_patterns: vec!["(pipeline|switchyard)[._a-z0-9-]*".to_string()],
            outbound_deny_names: Vec::new(),
            inbound_deny_patterns: Vec::new(),
            inbound_deny_names: Vec::new(),
        }
    }
}

impl SwitchyardConfig {
    /// The request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.request_timeout_ms)
    }

    /// Parses a TOML document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document does not parse or fails [`validate`](Self::validate).
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&document)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `switchyard/config.toml` under `$XDG_CONFIG_HOME` (usually
    /// `~/.config`) and then the XDG system config directories.
    ///
    /// If no configuration file is found, returns the default configuration.
    /// If a configuration file exists but is malformed or invalid, logs an error and uses defaults.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("switchyard") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            info!("Loading configuration from: {}", path.display());
            match Self::load_from(&path) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to load configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            info!("No configuration file found, using defaults");
            Self::default()
        }
    }

    /// Checks values that TOML alone cannot.
    ///
    /// # Errors
    ///
    /// Rejects an empty namespace, a zero request timeout and deny patterns
    /// that do not compile.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.headers.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.timeouts.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        for pattern in self
            .headers
            .outbound_deny_patterns
            .iter()
            .chain(&self.headers.inbound_deny_patterns)
        {
            compile_deny_pattern(pattern)?;
        }
        Ok(())
    }
}

/// Compiles a header deny pattern: anchored, case-insensitive.
pub(crate) fn compile_deny_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("(?i)^(?:{pattern})$")).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: SwitchyardConfig = SwitchyardConfig::load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SwitchyardConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.headers.namespace, "bus.");
        assert!(!config.binding.transfer_envelope);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_documents_keep_defaults() {
        let config = SwitchyardConfig::from_toml_str(
            r#"
            [headers]
            namespace = "evt."
            "#,
        )
        .unwrap();
        assert_eq!(config.headers.namespace, "evt.");
        assert!(config.headers.lower_case);
        assert_eq!(config.timeouts.request_timeout_ms, 30_000);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            SwitchyardConfig::from_toml_str("[timeouts]\nrequest_timeout_ms = 0"),
            Err(ConfigError::ZeroTimeout)
        ));
        assert!(matches!(
            SwitchyardConfig::from_toml_str("[headers]\nnamespace = \"\""),
            Err(ConfigError::EmptyNamespace)
        ));
        assert!(matches!(
            SwitchyardConfig::from_toml_str("[headers]\ninbound_deny_patterns = [\"(\"]"),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(matches!(
            SwitchyardConfig::from_toml_str("[timeouts]\nrequest_timeout_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn deny_patterns_are_anchored_and_case_insensitive() {
        let pattern = compile_deny_pattern("(pipeline|switchyard)[._a-z0-9-]*").unwrap();
        assert!(pattern.is_match("Switchyard.Trace"));
        assert!(pattern.is_match("pipeline-id"));
        assert!(!pattern.is_match("x-switchyard.trace"));
    }
}
