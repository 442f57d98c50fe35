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

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;

use crate::common::config::compile_deny_pattern;
use crate::common::{ConfigError, HeaderConfig};
use crate::traits::HeaderFilterStrategy;

/// Deny rules for one direction.
#[derive(Debug, Clone, Default)]
struct DenyRules {
    patterns: Vec<Regex>,
    names: HashSet<String>,
    lower_case: bool,
}

impl DenyRules {
    fn new(patterns: &[String], names: &[String], lower_case: bool) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|pattern| compile_deny_pattern(pattern))
            .collect::<Result<_, _>>()?;
        let names = names
            .iter()
            .map(|name| if lower_case { name.to_lowercase() } else { name.clone() })
            .collect();
        Ok(Self {
            patterns,
            names,
            lower_case,
        })
    }

    fn denies(&self, name: &str) -> bool {
        let listed = if self.lower_case {
            self.names.contains(&name.to_lowercase())
        } else {
            self.names.contains(name)
        };
        listed || self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}

/// The configurable header filter used by default.
///
/// Each direction has a list of regular expressions (anchored,
/// case-insensitive) and a list of exact names. Out of the box, headers
/// starting with `pipeline` or `switchyard` never leave the pipeline, and
/// everything on the bus is let in.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaderFilter {
    outbound: DenyRules,
    inbound: DenyRules,
}

impl DefaultHeaderFilter {
    /// Builds the filter from the `[headers]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] for a pattern that does not compile.
    pub fn from_config(config: &HeaderConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            outbound: DenyRules::new(
                &config.outbound_deny_patterns,
                &config.outbound_deny_names,
                config.lower_case,
            )?,
            inbound: DenyRules::new(
                &config.inbound_deny_patterns,
                &config.inbound_deny_names,
                config.lower_case,
            )?,
        })
    }
}

impl HeaderFilterStrategy for DefaultHeaderFilter {
    fn denies_outbound(&self, name: &str, _value: &Value) -> bool {
        self.outbound.denies(name)
    }

    fn denies_inbound(&self, name: &str, _value: &Value) -> bool {
        self.inbound.denies(name)
    }
}
