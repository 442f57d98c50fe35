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

/// Prefix applied to event header names when they are copied onto a message.
///
/// The namespace keeps bus headers from colliding with headers used by other
/// pipeline steps. Two names inside it are reserved for the event key and
/// reply address: `<prefix>key` and `<prefix>replyTo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderNamespace {
    prefix: String,
    key_header: String,
    reply_header: String,
}

impl HeaderNamespace {
    /// A namespace using `prefix`, for example `"bus."`.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            key_header: format!("{prefix}key"),
            reply_header: format!("{prefix}replyTo"),
            prefix,
        }
    }

    /// The prefix itself.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The message header carrying the event key.
    #[must_use]
    pub fn key_header(&self) -> &str {
        &self.key_header
    }

    /// The message header carrying the event reply address.
    #[must_use]
    pub fn reply_header(&self) -> &str {
        &self.reply_header
    }

    /// `name` with the prefix in front.
    #[must_use]
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }

    /// `name` without the prefix, if it had one.
    #[must_use]
    pub fn strip<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(self.prefix.as_str())
    }

    /// Whether `name` lies inside the namespace.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        name.starts_with(self.prefix.as_str())
    }
}
