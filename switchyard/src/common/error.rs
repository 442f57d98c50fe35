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

//! Errors raised while setting up endpoints and while exchanging messages.

use switchyard_core::{
    CorrelationError, Failure, InvalidSelectorError, RequestError, RequestTimeoutError,
};
use thiserror::Error;

/// A message could not be translated to or from an event.
///
/// Surfaces as a failed exchange; the endpoint keeps working.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// A key or reply-address header holds something that is not an address.
    #[error("header `{header}` does not hold a valid address")]
    InvalidAddressHeader {
        /// The offending header name.
        header: String,
    },
    /// Envelope transfer is on but the event payload is not a structured envelope.
    #[error("expected a structured envelope payload, found {found}")]
    MissingEnvelope {
        /// The kind of payload that arrived instead.
        found: &'static str,
    },
    /// The body could not be decoded into the requested type.
    #[error("could not decode message body: {0}")]
    Decode(String),
}

/// A textual endpoint address does not follow `<prefix>:<payload>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAddressSyntaxError {
    /// No `:` separates a prefix from the payload.
    #[error("address `{0}` has no `<prefix>:` part")]
    MissingPrefix(String),
    /// The prefix is not one of `uri`, `type`, `class`, `regex` or `object`.
    #[error("unknown address prefix `{prefix}` in `{address}`")]
    UnknownPrefix {
        /// The prefix as written.
        prefix: String,
        /// The whole address.
        address: String,
    },
    /// Nothing follows the prefix.
    #[error("address `{0}` has an empty payload")]
    EmptyPayload(String),
}

/// An invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read configuration file `{path}`: {source}")]
    Io {
        /// The file that failed.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this configuration.
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
    /// A header deny pattern does not compile.
    #[error("invalid header deny pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// The pattern as written.
        pattern: String,
        /// What the regex engine rejected.
        source: regex::Error,
    },
    /// The header namespace prefix is empty.
    #[error("header namespace must not be empty")]
    EmptyNamespace,
    /// The request timeout is zero.
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

/// An endpoint or consumer could not be created.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The textual address is malformed.
    #[error(transparent)]
    Address(#[from] InvalidAddressSyntaxError),
    /// The address is well formed but its pattern is not.
    #[error(transparent)]
    Selector(#[from] InvalidSelectorError),
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Consumers run their processors on a Tokio runtime.
    #[error("consumers must be started from within a Tokio runtime")]
    NoRuntime,
}

/// Why an exchange failed.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The message or the reply could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// The request could not be started.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
    /// No reply arrived in time.
    #[error(transparent)]
    Timeout(#[from] RequestTimeoutError),
    /// The request was torn down before a reply arrived.
    #[error("request was abandoned before a reply arrived")]
    Abandoned,
    /// The consumer failed and replied with the failure.
    #[error("remote processing failed: {0}")]
    Remote(Failure),
    /// The endpoint address matches many addresses and names none to publish to.
    #[error("endpoint `{0}` has no concrete address to publish to")]
    NotPublishable(String),
}

impl From<RequestError> for ExchangeError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Timeout(timeout) => Self::Timeout(timeout),
            RequestError::Abandoned => Self::Abandoned,
        }
    }
}
