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

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::message::Headers;

/// The application data an event carries.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// No data.
    #[default]
    Empty,
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A structured JSON value.
    Json(Value),
    /// An error raised while producing a reply.
    Failure(Failure),
    /// A whole message (headers and body) shipped as one payload.
    Structured {
        /// The message headers, un-namespaced.
        headers: Headers,
        /// The message body.
        body: Box<Payload>,
    },
}

impl Payload {
    /// Serializes `value` into a JSON payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Whether there is nothing to carry.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The failure carried by an error reply, if any.
    #[must_use]
    pub const fn as_failure(&self) -> Option<&Failure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    /// The text, if this is a text payload.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// A short name for the variant, used in logs and conversion errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::Failure(_) => "failure",
            Self::Structured { .. } => "structured",
        }
    }

    /// Decodes the payload into `T`.
    ///
    /// JSON values are deserialized directly; text and bytes are parsed as JSON
    /// documents. Empty, failure and structured payloads cannot be decoded.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadDecodeError> {
        match self {
            Self::Json(value) => {
                serde_json::from_value(value.clone()).map_err(PayloadDecodeError::Json)
            }
            Self::Text(text) => serde_json::from_str(text).map_err(PayloadDecodeError::Json),
            Self::Bytes(bytes) => serde_json::from_slice(bytes).map_err(PayloadDecodeError::Json),
            other => Err(PayloadDecodeError::Unsupported(other.kind())),
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Failure> for Payload {
    fn from(value: Failure) -> Self {
        Self::Failure(value)
    }
}

/// Why a payload could not be decoded into a typed value.
#[derive(Debug, thiserror::Error)]
pub enum PayloadDecodeError {
    /// The payload kind has no typed representation.
    #[error("a {0} payload cannot be decoded")]
    Unsupported(&'static str),
    /// Serde rejected the data.
    #[error(transparent)]
    Json(serde_json::Error),
}

/// An error carried as a reply payload.
///
/// A responder that fails publishes a `Failure` to the reply address instead of
/// staying silent, so the requester resolves promptly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    message: String,
    causes: Vec<String>,
}

impl Failure {
    /// A failure with a single message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Captures an error and its cause chain.
    #[must_use]
    pub fn from_error(error: &anyhow::Error) -> Self {
        Self {
            message: error.to_string(),
            causes: error.chain().skip(1).map(ToString::to_string).collect(),
        }
    }

    /// The top-level message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The underlying causes, outermost first.
    #[must_use]
    pub fn causes(&self) -> &[String] {
        &self.causes
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for cause in &self.causes {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}
