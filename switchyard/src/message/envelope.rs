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
use std::sync::{Arc, OnceLock};

use mti::prelude::*;
use serde::de::DeserializeOwned;
use serde_json::Value;
use switchyard_core::{Event, Headers, Payload};

use crate::binding::EventBinding;
use crate::common::ConversionError;

/// Identifies one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    fn generate() -> Self {
        Self("msg".create_type_id::<V7>().to_string())
    }

    /// The id as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone)]
struct Origin {
    event: Arc<Event>,
    binding: EventBinding,
}

fn decode_headers(origin: Option<&Origin>) -> Headers {
    match origin {
        Some(origin) => origin.binding.headers_from_event(&origin.event),
        None => Headers::new(),
    }
}

/// The pipeline's message envelope: headers plus a body.
///
/// A message created from an [`Event`] decodes lazily. Its headers are
/// materialised the first time the whole set is requested, and single
/// lookups through [`header`](Self::header) avoid materialising at all.
/// A message that wraps an event and is never modified is forwarded as that
/// event.
#[derive(Clone)]
pub struct Message {
    id: MessageId,
    origin: Option<Origin>,
    headers: OnceLock<Headers>,
    edited_headers: Option<Headers>,
    body: OnceLock<Result<Payload, ConversionError>>,
    modified: bool,
}

impl Message {
    /// A new message with `body` and no headers.
    pub fn new(body: impl Into<Payload>) -> Self {
        Self {
            id: MessageId::generate(),
            origin: None,
            headers: OnceLock::from(Headers::new()),
            edited_headers: None,
            body: OnceLock::from(Ok(body.into())),
            modified: false,
        }
    }

    pub(crate) fn from_event(event: Arc<Event>, binding: EventBinding) -> Self {
        Self {
            id: MessageId::generate(),
            origin: Some(Origin { event, binding }),
            headers: OnceLock::new(),
            edited_headers: None,
            body: OnceLock::new(),
            modified: false,
        }
    }

    /// Adds a header, builder style.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replaces all headers, builder style.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        *self.headers_mut() = headers;
        self
    }

    /// The message id.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    /// The event this message was decoded from, if any.
    #[must_use]
    pub fn event(&self) -> Option<&Event> {
        self.origin.as_ref().map(|origin| origin.event.as_ref())
    }

    /// The wrapped event, if the message has not been modified since.
    pub(crate) fn forwardable_event(&self) -> Option<&Event> {
        if self.modified {
            return None;
        }
        self.event()
    }

    /// Whether the headers have been decoded yet.
    #[must_use]
    pub fn has_materialized_headers(&self) -> bool {
        self.materialized_headers().is_some()
    }

    fn materialized_headers(&self) -> Option<&Headers> {
        self.edited_headers.as_ref().or_else(|| self.headers.get())
    }

    /// All headers, decoding them on first use.
    pub fn headers(&self) -> &Headers {
        match &self.edited_headers {
            Some(headers) => headers,
            None => self.headers.get_or_init(|| decode_headers(self.origin.as_ref())),
        }
    }

    /// Mutable access to the headers. Marks the message as modified.
    pub fn headers_mut(&mut self) -> &mut Headers {
        self.modified = true;
        let Self {
            origin,
            headers,
            edited_headers,
            ..
        } = self;
        edited_headers.get_or_insert_with(|| {
            headers
                .take()
                .unwrap_or_else(|| decode_headers(origin.as_ref()))
        })
    }

    /// One header.
    ///
    /// Before the headers are materialised this looks the name up directly
    /// on the wrapped event.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<Value> {
        if let Some(headers) = self.materialized_headers() {
            return headers.get(name).cloned();
        }
        self.origin
            .as_ref()
            .and_then(|origin| origin.binding.header_from_event(&origin.event, name))
    }

    /// Sets one header, returning the previous value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.headers_mut().insert(name, value)
    }

    /// Removes one header, returning its value.
    pub fn remove_header(&mut self, name: &str) -> Option<Value> {
        self.headers_mut().remove(name)
    }

    /// The body, decoding it on first use.
    ///
    /// # Errors
    ///
    /// Returns the [`ConversionError`] if the wrapped event's payload cannot
    /// be represented as a body.
    pub fn body(&self) -> Result<&Payload, ConversionError> {
        self.body
            .get_or_init(|| match &self.origin {
                Some(origin) => origin.binding.body_from_event(&origin.event),
                None => Ok(Payload::Empty),
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Replaces the body. Marks the message as modified.
    pub fn set_body(&mut self, body: impl Into<Payload>) {
        self.body = OnceLock::from(Ok(body.into()));
        self.modified = true;
    }

    /// Decodes the body into `T` with serde.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be converted or does not decode as `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ConversionError> {
        self.body()?
            .decode()
            .map_err(|error| ConversionError::Decode(error.to_string()))
    }

    /// Consumes the message, returning its body.
    ///
    /// # Errors
    ///
    /// Same as [`body`](Self::body).
    pub fn into_body(self) -> Result<Payload, ConversionError> {
        self.body().cloned()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("event", &self.event().map(Event::id))
            .field("headers", &self.materialized_headers())
            .field("body", &self.body.get())
            .field("modified", &self.modified)
            .finish()
    }
}
