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

use mti::prelude::*;
use serde_json::Value;

use crate::message::{Address, Headers, Payload};

/// Identifier assigned to every event at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(String);

impl EventId {
    /// Generates a new time-ordered identifier (`evt_<uuid v7>`).
    #[must_use]
    pub fn generate() -> Self {
        Self("evt".create_type_id::<V7>().to_string())
    }

    /// The identifier as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The unit of data flowing through the bus.
///
/// An `Event` is immutable once built: it has an identifier, an optional
/// application correlation key, an optional reply address, a header bag and a
/// payload. Use [`Event::builder`] to assemble one, or [`Event::to_builder`]
/// to derive a new event from an existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    id: EventId,
    key: Option<Address>,
    reply_to: Option<Address>,
    headers: Headers,
    payload: Payload,
}

impl Event {
    /// Creates an event carrying `payload` with no key, reply address or headers.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self::builder(payload).build()
    }

    /// Starts building an event around `payload`.
    pub fn builder(payload: impl Into<Payload>) -> EventBuilder {
        EventBuilder {
            key: None,
            reply_to: None,
            headers: Headers::new(),
            payload: payload.into(),
        }
    }

    /// Starts a builder pre-filled with this event's key, reply address,
    /// headers and payload. The built event gets a fresh id.
    #[must_use]
    pub fn to_builder(&self) -> EventBuilder {
        EventBuilder {
            key: self.key.clone(),
            reply_to: self.reply_to.clone(),
            headers: self.headers.clone(),
            payload: self.payload.clone(),
        }
    }

    /// The event identifier.
    #[must_use]
    pub const fn id(&self) -> &EventId {
        &self.id
    }

    /// The application correlation key.
    #[must_use]
    pub const fn key(&self) -> Option<&Address> {
        self.key.as_ref()
    }

    /// Where the sender expects a reply to be published.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref()
    }

    /// All headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// A single header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    /// The payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consumes the event, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// The same logical event with a reply address assigned.
    pub(crate) fn with_reply_to(mut self, reply_to: Address) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// The same logical event with selector bindings exposed as headers.
    pub(crate) fn with_bindings(&self, bindings: &[(String, String)]) -> Self {
        let mut bound = self.clone();
        for (name, value) in bindings {
            bound.headers.insert(name.clone(), Value::String(value.clone()));
        }
        bound
    }
}

/// Assembles an [`Event`].
#[derive(Debug, Clone)]
pub struct EventBuilder {
    key: Option<Address>,
    reply_to: Option<Address>,
    headers: Headers,
    payload: Payload,
}

impl EventBuilder {
    /// Sets the correlation key.
    #[must_use]
    pub fn key(mut self, key: impl Into<Address>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets or clears the correlation key.
    #[must_use]
    pub fn maybe_key(mut self, key: Option<Address>) -> Self {
        self.key = key;
        self
    }

    /// Sets the reply address.
    #[must_use]
    pub fn reply_to(mut self, reply_to: impl Into<Address>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Sets or clears the reply address.
    #[must_use]
    pub fn maybe_reply_to(mut self, reply_to: Option<Address>) -> Self {
        self.reply_to = reply_to;
        self
    }

    /// Adds one header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the header bag.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Replaces the payload.
    #[must_use]
    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Builds the event, assigning a fresh id.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: EventId::generate(),
            key: self.key,
            reply_to: self.reply_to,
            headers: self.headers,
            payload: self.payload,
        }
    }
}
