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

//! Translation between pipeline [`Message`]s and bus [`Event`]s.
//!
//! Going out (`to_event`), the key and reply-address headers are promoted to
//! event fields, every other header passes the outbound filter, and namespaced
//! names lose their prefix. Coming in (`to_message`), event headers pass the
//! inbound filter and gain the prefix, and the key and reply address are
//! written back under their reserved names. Nothing is decoded until the
//! message is read.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use switchyard_core::{Address, Event, Headers, Payload};
use tracing::trace;

use crate::common::{ConfigError, ConversionError, SwitchyardConfig};
use crate::message::Message;
use crate::traits::{HasHeaderFilter, HeaderFilterStrategy};

mod filter;
mod namespace;

pub use filter::DefaultHeaderFilter;
pub use namespace::HeaderNamespace;

/// Event fields that are exposed as message headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventProperty {
    /// [`Event::key`]
    Key,
    /// [`Event::reply_to`]
    ReplyTo,
}

impl EventProperty {
    /// Reads the property from `event`.
    #[must_use]
    pub fn read(self, event: &Event) -> Option<&Address> {
        match self {
            Self::Key => event.key(),
            Self::ReplyTo => event.reply_to(),
        }
    }
}

/// Converts messages to events and back.
///
/// Cheap to clone; clones share the filter and namespace.
#[derive(Clone)]
pub struct EventBinding {
    inner: Arc<BindingInner>,
}

struct BindingInner {
    filter: Arc<dyn HeaderFilterStrategy>,
    namespace: HeaderNamespace,
    properties: HashMap<String, EventProperty>,
    transfer_envelope: bool,
}

impl fmt::Debug for EventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBinding")
            .field("namespace", &self.inner.namespace.prefix())
            .field("transfer_envelope", &self.inner.transfer_envelope)
            .finish_non_exhaustive()
    }
}

impl EventBinding {
    /// A binding with an explicit filter and namespace.
    pub fn new(
        filter: impl HeaderFilterStrategy,
        namespace: HeaderNamespace,
        transfer_envelope: bool,
    ) -> Self {
        let properties = HashMap::from([
            (namespace.key_header().to_string(), EventProperty::Key),
            (namespace.reply_header().to_string(), EventProperty::ReplyTo),
        ]);
        Self {
            inner: Arc::new(BindingInner {
                filter: Arc::new(filter),
                namespace,
                properties,
                transfer_envelope,
            }),
        }
    }

    /// A binding using [`DefaultHeaderFilter`] and the configured namespace.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn from_config(config: &SwitchyardConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            DefaultHeaderFilter::from_config(&config.headers)?,
            HeaderNamespace::new(config.headers.namespace.clone()),
            config.binding.transfer_envelope,
        ))
    }

    /// The header namespace.
    #[must_use]
    pub fn namespace(&self) -> &HeaderNamespace {
        &self.inner.namespace
    }

    /// Whether whole messages travel as structured payloads.
    #[must_use]
    pub fn transfers_envelope(&self) -> bool {
        self.inner.transfer_envelope
    }

    /// The event field a message header name stands for, if any.
    #[must_use]
    pub fn property(&self, header: &str) -> Option<EventProperty> {
        self.inner.properties.get(header).copied()
    }

    /// Converts `message` to an event.
    ///
    /// A message that wraps an event and was never modified converts back to
    /// that same event.
    ///
    /// # Errors
    ///
    /// Fails if a key or reply-address header is not an address, or if the
    /// message body cannot be converted.
    pub fn to_event(&self, message: &Message) -> Result<Event, ConversionError> {
        if let Some(event) = message.forwardable_event() {
            trace!(event = %event.id(), "forwarding unmodified event");
            return Ok(event.clone());
        }

        let namespace = &self.inner.namespace;
        let mut key = None;
        let mut reply_to = None;
        let mut headers = Headers::new();

        for (name, value) in message.headers().iter() {
            match self.property(name) {
                Some(property) => {
                    let address = Address::from_header_value(value).ok_or_else(|| {
                        ConversionError::InvalidAddressHeader {
                            header: name.to_string(),
                        }
                    })?;
                    match property {
                        EventProperty::Key => key = Some(address),
                        EventProperty::ReplyTo => reply_to = Some(address),
                    }
                }
                None if self.inner.filter.denies_outbound(name, value) => {
                    trace!(header = name, "header kept off the bus");
                }
                None => {
                    let name = namespace.strip(name).unwrap_or(name);
                    headers.insert(name, value.clone());
                }
            }
        }

        let body = message.body()?.clone();
        let builder = Event::builder(Payload::Empty)
            .maybe_key(key)
            .maybe_reply_to(reply_to);
        let event = if self.inner.transfer_envelope {
            builder
                .payload(Payload::Structured {
                    headers,
                    body: Box::new(body),
                })
                .build()
        } else {
            builder.headers(headers).payload(body).build()
        };
        Ok(event)
    }

    /// Wraps `event` in a message. Headers and body are decoded on first access.
    #[must_use]
    pub fn to_message(&self, event: Event) -> Message {
        Message::from_event(Arc::new(event), self.clone())
    }

    /// The message headers `event` stands for.
    ///
    /// Event headers that pass the inbound filter appear under the namespace;
    /// the key and reply address appear under their reserved names. In
    /// envelope mode the enveloped headers are restored as they were.
    ///
    /// A generic header whose message name would be one of the reserved names
    /// (an event header called `key`, for example) is dropped.
    #[must_use]
    pub fn headers_from_event(&self, event: &Event) -> Headers {
        let namespace = &self.inner.namespace;
        let mut headers = Headers::new();

        if self.inner.transfer_envelope {
            if let Payload::Structured {
                headers: carried, ..
            } = event.payload()
            {
                for (name, value) in carried.iter() {
                    if self.property(name).is_some() {
                        trace!(header = name, "reserved header name dropped");
                    } else if !self.inner.filter.denies_inbound(name, value) {
                        headers.insert(name, value.clone());
                    }
                }
            }
        } else {
            for (name, value) in event.headers().iter() {
                let qualified = namespace.qualify(name);
                if self.property(&qualified).is_some() {
                    trace!(header = name, "reserved header name dropped");
                } else if !self.inner.filter.denies_inbound(name, value) {
                    headers.insert(qualified, value.clone());
                }
            }
        }

        if let Some(key) = event.key() {
            headers.insert(namespace.key_header(), key.to_header_value());
        }
        if let Some(reply_to) = event.reply_to() {
            headers.insert(namespace.reply_header(), reply_to.to_header_value());
        }
        headers
    }

    /// The message body `event` stands for.
    ///
    /// # Errors
    ///
    /// In envelope mode, fails if the payload is not a structured envelope.
    pub fn body_from_event(&self, event: &Event) -> Result<Payload, ConversionError> {
        if !self.inner.transfer_envelope {
            return Ok(event.payload().clone());
        }
        match event.payload() {
            Payload::Structured { body, .. } => Ok((**body).clone()),
            other => Err(ConversionError::MissingEnvelope { found: other.kind() }),
        }
    }

    /// Looks up one message header without materialising the rest.
    pub(crate) fn header_from_event(&self, event: &Event, name: &str) -> Option<Value> {
        // Reserved names read the event fields only, as in `headers_from_event`.
        if let Some(property) = self.property(name) {
            return property.read(event).map(Address::to_header_value);
        }
        if self.inner.transfer_envelope {
            return self.headers_from_event(event).get(name).cloned();
        }
        let bare = self.inner.namespace.strip(name)?;
        event
            .header(bare)
            .filter(|value| !self.inner.filter.denies_inbound(bare, value))
            .cloned()
    }
}

impl HasHeaderFilter for EventBinding {
    fn header_filter(&self) -> &dyn HeaderFilterStrategy {
        self.inner.filter.as_ref()
    }
}
