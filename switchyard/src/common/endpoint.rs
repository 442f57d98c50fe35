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
use std::time::Duration;

use parking_lot::Mutex;
use switchyard_core::{Address, Event, EventBus, Headers};
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace};

use crate::binding::EventBinding;
use crate::common::consumer::Delivery;
use crate::common::{Consumer, Exchange, ExchangeError, ExchangePattern, SetupError};
use crate::message::{EndpointAddress, Message};
use crate::traits::{AsyncCallback, HasHeaderFilter, HeaderFilterStrategy, MessageProcessor};

/// What a successful [`Endpoint::produce`] returns.
#[derive(Debug)]
pub enum Outcome {
    /// The message was published; no reply was requested.
    Ack,
    /// The reply to a request.
    Reply(Message),
}

impl Outcome {
    /// The reply message, if there is one.
    #[must_use]
    pub fn into_reply(self) -> Option<Message> {
        match self {
            Self::Ack => None,
            Self::Reply(message) => Some(message),
        }
    }
}

/// The point where a pipeline meets the bus.
///
/// An endpoint is bound to one [`EndpointAddress`]. Producing converts a
/// message to an event and publishes it to the address target, optionally
/// waiting for the correlated reply. Consuming registers a processor for
/// every address the endpoint selector matches.
#[derive(Clone)]
pub struct Endpoint {
    address: Arc<EndpointAddress>,
    bus: EventBus,
    binding: EventBinding,
    request_timeout: Duration,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("address", &self.address.as_str())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Endpoint {
    /// An endpoint for `address` on `bus`.
    #[must_use]
    pub fn new(
        address: EndpointAddress,
        bus: EventBus,
        binding: EventBinding,
        request_timeout: Duration,
    ) -> Self {
        Self {
            address: Arc::new(address),
            bus,
            binding,
            request_timeout,
        }
    }

    /// The same endpoint with a different request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// The address this endpoint is bound to.
    #[must_use]
    pub fn address(&self) -> &EndpointAddress {
        &self.address
    }

    /// The binding used for conversions.
    #[must_use]
    pub const fn binding(&self) -> &EventBinding {
        &self.binding
    }

    /// The bus this endpoint publishes to.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// How long `produce` waits for a reply.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Publishes `message`, and with `expect_reply` waits for the reply.
    ///
    /// The reply message carries the request's own headers (namespaced ones
    /// excepted) followed by the reply event's headers.
    ///
    /// # Errors
    ///
    /// [`ExchangeError`] if the endpoint has no concrete target, the message
    /// or reply cannot be converted, the request cannot start or times out,
    /// or the consumer replied with a failure.
    #[instrument(skip(self, message), fields(endpoint = %self.address, message = %message.id()))]
    pub async fn produce(&self, message: Message, expect_reply: bool) -> Result<Outcome, ExchangeError> {
        let (target, event) = self.prepare(&message)?;
        if !expect_reply {
            let delivered = self.bus.publish(target, event);
            trace!(delivered, "published");
            return Ok(Outcome::Ack);
        }

        let reply = self.bus.request(target, event, self.request_timeout)?.await?;
        self.reply_message(&message, reply).map(Outcome::Reply)
    }

    /// Callback-style [`produce`](Self::produce).
    ///
    /// Returns `true` if the exchange completed before returning; `callback`
    /// has then already been called with `synchronously = true`. Returns
    /// `false` if the reply is awaited; `callback` is then called with
    /// `synchronously = false` when it arrives or the request times out.
    /// Either way `callback` runs exactly once.
    #[instrument(skip_all, fields(endpoint = %self.address, message = %exchange.input().id()))]
    pub fn process<C: AsyncCallback>(&self, mut exchange: Exchange, callback: C) -> bool {
        let (target, event) = match self.prepare(exchange.input()) {
            Ok(prepared) => prepared,
            Err(failure) => {
                exchange.set_failure(failure);
                callback.done(exchange, true);
                return true;
            }
        };

        if exchange.pattern() == ExchangePattern::InOnly {
            self.bus.publish(target, event);
            callback.done(exchange, true);
            return true;
        }

        let parked = Arc::new(Mutex::new(Some((exchange, callback))));
        let resume = Arc::clone(&parked);
        let endpoint = self.clone();
        let started = self
            .bus
            .request_with(target, event, self.request_timeout, move |outcome| {
                let Some((mut exchange, callback)) = resume.lock().take() else {
                    return;
                };
                match outcome
                    .map_err(ExchangeError::from)
                    .and_then(|reply| endpoint.reply_message(exchange.input(), reply))
                {
                    Ok(output) => exchange.set_output(output),
                    Err(failure) => exchange.set_failure(failure),
                }
                callback.done(exchange, false);
            });

        match started {
            Ok(_) => false,
            Err(error) => {
                if let Some((mut exchange, callback)) = parked.lock().take() {
                    exchange.set_failure(error.into());
                    callback.done(exchange, true);
                }
                true
            }
        }
    }

    /// Runs `processor` for every event the endpoint selector matches.
    ///
    /// Each delivery is processed on its own task. When the event carries a
    /// reply address, the processor result is published there exactly once:
    /// the returned message on success, or a failure payload on error or
    /// panic. Replies are keyed with the request event id.
    ///
    /// # Errors
    ///
    /// [`SetupError::NoRuntime`] outside a Tokio runtime.
    #[instrument(skip(self, processor), fields(endpoint = %self.address))]
    pub fn consume(&self, processor: impl MessageProcessor) -> Result<Consumer, SetupError> {
        let runtime = Handle::try_current().map_err(|_| SetupError::NoRuntime)?;
        let tracker = TaskTracker::new();
        let registration_id = Arc::new(OnceLock::new());
        let delivery = Delivery::new(
            self.bus.clone(),
            self.binding.clone(),
            Arc::new(processor),
            Arc::clone(&registration_id),
        );

        let tasks = tracker.clone();
        let registration = self.bus.on(self.address.selector().clone(), move |event| {
            // The token keeps `shutdown` waiting until the spawn below is tracked.
            let _pending = tasks.token();
            if tasks.is_closed() {
                trace!(event = %event.id(), "consumer shut down; delivery skipped");
                return Ok(());
            }
            tasks.spawn_on(delivery.clone().run(event), &runtime);
            Ok(())
        });
        // The cell was created above and is set only here.
        let _ = registration_id.set(registration.id());
        debug!(registration = %registration.id(), "consumer started");

        Ok(Consumer::new(self.address.to_string(), registration, tracker))
    }

    fn target(&self) -> Result<Address, ExchangeError> {
        self.address
            .target()
            .cloned()
            .ok_or_else(|| ExchangeError::NotPublishable(self.address.to_string()))
    }

    /// The target and the outbound event for `message`.
    ///
    /// A message received from the bus still names its requester's reply
    /// address, either on the wrapped event or as the reply header. That
    /// address belongs to the upstream exchange and is never reused here.
    fn prepare(&self, message: &Message) -> Result<(Address, Event), ExchangeError> {
        let target = self.target()?;
        let mut event = self.binding.to_event(message)?;
        let inherited = message.event().and_then(Event::reply_to);
        if inherited.is_some() && event.reply_to() == inherited {
            trace!(reply_to = ?inherited, "dropping inherited reply address");
            event = event.to_builder().maybe_reply_to(None).build();
        }
        Ok((target, event))
    }

    fn reply_message(&self, request: &Message, reply: Event) -> Result<Message, ExchangeError> {
        if let Some(failure) = reply.payload().as_failure() {
            return Err(ExchangeError::Remote(failure.clone()));
        }
        let namespace = self.binding.namespace();
        let mut message = self.binding.to_message(reply);
        message.body()?;

        let mut headers: Headers = request
            .headers()
            .iter()
            .filter(|(name, _)| !namespace.contains(name))
            .map(|(name, value)| (name, value.clone()))
            .collect();
        headers.extend(message.headers().iter().map(|(name, value)| (name, value.clone())));
        *message.headers_mut() = headers;
        Ok(message)
    }
}

impl HasHeaderFilter for Endpoint {
    fn header_filter(&self) -> &dyn HeaderFilterStrategy {
        self.binding.header_filter()
    }
}
