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

//! The selector-addressed event bus.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tracing::{instrument, trace};

use crate::common::correlator::{Continuation, Correlator, ReplyResult};
use crate::common::registry::{Registration, Registry};
use crate::common::{
    CorrelationError, EventHandler, HandlerExecutionError, HandlerFailure, PendingReply,
    RegistrationHandle, RequestHandle,
};
use crate::message::{Address, Event};
use crate::selector::Selector;
use crate::traits::{ErrorSink, TracingErrorSink};

/// A publish/subscribe hub where interest is expressed with [`Selector`]s.
///
/// Publishing evaluates every live registration against the address, in
/// registration order, and runs each matching handler on the publishing task.
/// Handler errors and panics are caught per handler and reported to the bus
/// [`ErrorSink`]; they never reach the publisher and never stop the remaining
/// handlers.
///
/// `EventBus` is a cheap handle; clones share the same registrations.
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// bus.on(Selector::uri("/input/{destination}")?, |event| {
///     println!("destination = {:?}", event.header("destination"));
///     Ok(())
/// });
/// bus.publish("/input/test", Event::new("hello"));
/// ```
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    registry: Arc<Registry>,
    correlator: Correlator,
    error_sink: Arc<dyn ErrorSink>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_error_sink(TracingErrorSink)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("registrations", &self.registrations())
            .field("pending_requests", &self.pending_requests())
            .finish()
    }
}

impl EventBus {
    /// A bus that logs handler failures through `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus that reports handler failures to `sink`.
    pub fn with_error_sink(sink: impl ErrorSink) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: Arc::new(Registry::default()),
                correlator: Correlator::default(),
                error_sink: Arc::new(sink),
            }),
        }
    }

    /// Registers `handler` for every address `selector` matches.
    ///
    /// Selector bindings (URI placeholders, regex groups) are added to the
    /// delivered event as string headers.
    pub fn on<F>(&self, selector: Selector, handler: F) -> RegistrationHandle
    where
        F: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(selector, Arc::new(handler), false)
    }

    /// Registers `handler` for the first matching event only.
    ///
    /// Concurrent publishes race for the single delivery; exactly one wins.
    pub fn once<F>(&self, selector: Selector, handler: F) -> RegistrationHandle
    where
        F: Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(selector, Arc::new(handler), true)
    }

    fn register(&self, selector: Selector, handler: EventHandler, single_shot: bool) -> RegistrationHandle {
        self.inner.registry.register(selector, handler, single_shot)
    }

    /// Cancels a registration. Same as [`RegistrationHandle::cancel`].
    pub fn cancel(&self, handle: &RegistrationHandle) -> bool {
        handle.cancel()
    }

    /// Delivers `event` to every live registration matching `address`.
    ///
    /// Returns how many handlers were invoked. Publishing to an address
    /// nobody listens on is not an error.
    pub fn publish(&self, address: impl Into<Address>, event: Event) -> usize {
        self.dispatch(&address.into(), &event)
    }

    #[instrument(skip(self, event), fields(address = %address, event = %event.id()))]
    fn dispatch(&self, address: &Address, event: &Event) -> usize {
        let snapshot = self.inner.registry.snapshot();
        let mut delivered = 0;

        for registration in snapshot.iter() {
            if !registration.is_live() {
                continue;
            }
            let bindings = match panic::catch_unwind(AssertUnwindSafe(|| {
                registration.selector().select(address)
            })) {
                Ok(Some(bindings)) => bindings,
                Ok(None) => continue,
                Err(panic) => {
                    self.report_failure(registration, address, event, HandlerFailure::from_panic(&*panic));
                    continue;
                }
            };
            if !registration.claim() {
                continue;
            }
            if registration.is_single_shot() {
                self.inner.registry.remove(registration.id());
            }

            let delivery = if bindings.is_empty() {
                event.clone()
            } else {
                event.with_bindings(&bindings)
            };
            delivered += 1;
            trace!(registration = %registration.id(), "delivering");

            let handler = registration.handler();
            match panic::catch_unwind(AssertUnwindSafe(|| handler(delivery))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    self.report_failure(registration, address, event, HandlerFailure::Error(error));
                }
                Err(panic) => {
                    self.report_failure(registration, address, event, HandlerFailure::from_panic(&*panic));
                }
            }
        }

        if delivered == 0 {
            trace!("no registration matched");
        }
        delivered
    }

    /// Publishes `event` to `address` and waits for one reply.
    ///
    /// A reply address is generated unless `event` already carries one. The
    /// returned [`PendingReply`] resolves to the first event published to
    /// that address, or to a timeout error once `timeout` elapses; later
    /// replies are dropped.
    ///
    /// # Errors
    ///
    /// Fails without publishing when called outside a Tokio runtime, or when
    /// another request is still waiting on the event's preset reply address.
    #[instrument(skip_all, fields(event = %event.id()))]
    pub fn request(
        &self,
        address: impl Into<Address>,
        event: Event,
        timeout: Duration,
    ) -> Result<PendingReply, CorrelationError> {
        let (continuation, receiver) = PendingReply::channel();
        let slot = self
            .inner
            .correlator
            .begin(self, address.into(), event, timeout, continuation)?;
        Ok(PendingReply::new(slot, receiver))
    }

    /// Like [`request`](Self::request), but resumes `on_reply` instead of a future.
    ///
    /// `on_reply` runs exactly once with the reply or the timeout error, on
    /// whichever task publishes the reply or on the timer task. It does not run
    /// if the request is canceled.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request).
    #[instrument(skip_all, fields(event = %event.id()))]
    pub fn request_with<F>(
        &self,
        address: impl Into<Address>,
        event: Event,
        timeout: Duration,
        on_reply: F,
    ) -> Result<RequestHandle, CorrelationError>
    where
        F: FnOnce(ReplyResult) + Send + 'static,
    {
        let slot = self.inner.correlator.begin(
            self,
            address.into(),
            event,
            timeout,
            Continuation::Callback(Box::new(on_reply)),
        )?;
        Ok(RequestHandle::new(slot))
    }

    /// Hands `error` to the bus error sink.
    pub fn report(&self, error: HandlerExecutionError) {
        self.inner.error_sink.report(error);
    }

    /// Number of registrations currently installed, reply registrations included.
    #[must_use]
    pub fn registrations(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of requests still waiting for a reply.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.inner.correlator.outstanding()
    }

    /// Cancels every registration on this bus.
    pub fn clear(&self) {
        self.inner.registry.clear();
    }

    fn report_failure(
        &self,
        registration: &Registration,
        address: &Address,
        event: &Event,
        cause: HandlerFailure,
    ) {
        self.report(HandlerExecutionError::new(
            Some(registration.id()),
            Some(address.clone()),
            event.id().clone(),
            cause,
        ));
    }
}
