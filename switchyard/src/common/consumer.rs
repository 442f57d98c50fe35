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

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use switchyard_core::{
    Address, Event, EventBus, Failure, HandlerExecutionError, HandlerFailure, RegistrationHandle,
    RegistrationId,
};
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace};

use crate::binding::EventBinding;
use crate::traits::MessageProcessor;

/// A running consumer created by [`Endpoint::consume`](crate::common::Endpoint::consume).
///
/// Dropping a consumer cancels its registration; deliveries already running
/// finish in the background. Use [`shutdown`](Self::shutdown) to also wait
/// for them.
#[derive(Debug)]
pub struct Consumer {
    address: String,
    registration: RegistrationHandle,
    tracker: TaskTracker,
}

impl Consumer {
    pub(crate) const fn new(address: String, registration: RegistrationHandle, tracker: TaskTracker) -> Self {
        Self {
            address,
            registration,
            tracker,
        }
    }

    /// The endpoint address this consumer listens on.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The bus registration backing this consumer.
    #[must_use]
    pub fn registration_id(&self) -> RegistrationId {
        self.registration.id()
    }

    /// Whether new deliveries are still accepted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.registration.is_live()
    }

    /// Deliveries currently being processed.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stops accepting deliveries and waits for the in-flight ones to finish.
    #[instrument(skip(self), fields(address = %self.address))]
    pub async fn shutdown(&self) {
        self.registration.cancel();
        self.tracker.close();
        trace!(in_flight = self.tracker.len(), "waiting for deliveries");
        self.tracker.wait().await;
        debug!("consumer stopped");
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.registration.cancel();
        self.tracker.close();
    }
}

/// Everything one delivery task needs.
#[derive(Clone)]
pub(crate) struct Delivery {
    bus: EventBus,
    binding: EventBinding,
    processor: Arc<dyn MessageProcessor>,
    registration: Arc<OnceLock<RegistrationId>>,
}

impl Delivery {
    pub(crate) fn new(
        bus: EventBus,
        binding: EventBinding,
        processor: Arc<dyn MessageProcessor>,
        registration: Arc<OnceLock<RegistrationId>>,
    ) -> Self {
        Self {
            bus,
            binding,
            processor,
            registration,
        }
    }

    /// Processes `event` and publishes the reply if one was asked for.
    pub(crate) async fn run(self, event: Event) {
        let request_id = event.id().clone();
        let reply_to = event.reply_to().cloned();
        let message = self.binding.to_message(event);

        let outcome = AssertUnwindSafe(self.processor.process(message))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(Ok(reply)) => self
                .binding
                .to_event(&reply)
                .map_err(|error| HandlerFailure::Error(error.into())),
            Ok(Err(error)) => Err(HandlerFailure::Error(error)),
            Err(panic) => Err(HandlerFailure::from_panic(&*panic)),
        };

        let reply = match result {
            Ok(reply) => reply.to_builder(),
            Err(cause) => {
                let failure = match &cause {
                    HandlerFailure::Error(error) => Failure::from_error(error),
                    HandlerFailure::Panicked(_) => Failure::new(cause.to_string()),
                };
                self.bus.report(HandlerExecutionError::new(
                    self.registration.get().copied(),
                    None,
                    request_id.clone(),
                    cause,
                ));
                Event::builder(failure)
            }
        };

        let Some(reply_to) = reply_to else {
            return;
        };
        let reply = reply
            .key(Address::name(request_id.as_str()))
            .maybe_reply_to(None)
            .build();
        trace!(request = %request_id, reply = %reply.id(), "replying");
        self.bus.publish(reply_to, reply);
    }
}
