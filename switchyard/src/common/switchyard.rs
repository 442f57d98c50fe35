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

use std::sync::Arc;

use switchyard_core::EventBus;
use tracing::{instrument, trace};

use crate::binding::EventBinding;
use crate::common::{Consumer, Endpoint, SetupError, SwitchyardConfig, CONFIG};
use crate::message::EndpointAddress;
use crate::traits::MessageProcessor;

/// Entry point: a bus, a binding built from configuration, and endpoints on them.
///
/// ```rust,ignore
/// use switchyard::prelude::*;
///
/// let yard = Switchyard::launch()?;
/// let _consumer = yard.consume("uri:/input/{destination}", |message: Message| async move {
///     Ok(message)
/// })?;
/// let reply = yard
///     .endpoint("uri:/input/test")?
///     .produce(Message::new("hello"), true)
///     .await?;
/// ```
///
/// Cloning is cheap; clones share the bus.
#[derive(Debug, Clone)]
pub struct Switchyard {
    bus: EventBus,
    binding: EventBinding,
    config: Arc<SwitchyardConfig>,
}

impl Switchyard {
    /// Starts with the global configuration ([`CONFIG`]) and a fresh bus.
    ///
    /// # Errors
    ///
    /// [`SetupError::Config`] if the configuration does not validate.
    pub fn launch() -> Result<Self, SetupError> {
        Self::with_config(CONFIG.clone())
    }

    /// Starts with `config` and a fresh bus.
    ///
    /// # Errors
    ///
    /// [`SetupError::Config`] if `config` does not validate.
    pub fn with_config(config: SwitchyardConfig) -> Result<Self, SetupError> {
        Self::with_bus(EventBus::new(), config)
    }

    /// Starts on an existing bus, for example one with a custom error sink.
    ///
    /// # Errors
    ///
    /// [`SetupError::Config`] if `config` does not validate.
    #[instrument(skip_all)]
    pub fn with_bus(bus: EventBus, config: SwitchyardConfig) -> Result<Self, SetupError> {
        let binding = EventBinding::from_config(&config)?;
        trace!(?config, "switchyard ready");
        Ok(Self {
            bus,
            binding,
            config: Arc::new(config),
        })
    }

    /// The shared bus.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The binding every endpoint uses.
    #[must_use]
    pub const fn binding(&self) -> &EventBinding {
        &self.binding
    }

    /// The configuration this switchyard was started with.
    #[must_use]
    pub fn config(&self) -> &SwitchyardConfig {
        &self.config
    }

    /// An endpoint for a `<prefix>:<payload>` address.
    ///
    /// # Errors
    ///
    /// [`SetupError`] if the address does not parse.
    pub fn endpoint(&self, address: &str) -> Result<Endpoint, SetupError> {
        let address = EndpointAddress::parse(address)?;
        Ok(Endpoint::new(
            address,
            self.bus.clone(),
            self.binding.clone(),
            self.config.request_timeout(),
        ))
    }

    /// Shorthand for `endpoint(address)?.consume(processor)`.
    ///
    /// # Errors
    ///
    /// [`SetupError`] if the address does not parse or there is no Tokio runtime.
    pub fn consume(&self, address: &str, processor: impl MessageProcessor) -> Result<Consumer, SetupError> {
        self.endpoint(address)?.consume(processor)
    }
}
