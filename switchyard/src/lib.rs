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

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Switchyard
//!
//! Binds a message-processing pipeline to the selector-addressed event bus
//! of `switchyard-core`.
//!
//! ## Key Concepts
//!
//! - **Messages (`Message`)**: the pipeline envelope (headers plus body).
//!   Messages decoded from events are materialised lazily.
//! - **Binding (`EventBinding`)**: message/event translation with header
//!   filtering and namespacing; the event key and reply address travel as
//!   reserved headers.
//! - **Endpoint addresses**: `uri:`, `type:`/`class:`, `regex:` and
//!   `object:` addresses pick the selector a consumer registers with and the
//!   address a producer publishes to.
//! - **Endpoints (`Endpoint`)**: `produce` (fire-and-forget or correlated
//!   request/reply), callback-style `process`, and `consume`.
//! - **Configuration (`SwitchyardConfig`)**: TOML in XDG directories.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! let yard = Switchyard::launch()?;
//! let consumer = yard.consume("uri:/orders/{region}", |message: Message| async move {
//!     let region = message.header("bus.region");
//!     Ok(Message::new(format!("accepted in {region:?}")))
//! })?;
//! let outcome = yard.endpoint("uri:/orders/eu")?.produce(Message::new("order"), true).await?;
//! consumer.shutdown().await;
//! ```

/// Runtime pieces: configuration, endpoints, consumers, exchanges and errors.
pub(crate) mod common;

/// Message envelope and endpoint addresses.
pub(crate) mod message;

/// Message/event binding.
pub(crate) mod binding;

/// Extension points.
pub(crate) mod traits;

static_assertions::assert_impl_all!(Message: Send, Sync, Clone);
static_assertions::assert_impl_all!(Endpoint: Send, Sync, Clone);
static_assertions::assert_impl_all!(EventBinding: Send, Sync, Clone);
static_assertions::assert_impl_all!(Consumer: Send, Sync);

pub use binding::{DefaultHeaderFilter, EventBinding, EventProperty, HeaderNamespace};
pub use common::{
    BindingConfig, ConfigError, Consumer, ConversionError, Endpoint, Exchange, ExchangeError,
    ExchangePattern, HeaderConfig, InvalidAddressSyntaxError, Outcome, SetupError, Switchyard,
    SwitchyardConfig, TimeoutConfig, CONFIG,
};
pub use message::{EndpointAddress, Message, MessageId};
pub use traits::{AsyncCallback, HasHeaderFilter, HeaderFilterStrategy, MessageProcessor};

/// Re-exports for `use switchyard::prelude::*`.
///
/// Includes the `switchyard-core` prelude and `async_trait`.
pub mod prelude {
    pub use async_trait::async_trait;
    pub use switchyard_core::prelude::*;

    pub use crate::binding::{DefaultHeaderFilter, EventBinding, HeaderNamespace};
    pub use crate::common::{
        Consumer, ConversionError, Endpoint, Exchange, ExchangeError, ExchangePattern, Outcome,
        SetupError, Switchyard, SwitchyardConfig,
    };
    pub use crate::message::{EndpointAddress, Message};
    pub use crate::traits::{AsyncCallback, HasHeaderFilter, HeaderFilterStrategy, MessageProcessor};
}
