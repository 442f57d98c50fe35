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

//! # Switchyard Core
//!
//! The in-process half of switchyard: a selector-addressed event bus with
//! correlated request/reply.
//!
//! ## Key Concepts
//!
//! - **Events (`Event`)**: immutable envelopes with an id, an optional key and
//!   reply address, ordered headers and a payload.
//! - **Addresses and selectors**: events are published to an `Address`;
//!   handlers register interest with a `Selector` (exact, URI template, type,
//!   regex, predicate, set or everything).
//! - **Bus (`EventBus`)**: delivers each publish to every live matching
//!   registration, in registration order, isolating handler failures.
//! - **Requests**: `EventBus::request` installs a single-shot reply
//!   registration, publishes, and resolves exactly once with the reply or a
//!   timeout.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard_core::prelude::*;
//!
//! let bus = EventBus::new();
//! bus.on(Selector::exact("echo")?, {
//!     let bus = bus.clone();
//!     move |event| {
//!         if let Some(reply_to) = event.reply_to() {
//!             bus.publish(reply_to.clone(), Event::new(event.payload().clone()));
//!         }
//!         Ok(())
//!     }
//! });
//! let reply = bus.request("echo", Event::new("ping"), Duration::from_secs(1))?.await?;
//! ```

/// Bus, registry, correlator and errors.
pub(crate) mod common;

/// Events, addresses, headers and payloads.
pub(crate) mod message;

/// Address patterns.
pub(crate) mod selector;

/// Extension points.
pub(crate) mod traits;

static_assertions::assert_impl_all!(EventBus: Send, Sync, Clone);
static_assertions::assert_impl_all!(Event: Send, Sync, Clone);
static_assertions::assert_impl_all!(Selector: Send, Sync, Clone);
static_assertions::assert_impl_all!(PendingReply: Send, Sync, Unpin);

pub use common::{
    CorrelationError, EventBus, EventHandler, HandlerExecutionError, HandlerFailure,
    InvalidSelectorError, PendingReply, RegistrationHandle, RegistrationId, ReplyResult,
    RequestError, RequestHandle, RequestState, RequestTimeoutError,
};
pub use message::{
    Address, Event, EventBuilder, EventId, Failure, Headers, Payload, PayloadDecodeError, TypeTag,
};
pub use selector::{Bindings, RegexPattern, Selector, SelectorKind, UriTemplate};
pub use traits::{ErrorSink, TracingErrorSink};

/// Re-exports for `use switchyard_core::prelude::*`.
pub mod prelude {
    pub use crate::common::{
        CorrelationError, EventBus, HandlerExecutionError, InvalidSelectorError, PendingReply,
        RegistrationHandle, RequestError, RequestHandle, RequestState, RequestTimeoutError,
    };
    pub use crate::message::{Address, Event, Failure, Headers, Payload, TypeTag};
    pub use crate::selector::Selector;
    pub use crate::traits::{ErrorSink, TracingErrorSink};
}
