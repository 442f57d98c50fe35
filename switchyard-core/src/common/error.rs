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

//! Errors raised by selectors, dispatch and request/reply correlation.
//!
//! Setup-time errors ([`InvalidSelectorError`], [`CorrelationError`]) are
//! returned synchronously to the caller. Dispatch-time errors are isolated:
//! [`HandlerExecutionError`] goes to the bus error sink, and
//! [`RequestError`] resolves the one request it belongs to.

use std::time::Duration;

use derive_new::new;
use thiserror::Error;

use crate::common::RegistrationId;
use crate::message::{Address, EventId};

/// A selector pattern that cannot be used for matching.
#[derive(Debug, Error)]
pub enum InvalidSelectorError {
    /// Exact and set selectors need a non-empty address.
    #[error("selector address must not be empty")]
    EmptyAddress,
    /// A set selector without members would never match.
    #[error("set selector must contain at least one address")]
    EmptySet,
    /// The type name is blank or looks like a path.
    #[error("invalid type name `{0}`")]
    InvalidTypeName(String),
    /// The regular expression does not compile.
    #[error("invalid regular expression `{pattern}`: {source}")]
    InvalidRegex {
        /// The pattern as written.
        pattern: String,
        /// What the regex engine rejected.
        source: regex::Error,
    },
    /// The URI template is malformed.
    #[error("invalid uri template `{template}`: {reason}")]
    InvalidUriTemplate {
        /// The template as written.
        template: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// What went wrong inside a handler.
#[derive(Debug, Error)]
pub enum HandlerFailure {
    /// The handler returned an error.
    #[error(transparent)]
    Error(anyhow::Error),
    /// The handler (or a predicate selector) panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerFailure {
    /// Builds a failure from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }
}

/// A registered handler failed while an event was being delivered.
///
/// These never reach the publisher; the bus hands them to its
/// [`ErrorSink`](crate::traits::ErrorSink) and keeps dispatching.
#[derive(Debug, Error, new)]
#[error("handler failed on event {event_id}: {cause}")]
pub struct HandlerExecutionError {
    /// The registration whose handler failed, when known.
    pub registration: Option<RegistrationId>,
    /// The address the event was published to, when known.
    pub address: Option<Address>,
    /// The event being delivered.
    pub event_id: EventId,
    /// The failure itself.
    #[source]
    pub cause: HandlerFailure,
}

/// No reply arrived within the request window.
#[derive(Debug, Clone, Error, new)]
#[error("no reply on `{reply_to}` for request to `{address}` within {timeout:?}")]
pub struct RequestTimeoutError {
    /// Where the request was published.
    pub address: Address,
    /// Where the reply was expected.
    pub reply_to: Address,
    /// The window that elapsed.
    pub timeout: Duration,
}

/// How an outstanding request failed to produce a reply.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The timeout elapsed first.
    #[error(transparent)]
    Timeout(#[from] RequestTimeoutError),
    /// The request was torn down without resolving, e.g. its runtime shut down.
    #[error("request was abandoned before a reply arrived")]
    Abandoned,
}

/// A request could not be started.
#[derive(Debug, Error)]
pub enum CorrelationError {
    /// Another request is still waiting on this reply address.
    #[error("reply address `{0}` is already awaiting a reply")]
    ReplyAddressInUse(Address),
    /// The reply timer needs a Tokio runtime.
    #[error("requests must be issued from within a Tokio runtime")]
    NoRuntime,
    /// The preset reply address cannot be selected on.
    #[error(transparent)]
    InvalidReplyAddress(#[from] InvalidSelectorError),
}
