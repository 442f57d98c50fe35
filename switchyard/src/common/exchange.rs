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

use crate::common::ExchangeError;
use crate::message::Message;

/// Whether an exchange expects a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangePattern {
    /// Fire and forget.
    InOnly,
    /// Request/reply.
    InOut,
}

/// One message passing through an endpoint, and what came of it.
#[derive(Debug)]
pub struct Exchange {
    pattern: ExchangePattern,
    input: Message,
    output: Option<Message>,
    failure: Option<ExchangeError>,
}

impl Exchange {
    /// A new exchange around `input`.
    #[must_use]
    pub const fn new(pattern: ExchangePattern, input: Message) -> Self {
        Self {
            pattern,
            input,
            output: None,
            failure: None,
        }
    }

    /// A fire-and-forget exchange.
    #[must_use]
    pub const fn in_only(input: Message) -> Self {
        Self::new(ExchangePattern::InOnly, input)
    }

    /// A request/reply exchange.
    #[must_use]
    pub const fn in_out(input: Message) -> Self {
        Self::new(ExchangePattern::InOut, input)
    }

    /// Whether a reply is expected.
    #[must_use]
    pub const fn pattern(&self) -> ExchangePattern {
        self.pattern
    }

    /// The message sent.
    #[must_use]
    pub const fn input(&self) -> &Message {
        &self.input
    }

    /// The reply, once an `InOut` exchange succeeded.
    #[must_use]
    pub const fn output(&self) -> Option<&Message> {
        self.output.as_ref()
    }

    /// Takes the reply out of the exchange.
    pub fn take_output(&mut self) -> Option<Message> {
        self.output.take()
    }

    /// Why the exchange failed, if it did.
    #[must_use]
    pub const fn failure(&self) -> Option<&ExchangeError> {
        self.failure.as_ref()
    }

    /// Whether a failure was recorded.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub(crate) fn set_output(&mut self, output: Message) {
        self.output = Some(output);
    }

    pub(crate) fn set_failure(&mut self, failure: ExchangeError) {
        self.failure = Some(failure);
    }
}
