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

use tracing::error;

use crate::common::HandlerExecutionError;

/// Receives handler failures the bus caught during dispatch.
///
/// Sinks are called on the publishing task and must not block.
pub trait ErrorSink: Send + Sync + 'static {
    /// Records one failure.
    fn report(&self, error: HandlerExecutionError);
}

/// Logs every failure at `error` level. This is the default sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, failure: HandlerExecutionError) {
        error!(
            registration = ?failure.registration.map(|id| id.to_string()),
            address = ?failure.address.as_ref().map(ToString::to_string),
            event = %failure.event_id,
            cause = %failure.cause,
            "handler failed"
        );
    }
}

impl<F> ErrorSink for F
where
    F: Fn(HandlerExecutionError) + Send + Sync + 'static,
{
    fn report(&self, error: HandlerExecutionError) {
        self(error);
    }
}
