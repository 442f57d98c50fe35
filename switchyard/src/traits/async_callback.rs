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

use crate::common::Exchange;

/// Completion callback for [`Endpoint::process`](crate::common::Endpoint::process).
///
/// `done` is called exactly once per exchange. `synchronously` is `true`
/// when the exchange completed before `process` returned.
pub trait AsyncCallback: Send + 'static {
    /// Receives the completed exchange.
    fn done(self, exchange: Exchange, synchronously: bool);
}

impl<F> AsyncCallback for F
where
    F: FnOnce(Exchange, bool) + Send + 'static,
{
    fn done(self, exchange: Exchange, synchronously: bool) {
        self(exchange, synchronously);
    }
}
