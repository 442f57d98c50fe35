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

use serde_json::Value;

/// Decides which headers cross the message/event boundary.
///
/// Outbound rules run when a message becomes an event and see the message
/// header name. Inbound rules run when an event becomes a message and see the
/// event header name, before namespacing. The key and reply-address fields
/// are never offered to a filter.
pub trait HeaderFilterStrategy: Send + Sync + 'static {
    /// Whether a message header must be kept off the bus.
    fn denies_outbound(&self, name: &str, value: &Value) -> bool;

    /// Whether an event header must not be copied onto a message.
    fn denies_inbound(&self, name: &str, value: &Value) -> bool;
}

/// Implemented by components that carry a header filter.
pub trait HasHeaderFilter {
    /// The filter in effect.
    fn header_filter(&self) -> &dyn HeaderFilterStrategy;
}
