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

// --- Public Re-exports ---
pub use async_callback::AsyncCallback;
pub use header_filter::{HasHeaderFilter, HeaderFilterStrategy};
pub use message_processor::MessageProcessor;

// --- Submodules ---

/// Defines the [`AsyncCallback`] completion interface.
mod async_callback;
/// Defines [`HeaderFilterStrategy`] and [`HasHeaderFilter`].
mod header_filter;
/// Defines the [`MessageProcessor`] trait for consumers.
mod message_processor;
