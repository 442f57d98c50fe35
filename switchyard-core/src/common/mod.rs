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
pub use bus::EventBus;
pub use correlator::{PendingReply, ReplyResult, RequestHandle, RequestState};
pub use error::{
    CorrelationError, HandlerExecutionError, HandlerFailure, InvalidSelectorError, RequestError,
    RequestTimeoutError,
};
pub use registry::{RegistrationHandle, RegistrationId};
pub use types::*;

// --- Submodules ---

/// Defines the [`EventBus`].
mod bus;
/// Request/reply correlation.
mod correlator;
/// Error types for selectors, dispatch and requests.
mod error;
/// The registration list behind the bus.
mod registry;
/// Shared type aliases.
mod types;
