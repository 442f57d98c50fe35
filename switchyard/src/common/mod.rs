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
pub use config::{BindingConfig, HeaderConfig, SwitchyardConfig, TimeoutConfig, CONFIG};
pub use consumer::Consumer;
pub use endpoint::{Endpoint, Outcome};
pub use error::{
    ConfigError, ConversionError, ExchangeError, InvalidAddressSyntaxError, SetupError,
};
pub use exchange::{Exchange, ExchangePattern};
pub use switchyard::Switchyard;

// --- Submodules ---

/// Configuration loading and validation.
pub(crate) mod config;
/// Defines the [`Consumer`] handle and its delivery task.
pub(crate) mod consumer;
/// Defines the [`Endpoint`] facade.
mod endpoint;
/// Error types for endpoints and exchanges.
mod error;
/// Defines [`Exchange`].
mod exchange;
/// Defines the [`Switchyard`] entry point.
mod switchyard;
