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

//! The data that travels over the bus: events, addresses, headers and payloads.

pub use address::{Address, TypeTag};
pub use event::{Event, EventBuilder, EventId};
pub use headers::Headers;
pub use payload::{Failure, Payload, PayloadDecodeError};

mod address;
mod event;
mod headers;
mod payload;
