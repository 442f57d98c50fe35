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

//! Shared type aliases for the bus internals.

use std::sync::Arc;

use crate::message::Event;

/// A synchronous bus handler.
///
/// Handlers run on the publishing task, in registration order. An `Err` or a
/// panic is reported to the bus error sink and dispatch moves on to the next
/// registration.
pub type EventHandler = Arc<dyn Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static>;
