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

use std::future::Future;

use async_trait::async_trait;

use crate::message::Message;

/// Processes messages delivered to a consumer.
///
/// The returned message becomes the reply when the delivered event carried a
/// reply address; otherwise it is discarded. An error (or a panic) is reported
/// to the bus error sink and, when a reply is expected, sent back as a
/// failure payload.
///
/// Any `Fn(Message) -> impl Future<Output = anyhow::Result<Message>>` closure
/// is a processor.
#[async_trait]
pub trait MessageProcessor: Send + Sync + 'static {
    /// Handles one message.
    async fn process(&self, message: Message) -> anyhow::Result<Message>;
}

#[async_trait]
impl<F, Fut> MessageProcessor for F
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Message>> + Send + 'static,
{
    async fn process(&self, message: Message) -> anyhow::Result<Message> {
        self(message).await
    }
}
