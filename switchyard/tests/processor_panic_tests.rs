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
//! Processors that panic. These run on plain Tokio tests: the test harness
//! macro fails any test in which a panic was raised, even a caught one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use switchyard::prelude::*;

async fn explode_later(_message: Message) -> anyhow::Result<Message> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    panic!("late failure");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_processor_replies_with_failure() -> anyhow::Result<()> {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let bus = EventBus::with_error_sink(move |error: HandlerExecutionError| {
        sink.lock().push(error.to_string());
    });
    let yard = Switchyard::with_bus(bus, SwitchyardConfig::default())?;

    let _consumer = yard.consume("object:fragile", |message: Message| async move {
        if message.body()?.as_text() == Some("boom") {
            panic!("processor exploded");
        }
        anyhow::Ok(message)
    })?;
    let endpoint = yard
        .endpoint("object:fragile")?
        .with_request_timeout(Duration::from_secs(5));

    match endpoint.produce(Message::new("boom"), true).await {
        Err(ExchangeError::Remote(failure)) => {
            assert!(failure.message().contains("processor exploded"), "{failure}");
        }
        other => panic!("expected a remote failure, got {other:?}"),
    }
    assert_eq!(failures.lock().len(), 1);

    let reply = endpoint
        .produce(Message::new("fine"), true)
        .await?
        .into_reply()
        .ok_or_else(|| anyhow!("expected a reply"))?;
    assert_eq!(reply.body()?.as_text(), Some("fine"), "the consumer survives the panic");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_processor_does_not_stall_shutdown() -> anyhow::Result<()> {
    let yard = Switchyard::with_config(SwitchyardConfig::default())?;
    let consumer = yard.consume("object:fragile", explode_later)?;

    yard.endpoint("object:fragile")?
        .produce(Message::new("x"), false)
        .await?;
    tokio::time::timeout(Duration::from_secs(5), consumer.shutdown()).await?;
    assert_eq!(consumer.in_flight(), 0);
    Ok(())
}
