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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use switchyard_core::prelude::*;
use switchyard_test::prelude::*;
use tokio::sync::Barrier;

use crate::setup::*;

mod setup;

/// Replies to every request on `address` by echoing the payload.
fn echo(bus: &EventBus, address: &str) -> anyhow::Result<RegistrationHandle> {
    let replier = bus.clone();
    Ok(bus.on(Selector::exact(address)?, move |event| {
        if let Some(reply_to) = event.reply_to() {
            replier.publish(reply_to.clone(), Event::new(event.payload().clone()));
        }
        Ok(())
    }))
}

#[switchyard_test]
async fn test_synchronous_reply_is_not_lost() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();
    echo(&bus, "echo")?;

    let pending = bus.request("echo", Event::new("ping"), Duration::from_secs(5))?;
    // The handler replied during publish, before we got the handle back.
    assert_eq!(pending.state(), RequestState::Fulfilled);

    let reply = pending.await?;
    assert_eq!(reply.payload().as_text(), Some("ping"));
    assert_eq!(bus.pending_requests(), 0);
    assert_eq!(bus.registrations(), 1, "only the echo registration remains");
    Ok(())
}

#[switchyard_test]
async fn test_reply_from_another_task() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();
    let replier = bus.clone();
    bus.on(Selector::exact("slow")?, move |event| {
        let replier = replier.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if let Some(reply_to) = event.reply_to() {
                replier.publish(reply_to.clone(), Event::new("done"));
            }
        });
        Ok(())
    });

    let pending = bus.request("slow", Event::new("work"), Duration::from_secs(5))?;
    assert_eq!(pending.state(), RequestState::Pending);
    assert_eq!(bus.pending_requests(), 1);

    let reply = pending.await?;
    assert_eq!(reply.payload().as_text(), Some("done"));
    assert_eq!(bus.pending_requests(), 0);
    Ok(())
}

#[switchyard_test]
async fn test_at_most_once_with_simultaneous_replies() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let done_tx = Arc::new(Mutex::new(Some(done_tx)));

    let handle = {
        let calls = Arc::clone(&calls);
        let received = Arc::clone(&received);
        bus.request_with("nobody", Event::new("q"), Duration::from_secs(5), move |outcome| {
            calls.fetch_add(1, Ordering::SeqCst);
            received.lock().push(outcome.map(|event| event.payload().as_text().map(str::to_string)));
            if let Some(done) = done_tx.lock().take() {
                let _ = done.send(());
            }
        })?
    };
    let reply_to = handle.reply_to().clone();

    let barrier = Arc::new(Barrier::new(3));
    let publishers: Vec<_> = (0..3)
        .map(|n| {
            let bus = bus.clone();
            let reply_to = reply_to.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                bus.publish(reply_to, Event::new(format!("reply-{n}")))
            })
        })
        .collect();

    let mut delivered = 0;
    for publisher in publishers {
        delivered += publisher.await?;
    }
    done_rx.await?;

    assert_eq!(delivered, 1, "only one publish reaches the reply registration");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(received.lock()[0], Ok(Some(_))));
    assert_eq!(handle.state(), RequestState::Fulfilled);
    assert_eq!(bus.registrations(), 0);
    assert_eq!(bus.pending_requests(), 0);
    Ok(())
}

#[switchyard_test]
async fn test_timeout_fires_once_and_late_reply_is_dropped() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let outcome = Arc::new(Mutex::new(None));

    let handle = {
        let calls = Arc::clone(&calls);
        let outcome = Arc::clone(&outcome);
        bus.request_with("nobody", Event::new("q"), Duration::from_millis(30), move |result| {
            calls.fetch_add(1, Ordering::SeqCst);
            *outcome.lock() = Some(result);
        })?
    };
    let reply_to = handle.reply_to().clone();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.state(), RequestState::TimedOut);
    assert_eq!(bus.registrations(), 0, "timeout removes the reply registration");
    assert_eq!(bus.pending_requests(), 0);

    assert_eq!(bus.publish(reply_to.clone(), Event::new("late")), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let guard = outcome.lock();
    match guard.as_ref() {
        Some(Err(RequestError::Timeout(timeout))) => {
            assert_eq!(timeout.reply_to, reply_to);
            assert_eq!(timeout.address, Address::name("nobody"));
            assert_eq!(timeout.timeout, Duration::from_millis(30));
        }
        other => panic!("expected a timeout, got {other:?}"),
    }
    Ok(())
}

#[switchyard_test]
async fn test_awaited_request_times_out() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();

    let result = bus
        .request("nobody", Event::new("q"), Duration::from_millis(20))?
        .await;

    assert!(matches!(result, Err(RequestError::Timeout(_))));
    assert_eq!(bus.registrations(), 0);
    Ok(())
}

#[switchyard_test]
async fn test_cancelled_request_resumes_nobody() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let handle = {
        let calls = Arc::clone(&calls);
        bus.request_with("nobody", Event::new("q"), Duration::from_millis(30), move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        })?
    };
    assert!(handle.cancel());
    assert!(!handle.cancel());
    assert_eq!(bus.registrations(), 0);

    bus.publish(handle.reply_to().clone(), Event::new("late"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(handle.state(), RequestState::Canceled);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    Ok(())
}

#[switchyard_test]
async fn test_dropping_a_pending_reply_cancels_it() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();

    let pending = bus.request("nobody", Event::new("q"), Duration::from_secs(5))?;
    assert_eq!(bus.pending_requests(), 1);
    drop(pending);

    assert_eq!(bus.pending_requests(), 0);
    assert_eq!(bus.registrations(), 0);
    Ok(())
}

#[switchyard_test]
async fn test_preset_reply_address_is_honoured_and_exclusive() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();
    echo(&bus, "echo")?;
    let outstanding = bus.request(
        "nobody",
        Event::builder("q").reply_to("replies.mine").build(),
        Duration::from_secs(5),
    )?;
    assert_eq!(outstanding.reply_to(), &Address::name("replies.mine"));

    let clash = bus.request(
        "echo",
        Event::builder("q").reply_to("replies.mine").build(),
        Duration::from_secs(5),
    );
    assert!(matches!(clash, Err(CorrelationError::ReplyAddressInUse(_))));

    outstanding.cancel();
    let reply = bus
        .request(
            "echo",
            Event::builder("again").reply_to("replies.mine").build(),
            Duration::from_secs(5),
        )?
        .await?;
    assert_eq!(reply.payload().as_text(), Some("again"));
    Ok(())
}

#[switchyard_test]
async fn test_generated_reply_addresses_are_unique() -> anyhow::Result<()> {
    initialize_tracing();
    let bus = EventBus::new();
    let first = bus.request("nobody", Event::new("a"), Duration::from_secs(5))?;
    let second = bus.request("nobody", Event::new("b"), Duration::from_secs(5))?;

    assert_ne!(first.reply_to(), second.reply_to());
    assert_eq!(bus.pending_requests(), 2);
    Ok(())
}
