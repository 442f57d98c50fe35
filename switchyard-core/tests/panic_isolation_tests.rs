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
//! Panicking handlers and predicates.
//!
//! These use `#[tokio::test]` because the switchyard test harness fails any
//! test during which a panic was raised, caught or not.

use switchyard_core::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test]
async fn test_panicking_handler_is_isolated() -> anyhow::Result<()> {
    initialize_tracing();
    let sink = CollectingSink::default();
    let bus = EventBus::with_error_sink(sink.clone());
    let recorder = Recorder::default();

    bus.on(Selector::All, |_| panic!("handler exploded"));
    bus.on(Selector::All, recorder.handler("survivor"));

    assert_eq!(bus.publish("anything", Event::new("x")), 2);
    assert_eq!(recorder.labels(), vec!["survivor"]);
    assert_eq!(sink.len(), 1);
    assert!(sink.messages()[0].contains("handler exploded"));

    // The bus keeps working afterwards.
    assert_eq!(bus.publish("anything", Event::new("y")), 2);
    assert_eq!(recorder.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_panicking_predicate_is_reported() -> anyhow::Result<()> {
    initialize_tracing();
    let sink = CollectingSink::default();
    let bus = EventBus::with_error_sink(sink.clone());
    let recorder = Recorder::default();

    bus.on(
        Selector::predicate(|_| panic!("predicate exploded")),
        recorder.handler("never"),
    );
    bus.on(Selector::All, recorder.handler("survivor"));

    assert_eq!(bus.publish("anything", Event::new("x")), 1);
    assert_eq!(recorder.labels(), vec!["survivor"]);
    assert!(sink.messages()[0].contains("predicate exploded"));
    Ok(())
}
