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
#![allow(dead_code)]

use std::sync::{Arc, Once};

use parking_lot::Mutex;
use switchyard_core::prelude::*;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Installs the global tracing subscriber once per test binary.
///
/// Output goes to `logs/core_tests.txt`; set `RUST_LOG` to narrow it.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "core_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        Box::leak(Box::new(guard));

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("trace")
                .add_directive("switchyard_core=trace".parse().unwrap())
                .add_directive("tokio=info".parse().unwrap())
        });

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// Collects every event a handler receives, tagged with a label.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<(&'static str, Event)>>>,
}

impl Recorder {
    /// A handler that records under `label` and succeeds.
    pub fn handler(&self, label: &'static str) -> impl Fn(Event) -> anyhow::Result<()> + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |event| {
            seen.lock().push((label, event));
            Ok(())
        }
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.seen.lock().iter().map(|(label, _)| *label).collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.seen.lock().iter().map(|(_, event)| event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }
}

/// An error sink that keeps everything it receives.
#[derive(Clone, Default)]
pub struct CollectingSink {
    errors: Arc<Mutex<Vec<HandlerExecutionError>>>,
}

impl CollectingSink {
    pub fn len(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.lock().iter().map(ToString::to_string).collect()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, error: HandlerExecutionError) {
        self.errors.lock().push(error);
    }
}
