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
use switchyard::prelude::*;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Installs the global tracing subscriber once per test binary.
///
/// Output goes to `logs/switchyard_tests.txt`; set `RUST_LOG` to narrow it.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender =
            RollingFileAppender::new(Rotation::NEVER, "logs", "switchyard_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        Box::leak(Box::new(guard));

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("trace")
                .add_directive("switchyard=trace".parse().unwrap())
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

/// A switchyard on a fresh bus with the default configuration.
pub fn yard() -> Switchyard {
    Switchyard::with_config(SwitchyardConfig::default()).expect("default config is valid")
}

/// A switchyard whose bus reports handler failures into the returned list.
pub fn yard_with_sink() -> (Switchyard, Arc<Mutex<Vec<String>>>) {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&failures);
    let bus = EventBus::with_error_sink(move |error: HandlerExecutionError| {
        sink.lock().push(error.to_string());
    });
    let yard = Switchyard::with_bus(bus, SwitchyardConfig::default())
        .expect("default config is valid");
    (yard, failures)
}

/// The default binding.
pub fn binding() -> EventBinding {
    EventBinding::from_config(&SwitchyardConfig::default()).expect("default config is valid")
}

/// A binding that ships whole messages as structured payloads.
pub fn envelope_binding() -> EventBinding {
    let mut config = SwitchyardConfig::default();
    config.binding.transfer_envelope = true;
    EventBinding::from_config(&config).expect("config is valid")
}
