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

//! The registration list shared by publishers and (un)registering callers.
//!
//! Publishers read an immutable snapshot (`Arc<Vec<_>>`) and never hold the
//! lock while dispatching. Writers take the lock only long enough to swap in a
//! rebuilt list, so a publish never observes a half-applied change.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::trace;

use crate::common::EventHandler;
use crate::selector::Selector;

/// Identifies one registration on one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationId(u64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg-{}", self.0)
    }
}

pub(crate) struct Registration {
    id: RegistrationId,
    selector: Selector,
    handler: EventHandler,
    single_shot: bool,
    live: AtomicBool,
}

impl Registration {
    pub(crate) const fn id(&self) -> RegistrationId {
        self.id
    }

    pub(crate) const fn selector(&self) -> &Selector {
        &self.selector
    }

    pub(crate) const fn handler(&self) -> &EventHandler {
        &self.handler
    }

    pub(crate) const fn is_single_shot(&self) -> bool {
        self.single_shot
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Claims the right to deliver one event.
    ///
    /// Single-shot registrations can be claimed once across all threads.
    pub(crate) fn claim(&self) -> bool {
        if self.single_shot {
            self.live
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        } else {
            self.is_live()
        }
    }

    /// Stops future deliveries. Returns `true` for the call that flipped the flag.
    fn retire(&self) -> bool {
        self.live.swap(false, Ordering::AcqRel)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("selector", &self.selector)
            .field("single_shot", &self.single_shot)
            .field("live", &self.is_live())
            .finish_non_exhaustive()
    }
}

type Snapshot = Arc<Vec<Arc<Registration>>>;

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: RwLock<Snapshot>,
    next_id: AtomicU64,
}

impl Registry {
    pub(crate) fn register(
        self: &Arc<Self>,
        selector: Selector,
        handler: EventHandler,
        single_shot: bool,
    ) -> RegistrationHandle {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registration = Arc::new(Registration {
            id,
            selector,
            handler,
            single_shot,
            live: AtomicBool::new(true),
        });

        {
            let mut entries = self.entries.write();
            let mut next = Vec::with_capacity(entries.len() + 1);
            next.extend(entries.iter().cloned());
            next.push(Arc::clone(&registration));
            *entries = Arc::new(next);
        }
        trace!(registration = %id, selector = %registration.selector, single_shot, "registered");

        RegistrationHandle {
            registration,
            registry: Arc::downgrade(self),
        }
    }

    /// Drops `id` from the list. Returns whether it was present.
    pub(crate) fn remove(&self, id: RegistrationId) -> bool {
        let mut entries = self.entries.write();
        if !entries.iter().any(|entry| entry.id == id) {
            return false;
        }
        let next: Vec<_> = entries.iter().filter(|entry| entry.id != id).cloned().collect();
        *entries = Arc::new(next);
        trace!(registration = %id, "removed");
        true
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.entries.read().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Retires and drops every registration.
    pub(crate) fn clear(&self) {
        let mut entries = self.entries.write();
        for entry in entries.iter() {
            entry.retire();
        }
        *entries = Arc::new(Vec::new());
    }
}

/// The caller's side of a registration.
///
/// Cancelling is idempotent and takes effect immediately: once
/// [`cancel`](Self::cancel) returns, no new delivery to this registration
/// starts. A delivery already running is allowed to finish. Dropping the
/// handle does *not* cancel the registration.
#[derive(Debug, Clone)]
pub struct RegistrationHandle {
    registration: Arc<Registration>,
    registry: Weak<Registry>,
}

impl RegistrationHandle {
    /// The registration id.
    #[must_use]
    pub fn id(&self) -> RegistrationId {
        self.registration.id
    }

    /// Whether the registration can still receive events.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.registration.is_live()
    }

    /// The selector this registration was made with.
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.registration.selector
    }

    /// Stops deliveries and removes the registration from its bus.
    ///
    /// Returns `true` if this call did the cancelling, `false` if the
    /// registration was already cancelled or consumed.
    pub fn cancel(&self) -> bool {
        let cancelled = self.registration.retire();
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.registration.id);
        }
        cancelled
    }
}
