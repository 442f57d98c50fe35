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

//! Request/reply correlation over single-shot reply registrations.
//!
//! Each outstanding request owns a [`ReplySlot`] that moves from `Pending` to
//! exactly one terminal state. The move is a compare-and-swap, so whichever of
//! the reply, the timer or the caller gets there first wins, and everything
//! after it is a no-op. The winner tears down the timer and the reply
//! registration, removes the slot from the pending table and resumes the
//! caller (cancellation resumes nobody).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::common::{
    CorrelationError, EventBus, RegistrationHandle, RequestError, RequestTimeoutError,
};
use crate::message::{Address, Event};
use crate::selector::Selector;

/// What a request resolves to: the reply event, or why there is none.
pub type ReplyResult = Result<Event, RequestError>;

/// Lifecycle of one outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestState {
    /// Waiting for a reply.
    Pending = 0,
    /// A reply arrived and was delivered.
    Fulfilled = 1,
    /// The timeout elapsed first; the caller received a timeout error.
    TimedOut = 2,
    /// The caller gave up; nobody was resumed.
    Canceled = 3,
}

impl RequestState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Fulfilled,
            2 => Self::TimedOut,
            _ => Self::Canceled,
        }
    }

    /// Whether the request has resolved.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::TimedOut => "timed out",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

pub(crate) enum Continuation {
    Channel(oneshot::Sender<ReplyResult>),
    Callback(Box<dyn FnOnce(ReplyResult) + Send + 'static>),
}

impl Continuation {
    fn resume(self, outcome: ReplyResult) {
        match self {
            // The receiver may already be gone; nothing to resume then.
            Self::Channel(sender) => {
                let _ = sender.send(outcome);
            }
            Self::Callback(callback) => callback(outcome),
        }
    }
}

type PendingTable = DashMap<Address, Arc<ReplySlot>>;

pub(crate) struct ReplySlot {
    reply_to: Address,
    state: AtomicU8,
    continuation: Mutex<Option<Continuation>>,
    registration: OnceLock<RegistrationHandle>,
    timer: CancellationToken,
    table: Weak<PendingTable>,
}

impl ReplySlot {
    fn state(&self) -> RequestState {
        RequestState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Moves the slot out of `Pending`. Returns `false` if it had already left.
    fn settle(self: &Arc<Self>, to: RequestState, outcome: Option<ReplyResult>) -> bool {
        if self
            .state
            .compare_exchange(
                RequestState::Pending as u8,
                to as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        self.timer.cancel();
        if let Some(registration) = self.registration.get() {
            registration.cancel();
        }
        if let Some(table) = self.table.upgrade() {
            table.remove_if(&self.reply_to, |_, slot| Arc::ptr_eq(slot, self));
        }
        trace!(reply_to = %self.reply_to, state = %to, "request settled");

        let continuation = self.continuation.lock().take();
        if let (Some(continuation), Some(outcome)) = (continuation, outcome) {
            continuation.resume(outcome);
        }
        true
    }
}

impl fmt::Debug for ReplySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplySlot")
            .field("reply_to", &self.reply_to)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Tracks outstanding requests for one bus.
#[derive(Debug, Default)]
pub(crate) struct Correlator {
    pending: Arc<PendingTable>,
}

impl Correlator {
    pub(crate) fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Installs the reply registration and timer for `event`, then publishes it.
    ///
    /// The reply registration is live before the request is published, so a
    /// handler that replies synchronously is still heard.
    pub(crate) fn begin(
        &self,
        bus: &EventBus,
        address: Address,
        event: Event,
        timeout: Duration,
        continuation: Continuation,
    ) -> Result<Arc<ReplySlot>, CorrelationError> {
        let runtime = Handle::try_current().map_err(|_| CorrelationError::NoRuntime)?;
        let reply_to = event.reply_to().cloned().unwrap_or_else(Address::reply);
        let selector = Selector::exact(reply_to.clone())?;

        let slot = Arc::new(ReplySlot {
            reply_to: reply_to.clone(),
            state: AtomicU8::new(RequestState::Pending as u8),
            continuation: Mutex::new(Some(continuation)),
            registration: OnceLock::new(),
            timer: CancellationToken::new(),
            table: Arc::downgrade(&self.pending),
        });

        match self.pending.entry(reply_to.clone()) {
            Entry::Occupied(_) => return Err(CorrelationError::ReplyAddressInUse(reply_to)),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&slot));
            }
        }

        let listener = Arc::downgrade(&slot);
        let registration = bus.once(selector, move |reply| {
            if let Some(slot) = listener.upgrade() {
                slot.settle(RequestState::Fulfilled, Some(Ok(reply)));
            }
            Ok(())
        });
        // The slot is brand new, so the cell is empty.
        let _ = slot.registration.set(registration);

        let timer = Arc::clone(&slot);
        let timed_out = RequestTimeoutError::new(address.clone(), reply_to.clone(), timeout);
        runtime.spawn(async move {
            tokio::select! {
                () = timer.timer.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    if timer.settle(RequestState::TimedOut, Some(Err(timed_out.into()))) {
                        debug!(reply_to = %timer.reply_to, ?timeout, "request timed out");
                    }
                }
            }
        });

        bus.publish(address, event.with_reply_to(reply_to));
        Ok(slot)
    }
}

/// An outstanding request, resolved by awaiting it.
///
/// Resolves to the reply event, or to [`RequestError::Timeout`] once the
/// request window elapses. Dropping an unresolved `PendingReply` cancels the
/// request.
#[derive(Debug)]
pub struct PendingReply {
    slot: Arc<ReplySlot>,
    receiver: oneshot::Receiver<ReplyResult>,
}

impl PendingReply {
    pub(crate) fn channel() -> (Continuation, oneshot::Receiver<ReplyResult>) {
        let (sender, receiver) = oneshot::channel();
        (Continuation::Channel(sender), receiver)
    }

    pub(crate) const fn new(slot: Arc<ReplySlot>, receiver: oneshot::Receiver<ReplyResult>) -> Self {
        Self { slot, receiver }
    }

    /// The address the reply is expected on.
    #[must_use]
    pub fn reply_to(&self) -> &Address {
        &self.slot.reply_to
    }

    /// Where the request currently stands.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.slot.state()
    }

    /// Gives up on the reply.
    ///
    /// Returns `true` if the request was still pending. Awaiting a canceled
    /// request yields [`RequestError::Abandoned`].
    pub fn cancel(&self) -> bool {
        self.slot.settle(RequestState::Canceled, None)
    }
}

impl Future for PendingReply {
    type Output = ReplyResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RequestError::Abandoned)))
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.slot.settle(RequestState::Canceled, None);
    }
}

/// An outstanding request whose reply goes to a callback.
///
/// Unlike [`PendingReply`], dropping the handle leaves the request running.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    slot: Arc<ReplySlot>,
}

impl RequestHandle {
    pub(crate) const fn new(slot: Arc<ReplySlot>) -> Self {
        Self { slot }
    }

    /// The address the reply is expected on.
    #[must_use]
    pub fn reply_to(&self) -> &Address {
        &self.slot.reply_to
    }

    /// Where the request currently stands.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.slot.state()
    }

    /// Gives up on the reply without invoking the callback.
    pub fn cancel(&self) -> bool {
        self.slot.settle(RequestState::Canceled, None)
    }
}
