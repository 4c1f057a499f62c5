//! Sliding window admission limiter.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::quota::{Quota, TimeUnit};
use super::window::{AdmissionWindow, NextSlot};
use crate::error::Result;

/// Caps admissions at `limit` per trailing window, shared across threads and
/// tasks.
///
/// Callers that find the window full queue up and are admitted in arrival
/// order. Only the caller at the head of the queue waits for a timestamp to
/// expire; the lock is never held while anyone waits, so other callers can
/// still enqueue, give up, or use [`try_admit_now`](Self::try_admit_now).
///
/// Cloning is cheap and every clone shares the same window.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    /// Signalled whenever the head of the queue changes.
    changed: Notify,
}

struct State {
    window: AdmissionWindow,
    /// Tickets of queued callers, in arrival order.
    queue: VecDeque<u64>,
    next_ticket: u64,
}

impl State {
    fn is_head(&self, ticket: u64) -> bool {
        self.queue.front() == Some(&ticket)
    }
}

/// What a queued caller waits for before looking at the window again.
enum Wait {
    /// Someone ahead in the queue to leave
    Turn,
    /// The slot to open at this instant
    Until(Instant),
}

/// A caller's place in the queue. Dropping it before admission gives the
/// place up.
struct Ticket<'a> {
    shared: &'a Shared,
    id: u64,
    admitted: bool,
}

impl<'a> Ticket<'a> {
    fn take(shared: &'a Shared) -> Self {
        let mut state = shared.state.lock();
        let id = state.next_ticket;
        state.next_ticket += 1;
        state.queue.push_back(id);
        Self {
            shared,
            id,
            admitted: false,
        }
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if self.admitted {
            return;
        }
        let mut state = self.shared.state.lock();
        let was_head = state.is_head(self.id);
        state.queue.retain(|&t| t != self.id);
        if was_head && !state.queue.is_empty() {
            self.shared.changed.notify_waiters();
        }
    }
}

impl SlidingWindowLimiter {
    /// Create a limiter enforcing the given quota.
    pub fn new(quota: Quota) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    window: AdmissionWindow::new(quota),
                    queue: VecDeque::new(),
                    next_ticket: 0,
                }),
                changed: Notify::new(),
            }),
        }
    }

    /// Create a limiter allowing `limit` admissions per single `unit`.
    ///
    /// Fails for units finer than a millisecond and for a zero limit.
    pub fn per_unit(unit: TimeUnit, limit: u32) -> Result<Self> {
        Ok(Self::new(Quota::per_unit(unit, limit)?))
    }

    /// Block until admitted.
    ///
    /// Nothing can interrupt this wait, so it always returns `true`. Use
    /// [`admit_with`](Self::admit_with) for a wait that returns `false` when
    /// interrupted.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async runtime; use
    /// [`admit_async`](Self::admit_async) there.
    pub fn admit(&self) -> bool {
        self.admit_with(&CancellationToken::new())
    }

    /// Block until admitted or until `token` is cancelled.
    ///
    /// Returns `false` on cancellation, in which case nothing was recorded
    /// and the caller must not perform the gated action.
    ///
    /// # Panics
    ///
    /// Panics when called from within an async runtime; use
    /// [`admit_async`](Self::admit_async) there.
    pub fn admit_with(&self, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            return false;
        }
        if self.try_admit_now() {
            return true;
        }

        match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.admit_async(token)),
            Err(e) => {
                warn!(error = %e, "Failed to start runtime for blocking admission");
                false
            }
        }
    }

    /// Wait for admission from async code.
    ///
    /// Returns `false` if `token` is cancelled first. Dropping the returned
    /// future also gives up the caller's place in the queue.
    pub async fn admit_async(&self, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            return false;
        }

        let shared = &*self.shared;
        let mut ticket = Ticket::take(shared);

        loop {
            let notified = shared.changed.notified();
            tokio::pin!(notified);
            // Register before looking at the queue so a hand-over that lands
            // between the check and the wait still wakes us.
            notified.as_mut().enable();

            if token.is_cancelled() {
                debug!(ticket = ticket.id, "Admission cancelled");
                return false;
            }

            let wait = {
                let mut state = shared.state.lock();
                let now = Instant::now();
                state.window.prune(now);

                if !state.is_head(ticket.id) {
                    Wait::Turn
                } else {
                    match state.window.next_slot(now) {
                        NextSlot::Free => {
                            state.window.record(now);
                            state.queue.pop_front();
                            ticket.admitted = true;
                            if !state.queue.is_empty() {
                                shared.changed.notify_waiters();
                            }
                            trace!(ticket = ticket.id, in_window = state.window.len(), "Admitted");
                            return true;
                        }
                        NextSlot::At(ready_at) => {
                            debug!(
                                ticket = ticket.id,
                                wait = ?ready_at.saturating_duration_since(now),
                                waiting = state.queue.len(),
                                "Window full, waiting for a slot"
                            );
                            Wait::Until(ready_at)
                        }
                        NextSlot::Unbounded => {
                            debug!(
                                ticket = ticket.id,
                                waiting = state.queue.len(),
                                "Window full, no slot within clock range"
                            );
                            Wait::Turn
                        }
                    }
                }
            };

            let slot_opens = async {
                match wait {
                    Wait::Until(ready_at) => tokio::time::sleep_until(ready_at.into()).await,
                    Wait::Turn => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(ticket = ticket.id, "Admission cancelled");
                    return false;
                }
                _ = &mut notified => {}
                _ = slot_opens => {}
            }
        }
    }

    /// Admit only if a slot is free right now and nobody is queued.
    ///
    /// Never blocks.
    pub fn try_admit_now(&self) -> bool {
        let mut state = self.shared.state.lock();
        let now = Instant::now();
        state.window.prune(now);

        if !state.queue.is_empty() || !state.window.next_slot(now).is_free() {
            trace!(waiting = state.queue.len(), "Immediate admission refused");
            return false;
        }

        state.window.record(now);
        trace!(in_window = state.window.len(), "Admitted without waiting");
        true
    }

    /// Get the maximum admissions per window.
    pub fn limit(&self) -> u32 {
        self.shared.state.lock().window.quota().limit()
    }

    /// Get the window duration.
    pub fn window(&self) -> Duration {
        self.shared.state.lock().window.quota().window()
    }

    /// Number of admissions counting against the limit right now.
    pub fn admitted_in_window(&self) -> usize {
        self.shared.state.lock().window.live(Instant::now())
    }

    /// Number of admissions still available in the current window.
    pub fn remaining(&self) -> usize {
        let state = self.shared.state.lock();
        let limit = state.window.quota().limit() as usize;
        limit.saturating_sub(state.window.live(Instant::now()))
    }

    /// Number of callers currently queued for admission.
    pub fn waiting(&self) -> usize {
        self.shared.state.lock().queue.len()
    }
}

impl std::fmt::Debug for SlidingWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SlidingWindowLimiter")
            .field("quota", &state.window.quota())
            .field("stored", &state.window.len())
            .field("waiting", &state.queue.len())
            .finish()
    }
}
