//! Admission history for a single sliding window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::quota::Quota;

/// Outcome of asking a window for its next free slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextSlot {
    /// An admission may happen now
    Free,
    /// An admission may happen once this instant is reached
    At(Instant),
    /// The window is full and its oldest entry expires beyond what the
    /// clock can represent
    Unbounded,
}

impl NextSlot {
    /// Whether an admission may happen now.
    pub fn is_free(&self) -> bool {
        matches!(self, NextSlot::Free)
    }
}

/// Timestamps of recent admissions, oldest first.
///
/// The window never reads the clock itself; every operation takes `now` so
/// callers decide which instant a decision is made at. An entry is live while
/// its age is strictly below the window duration and expired once its age
/// reaches it.
#[derive(Debug)]
pub struct AdmissionWindow {
    quota: Quota,
    history: VecDeque<Instant>,
}

impl AdmissionWindow {
    /// Create an empty window for the given quota.
    pub fn new(quota: Quota) -> Self {
        Self {
            quota,
            history: VecDeque::with_capacity(quota.limit() as usize),
        }
    }

    /// Get the quota this window enforces.
    pub fn quota(&self) -> Quota {
        self.quota
    }

    /// Drop every entry that has expired at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self, now: Instant) -> usize {
        let window = self.quota.window();
        let mut removed = 0;
        while let Some(&oldest) = self.history.front() {
            if age(oldest, now) < window {
                break;
            }
            self.history.pop_front();
            removed += 1;
        }
        removed
    }

    /// When the next admission may happen, as seen at `now`.
    pub fn next_slot(&self, now: Instant) -> NextSlot {
        let limit = self.quota.limit() as usize;
        let window = self.quota.window();
        let live = self.live(now);
        if live < limit {
            return NextSlot::Free;
        }
        // The entry that must expire is the one `limit` places from the newest.
        let blocking = self.history[self.history.len() - limit];
        match blocking.checked_add(window) {
            Some(ready_at) if ready_at <= now => NextSlot::Free,
            Some(ready_at) => NextSlot::At(ready_at),
            None => NextSlot::Unbounded,
        }
    }

    /// Record an admission at `now`.
    pub fn record(&mut self, now: Instant) {
        debug_assert!(self.history.back().map_or(true, |&last| last <= now));
        self.history.push_back(now);
    }

    /// Number of admissions still counting against the limit at `now`.
    pub fn live(&self, now: Instant) -> usize {
        let window = self.quota.window();
        self.history
            .iter()
            .rev()
            .take_while(|&&ts| age(ts, now) < window)
            .count()
    }

    /// Number of stored entries, including any not yet pruned.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

fn age(ts: Instant, now: Instant) -> Duration {
    now.saturating_duration_since(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(limit: u32, millis: u64) -> AdmissionWindow {
        AdmissionWindow::new(Quota::new(limit, Duration::from_millis(millis)).unwrap())
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_admits_until_limit() {
        let mut w = window(3, 1000);
        let t0 = Instant::now();

        for i in 0..3 {
            assert_eq!(w.next_slot(t0 + ms(i)), NextSlot::Free);
            w.record(t0 + ms(i));
        }

        assert_eq!(w.next_slot(t0 + ms(3)), NextSlot::At(t0 + ms(1000)));
        assert_eq!(w.live(t0 + ms(3)), 3);
    }

    #[test]
    fn test_entry_expires_exactly_at_window_boundary() {
        let mut w = window(1, 1000);
        let t0 = Instant::now();
        w.record(t0);

        // One millisecond short of the boundary the entry still counts.
        assert_eq!(w.live(t0 + ms(999)), 1);
        assert_eq!(w.prune(t0 + ms(999)), 0);
        assert_eq!(w.next_slot(t0 + ms(999)), NextSlot::At(t0 + ms(1000)));

        // At the boundary it has expired.
        assert_eq!(w.live(t0 + ms(1000)), 0);
        assert_eq!(w.next_slot(t0 + ms(1000)), NextSlot::Free);
        assert_eq!(w.prune(t0 + ms(1000)), 1);
        assert!(w.is_empty());
    }

    #[test]
    fn test_prune_removes_only_expired_prefix() {
        let mut w = window(5, 100);
        let t0 = Instant::now();
        w.record(t0);
        w.record(t0 + ms(10));
        w.record(t0 + ms(60));
        w.record(t0 + ms(90));

        assert_eq!(w.prune(t0 + ms(110)), 2);
        assert_eq!(w.len(), 2);
        assert_eq!(w.live(t0 + ms(110)), 2);
    }

    #[test]
    fn test_next_slot_uses_entry_blocking_newest_admission() {
        let mut w = window(2, 100);
        let t0 = Instant::now();
        w.record(t0);
        w.record(t0 + ms(40));
        w.record(t0 + ms(100));

        // Stale entry at t0 is still stored, the limit is reached by the
        // two live ones, so the slot opens when t0+40 expires.
        assert_eq!(w.len(), 3);
        assert_eq!(w.next_slot(t0 + ms(120)), NextSlot::At(t0 + ms(140)));
    }

    #[test]
    fn test_invariant_holds_for_greedy_sequence() {
        let mut w = window(3, 50);
        let t0 = Instant::now();
        let mut admitted = Vec::new();

        for step in 0..400u64 {
            let now = t0 + ms(step);
            w.prune(now);
            if w.next_slot(now).is_free() {
                w.record(now);
                admitted.push(step);
            }
        }

        for (i, &start) in admitted.iter().enumerate() {
            let in_window = admitted[i..].iter().take_while(|&&t| t < start + 50).count();
            assert!(in_window <= 3, "{} admissions in window starting at {}", in_window, start);
        }
        assert_eq!(admitted.len(), 24);
    }

    #[test]
    fn test_window_beyond_clock_range_does_not_overflow() {
        let quota = Quota::new(1, Duration::from_secs(u64::MAX)).unwrap();
        let mut w = AdmissionWindow::new(quota);
        let t0 = Instant::now();

        assert_eq!(w.next_slot(t0), NextSlot::Free);
        w.record(t0);

        assert_eq!(w.prune(t0 + ms(5)), 0);
        assert_eq!(w.live(t0 + ms(5)), 1);
        assert_eq!(w.next_slot(t0 + ms(5)), NextSlot::Unbounded);
    }
}
