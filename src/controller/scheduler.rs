//! Timer queue on the tokio clock.
//!
//! Timers are data, not spawned tasks: the controller pops whatever is due
//! and handles it in due order. Under `tokio::time::pause()` this makes every
//! retry and burst deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use tokio::time::Instant;

/// Something the controller asked to be woken up for. Each variant carries
/// the token that was current when it was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    /// Detection probe for a detection epoch
    Probe { epoch: u64 },
    /// Restore normal speed for a session generation
    BurstEnd { session: u64 },
    /// Clear the "Synced" status if nothing replaced it
    ClearStatus { stamp: u64 },
    /// Periodic auto-sync tick for an auto-sync generation
    AutoSync { generation: u64 },
}

#[derive(Debug)]
struct Entry {
    due: Instant,
    seq: u64,
    timer: Timer,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

#[derive(Debug)]
pub struct Scheduler {
    now: Instant,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Entry>>,
}

impl Scheduler {
    pub fn new(now: Instant) -> Self {
        Self {
            now,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    /// Logical time: the due instant of the timer being handled, or the
    /// last observed wall time.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Move logical time forward to `now`. Never moves backwards.
    pub fn observe(&mut self, now: Instant) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn schedule(&mut self, delay: Duration, timer: Timer) -> Instant {
        let due = self.now + delay;
        self.next_seq += 1;
        self.queue.push(Reverse(Entry {
            due,
            seq: self.next_seq,
            timer,
        }));
        due
    }

    /// Drop every pending timer matching `predicate`; returns how many.
    pub fn cancel(&mut self, predicate: impl Fn(&Timer) -> bool) -> usize {
        let before = self.queue.len();
        self.queue.retain(|Reverse(entry)| !predicate(&entry.timer));
        before - self.queue.len()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse(entry)| entry.due)
    }

    /// Pop the earliest timer due at or before `until`, advancing logical
    /// time to its due instant.
    pub fn pop_due(&mut self, until: Instant) -> Option<Timer> {
        if self.next_due()? > until {
            return None;
        }
        let Reverse(entry) = self.queue.pop()?;
        self.observe(entry.due);
        Some(entry.timer)
    }

    pub fn pending(&self) -> Vec<Timer> {
        let mut entries: Vec<&Entry> = self.queue.iter().map(|Reverse(e)| e).collect();
        entries.sort();
        entries.into_iter().map(|e| e.timer).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
