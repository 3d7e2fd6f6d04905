//! Per-bulb runtime state shared between the decoder (change detection
//! + enqueue) and the pump task (drain + send).
//!
//! `spec.md` §3/§9: `lastReceived` and `queue` are touched by both the
//! decoder and the pump, so they live behind a short-lived lock;
//! `lastSent` is touched only by the pump itself and lives as a plain
//! local variable in `pump::run` (see that module), never behind a lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use wizbridge_core::SlotVector;

/// Bounded FIFO capacity; overflow evicts the oldest entry (`spec.md` §3).
pub const QUEUE_CAPACITY: usize = 10;

/// Maximum off-verification retries before giving up (`spec.md` §4.5).
pub const MAX_VERIFY_RETRIES: u8 = 3;

/// One pending slot vector plus its off-verification retry count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueEntry {
    pub vector: SlotVector,
    pub retry_count: u8,
}

/// The part of a bulb's runtime state touched from outside the pump
/// task: the change-detector's `lastReceived` cache and the pending
/// queue.
#[derive(Default)]
pub struct SharedState {
    pub last_received: SlotVector,
    pub queue: VecDeque<QueueEntry>,
}

impl SharedState {
    /// Push a new vector, evicting the oldest entry if the queue is
    /// full. Returns `true` if an entry was evicted.
    pub fn push(&mut self, entry: QueueEntry) -> bool {
        let evicted = if self.queue.len() >= QUEUE_CAPACITY {
            self.queue.pop_front();
            true
        } else {
            false
        };
        self.queue.push_back(entry);
        evicted
    }
}

/// `{queued, sent, dropped}` counters (`spec.md` §3), plus current
/// queue length for the stats tick (`spec.md` §4.9 / SPEC_FULL §4.9).
#[derive(Default)]
pub struct Stats {
    pub queued: AtomicU32,
    pub sent: AtomicU32,
    pub dropped: AtomicU32,
}

impl Stats {
    pub fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u32, u32, u32) {
        (
            self.queued.load(Ordering::Relaxed),
            self.sent.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
        )
    }
}
