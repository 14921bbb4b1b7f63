//! # Outbound Sync Queue
//!
//! Committed local events waiting for the remote channel. Entries are
//! `pending` until acked, retried with exponential backoff on failure,
//! and parked as `failed` once the attempt budget is spent — visible to
//! the operator, never dropped.

use shared_types::{EventEnvelope, EventId, SyncStatus};
use tracing::debug;

use crate::config::SyncConfig;

struct QueuedEvent {
    event: EventEnvelope,
    status: SyncStatus,
    attempts: u32,
    next_attempt_ms: u64,
}

/// FIFO of events awaiting a remote ack.
#[derive(Default)]
pub struct SyncQueue {
    entries: Vec<QueuedEvent>,
}

impl SyncQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a committed event. Duplicate ids are ignored.
    pub fn enqueue(&mut self, event: EventEnvelope) {
        if self.entries.iter().any(|entry| entry.event.id == event.id) {
            return;
        }
        debug!(event_id = %event.id, "event queued for sync");
        self.entries.push(QueuedEvent {
            event,
            status: SyncStatus::Pending,
            attempts: 0,
            next_attempt_ms: 0,
        });
    }

    /// Pending events whose retry delay has elapsed, oldest first.
    #[must_use]
    pub fn due(&self, now_ms: u64, limit: usize) -> Vec<EventEnvelope> {
        self.entries
            .iter()
            .filter(|entry| {
                entry.status == SyncStatus::Pending && entry.next_attempt_ms <= now_ms
            })
            .take(limit)
            .map(|entry| entry.event.clone())
            .collect()
    }

    /// Remove an acked event. Returns the number of attempts it took
    /// (the successful one included).
    pub fn mark_synced(&mut self, id: &EventId) -> Option<u32> {
        let index = self.entries.iter().position(|entry| entry.event.id == *id)?;
        let entry = self.entries.remove(index);
        Some(entry.attempts + 1)
    }

    /// Record a failed attempt.
    ///
    /// Returns the entry's new status: `Pending` with a backed-off next
    /// attempt, or `Failed` once the budget is spent. The failed entry
    /// stays queued for operator inspection.
    pub fn record_failure(&mut self, id: &EventId, now_ms: u64, config: &SyncConfig) -> SyncStatus {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.event.id == *id) else {
            return SyncStatus::Failed;
        };

        entry.attempts += 1;
        if entry.attempts >= config.max_attempts {
            entry.status = SyncStatus::Failed;
        } else {
            let exponent = entry.attempts.saturating_sub(1).min(16);
            let delay = config
                .backoff_base_ms
                .saturating_mul(1u64 << exponent)
                .min(config.backoff_cap_ms);
            entry.next_attempt_ms = now_ms + delay;
        }
        entry.status
    }

    /// Attempts already made for an event still in the queue.
    #[must_use]
    pub fn attempts(&self, id: &EventId) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.event.id == *id)
            .map(|entry| entry.attempts)
    }

    /// Events parked after exhausting their retry budget.
    #[must_use]
    pub fn failed(&self) -> Vec<EventEnvelope> {
        self.entries
            .iter()
            .filter(|entry| entry.status == SyncStatus::Failed)
            .map(|entry| entry.event.clone())
            .collect()
    }

    /// Events still awaiting an ack (failed ones excluded).
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status == SyncStatus::Pending)
            .count()
    }

    /// Total queued entries, failed included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
