//! Lightweight counters exposed by the log for status reporting and
//! test assertions.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters maintained by [`crate::EventLog`].
#[derive(Debug, Default)]
pub struct LogMetrics {
    appended: AtomicU64,
    duplicates: AtomicU64,
    replays: AtomicU64,
}

impl LogMetrics {
    pub(crate) fn record_append(&self) {
        self.appended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_replay(&self) {
        self.replays.fetch_add(1, Ordering::Relaxed);
    }

    /// Events actually written to storage.
    #[must_use]
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    /// Appends skipped because the id was already stored.
    #[must_use]
    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Replay calls served.
    #[must_use]
    pub fn replays(&self) -> u64 {
        self.replays.load(Ordering::Relaxed)
    }
}
