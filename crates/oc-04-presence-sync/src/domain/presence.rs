//! # Presence Tracker
//!
//! The connected-user set. Ephemeral by design: records live in memory,
//! refresh on every heartbeat, and expire after the missed-interval
//! allowance. Nothing here ever reaches the event log.

use std::collections::HashMap;

use shared_types::{ActorId, PresenceRecord};
use tracing::debug;

/// Tracks who is connected and what they are editing.
pub struct PresenceTracker {
    peers: HashMap<ActorId, PresenceRecord>,
    timeout_ms: u64,
}

impl PresenceTracker {
    /// A tracker expiring peers after `timeout_ms` of silence.
    #[must_use]
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            peers: HashMap::new(),
            timeout_ms,
        }
    }

    /// Record a presence broadcast. Returns `true` for a new peer,
    /// `false` for a refresh.
    pub fn observe(&mut self, record: PresenceRecord) -> bool {
        let is_new = !self.peers.contains_key(&record.actor_id);
        debug!(actor = %record.actor_id, is_new, "presence observed");
        self.peers.insert(record.actor_id.clone(), record);
        is_new
    }

    /// Remove and return peers not heard from within the timeout.
    pub fn sweep(&mut self, now_ms: u64) -> Vec<PresenceRecord> {
        let timeout = self.timeout_ms;
        let expired: Vec<ActorId> = self
            .peers
            .values()
            .filter(|record| now_ms.saturating_sub(record.last_seen_ms) > timeout)
            .map(|record| record.actor_id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|actor| self.peers.remove(actor))
            .collect()
    }

    /// Current connected set, ordered by actor id.
    #[must_use]
    pub fn connected(&self) -> Vec<PresenceRecord> {
        let mut peers: Vec<_> = self.peers.values().cloned().collect();
        peers.sort_by(|a, b| a.actor_id.0.cmp(&b.actor_id.0));
        peers
    }

    /// One peer's presence, if connected.
    #[must_use]
    pub fn get(&self, actor_id: &ActorId) -> Option<&PresenceRecord> {
        self.peers.get(actor_id)
    }
}
