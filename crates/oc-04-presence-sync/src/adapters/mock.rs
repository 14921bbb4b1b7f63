//! In-memory implementation of the remote channel port.
//!
//! Doubles as the "offline" backend for local runs and as the test
//! double for sync behavior: failures can be injected per call, and
//! individual events can be marked for rejection.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use shared_types::{
    ChangeBroadcast, EventEnvelope, EventId, OperationId, PresenceRecord, SyncError,
};

use crate::ports::{PushAck, RemoteChannel};

#[derive(Default)]
struct MockState {
    events: Vec<EventEnvelope>,
    presence: Vec<PresenceRecord>,
    changes: Vec<ChangeBroadcast>,
    reject_ids: HashSet<EventId>,
}

/// In-memory remote: stores pushed events, serves pulls, records
/// broadcasts.
#[derive(Default)]
pub struct MockRemoteChannel {
    state: Mutex<MockState>,
    /// Remaining calls that should fail with a transport error.
    fail_next: AtomicU32,
}

impl MockRemoteChannel {
    /// A channel that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls fail with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Reject a specific event id on push (content-level rejection).
    pub fn reject(&self, id: EventId) {
        self.state.lock().reject_ids.insert(id);
    }

    /// Seed an event as if another client had pushed it.
    pub fn seed_event(&self, event: EventEnvelope) {
        self.state.lock().events.push(event);
    }

    /// Events the channel has accepted.
    #[must_use]
    pub fn stored_events(&self) -> Vec<EventEnvelope> {
        self.state.lock().events.clone()
    }

    /// Presence broadcasts received, in order.
    #[must_use]
    pub fn presence_broadcasts(&self) -> Vec<PresenceRecord> {
        self.state.lock().presence.clone()
    }

    /// Change broadcasts received, in order.
    #[must_use]
    pub fn change_broadcasts(&self) -> Vec<ChangeBroadcast> {
        self.state.lock().changes.clone()
    }

    fn check_transport(&self) -> Result<(), SyncError> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(SyncError::Transport("injected transport failure".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteChannel for MockRemoteChannel {
    async fn push_events(&self, batch: Vec<EventEnvelope>) -> Result<PushAck, SyncError> {
        self.check_transport()?;

        let mut state = self.state.lock();
        let mut ack = PushAck::default();
        for event in batch {
            if state.reject_ids.contains(&event.id) {
                ack.rejected
                    .push((event.id, "rejected by remote".to_owned()));
                continue;
            }
            if !state.events.iter().any(|stored| stored.id == event.id) {
                state.events.push(event.clone());
            }
            ack.accepted.push(event.id);
        }
        Ok(ack)
    }

    async fn pull_events(
        &self,
        operation_id: &OperationId,
        since: Option<EventId>,
    ) -> Result<Vec<EventEnvelope>, SyncError> {
        self.check_transport()?;

        let state = self.state.lock();
        let mut events: Vec<EventEnvelope> = state
            .events
            .iter()
            .filter(|event| &event.operation_id == operation_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        if let Some(since_id) = since {
            if let Some(pos) = events.iter().position(|event| event.id == since_id) {
                events.drain(..=pos);
            }
        }
        Ok(events)
    }

    async fn broadcast_presence(&self, record: &PresenceRecord) -> Result<(), SyncError> {
        self.check_transport()?;
        self.state.lock().presence.push(record.clone());
        Ok(())
    }

    async fn broadcast_change(&self, change: &ChangeBroadcast) -> Result<(), SyncError> {
        self.check_transport()?;
        self.state.lock().changes.push(change.clone());
        Ok(())
    }
}
