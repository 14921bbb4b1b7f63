//! # Event Log Service
//!
//! Ordering, idempotency, and replay semantics over an [`EventStore`].

use parking_lot::RwLock;
use tracing::{debug, warn};

use shared_types::{AppendError, EventEnvelope, EventId, OperationId};

use crate::domain::metrics::LogMetrics;
use crate::ports::EventStore;

/// The append-only event log.
///
/// Thread-safe: the backing store sits behind a lock and every public
/// method takes `&self`, so the log can be shared via `Arc` across the
/// master data service and the sync layer.
pub struct EventLog<S: EventStore> {
    store: RwLock<S>,
    metrics: LogMetrics,
}

impl<S: EventStore> EventLog<S> {
    /// Wrap a storage backend.
    pub fn new(store: S) -> Self {
        Self {
            store: RwLock::new(store),
            metrics: LogMetrics::default(),
        }
    }

    /// Append an event.
    ///
    /// Idempotent by event id: appending an id that is already stored is
    /// a successful no-op, because the sync layer may redeliver. Fails
    /// only on storage I/O.
    pub fn append(&self, event: &EventEnvelope) -> Result<EventId, AppendError> {
        let mut store = self.store.write();
        if store.contains(&event.id)? {
            self.metrics.record_duplicate();
            debug!(event_id = %event.id, kind = %event.kind(), "duplicate append ignored");
            return Ok(event.id);
        }
        store.put(event)?;
        self.metrics.record_append();
        debug!(
            event_id = %event.id,
            kind = %event.kind(),
            operation = %event.operation_id,
            "event appended"
        );
        Ok(event.id)
    }

    /// Whether an event id is already stored.
    pub fn contains(&self, id: &EventId) -> Result<bool, AppendError> {
        self.store.read().contains(id)
    }

    /// Fetch one stored envelope.
    pub fn get(&self, id: &EventId) -> Result<Option<EventEnvelope>, AppendError> {
        self.store.read().get(id)
    }

    /// Replay one operation's events in their total order.
    ///
    /// With `since`, only events strictly after the given event (by sort
    /// key) are returned. An unknown `since` id falls back to a full
    /// replay — consumers are idempotent, so over-delivery is safe.
    pub fn replay(
        &self,
        operation_id: &OperationId,
        since: Option<EventId>,
    ) -> Result<Vec<EventEnvelope>, AppendError> {
        self.metrics.record_replay();
        let mut events = self.store.read().scan_operation(operation_id)?;
        events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        if let Some(since_id) = since {
            match events.iter().position(|e| e.id == since_id) {
                Some(pos) => {
                    events.drain(..=pos);
                }
                None => {
                    warn!(
                        %since_id,
                        operation = %operation_id,
                        "replay cursor unknown, falling back to full replay"
                    );
                }
            }
        }
        Ok(events)
    }

    /// Total number of stored events across all operations.
    pub fn len(&self) -> Result<usize, AppendError> {
        self.store.read().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> Result<bool, AppendError> {
        self.store.read().is_empty()
    }

    /// Counters for status reporting.
    #[must_use]
    pub fn metrics(&self) -> &LogMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryEventStore;
    use shared_types::{
        ActorId, AggregateId, DeviceId, EventPayload, EventTimestamp, FacilityKind,
        FacilityStatus, SessionId, SyncStatus, SCHEMA_VERSION,
    };

    fn envelope(op: &str, wall_ms: u64, device: &str, sequence: u64) -> EventEnvelope {
        EventEnvelope {
            id: EventId::generate(),
            operation_id: OperationId::from(op),
            actor_id: ActorId::from("actor-1"),
            payload: EventPayload::FacilityCreated {
                facility_id: AggregateId::from("f1"),
                name: "Shelter A".to_owned(),
                kind: FacilityKind::Shelter,
                address: None,
                capacity: None,
            },
            timestamp: EventTimestamp::new(wall_ms, sequence),
            schema_version: SCHEMA_VERSION,
            device_id: DeviceId::from(device),
            session_id: SessionId::generate(),
            sync_status: SyncStatus::Local,
            sync_attempts: 0,
        }
    }

    fn log() -> EventLog<InMemoryEventStore> {
        EventLog::new(InMemoryEventStore::new())
    }

    #[test]
    fn append_then_replay_round_trips() {
        let log = log();
        let event = envelope("op-1", 100, "device-a", 1);
        log.append(&event).unwrap();

        let replayed = log.replay(&OperationId::from("op-1"), None).unwrap();
        assert_eq!(replayed, vec![event]);
    }

    #[test]
    fn duplicate_append_is_a_noop() {
        let log = log();
        let event = envelope("op-1", 100, "device-a", 1);
        log.append(&event).unwrap();
        log.append(&event).unwrap();

        assert_eq!(log.len().unwrap(), 1);
        assert_eq!(log.metrics().appended(), 1);
        assert_eq!(log.metrics().duplicates(), 1);
    }

    #[test]
    fn replay_orders_by_wall_clock_device_sequence() {
        let log = log();
        let e1 = envelope("op-1", 200, "device-b", 1);
        let e2 = envelope("op-1", 100, "device-a", 5);
        let e3 = envelope("op-1", 200, "device-a", 9);
        for e in [&e1, &e2, &e3] {
            log.append(e).unwrap();
        }

        let replayed = log.replay(&OperationId::from("op-1"), None).unwrap();
        let ids: Vec<_> = replayed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![e2.id, e3.id, e1.id]);
    }

    #[test]
    fn replay_is_scoped_per_operation() {
        let log = log();
        log.append(&envelope("op-1", 100, "device-a", 1)).unwrap();
        log.append(&envelope("op-2", 100, "device-a", 2)).unwrap();

        assert_eq!(log.replay(&OperationId::from("op-1"), None).unwrap().len(), 1);
        assert_eq!(log.replay(&OperationId::from("op-2"), None).unwrap().len(), 1);
    }

    #[test]
    fn replay_since_returns_strict_suffix() {
        let log = log();
        let e1 = envelope("op-1", 100, "device-a", 1);
        let e2 = envelope("op-1", 200, "device-a", 2);
        let e3 = envelope("op-1", 300, "device-a", 3);
        for e in [&e1, &e2, &e3] {
            log.append(e).unwrap();
        }

        let replayed = log.replay(&OperationId::from("op-1"), Some(e2.id)).unwrap();
        let ids: Vec<_> = replayed.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![e3.id]);
    }

    #[test]
    fn replay_with_unknown_cursor_returns_everything() {
        let log = log();
        let e1 = envelope("op-1", 100, "device-a", 1);
        log.append(&e1).unwrap();

        let replayed = log
            .replay(&OperationId::from("op-1"), Some(EventId::generate()))
            .unwrap();
        assert_eq!(replayed.len(), 1);
    }

    #[test]
    fn malformed_content_is_still_appended() {
        // The log never inspects business rules: a status change for a
        // facility that was never created still appends cleanly.
        let log = log();
        let mut event = envelope("op-1", 100, "device-a", 1);
        event.payload = EventPayload::FacilityStatusChanged {
            facility_id: AggregateId::from("ghost"),
            status: FacilityStatus::Closed,
        };
        assert!(log.append(&event).is_ok());
    }
}
