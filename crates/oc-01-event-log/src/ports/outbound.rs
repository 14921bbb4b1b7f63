//! # Outbound Ports (Driven Ports)
//!
//! Storage dependency of the event log service.
//!
//! Production: `JournalEventStore` (this crate) or the RocksDB adapter in
//! `ops-runtime`. Testing: `InMemoryEventStore`.

use shared_types::{AppendError, EventEnvelope, EventId, OperationId};

/// Abstract interface for durable event storage.
///
/// Implementations only store and retrieve; ordering, idempotency, and
/// replay semantics live in [`crate::domain::EventLog`].
pub trait EventStore: Send + Sync {
    /// Persist one envelope. Called at most once per event id; the log
    /// service filters duplicates before calling.
    fn put(&mut self, event: &EventEnvelope) -> Result<(), AppendError>;

    /// Fetch one envelope by id.
    fn get(&self, id: &EventId) -> Result<Option<EventEnvelope>, AppendError>;

    /// Whether an envelope with this id is stored.
    fn contains(&self, id: &EventId) -> Result<bool, AppendError>;

    /// All envelopes belonging to one operation, in storage order
    /// (callers sort).
    fn scan_operation(&self, operation_id: &OperationId)
        -> Result<Vec<EventEnvelope>, AppendError>;

    /// Total number of stored envelopes.
    fn len(&self) -> Result<usize, AppendError>;

    /// Whether the store holds no envelopes.
    fn is_empty(&self) -> Result<bool, AppendError> {
        Ok(self.len()? == 0)
    }
}
