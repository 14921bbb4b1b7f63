//! In-memory event store for unit tests and ephemeral runs.

use std::collections::HashMap;

use shared_types::{AppendError, EventEnvelope, EventId, OperationId};

use crate::ports::EventStore;

/// HashMap-backed store. Not durable; production uses
/// [`crate::adapters::JournalEventStore`].
#[derive(Default)]
pub struct InMemoryEventStore {
    events: HashMap<EventId, EventEnvelope>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn put(&mut self, event: &EventEnvelope) -> Result<(), AppendError> {
        self.events.insert(event.id, event.clone());
        Ok(())
    }

    fn get(&self, id: &EventId) -> Result<Option<EventEnvelope>, AppendError> {
        Ok(self.events.get(id).cloned())
    }

    fn contains(&self, id: &EventId) -> Result<bool, AppendError> {
        Ok(self.events.contains_key(id))
    }

    fn scan_operation(
        &self,
        operation_id: &OperationId,
    ) -> Result<Vec<EventEnvelope>, AppendError> {
        Ok(self
            .events
            .values()
            .filter(|e| &e.operation_id == operation_id)
            .cloned()
            .collect())
    }

    fn len(&self) -> Result<usize, AppendError> {
        Ok(self.events.len())
    }
}
