//! RocksDB-backed event store.
//!
//! Key layout:
//!
//! ```text
//! ev/<event-uuid>          -> envelope JSON
//! op/<operation>/<uuid>    -> empty (operation index)
//! ```
//!
//! Writes land as an atomic batch so the index can never point at a
//! missing envelope.

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};

use oc_01_event_log::EventStore;
use shared_types::{AppendError, EventEnvelope, EventId, OperationId};

const EVENT_PREFIX: &str = "ev/";
const OPERATION_PREFIX: &str = "op/";

/// Durable event store over RocksDB.
pub struct RocksDbEventStore {
    db: DB,
}

impl RocksDbEventStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppendError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path).map_err(|e| AppendError::Storage(e.to_string()))?;
        Ok(Self { db })
    }

    fn event_key(id: &EventId) -> Vec<u8> {
        format!("{EVENT_PREFIX}{id}").into_bytes()
    }

    fn operation_key(operation_id: &OperationId, id: &EventId) -> Vec<u8> {
        format!("{OPERATION_PREFIX}{operation_id}/{id}").into_bytes()
    }

    fn operation_scan_prefix(operation_id: &OperationId) -> Vec<u8> {
        format!("{OPERATION_PREFIX}{operation_id}/").into_bytes()
    }

    fn decode(bytes: &[u8]) -> Result<EventEnvelope, AppendError> {
        serde_json::from_slice(bytes).map_err(|e| AppendError::Storage(format!("corrupt envelope: {e}")))
    }
}

impl EventStore for RocksDbEventStore {
    fn put(&mut self, event: &EventEnvelope) -> Result<(), AppendError> {
        let payload = serde_json::to_vec(event).map_err(|e| AppendError::Encoding {
            id: event.id,
            reason: e.to_string(),
        })?;

        let mut batch = WriteBatch::default();
        batch.put(Self::event_key(&event.id), payload);
        batch.put(Self::operation_key(&event.operation_id, &event.id), []);
        self.db
            .write(batch)
            .map_err(|e| AppendError::Storage(e.to_string()))
    }

    fn get(&self, id: &EventId) -> Result<Option<EventEnvelope>, AppendError> {
        match self
            .db
            .get(Self::event_key(id))
            .map_err(|e| AppendError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn contains(&self, id: &EventId) -> Result<bool, AppendError> {
        Ok(self
            .db
            .get_pinned(Self::event_key(id))
            .map_err(|e| AppendError::Storage(e.to_string()))?
            .is_some())
    }

    fn scan_operation(
        &self,
        operation_id: &OperationId,
    ) -> Result<Vec<EventEnvelope>, AppendError> {
        let prefix = Self::operation_scan_prefix(operation_id);
        let mut events = Vec::new();

        for entry in self
            .db
            .iterator(IteratorMode::From(&prefix, Direction::Forward))
        {
            let (key, _) = entry.map_err(|e| AppendError::Storage(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let id_text = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            let event_key = format!("{EVENT_PREFIX}{id_text}").into_bytes();
            if let Some(bytes) = self
                .db
                .get(event_key)
                .map_err(|e| AppendError::Storage(e.to_string()))?
            {
                events.push(Self::decode(&bytes)?);
            }
        }
        Ok(events)
    }

    fn len(&self) -> Result<usize, AppendError> {
        let prefix = EVENT_PREFIX.as_bytes();
        let mut count = 0usize;
        for entry in self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, _) = entry.map_err(|e| AppendError::Storage(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}
