//! Durable append-only journal file.
//!
//! ## Frame Format
//!
//! ```text
//! ┌─────────────┬─────────────┬──────────────────┐
//! │ len: u32 LE │ crc: u32 LE │ envelope as JSON │
//! └─────────────┴─────────────┴──────────────────┘
//! ```
//!
//! The crc covers the JSON bytes. On open, frames are replayed into an
//! in-memory index; the first torn or corrupt frame ends the replay and
//! the file is truncated back to the last good frame (a crash mid-write
//! can only damage the tail, since frames are written sequentially and
//! synced per append).
//!
//! An exclusive `fs2` lock is held for the lifetime of the store so two
//! processes cannot interleave writes into one journal.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{info, warn};

use shared_types::{AppendError, EventEnvelope, EventId, OperationId};

use crate::ports::EventStore;

/// Upper bound on a single frame's payload; anything larger is treated
/// as a corrupt length field.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

const FRAME_HEADER_LEN: usize = 8;

/// File-backed event store. All reads are served from an in-memory index
/// rebuilt at open; the file is only ever appended to.
pub struct JournalEventStore {
    file: File,
    path: PathBuf,
    events: HashMap<EventId, EventEnvelope>,
}

impl JournalEventStore {
    /// Open (or create) a journal at `path`, replaying existing frames.
    ///
    /// A damaged tail is truncated back to the last intact frame and
    /// reported via a warning; everything before it is recovered.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppendError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppendError::Storage(e.to_string()))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| AppendError::Storage(e.to_string()))?;

        file.try_lock_exclusive()
            .map_err(|e| AppendError::Storage(format!("journal locked: {e}")))?;

        let file_len = file
            .metadata()
            .map_err(|e| AppendError::Storage(e.to_string()))?
            .len();

        let mut events = HashMap::new();
        let good_offset = Self::replay_frames(&mut file, file_len, &mut events)?;

        if good_offset < file_len {
            warn!(
                path = %path.display(),
                dropped_bytes = file_len - good_offset,
                "journal tail damaged, truncating to last intact frame"
            );
            file.set_len(good_offset)
                .map_err(|e| AppendError::Storage(e.to_string()))?;
        }

        file.seek(SeekFrom::End(0))
            .map_err(|e| AppendError::Storage(e.to_string()))?;

        info!(
            path = %path.display(),
            events = events.len(),
            "journal opened"
        );

        Ok(Self { file, path, events })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read frames from the start of `file`, filling `events`.
    ///
    /// Returns the offset one past the last intact frame.
    fn replay_frames(
        file: &mut File,
        file_len: u64,
        events: &mut HashMap<EventId, EventEnvelope>,
    ) -> Result<u64, AppendError> {
        file.seek(SeekFrom::Start(0))
            .map_err(|e| AppendError::Storage(e.to_string()))?;

        let mut offset: u64 = 0;
        let mut header = [0u8; FRAME_HEADER_LEN];

        loop {
            if offset + FRAME_HEADER_LEN as u64 > file_len {
                break;
            }
            file.read_exact(&mut header)
                .map_err(|e| AppendError::Storage(e.to_string()))?;

            let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            if len == 0 || len > MAX_FRAME_LEN {
                break;
            }
            if offset + FRAME_HEADER_LEN as u64 + u64::from(len) > file_len {
                break;
            }

            let mut payload = vec![0u8; len as usize];
            file.read_exact(&mut payload)
                .map_err(|e| AppendError::Storage(e.to_string()))?;

            if crc32fast::hash(&payload) != crc {
                break;
            }

            let Ok(event) = serde_json::from_slice::<EventEnvelope>(&payload) else {
                break;
            };

            events.insert(event.id, event);
            offset += FRAME_HEADER_LEN as u64 + u64::from(len);
        }

        Ok(offset)
    }
}

impl EventStore for JournalEventStore {
    fn put(&mut self, event: &EventEnvelope) -> Result<(), AppendError> {
        let payload = serde_json::to_vec(event).map_err(|e| AppendError::Encoding {
            id: event.id,
            reason: e.to_string(),
        })?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        self.file
            .write_all(&frame)
            .map_err(|e| AppendError::Storage(e.to_string()))?;
        self.file
            .sync_data()
            .map_err(|e| AppendError::Storage(e.to_string()))?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        ActorId, AggregateId, DeviceId, EventPayload, EventTimestamp, FacilityKind, SessionId,
        SyncStatus, SCHEMA_VERSION,
    };

    fn envelope(wall_ms: u64, sequence: u64) -> EventEnvelope {
        EventEnvelope {
            id: EventId::generate(),
            operation_id: OperationId::from("op-1"),
            actor_id: ActorId::from("actor-1"),
            payload: EventPayload::FacilityCreated {
                facility_id: AggregateId::from("f1"),
                name: "Shelter A".to_owned(),
                kind: FacilityKind::Shelter,
                address: None,
                capacity: Some(120),
            },
            timestamp: EventTimestamp::new(wall_ms, sequence),
            schema_version: SCHEMA_VERSION,
            device_id: DeviceId::from("device-a"),
            session_id: SessionId::generate(),
            sync_status: SyncStatus::Local,
            sync_attempts: 0,
        }
    }

    #[test]
    fn events_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.journal");

        let e1 = envelope(100, 1);
        let e2 = envelope(200, 2);
        {
            let mut store = JournalEventStore::open(&path).unwrap();
            store.put(&e1).unwrap();
            store.put(&e2).unwrap();
        }

        let store = JournalEventStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.get(&e1.id).unwrap(), Some(e1));
        assert_eq!(store.get(&e2.id).unwrap(), Some(e2));
    }

    #[test]
    fn torn_tail_is_truncated_and_prefix_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.journal");

        let e1 = envelope(100, 1);
        {
            let mut store = JournalEventStore::open(&path).unwrap();
            store.put(&e1).unwrap();
        }

        // Simulate a crash mid-write: garbage half-frame at the tail.
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0x42, 0x00, 0x00, 0x00, 0xde, 0xad]).unwrap();
        }

        let store = JournalEventStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.contains(&e1.id).unwrap());

        // The truncation leaves a clean file: reopen again finds no damage.
        drop(store);
        let store = JournalEventStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn corrupt_crc_drops_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.journal");

        let e1 = envelope(100, 1);
        let e2 = envelope(200, 2);
        let tail_start;
        {
            let mut store = JournalEventStore::open(&path).unwrap();
            store.put(&e1).unwrap();
            tail_start = store.file.metadata().unwrap().len();
            store.put(&e2).unwrap();
        }

        // Flip a payload byte inside the second frame.
        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(tail_start + FRAME_HEADER_LEN as u64 + 4))
                .unwrap();
            file.write_all(&[0xff]).unwrap();
        }

        let store = JournalEventStore::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.contains(&e1.id).unwrap());
        assert!(!store.contains(&e2.id).unwrap());
    }

    #[test]
    fn second_open_on_locked_journal_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.journal");

        let _store = JournalEventStore::open(&path).unwrap();
        assert!(JournalEventStore::open(&path).is_err());
    }
}
