//! # Snapshots
//!
//! Immutable, versioned freezes of an IAP document at a point in time
//! (e.g. the 6 PM official snapshot). Created by the
//! `OFFICIAL_SNAPSHOT_CREATED` reducer, never mutated afterwards.

use serde::{Deserialize, Serialize};
use shared_types::{ActorId, AggregateId, SnapshotId};

use crate::domain::aggregates::IapDocumentRecord;

/// Lightweight reference kept on the live document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    pub id: SnapshotId,
    pub version: u64,
    pub created_at_ms: u64,
    pub created_by: ActorId,
}

/// A full, deep-copied freeze of one document.
///
/// Later edits to the live aggregate are invisible through this value:
/// the `document` field is an owned copy taken at the fold point of the
/// creating event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique id, assigned by the creating event.
    pub id: SnapshotId,
    /// Monotonically increasing per document, starting at 1.
    pub version: u64,
    /// The document this snapshot freezes.
    pub document_id: AggregateId,
    /// Wall-clock milliseconds of the creating event.
    pub created_at_ms: u64,
    /// Actor who took the snapshot.
    pub created_by: ActorId,
    /// Deep copy of the document state at the fold point.
    pub document: IapDocumentRecord,
}

impl Snapshot {
    /// The reference stored on the live document.
    #[must_use]
    pub fn to_ref(&self) -> SnapshotRef {
        SnapshotRef {
            id: self.id,
            version: self.version,
            created_at_ms: self.created_at_ms,
            created_by: self.created_by.clone(),
        }
    }
}
