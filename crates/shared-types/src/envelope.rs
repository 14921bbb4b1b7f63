//! # `EventEnvelope` Wire Format
//!
//! The universal wrapper for every domain event, durable and on the wire.
//!
//! ## Invariants
//!
//! - Envelopes are immutable once appended to the log; sync bookkeeping
//!   (`sync_status`, `sync_attempts`) is advanced by the sync layer on its
//!   own queued copies, never by rewriting stored envelopes.
//! - Within one operation, envelopes are totally ordered by
//!   `(timestamp.wall_ms, device_id, timestamp.sequence)`; the sort key is
//!   exposed via [`EventEnvelope::sort_key`].

use serde::{Deserialize, Serialize};

use crate::entities::{ActorId, DeviceId, EventId, OperationId, SessionId, SyncStatus};
use crate::payloads::{EventKind, EventPayload};

/// Current envelope schema version.
///
/// Checked at the sync boundary before replaying remote events; bumped on
/// any breaking change to the envelope or payload union.
pub const SCHEMA_VERSION: u16 = 1;

/// Hybrid timestamp: wall clock plus a per-device logical counter.
///
/// The counter makes same-millisecond events from one device ordered and
/// is the final tie-break of the total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventTimestamp {
    /// Milliseconds since the Unix epoch on the originating device.
    pub wall_ms: u64,
    /// Per-device monotonic counter, never reset within an installation.
    pub sequence: u64,
}

impl EventTimestamp {
    /// Build a timestamp from its parts.
    #[must_use]
    pub fn new(wall_ms: u64, sequence: u64) -> Self {
        Self { wall_ms, sequence }
    }
}

/// Deterministic total-order key for events within one operation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventSortKey {
    /// Primary: wall-clock milliseconds.
    pub wall_ms: u64,
    /// Tie-break between devices writing in the same millisecond.
    pub device_id: DeviceId,
    /// Tie-break within one device.
    pub sequence: u64,
}

/// Immutable record of something that happened; the unit of the
/// append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique, client-generated id. Both the log and the projector
    /// deduplicate on it, which makes redelivery harmless.
    pub id: EventId,

    /// Partition key; all ordering guarantees are scoped to it.
    pub operation_id: OperationId,

    /// The person whose action produced this event.
    pub actor_id: ActorId,

    /// The typed payload; carries the `type` discriminant on the wire.
    #[serde(flatten)]
    pub payload: EventPayload,

    /// Hybrid wall-clock + logical timestamp.
    pub timestamp: EventTimestamp,

    /// Envelope schema version at creation time.
    pub schema_version: u16,

    /// Device the event was created on.
    pub device_id: DeviceId,

    /// Client session the event was created in.
    pub session_id: SessionId,

    /// Sync state at creation; advanced by the sync layer on its queued
    /// copies.
    pub sync_status: SyncStatus,

    /// Number of sync attempts made for this event.
    pub sync_attempts: u32,
}

impl EventEnvelope {
    /// The event kind discriminant.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// The deterministic total-order key within this event's operation.
    #[must_use]
    pub fn sort_key(&self) -> EventSortKey {
        EventSortKey {
            wall_ms: self.timestamp.wall_ms,
            device_id: self.device_id.clone(),
            sequence: self.timestamp.sequence,
        }
    }
}
