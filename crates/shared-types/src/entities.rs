//! # Core Identifiers and Cross-Subsystem Entities
//!
//! Identifier newtypes used across subsystems, plus the handful of entity
//! types that must be shared because the event bus carries them (presence
//! records, change broadcasts). Aggregate records themselves are owned by
//! the projector crate and are NOT defined here.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique, client-generated event identifier.
///
/// Generated once when the event is built and never reused; the event log
/// and the projector both deduplicate on this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Generate a fresh random event id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partition key for all ordering guarantees.
///
/// Every event belongs to exactly one operation; events from different
/// operations have no ordering relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identity of the person who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Stable identifier of the device an event was created on.
///
/// Participates in the total order tie-break, so it must be stable for the
/// lifetime of the local installation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of one connected client session. Rotates on reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a fresh session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain identifier of an aggregate (facility, personnel, document, ...).
///
/// Client-generated, human-opaque strings; uniqueness is scoped per
/// operation and aggregate kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(pub String);

impl AggregateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AggregateId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of an immutable snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    /// Generate a fresh snapshot id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synchronization state of an event with respect to the remote channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Created locally, not yet handed to the sync queue.
    #[default]
    Local,
    /// Queued for the remote channel, awaiting an ack.
    Pending,
    /// Acknowledged by the remote channel.
    Synced,
    /// Retry budget exhausted; requires operator attention.
    Failed,
}

/// The aggregate kinds the projector maintains, doubling as table names
/// for the master data subscription API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Operation,
    Facility,
    Personnel,
    WorkAssignment,
    Gap,
    IapDocument,
}

impl AggregateKind {
    /// Table name exposed through the subscription API.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            AggregateKind::Operation => "operations",
            AggregateKind::Facility => "facilities",
            AggregateKind::Personnel => "personnel",
            AggregateKind::WorkAssignment => "work_assignments",
            AggregateKind::Gap => "gaps",
            AggregateKind::IapDocument => "iap_documents",
        }
    }

    /// Reverse lookup from a table name.
    #[must_use]
    pub fn from_table_name(name: &str) -> Option<Self> {
        match name {
            "operations" => Some(AggregateKind::Operation),
            "facilities" => Some(AggregateKind::Facility),
            "personnel" => Some(AggregateKind::Personnel),
            "work_assignments" => Some(AggregateKind::WorkAssignment),
            "gaps" => Some(AggregateKind::Gap),
            "iap_documents" => Some(AggregateKind::IapDocument),
            _ => None,
        }
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Ephemeral per-actor presence state exchanged on the presence channel.
///
/// Never appended to the event log; the presence layer owns the connected
/// set and expires records after missed heartbeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    /// The actor this record describes.
    pub actor_id: ActorId,
    /// Display name shown to other connected users.
    pub name: String,
    /// Role within the operation (e.g. "planning", "sheltering").
    pub role: String,
    /// Cursor/identity color assigned to this actor.
    pub color: String,
    /// Wall-clock milliseconds of the last heartbeat received.
    pub last_seen_ms: u64,
    /// Operation the actor currently has open.
    pub current_operation: OperationId,
    /// Facility the actor is currently editing, if any.
    pub current_facility: Option<AggregateId>,
    /// Form section the actor is currently editing, if any.
    pub current_section: Option<String>,
}

/// Record-level change notification exchanged on a named channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBroadcast {
    /// Kind of the entity that changed.
    pub entity_kind: AggregateKind,
    /// Identifier of the entity that changed.
    pub entity_id: AggregateId,
    /// Event kind describing the change.
    pub change: String,
    /// Actor that made the change.
    pub actor_id: ActorId,
    /// Wall-clock milliseconds when the change was committed.
    pub timestamp_ms: u64,
}
