//! # Aggregate Records
//!
//! Read-optimized current state, rebuilt by replaying events in their
//! total order. Aggregates are never hard-deleted: lifecycle ends in a
//! terminal status so the audit trail stays intact.
//!
//! Every record carries `updated_at_ms`/`updated_by` housekeeping fields;
//! the conflict resolver excludes those from field diffs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::{
    ActorId, AggregateId, AggregateKind, FacilityKind, FacilityStatus, OperationId, Section,
    Shift,
};

use crate::domain::snapshot::SnapshotRef;

/// Status of a personnel roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonnelStatus {
    Available,
    Assigned,
}

/// Status of a work assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Open,
    Completed,
}

/// Status of a staffing gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapStatus {
    Open,
    Filled,
}

/// Status of an IAP document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IapStatus {
    Draft,
    Published,
}

/// The operation itself, projected from operation-level events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: AggregateId,
    pub name: String,
    pub disaster_number: Option<String>,
    pub setup_complete: bool,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub updated_by: ActorId,
}

/// A facility (shelter, kitchen, warehouse, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: AggregateId,
    pub operation_id: OperationId,
    pub name: String,
    /// Named `facility_type` rather than `kind`: the serialized record
    /// already uses `kind` as the aggregate discriminant.
    pub facility_type: FacilityKind,
    pub status: FacilityStatus,
    pub address: Option<String>,
    pub capacity: Option<u32>,
    pub notes: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub updated_by: ActorId,
}

/// A responder on the operation roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonnelRecord {
    pub id: AggregateId,
    pub operation_id: OperationId,
    pub name: String,
    pub role: String,
    pub section: Option<Section>,
    pub contact: Option<String>,
    pub status: PersonnelStatus,
    pub assigned_facility: Option<AggregateId>,
    pub shift: Option<Shift>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub updated_by: ActorId,
}

/// A work assignment opened against a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkAssignmentRecord {
    pub id: AggregateId,
    pub operation_id: OperationId,
    pub facility_id: AggregateId,
    pub role: String,
    pub shift: Shift,
    pub personnel: Vec<AggregateId>,
    pub status: AssignmentStatus,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub updated_by: ActorId,
}

/// A staffing gap recorded against a facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapRecord {
    pub id: AggregateId,
    pub operation_id: OperationId,
    pub facility_id: AggregateId,
    pub role: String,
    pub shift: Shift,
    pub status: GapStatus,
    pub filled_by: Option<AggregateId>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub updated_by: ActorId,
}

/// An IAP document for one operational period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IapDocumentRecord {
    pub id: AggregateId,
    pub operation_id: OperationId,
    pub operational_period: String,
    /// Section name -> form content. BTreeMap keeps section order stable
    /// across replays.
    pub sections: BTreeMap<String, serde_json::Value>,
    pub status: IapStatus,
    /// References to official snapshots taken of this document.
    pub snapshots: Vec<SnapshotRef>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub updated_by: ActorId,
}

/// Any projected aggregate, as handed out by the master data service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateRecord {
    Operation(OperationRecord),
    Facility(FacilityRecord),
    Personnel(PersonnelRecord),
    WorkAssignment(WorkAssignmentRecord),
    Gap(GapRecord),
    IapDocument(IapDocumentRecord),
}

impl AggregateRecord {
    /// The kind of this record.
    #[must_use]
    pub fn kind(&self) -> AggregateKind {
        match self {
            AggregateRecord::Operation(_) => AggregateKind::Operation,
            AggregateRecord::Facility(_) => AggregateKind::Facility,
            AggregateRecord::Personnel(_) => AggregateKind::Personnel,
            AggregateRecord::WorkAssignment(_) => AggregateKind::WorkAssignment,
            AggregateRecord::Gap(_) => AggregateKind::Gap,
            AggregateRecord::IapDocument(_) => AggregateKind::IapDocument,
        }
    }

    /// The aggregate id of this record.
    #[must_use]
    pub fn id(&self) -> &AggregateId {
        match self {
            AggregateRecord::Operation(r) => &r.id,
            AggregateRecord::Facility(r) => &r.id,
            AggregateRecord::Personnel(r) => &r.id,
            AggregateRecord::WorkAssignment(r) => &r.id,
            AggregateRecord::Gap(r) => &r.id,
            AggregateRecord::IapDocument(r) => &r.id,
        }
    }

    /// Wall-clock milliseconds of the last event folded into this record.
    #[must_use]
    pub fn updated_at_ms(&self) -> u64 {
        match self {
            AggregateRecord::Operation(r) => r.updated_at_ms,
            AggregateRecord::Facility(r) => r.updated_at_ms,
            AggregateRecord::Personnel(r) => r.updated_at_ms,
            AggregateRecord::WorkAssignment(r) => r.updated_at_ms,
            AggregateRecord::Gap(r) => r.updated_at_ms,
            AggregateRecord::IapDocument(r) => r.updated_at_ms,
        }
    }

    /// The actor of the last event folded into this record.
    #[must_use]
    pub fn updated_by(&self) -> &ActorId {
        match self {
            AggregateRecord::Operation(r) => &r.updated_by,
            AggregateRecord::Facility(r) => &r.updated_by,
            AggregateRecord::Personnel(r) => &r.updated_by,
            AggregateRecord::WorkAssignment(r) => &r.updated_by,
            AggregateRecord::Gap(r) => &r.updated_by,
            AggregateRecord::IapDocument(r) => &r.updated_by,
        }
    }
}
