//! # Event Payload Union
//!
//! The closed tagged union of every domain event the system can record.
//! Each variant carries only the fields that event requires; the `type`
//! discriminant on the wire is the SCREAMING_SNAKE_CASE variant name.
//!
//! Adding an event kind means adding a variant here and a reducer in the
//! projector. There is no free-form escape hatch; forward compatibility is
//! handled by `schema_version` checks at the sync boundary.

use serde::{Deserialize, Serialize};

use crate::entities::{AggregateId, SnapshotId};

/// Fieldless mirror of [`EventPayload`] used for dispatch and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    OperationCreated,
    SetupCompleted,
    FacilityCreated,
    FacilityUpdated,
    FacilityStatusChanged,
    PersonnelCreated,
    PersonnelUpdated,
    PersonnelAssigned,
    WorkAssignmentCreated,
    WorkAssignmentUpdated,
    WorkAssignmentCompleted,
    GapCreated,
    GapFilled,
    IapDocumentCreated,
    IapSectionUpdated,
    IapDocumentPublished,
    OfficialSnapshotCreated,
}

impl EventKind {
    /// Wire name of this event kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OperationCreated => "OPERATION_CREATED",
            EventKind::SetupCompleted => "SETUP_COMPLETED",
            EventKind::FacilityCreated => "FACILITY_CREATED",
            EventKind::FacilityUpdated => "FACILITY_UPDATED",
            EventKind::FacilityStatusChanged => "FACILITY_STATUS_CHANGED",
            EventKind::PersonnelCreated => "PERSONNEL_CREATED",
            EventKind::PersonnelUpdated => "PERSONNEL_UPDATED",
            EventKind::PersonnelAssigned => "PERSONNEL_ASSIGNED",
            EventKind::WorkAssignmentCreated => "WORK_ASSIGNMENT_CREATED",
            EventKind::WorkAssignmentUpdated => "WORK_ASSIGNMENT_UPDATED",
            EventKind::WorkAssignmentCompleted => "WORK_ASSIGNMENT_COMPLETED",
            EventKind::GapCreated => "GAP_CREATED",
            EventKind::GapFilled => "GAP_FILLED",
            EventKind::IapDocumentCreated => "IAP_DOCUMENT_CREATED",
            EventKind::IapSectionUpdated => "IAP_SECTION_UPDATED",
            EventKind::IapDocumentPublished => "IAP_DOCUMENT_PUBLISHED",
            EventKind::OfficialSnapshotCreated => "OFFICIAL_SNAPSHOT_CREATED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a facility through its lifecycle. Facilities are never hard
/// deleted; `Closed` is the terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityStatus {
    Planned,
    Open,
    Standby,
    Closed,
}

/// Broad facility categories used by the planning forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityKind {
    Shelter,
    Kitchen,
    Warehouse,
    Headquarters,
    Other,
}

/// Operational shift for assignments and gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Day,
    Night,
}

/// ICS-style section an actor works under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Command,
    Operations,
    Planning,
    Logistics,
    Finance,
}

/// Field-level changes to a facility. `None` means "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FacilityChanges {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.capacity.is_none()
            && self.notes.is_none()
    }
}

/// Field-level changes to a personnel record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonnelChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl PersonnelChanges {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.section.is_none() && self.contact.is_none()
    }
}

/// Field-level changes to a work assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkAssignmentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personnel: Option<Vec<AggregateId>>,
}

impl WorkAssignmentChanges {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.shift.is_none() && self.personnel.is_none()
    }
}

/// The closed union of all event payloads.
///
/// Serialized adjacently tagged so the wire envelope carries the familiar
/// `type` + `payload` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    /// A new operation was opened. The first event of every log partition.
    OperationCreated {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        disaster_number: Option<String>,
    },

    /// Initial operation setup (periods, staffing skeleton) finished.
    SetupCompleted,

    /// A facility was added to the operation.
    FacilityCreated {
        facility_id: AggregateId,
        name: String,
        kind: FacilityKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        address: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        capacity: Option<u32>,
    },

    /// Field-level edits to an existing facility.
    FacilityUpdated {
        facility_id: AggregateId,
        changes: FacilityChanges,
    },

    /// A facility moved through its lifecycle (open/standby/closed).
    FacilityStatusChanged {
        facility_id: AggregateId,
        status: FacilityStatus,
    },

    /// A responder joined the operation roster.
    PersonnelCreated {
        personnel_id: AggregateId,
        name: String,
        role: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        section: Option<Section>,
        #[serde(skip_serializing_if = "Option::is_none")]
        contact: Option<String>,
    },

    /// Field-level edits to a roster entry.
    PersonnelUpdated {
        personnel_id: AggregateId,
        changes: PersonnelChanges,
    },

    /// A responder was assigned to a facility.
    PersonnelAssigned {
        personnel_id: AggregateId,
        facility_id: AggregateId,
        #[serde(skip_serializing_if = "Option::is_none")]
        shift: Option<Shift>,
    },

    /// A work assignment was opened against a facility.
    WorkAssignmentCreated {
        assignment_id: AggregateId,
        facility_id: AggregateId,
        role: String,
        shift: Shift,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        personnel: Vec<AggregateId>,
    },

    /// Field-level edits to a work assignment.
    WorkAssignmentUpdated {
        assignment_id: AggregateId,
        changes: WorkAssignmentChanges,
    },

    /// A work assignment was completed.
    WorkAssignmentCompleted { assignment_id: AggregateId },

    /// A staffing gap was recorded against a facility.
    GapCreated {
        gap_id: AggregateId,
        facility_id: AggregateId,
        role: String,
        shift: Shift,
    },

    /// A staffing gap was filled by a responder.
    GapFilled {
        gap_id: AggregateId,
        personnel_id: AggregateId,
    },

    /// An IAP document was started for an operational period.
    IapDocumentCreated {
        document_id: AggregateId,
        operational_period: String,
    },

    /// One section of an IAP document was edited.
    IapSectionUpdated {
        document_id: AggregateId,
        section: String,
        content: serde_json::Value,
    },

    /// An IAP document was published for the operational period.
    IapDocumentPublished { document_id: AggregateId },

    /// An official point-in-time snapshot of an IAP document was taken.
    OfficialSnapshotCreated {
        snapshot_id: SnapshotId,
        document_id: AggregateId,
    },
}

impl EventPayload {
    /// The kind discriminant of this payload.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::OperationCreated { .. } => EventKind::OperationCreated,
            EventPayload::SetupCompleted => EventKind::SetupCompleted,
            EventPayload::FacilityCreated { .. } => EventKind::FacilityCreated,
            EventPayload::FacilityUpdated { .. } => EventKind::FacilityUpdated,
            EventPayload::FacilityStatusChanged { .. } => EventKind::FacilityStatusChanged,
            EventPayload::PersonnelCreated { .. } => EventKind::PersonnelCreated,
            EventPayload::PersonnelUpdated { .. } => EventKind::PersonnelUpdated,
            EventPayload::PersonnelAssigned { .. } => EventKind::PersonnelAssigned,
            EventPayload::WorkAssignmentCreated { .. } => EventKind::WorkAssignmentCreated,
            EventPayload::WorkAssignmentUpdated { .. } => EventKind::WorkAssignmentUpdated,
            EventPayload::WorkAssignmentCompleted { .. } => EventKind::WorkAssignmentCompleted,
            EventPayload::GapCreated { .. } => EventKind::GapCreated,
            EventPayload::GapFilled { .. } => EventKind::GapFilled,
            EventPayload::IapDocumentCreated { .. } => EventKind::IapDocumentCreated,
            EventPayload::IapSectionUpdated { .. } => EventKind::IapSectionUpdated,
            EventPayload::IapDocumentPublished { .. } => EventKind::IapDocumentPublished,
            EventPayload::OfficialSnapshotCreated { .. } => EventKind::OfficialSnapshotCreated,
        }
    }

    /// The aggregate id this payload targets, if it targets one.
    ///
    /// Operation-level events (`OperationCreated`, `SetupCompleted`) return
    /// `None`; their aggregate id is the operation id itself.
    #[must_use]
    pub fn target_id(&self) -> Option<&AggregateId> {
        match self {
            EventPayload::OperationCreated { .. } | EventPayload::SetupCompleted => None,
            EventPayload::FacilityCreated { facility_id, .. }
            | EventPayload::FacilityUpdated { facility_id, .. }
            | EventPayload::FacilityStatusChanged { facility_id, .. } => Some(facility_id),
            EventPayload::PersonnelCreated { personnel_id, .. }
            | EventPayload::PersonnelUpdated { personnel_id, .. }
            | EventPayload::PersonnelAssigned { personnel_id, .. } => Some(personnel_id),
            EventPayload::WorkAssignmentCreated { assignment_id, .. }
            | EventPayload::WorkAssignmentUpdated { assignment_id, .. }
            | EventPayload::WorkAssignmentCompleted { assignment_id } => Some(assignment_id),
            EventPayload::GapCreated { gap_id, .. } | EventPayload::GapFilled { gap_id, .. } => {
                Some(gap_id)
            }
            EventPayload::IapDocumentCreated { document_id, .. }
            | EventPayload::IapSectionUpdated { document_id, .. }
            | EventPayload::IapDocumentPublished { document_id }
            | EventPayload::OfficialSnapshotCreated { document_id, .. } => Some(document_id),
        }
    }
}
