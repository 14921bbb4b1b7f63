//! # Reducers
//!
//! One pure function per event kind: `(prior state, payload) -> new
//! state`. Reducers never touch anything outside their own aggregate, so
//! a failure is isolated to the event that caused it.

use shared_types::{
    ActorId, AggregateId, AggregateKind, EventEnvelope, EventKind, FacilityChanges, FacilityKind,
    FacilityStatus, PersonnelChanges, ProjectionError, Section, Shift, SnapshotId,
    WorkAssignmentChanges,
};

use crate::domain::aggregates::{
    AggregateRecord, AssignmentStatus, FacilityRecord, GapRecord, GapStatus, IapDocumentRecord,
    IapStatus, OperationRecord, PersonnelRecord, PersonnelStatus, WorkAssignmentRecord,
};
use crate::domain::snapshot::Snapshot;

/// Event metadata every reducer needs: who, when, and what kind.
pub(crate) struct Fold<'a> {
    pub actor: &'a ActorId,
    pub wall_ms: u64,
    pub event_kind: EventKind,
}

impl<'a> Fold<'a> {
    pub(crate) fn of(event: &'a EventEnvelope) -> Self {
        Self {
            actor: &event.actor_id,
            wall_ms: event.timestamp.wall_ms,
            event_kind: event.kind(),
        }
    }

    fn missing(&self, kind: AggregateKind, id: &AggregateId) -> ProjectionError {
        ProjectionError::MissingAggregate {
            kind,
            id: id.clone(),
            event_kind: self.event_kind,
        }
    }

    fn bad(&self, reason: impl Into<String>) -> ProjectionError {
        ProjectionError::BadPayload {
            event_kind: self.event_kind,
            reason: reason.into(),
        }
    }
}

pub(crate) fn operation_created(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
    name: &str,
    disaster_number: Option<&str>,
) -> Result<AggregateRecord, ProjectionError> {
    if prior.is_some() {
        return Err(fold.bad(format!("operation {id} already created")));
    }
    Ok(AggregateRecord::Operation(OperationRecord {
        id: id.clone(),
        name: name.to_owned(),
        disaster_number: disaster_number.map(str::to_owned),
        setup_complete: false,
        created_at_ms: fold.wall_ms,
        updated_at_ms: fold.wall_ms,
        updated_by: fold.actor.clone(),
    }))
}

pub(crate) fn setup_completed(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_operation(prior, fold, id)?.clone();
    record.setup_complete = true;
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::Operation(record))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn facility_created(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    operation_id: &shared_types::OperationId,
    facility_id: &AggregateId,
    name: &str,
    kind: FacilityKind,
    address: Option<&str>,
    capacity: Option<u32>,
) -> Result<AggregateRecord, ProjectionError> {
    if prior.is_some() {
        return Err(fold.bad(format!("facility {facility_id} already created")));
    }
    Ok(AggregateRecord::Facility(FacilityRecord {
        id: facility_id.clone(),
        operation_id: operation_id.clone(),
        name: name.to_owned(),
        facility_type: kind,
        status: FacilityStatus::Planned,
        address: address.map(str::to_owned),
        capacity,
        notes: None,
        created_at_ms: fold.wall_ms,
        updated_at_ms: fold.wall_ms,
        updated_by: fold.actor.clone(),
    }))
}

pub(crate) fn facility_updated(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    facility_id: &AggregateId,
    changes: &FacilityChanges,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_facility(prior, fold, facility_id)?.clone();
    if let Some(name) = &changes.name {
        record.name = name.clone();
    }
    if let Some(address) = &changes.address {
        record.address = Some(address.clone());
    }
    if let Some(capacity) = changes.capacity {
        record.capacity = Some(capacity);
    }
    if let Some(notes) = &changes.notes {
        record.notes = Some(notes.clone());
    }
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::Facility(record))
}

pub(crate) fn facility_status_changed(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    facility_id: &AggregateId,
    status: FacilityStatus,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_facility(prior, fold, facility_id)?.clone();
    // Closed is terminal: the record stays queryable for auditability but
    // never transitions again.
    if record.status == FacilityStatus::Closed {
        return Err(fold.bad(format!("facility {facility_id} is closed")));
    }
    record.status = status;
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::Facility(record))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn personnel_created(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    operation_id: &shared_types::OperationId,
    personnel_id: &AggregateId,
    name: &str,
    role: &str,
    section: Option<Section>,
    contact: Option<&str>,
) -> Result<AggregateRecord, ProjectionError> {
    if prior.is_some() {
        return Err(fold.bad(format!("personnel {personnel_id} already created")));
    }
    Ok(AggregateRecord::Personnel(PersonnelRecord {
        id: personnel_id.clone(),
        operation_id: operation_id.clone(),
        name: name.to_owned(),
        role: role.to_owned(),
        section,
        contact: contact.map(str::to_owned),
        status: PersonnelStatus::Available,
        assigned_facility: None,
        shift: None,
        created_at_ms: fold.wall_ms,
        updated_at_ms: fold.wall_ms,
        updated_by: fold.actor.clone(),
    }))
}

pub(crate) fn personnel_updated(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    personnel_id: &AggregateId,
    changes: &PersonnelChanges,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_personnel(prior, fold, personnel_id)?.clone();
    if let Some(name) = &changes.name {
        record.name = name.clone();
    }
    if let Some(role) = &changes.role {
        record.role = role.clone();
    }
    if let Some(section) = changes.section {
        record.section = Some(section);
    }
    if let Some(contact) = &changes.contact {
        record.contact = Some(contact.clone());
    }
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::Personnel(record))
}

pub(crate) fn personnel_assigned(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    personnel_id: &AggregateId,
    facility_id: &AggregateId,
    shift: Option<Shift>,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_personnel(prior, fold, personnel_id)?.clone();
    record.status = PersonnelStatus::Assigned;
    record.assigned_facility = Some(facility_id.clone());
    record.shift = shift;
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::Personnel(record))
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn assignment_created(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    operation_id: &shared_types::OperationId,
    assignment_id: &AggregateId,
    facility_id: &AggregateId,
    role: &str,
    shift: Shift,
    personnel: &[AggregateId],
) -> Result<AggregateRecord, ProjectionError> {
    if prior.is_some() {
        return Err(fold.bad(format!("work assignment {assignment_id} already created")));
    }
    Ok(AggregateRecord::WorkAssignment(WorkAssignmentRecord {
        id: assignment_id.clone(),
        operation_id: operation_id.clone(),
        facility_id: facility_id.clone(),
        role: role.to_owned(),
        shift,
        personnel: personnel.to_vec(),
        status: AssignmentStatus::Open,
        created_at_ms: fold.wall_ms,
        updated_at_ms: fold.wall_ms,
        updated_by: fold.actor.clone(),
    }))
}

pub(crate) fn assignment_updated(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    assignment_id: &AggregateId,
    changes: &WorkAssignmentChanges,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_assignment(prior, fold, assignment_id)?.clone();
    if let Some(role) = &changes.role {
        record.role = role.clone();
    }
    if let Some(shift) = changes.shift {
        record.shift = shift;
    }
    if let Some(personnel) = &changes.personnel {
        record.personnel = personnel.clone();
    }
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::WorkAssignment(record))
}

pub(crate) fn assignment_completed(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    assignment_id: &AggregateId,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_assignment(prior, fold, assignment_id)?.clone();
    record.status = AssignmentStatus::Completed;
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::WorkAssignment(record))
}

pub(crate) fn gap_created(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    operation_id: &shared_types::OperationId,
    gap_id: &AggregateId,
    facility_id: &AggregateId,
    role: &str,
    shift: Shift,
) -> Result<AggregateRecord, ProjectionError> {
    if prior.is_some() {
        return Err(fold.bad(format!("gap {gap_id} already created")));
    }
    Ok(AggregateRecord::Gap(GapRecord {
        id: gap_id.clone(),
        operation_id: operation_id.clone(),
        facility_id: facility_id.clone(),
        role: role.to_owned(),
        shift,
        status: GapStatus::Open,
        filled_by: None,
        created_at_ms: fold.wall_ms,
        updated_at_ms: fold.wall_ms,
        updated_by: fold.actor.clone(),
    }))
}

pub(crate) fn gap_filled(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    gap_id: &AggregateId,
    personnel_id: &AggregateId,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_gap(prior, fold, gap_id)?.clone();
    record.status = GapStatus::Filled;
    record.filled_by = Some(personnel_id.clone());
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::Gap(record))
}

pub(crate) fn iap_document_created(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    operation_id: &shared_types::OperationId,
    document_id: &AggregateId,
    operational_period: &str,
) -> Result<AggregateRecord, ProjectionError> {
    if prior.is_some() {
        return Err(fold.bad(format!("IAP document {document_id} already created")));
    }
    Ok(AggregateRecord::IapDocument(IapDocumentRecord {
        id: document_id.clone(),
        operation_id: operation_id.clone(),
        operational_period: operational_period.to_owned(),
        sections: std::collections::BTreeMap::new(),
        status: IapStatus::Draft,
        snapshots: Vec::new(),
        created_at_ms: fold.wall_ms,
        updated_at_ms: fold.wall_ms,
        updated_by: fold.actor.clone(),
    }))
}

pub(crate) fn iap_section_updated(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    document_id: &AggregateId,
    section: &str,
    content: &serde_json::Value,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_document(prior, fold, document_id)?.clone();
    record
        .sections
        .insert(section.to_owned(), content.clone());
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::IapDocument(record))
}

pub(crate) fn iap_document_published(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    document_id: &AggregateId,
) -> Result<AggregateRecord, ProjectionError> {
    let mut record = expect_document(prior, fold, document_id)?.clone();
    record.status = IapStatus::Published;
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok(AggregateRecord::IapDocument(record))
}

/// Snapshot creation folds like any other event, but also yields the
/// frozen copy for the projector's snapshot registry. The version is
/// derived from the document itself (`snapshots.len() + 1`), which keeps
/// it monotonic and replay-deterministic.
pub(crate) fn official_snapshot_created(
    prior: Option<&AggregateRecord>,
    fold: &Fold<'_>,
    snapshot_id: SnapshotId,
    document_id: &AggregateId,
) -> Result<(AggregateRecord, Snapshot), ProjectionError> {
    let mut record = expect_document(prior, fold, document_id)?.clone();

    let snapshot = Snapshot {
        id: snapshot_id,
        version: record.snapshots.len() as u64 + 1,
        document_id: document_id.clone(),
        created_at_ms: fold.wall_ms,
        created_by: fold.actor.clone(),
        document: record.clone(),
    };

    record.snapshots.push(snapshot.to_ref());
    record.updated_at_ms = fold.wall_ms;
    record.updated_by = fold.actor.clone();
    Ok((AggregateRecord::IapDocument(record), snapshot))
}

// =============================================================================
// Typed access to the prior record
// =============================================================================

fn expect_operation<'a>(
    prior: Option<&'a AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
) -> Result<&'a OperationRecord, ProjectionError> {
    match prior {
        Some(AggregateRecord::Operation(record)) => Ok(record),
        Some(_) => Err(fold.bad(format!("{id} is not an operation"))),
        None => Err(fold.missing(AggregateKind::Operation, id)),
    }
}

fn expect_facility<'a>(
    prior: Option<&'a AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
) -> Result<&'a FacilityRecord, ProjectionError> {
    match prior {
        Some(AggregateRecord::Facility(record)) => Ok(record),
        Some(_) => Err(fold.bad(format!("{id} is not a facility"))),
        None => Err(fold.missing(AggregateKind::Facility, id)),
    }
}

fn expect_personnel<'a>(
    prior: Option<&'a AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
) -> Result<&'a PersonnelRecord, ProjectionError> {
    match prior {
        Some(AggregateRecord::Personnel(record)) => Ok(record),
        Some(_) => Err(fold.bad(format!("{id} is not a personnel record"))),
        None => Err(fold.missing(AggregateKind::Personnel, id)),
    }
}

fn expect_assignment<'a>(
    prior: Option<&'a AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
) -> Result<&'a WorkAssignmentRecord, ProjectionError> {
    match prior {
        Some(AggregateRecord::WorkAssignment(record)) => Ok(record),
        Some(_) => Err(fold.bad(format!("{id} is not a work assignment"))),
        None => Err(fold.missing(AggregateKind::WorkAssignment, id)),
    }
}

fn expect_gap<'a>(
    prior: Option<&'a AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
) -> Result<&'a GapRecord, ProjectionError> {
    match prior {
        Some(AggregateRecord::Gap(record)) => Ok(record),
        Some(_) => Err(fold.bad(format!("{id} is not a gap"))),
        None => Err(fold.missing(AggregateKind::Gap, id)),
    }
}

fn expect_document<'a>(
    prior: Option<&'a AggregateRecord>,
    fold: &Fold<'_>,
    id: &AggregateId,
) -> Result<&'a IapDocumentRecord, ProjectionError> {
    match prior {
        Some(AggregateRecord::IapDocument(record)) => Ok(record),
        Some(_) => Err(fold.bad(format!("{id} is not an IAP document"))),
        None => Err(fold.missing(AggregateKind::IapDocument, id)),
    }
}
