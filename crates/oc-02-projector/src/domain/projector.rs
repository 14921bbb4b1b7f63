//! # Projector Service
//!
//! Folds committed events into aggregates, tracks applied event ids for
//! idempotency, and owns the snapshot registry.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use shared_types::{
    AggregateId, AggregateKind, EventEnvelope, EventId, EventPayload, OperationId,
    ProjectionError, SnapshotId,
};

use crate::domain::aggregates::AggregateRecord;
use crate::domain::reducers::{self, Fold};
use crate::domain::snapshot::Snapshot;

/// Outcome of a successful `process_event` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// The event was folded into its aggregate.
    Applied,
    /// The event id was already applied to this aggregate; state is
    /// unchanged.
    Duplicate,
}

/// Counters maintained by the projector.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectorMetrics {
    applied: u64,
    duplicates: u64,
    skipped: u64,
}

impl ProjectorMetrics {
    /// Events folded into aggregates.
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Redelivered events ignored by id.
    #[must_use]
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Events whose reducer failed; logged and skipped.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

struct AggregateEntry {
    record: AggregateRecord,
    /// Every event id folded into this aggregate. Makes redelivery a
    /// no-op even when other events landed in between.
    applied: HashSet<EventId>,
    last_applied: Option<EventId>,
}

type AggregateKey = (OperationId, AggregateKind, AggregateId);

/// The deterministic projector.
///
/// Not internally locked: the owner (master data service or a test)
/// serializes access, matching the one-pipeline-per-event model.
#[derive(Default)]
pub struct Projector {
    aggregates: HashMap<AggregateKey, AggregateEntry>,
    snapshots: HashMap<SnapshotId, Snapshot>,
    metrics: ProjectorMetrics,
}

impl Projector {
    /// Create an empty projector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into its aggregate.
    ///
    /// Duplicate event ids (per aggregate) return
    /// [`ProjectionOutcome::Duplicate`] without touching state. Reducer
    /// failures are isolated: the error describes this event only and
    /// the projector remains usable for every other event.
    pub fn process_event(
        &mut self,
        event: &EventEnvelope,
    ) -> Result<ProjectionOutcome, ProjectionError> {
        let (kind, id) = Self::target(event);
        let key = (event.operation_id.clone(), kind, id.clone());

        if let Some(entry) = self.aggregates.get(&key) {
            if entry.applied.contains(&event.id) {
                self.metrics.duplicates += 1;
                debug!(event_id = %event.id, aggregate = %id, "duplicate event ignored");
                return Ok(ProjectionOutcome::Duplicate);
            }
        }

        let prior = self.aggregates.get(&key).map(|entry| &entry.record);
        let (record, snapshot) = Self::reduce(prior, event)?;

        let entry = self.aggregates.entry(key).or_insert_with(|| AggregateEntry {
            record: record.clone(),
            applied: HashSet::new(),
            last_applied: None,
        });
        entry.record = record;
        entry.applied.insert(event.id);
        entry.last_applied = Some(event.id);

        if let Some(snapshot) = snapshot {
            self.snapshots.insert(snapshot.id, snapshot);
        }

        self.metrics.applied += 1;
        Ok(ProjectionOutcome::Applied)
    }

    /// What this event would do to its aggregate, without applying it.
    ///
    /// Used by the sync layer to compare an incoming remote change
    /// against local state before deciding whether to raise a conflict.
    pub fn preview(&self, event: &EventEnvelope) -> Result<AggregateRecord, ProjectionError> {
        let (kind, id) = Self::target(event);
        let key = (event.operation_id.clone(), kind, id);
        let prior = self.aggregates.get(&key).map(|entry| &entry.record);
        Ok(Self::reduce(prior, event)?.0)
    }

    /// Fold a batch, logging and skipping reducer failures.
    ///
    /// Returns how many events were actually applied.
    pub fn process_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a EventEnvelope>,
    ) -> usize {
        let mut applied = 0;
        for event in events {
            match self.process_event(event) {
                Ok(ProjectionOutcome::Applied) => applied += 1,
                Ok(ProjectionOutcome::Duplicate) => {}
                Err(error) => {
                    self.metrics.skipped += 1;
                    warn!(event_id = %event.id, %error, "projection skipped");
                }
            }
        }
        applied
    }

    /// Rebuild a projector from scratch by replaying events in order.
    #[must_use]
    pub fn rebuild<'a>(events: impl IntoIterator<Item = &'a EventEnvelope>) -> Self {
        let mut projector = Self::new();
        projector.process_all(events);
        projector
    }

    /// Current state of one aggregate.
    #[must_use]
    pub fn get_aggregate(
        &self,
        operation_id: &OperationId,
        kind: AggregateKind,
        id: &AggregateId,
    ) -> Option<&AggregateRecord> {
        self.aggregates
            .get(&(operation_id.clone(), kind, id.clone()))
            .map(|entry| &entry.record)
    }

    /// All records of one kind within an operation, ordered by id.
    #[must_use]
    pub fn table(&self, operation_id: &OperationId, kind: AggregateKind) -> Vec<AggregateRecord> {
        let mut rows: Vec<_> = self
            .aggregates
            .iter()
            .filter(|((op, k, _), _)| op == operation_id && *k == kind)
            .map(|(_, entry)| entry.record.clone())
            .collect();
        rows.sort_by(|a, b| a.id().cmp(b.id()));
        rows
    }

    /// An issued snapshot, by id.
    #[must_use]
    pub fn snapshot(&self, id: &SnapshotId) -> Option<&Snapshot> {
        self.snapshots.get(id)
    }

    /// The id of the last event folded into an aggregate.
    #[must_use]
    pub fn last_applied(
        &self,
        operation_id: &OperationId,
        kind: AggregateKind,
        id: &AggregateId,
    ) -> Option<EventId> {
        self.aggregates
            .get(&(operation_id.clone(), kind, id.clone()))
            .and_then(|entry| entry.last_applied)
    }

    /// Counters for status reporting.
    #[must_use]
    pub fn metrics(&self) -> ProjectorMetrics {
        self.metrics
    }

    /// The aggregate a payload targets. Operation-level events fold into
    /// the operation aggregate whose id is the operation id itself.
    #[must_use]
    pub fn target(event: &EventEnvelope) -> (AggregateKind, AggregateId) {
        match event.payload.target_id() {
            Some(id) => (Self::kind_of(&event.payload), id.clone()),
            None => (
                AggregateKind::Operation,
                AggregateId::new(event.operation_id.0.clone()),
            ),
        }
    }

    /// Run the reducer for one event against a prior state.
    fn reduce(
        prior: Option<&AggregateRecord>,
        event: &EventEnvelope,
    ) -> Result<(AggregateRecord, Option<Snapshot>), ProjectionError> {
        let fold = Fold::of(event);
        let (_, target_id) = Self::target(event);

        let result = match &event.payload {
            EventPayload::OperationCreated {
                name,
                disaster_number,
            } => (
                reducers::operation_created(
                    prior,
                    &fold,
                    &target_id,
                    name,
                    disaster_number.as_deref(),
                )?,
                None,
            ),
            EventPayload::SetupCompleted => {
                (reducers::setup_completed(prior, &fold, &target_id)?, None)
            }
            EventPayload::FacilityCreated {
                facility_id,
                name,
                kind,
                address,
                capacity,
            } => (
                reducers::facility_created(
                    prior,
                    &fold,
                    &event.operation_id,
                    facility_id,
                    name,
                    *kind,
                    address.as_deref(),
                    *capacity,
                )?,
                None,
            ),
            EventPayload::FacilityUpdated {
                facility_id,
                changes,
            } => (
                reducers::facility_updated(prior, &fold, facility_id, changes)?,
                None,
            ),
            EventPayload::FacilityStatusChanged {
                facility_id,
                status,
            } => (
                reducers::facility_status_changed(prior, &fold, facility_id, *status)?,
                None,
            ),
            EventPayload::PersonnelCreated {
                personnel_id,
                name,
                role,
                section,
                contact,
            } => (
                reducers::personnel_created(
                    prior,
                    &fold,
                    &event.operation_id,
                    personnel_id,
                    name,
                    role,
                    *section,
                    contact.as_deref(),
                )?,
                None,
            ),
            EventPayload::PersonnelUpdated {
                personnel_id,
                changes,
            } => (
                reducers::personnel_updated(prior, &fold, personnel_id, changes)?,
                None,
            ),
            EventPayload::PersonnelAssigned {
                personnel_id,
                facility_id,
                shift,
            } => (
                reducers::personnel_assigned(prior, &fold, personnel_id, facility_id, *shift)?,
                None,
            ),
            EventPayload::WorkAssignmentCreated {
                assignment_id,
                facility_id,
                role,
                shift,
                personnel,
            } => (
                reducers::assignment_created(
                    prior,
                    &fold,
                    &event.operation_id,
                    assignment_id,
                    facility_id,
                    role,
                    *shift,
                    personnel,
                )?,
                None,
            ),
            EventPayload::WorkAssignmentUpdated {
                assignment_id,
                changes,
            } => (
                reducers::assignment_updated(prior, &fold, assignment_id, changes)?,
                None,
            ),
            EventPayload::WorkAssignmentCompleted { assignment_id } => (
                reducers::assignment_completed(prior, &fold, assignment_id)?,
                None,
            ),
            EventPayload::GapCreated {
                gap_id,
                facility_id,
                role,
                shift,
            } => (
                reducers::gap_created(
                    prior,
                    &fold,
                    &event.operation_id,
                    gap_id,
                    facility_id,
                    role,
                    *shift,
                )?,
                None,
            ),
            EventPayload::GapFilled {
                gap_id,
                personnel_id,
            } => (
                reducers::gap_filled(prior, &fold, gap_id, personnel_id)?,
                None,
            ),
            EventPayload::IapDocumentCreated {
                document_id,
                operational_period,
            } => (
                reducers::iap_document_created(
                    prior,
                    &fold,
                    &event.operation_id,
                    document_id,
                    operational_period,
                )?,
                None,
            ),
            EventPayload::IapSectionUpdated {
                document_id,
                section,
                content,
            } => (
                reducers::iap_section_updated(prior, &fold, document_id, section, content)?,
                None,
            ),
            EventPayload::IapDocumentPublished { document_id } => (
                reducers::iap_document_published(prior, &fold, document_id)?,
                None,
            ),
            EventPayload::OfficialSnapshotCreated {
                snapshot_id,
                document_id,
            } => {
                let (record, snapshot) =
                    reducers::official_snapshot_created(prior, &fold, *snapshot_id, document_id)?;
                (record, Some(snapshot))
            }
        };
        Ok(result)
    }

    fn kind_of(payload: &EventPayload) -> AggregateKind {
        match payload {
            EventPayload::OperationCreated { .. } | EventPayload::SetupCompleted => {
                AggregateKind::Operation
            }
            EventPayload::FacilityCreated { .. }
            | EventPayload::FacilityUpdated { .. }
            | EventPayload::FacilityStatusChanged { .. } => AggregateKind::Facility,
            EventPayload::PersonnelCreated { .. }
            | EventPayload::PersonnelUpdated { .. }
            | EventPayload::PersonnelAssigned { .. } => AggregateKind::Personnel,
            EventPayload::WorkAssignmentCreated { .. }
            | EventPayload::WorkAssignmentUpdated { .. }
            | EventPayload::WorkAssignmentCompleted { .. } => AggregateKind::WorkAssignment,
            EventPayload::GapCreated { .. } | EventPayload::GapFilled { .. } => AggregateKind::Gap,
            EventPayload::IapDocumentCreated { .. }
            | EventPayload::IapSectionUpdated { .. }
            | EventPayload::IapDocumentPublished { .. }
            | EventPayload::OfficialSnapshotCreated { .. } => AggregateKind::IapDocument,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        ActorId, DeviceId, EventTimestamp, FacilityChanges, FacilityKind, FacilityStatus,
        SessionId, SyncStatus, SCHEMA_VERSION,
    };

    fn envelope(wall_ms: u64, sequence: u64, payload: EventPayload) -> EventEnvelope {
        EventEnvelope {
            id: EventId::generate(),
            operation_id: OperationId::from("op-1"),
            actor_id: ActorId::from("actor-1"),
            payload,
            timestamp: EventTimestamp::new(wall_ms, sequence),
            schema_version: SCHEMA_VERSION,
            device_id: DeviceId::from("device-a"),
            session_id: SessionId::generate(),
            sync_status: SyncStatus::Local,
            sync_attempts: 0,
        }
    }

    fn facility_created(wall_ms: u64, sequence: u64) -> EventEnvelope {
        envelope(
            wall_ms,
            sequence,
            EventPayload::FacilityCreated {
                facility_id: AggregateId::from("f1"),
                name: "Shelter A".to_owned(),
                kind: FacilityKind::Shelter,
                address: None,
                capacity: Some(120),
            },
        )
    }

    fn op() -> OperationId {
        OperationId::from("op-1")
    }

    #[test]
    fn create_then_update_folds_both() {
        let mut projector = Projector::new();
        projector.process_event(&facility_created(100, 1)).unwrap();
        projector
            .process_event(&envelope(
                200,
                2,
                EventPayload::FacilityStatusChanged {
                    facility_id: AggregateId::from("f1"),
                    status: FacilityStatus::Closed,
                },
            ))
            .unwrap();

        let record = projector
            .get_aggregate(&op(), AggregateKind::Facility, &AggregateId::from("f1"))
            .unwrap();
        let AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        assert_eq!(facility.name, "Shelter A");
        assert_eq!(facility.status, FacilityStatus::Closed);
        assert_eq!(facility.updated_at_ms, 200);
    }

    #[test]
    fn duplicate_event_id_is_a_noop() {
        let mut projector = Projector::new();
        let create = facility_created(100, 1);
        let mut update = envelope(
            200,
            2,
            EventPayload::FacilityUpdated {
                facility_id: AggregateId::from("f1"),
                changes: FacilityChanges {
                    capacity: Some(80),
                    ..FacilityChanges::default()
                },
            },
        );
        projector.process_event(&create).unwrap();
        assert_eq!(
            projector.process_event(&update).unwrap(),
            ProjectionOutcome::Applied
        );

        // Redeliver the same update with a different capacity: the id
        // wins, the content is ignored.
        if let EventPayload::FacilityUpdated { changes, .. } = &mut update.payload {
            changes.capacity = Some(9999);
        }
        assert_eq!(
            projector.process_event(&update).unwrap(),
            ProjectionOutcome::Duplicate
        );

        let record = projector
            .get_aggregate(&op(), AggregateKind::Facility, &AggregateId::from("f1"))
            .unwrap();
        let AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        assert_eq!(facility.capacity, Some(80));
        assert_eq!(projector.metrics().duplicates(), 1);
    }

    #[test]
    fn update_without_create_is_skipped_not_accepted() {
        let mut projector = Projector::new();
        let update = envelope(
            200,
            1,
            EventPayload::FacilityStatusChanged {
                facility_id: AggregateId::from("f1"),
                status: FacilityStatus::Closed,
            },
        );

        let error = projector.process_event(&update).unwrap_err();
        assert!(matches!(error, ProjectionError::MissingAggregate { .. }));
        assert!(projector
            .get_aggregate(&op(), AggregateKind::Facility, &AggregateId::from("f1"))
            .is_none());

        // The failure is isolated: the projector still folds new events.
        projector.process_event(&facility_created(300, 2)).unwrap();
    }

    #[test]
    fn preview_does_not_mutate_state() {
        let mut projector = Projector::new();
        projector.process_event(&facility_created(100, 1)).unwrap();

        let update = envelope(
            200,
            2,
            EventPayload::FacilityUpdated {
                facility_id: AggregateId::from("f1"),
                changes: FacilityChanges {
                    capacity: Some(80),
                    ..FacilityChanges::default()
                },
            },
        );

        let previewed = projector.preview(&update).unwrap();
        let AggregateRecord::Facility(previewed) = previewed else {
            panic!("expected facility");
        };
        assert_eq!(previewed.capacity, Some(80));

        // The live aggregate is untouched.
        let record = projector
            .get_aggregate(&op(), AggregateKind::Facility, &AggregateId::from("f1"))
            .unwrap();
        let AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        assert_eq!(facility.capacity, Some(120));
    }

    #[test]
    fn rebuild_equals_incremental_application() {
        let events = vec![
            envelope(
                50,
                1,
                EventPayload::OperationCreated {
                    name: "DR-2026-041".to_owned(),
                    disaster_number: Some("DR-2026-041".to_owned()),
                },
            ),
            facility_created(100, 2),
            envelope(
                200,
                3,
                EventPayload::FacilityUpdated {
                    facility_id: AggregateId::from("f1"),
                    changes: FacilityChanges {
                        notes: Some("overnight capacity only".to_owned()),
                        ..FacilityChanges::default()
                    },
                },
            ),
        ];

        let mut incremental = Projector::new();
        for event in &events {
            incremental.process_event(event).unwrap();
        }
        let rebuilt = Projector::rebuild(events.iter());

        for kind in [AggregateKind::Operation, AggregateKind::Facility] {
            assert_eq!(incremental.table(&op(), kind), rebuilt.table(&op(), kind));
        }
    }

    #[test]
    fn snapshot_is_immutable_under_later_edits() {
        let mut projector = Projector::new();
        let snapshot_id = SnapshotId::generate();

        projector
            .process_event(&envelope(
                100,
                1,
                EventPayload::IapDocumentCreated {
                    document_id: AggregateId::from("iap-1"),
                    operational_period: "2026-08-07 18:00".to_owned(),
                },
            ))
            .unwrap();
        projector
            .process_event(&envelope(
                150,
                2,
                EventPayload::IapSectionUpdated {
                    document_id: AggregateId::from("iap-1"),
                    section: "objectives".to_owned(),
                    content: serde_json::json!({"text": "open two shelters"}),
                },
            ))
            .unwrap();
        projector
            .process_event(&envelope(
                200,
                3,
                EventPayload::OfficialSnapshotCreated {
                    snapshot_id,
                    document_id: AggregateId::from("iap-1"),
                },
            ))
            .unwrap();

        // Edit the live document after the snapshot.
        projector
            .process_event(&envelope(
                300,
                4,
                EventPayload::IapSectionUpdated {
                    document_id: AggregateId::from("iap-1"),
                    section: "objectives".to_owned(),
                    content: serde_json::json!({"text": "open five shelters"}),
                },
            ))
            .unwrap();

        let snapshot = projector.snapshot(&snapshot_id).unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(
            snapshot.document.sections["objectives"],
            serde_json::json!({"text": "open two shelters"})
        );
    }

    #[test]
    fn snapshot_versions_increase_per_document() {
        let mut projector = Projector::new();
        projector
            .process_event(&envelope(
                100,
                1,
                EventPayload::IapDocumentCreated {
                    document_id: AggregateId::from("iap-1"),
                    operational_period: "period 1".to_owned(),
                },
            ))
            .unwrap();

        let first = SnapshotId::generate();
        let second = SnapshotId::generate();
        for (sequence, id) in [(2u64, first), (3u64, second)] {
            projector
                .process_event(&envelope(
                    100 + sequence,
                    sequence,
                    EventPayload::OfficialSnapshotCreated {
                        snapshot_id: id,
                        document_id: AggregateId::from("iap-1"),
                    },
                ))
                .unwrap();
        }

        assert_eq!(projector.snapshot(&first).unwrap().version, 1);
        assert_eq!(projector.snapshot(&second).unwrap().version, 2);
    }

    #[test]
    fn operations_fold_into_their_own_aggregate() {
        let mut projector = Projector::new();
        projector
            .process_event(&envelope(
                50,
                1,
                EventPayload::OperationCreated {
                    name: "DR-2026-041".to_owned(),
                    disaster_number: None,
                },
            ))
            .unwrap();
        projector
            .process_event(&envelope(60, 2, EventPayload::SetupCompleted))
            .unwrap();

        let record = projector
            .get_aggregate(&op(), AggregateKind::Operation, &AggregateId::from("op-1"))
            .unwrap();
        let AggregateRecord::Operation(operation) = record else {
            panic!("expected operation");
        };
        assert!(operation.setup_complete);
    }
}
