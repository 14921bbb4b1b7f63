//! # Master Data Service
//!
//! Mutation entry points and the subscription API.
//!
//! ## Apply Pipeline
//!
//! Every mutation runs the same logical unit under one commit lock:
//!
//! ```text
//! build event -> append to log -> fold into projector
//!             -> notify table/record subscribers -> publish to bus
//! ```
//!
//! The commit lock serializes pipelines, so all subscribers of one
//! operation observe the same ordered sequence of updates, and no two
//! pipelines touch the same aggregate concurrently.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use oc_01_event_log::{EventLog, EventStore};
use oc_02_projector::{AggregateRecord, ProjectionOutcome, Projector, Snapshot};
use shared_bus::{CoreEvent, EventPublisher, InMemoryEventBus};
use shared_types::{
    ActorId, AggregateId, AggregateKind, EventEnvelope, EventPayload, FacilityChanges,
    FacilityKind, FacilityStatus, OperationId, PersonnelChanges, Section, Shift, SnapshotId,
    WorkAssignmentChanges, SCHEMA_VERSION,
};

use crate::errors::MutationError;
use crate::factory::EventFactory;
use crate::subscriptions::{SharedRegistry, SubscriptionRegistry};
use crate::SubscriptionGuard;

/// The single source of truth consumed by all UI surfaces.
pub struct MasterDataService<S: EventStore> {
    log: Arc<EventLog<S>>,
    projector: RwLock<Projector>,
    bus: Arc<InMemoryEventBus>,
    registry: SharedRegistry,
    factory: EventFactory,
    current_operation: RwLock<Option<OperationId>>,
    /// Serializes apply pipelines end to end, notification included.
    commit_lock: Mutex<()>,
}

impl<S: EventStore> MasterDataService<S> {
    /// Wire the service to its collaborators.
    pub fn new(log: Arc<EventLog<S>>, bus: Arc<InMemoryEventBus>, factory: EventFactory) -> Self {
        Self {
            log,
            projector: RwLock::new(Projector::new()),
            bus,
            registry: Arc::new(RwLock::new(SubscriptionRegistry::default())),
            factory,
            current_operation: RwLock::new(None),
            commit_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // OPERATION CONTEXT
    // =========================================================================

    /// The operation all entry points currently target.
    #[must_use]
    pub fn current_operation_id(&self) -> Option<OperationId> {
        self.current_operation.read().clone()
    }

    /// Switch the current operation.
    ///
    /// Existing subscriptions stay registered under the operation they
    /// were created for and simply stop firing; they neither leak nor
    /// receive the new operation's data.
    pub fn set_current_operation(&self, operation_id: OperationId) {
        *self.current_operation.write() = Some(operation_id);
    }

    /// Rebuild the projector by replaying an operation's full log, then
    /// make it the current operation. Used at startup and after a bulk
    /// remote catch-up.
    pub fn open_operation(&self, operation_id: OperationId) -> Result<usize, MutationError> {
        let events = self.log.replay(&operation_id, None)?;
        let applied = {
            let _commit = self.commit_lock.lock();
            self.projector.write().process_all(events.iter())
        };
        *self.current_operation.write() = Some(operation_id);
        Ok(applied)
    }

    // =========================================================================
    // SUBSCRIPTION API
    // =========================================================================

    /// Subscribe to every change of one table under the current
    /// operation. The callback receives the full post-mutation row set.
    pub fn subscribe_to_table(
        &self,
        kind: AggregateKind,
        callback: impl Fn(&[AggregateRecord]) + Send + Sync + 'static,
    ) -> Result<SubscriptionGuard, MutationError> {
        let operation_id = self.require_operation()?;
        Ok(SubscriptionRegistry::subscribe_table(
            &self.registry,
            operation_id,
            kind,
            Box::new(callback),
        ))
    }

    /// Subscribe to changes of one record under the current operation.
    pub fn subscribe_to_record(
        &self,
        kind: AggregateKind,
        record_id: AggregateId,
        callback: impl Fn(&AggregateRecord) + Send + Sync + 'static,
    ) -> Result<SubscriptionGuard, MutationError> {
        let operation_id = self.require_operation()?;
        Ok(SubscriptionRegistry::subscribe_record(
            &self.registry,
            operation_id,
            kind,
            record_id,
            Box::new(callback),
        ))
    }

    // =========================================================================
    // READ API
    // =========================================================================

    /// All rows of one table under the current operation, ordered by id.
    pub fn table(&self, kind: AggregateKind) -> Result<Vec<AggregateRecord>, MutationError> {
        let operation_id = self.require_operation()?;
        Ok(self.projector.read().table(&operation_id, kind))
    }

    /// One record under the current operation.
    pub fn record(
        &self,
        kind: AggregateKind,
        id: &AggregateId,
    ) -> Result<Option<AggregateRecord>, MutationError> {
        let operation_id = self.require_operation()?;
        Ok(self
            .projector
            .read()
            .get_aggregate(&operation_id, kind, id)
            .cloned())
    }

    /// One record under an explicit operation. The sync layer uses this
    /// to look up local state for incoming remote events.
    #[must_use]
    pub fn record_for(
        &self,
        operation_id: &OperationId,
        kind: AggregateKind,
        id: &AggregateId,
    ) -> Option<AggregateRecord> {
        self.projector
            .read()
            .get_aggregate(operation_id, kind, id)
            .cloned()
    }

    /// What an event would do to its aggregate, without applying it.
    /// The sync layer compares this against local state when deciding
    /// whether to raise a conflict.
    pub fn preview_event(
        &self,
        event: &EventEnvelope,
    ) -> Result<AggregateRecord, shared_types::ProjectionError> {
        self.projector.read().preview(event)
    }

    /// An issued snapshot, by id.
    #[must_use]
    pub fn snapshot(&self, id: &SnapshotId) -> Option<Snapshot> {
        self.projector.read().snapshot(id).cloned()
    }

    // =========================================================================
    // MUTATION ENTRY POINTS
    // =========================================================================

    /// Open a new operation and make it current.
    pub fn create_operation(
        &self,
        actor: &ActorId,
        operation_id: OperationId,
        name: &str,
        disaster_number: Option<&str>,
    ) -> Result<AggregateRecord, MutationError> {
        let record = self.commit_for(
            operation_id.clone(),
            actor,
            EventPayload::OperationCreated {
                name: name.to_owned(),
                disaster_number: disaster_number.map(str::to_owned),
            },
        )?;
        *self.current_operation.write() = Some(operation_id);
        Ok(record)
    }

    /// Mark initial setup of the current operation complete.
    pub fn complete_setup(&self, actor: &ActorId) -> Result<AggregateRecord, MutationError> {
        self.commit(actor, EventPayload::SetupCompleted)
    }

    /// Add a facility.
    pub fn create_facility(
        &self,
        actor: &ActorId,
        facility_id: AggregateId,
        name: &str,
        kind: FacilityKind,
        address: Option<&str>,
        capacity: Option<u32>,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::FacilityCreated {
                facility_id,
                name: name.to_owned(),
                kind,
                address: address.map(str::to_owned),
                capacity,
            },
        )
    }

    /// Edit facility fields.
    pub fn update_facility(
        &self,
        actor: &ActorId,
        facility_id: AggregateId,
        changes: FacilityChanges,
    ) -> Result<AggregateRecord, MutationError> {
        if changes.is_empty() {
            return Err(MutationError::EmptyChanges);
        }
        self.commit(
            actor,
            EventPayload::FacilityUpdated {
                facility_id,
                changes,
            },
        )
    }

    /// Move a facility through its lifecycle.
    pub fn change_facility_status(
        &self,
        actor: &ActorId,
        facility_id: AggregateId,
        status: FacilityStatus,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::FacilityStatusChanged {
                facility_id,
                status,
            },
        )
    }

    /// Add a responder to the roster.
    pub fn create_personnel(
        &self,
        actor: &ActorId,
        personnel_id: AggregateId,
        name: &str,
        role: &str,
        section: Option<Section>,
        contact: Option<&str>,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::PersonnelCreated {
                personnel_id,
                name: name.to_owned(),
                role: role.to_owned(),
                section,
                contact: contact.map(str::to_owned),
            },
        )
    }

    /// Edit a roster entry.
    pub fn update_personnel(
        &self,
        actor: &ActorId,
        personnel_id: AggregateId,
        changes: PersonnelChanges,
    ) -> Result<AggregateRecord, MutationError> {
        if changes.is_empty() {
            return Err(MutationError::EmptyChanges);
        }
        self.commit(
            actor,
            EventPayload::PersonnelUpdated {
                personnel_id,
                changes,
            },
        )
    }

    /// Assign a responder to a facility.
    pub fn assign_personnel(
        &self,
        actor: &ActorId,
        personnel_id: AggregateId,
        facility_id: AggregateId,
        shift: Option<Shift>,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::PersonnelAssigned {
                personnel_id,
                facility_id,
                shift,
            },
        )
    }

    /// Open a work assignment.
    pub fn create_work_assignment(
        &self,
        actor: &ActorId,
        assignment_id: AggregateId,
        facility_id: AggregateId,
        role: &str,
        shift: Shift,
        personnel: Vec<AggregateId>,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::WorkAssignmentCreated {
                assignment_id,
                facility_id,
                role: role.to_owned(),
                shift,
                personnel,
            },
        )
    }

    /// Edit a work assignment.
    pub fn update_work_assignment(
        &self,
        actor: &ActorId,
        assignment_id: AggregateId,
        changes: WorkAssignmentChanges,
    ) -> Result<AggregateRecord, MutationError> {
        if changes.is_empty() {
            return Err(MutationError::EmptyChanges);
        }
        self.commit(
            actor,
            EventPayload::WorkAssignmentUpdated {
                assignment_id,
                changes,
            },
        )
    }

    /// Complete a work assignment.
    pub fn complete_work_assignment(
        &self,
        actor: &ActorId,
        assignment_id: AggregateId,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(actor, EventPayload::WorkAssignmentCompleted { assignment_id })
    }

    /// Record a staffing gap.
    pub fn create_gap(
        &self,
        actor: &ActorId,
        gap_id: AggregateId,
        facility_id: AggregateId,
        role: &str,
        shift: Shift,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::GapCreated {
                gap_id,
                facility_id,
                role: role.to_owned(),
                shift,
            },
        )
    }

    /// Fill a staffing gap.
    pub fn fill_gap(
        &self,
        actor: &ActorId,
        gap_id: AggregateId,
        personnel_id: AggregateId,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::GapFilled {
                gap_id,
                personnel_id,
            },
        )
    }

    /// Start an IAP document for an operational period.
    pub fn create_iap_document(
        &self,
        actor: &ActorId,
        document_id: AggregateId,
        operational_period: &str,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::IapDocumentCreated {
                document_id,
                operational_period: operational_period.to_owned(),
            },
        )
    }

    /// Edit one section of an IAP document.
    pub fn update_iap_section(
        &self,
        actor: &ActorId,
        document_id: AggregateId,
        section: &str,
        content: serde_json::Value,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(
            actor,
            EventPayload::IapSectionUpdated {
                document_id,
                section: section.to_owned(),
                content,
            },
        )
    }

    /// Publish an IAP document.
    pub fn publish_iap_document(
        &self,
        actor: &ActorId,
        document_id: AggregateId,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit(actor, EventPayload::IapDocumentPublished { document_id })
    }

    /// Take an official, immutable snapshot of an IAP document.
    pub fn create_official_snapshot(
        &self,
        document_id: AggregateId,
        actor: &ActorId,
    ) -> Result<Snapshot, MutationError> {
        let snapshot_id = SnapshotId::generate();
        self.commit(
            actor,
            EventPayload::OfficialSnapshotCreated {
                snapshot_id,
                document_id,
            },
        )?;
        self.snapshot(&snapshot_id)
            .ok_or(MutationError::SnapshotMissing(snapshot_id))
    }

    // =========================================================================
    // SYNC INTEGRATION
    // =========================================================================

    /// Commit a resolution event produced by the conflict resolver.
    ///
    /// Resolutions never rewrite history: the chosen side re-enters the
    /// log as a brand-new event against the conflict's operation.
    pub fn apply_resolution(
        &self,
        actor: &ActorId,
        operation_id: OperationId,
        payload: EventPayload,
    ) -> Result<AggregateRecord, MutationError> {
        self.commit_for(operation_id, actor, payload)
    }

    /// Replay an event received from the remote channel through the same
    /// append + project + notify pipeline as local mutations.
    ///
    /// Idempotent end to end: a redelivered event neither duplicates log
    /// entries nor re-notifies subscribers.
    pub fn apply_remote_event(
        &self,
        event: &EventEnvelope,
    ) -> Result<ProjectionOutcome, MutationError> {
        if event.schema_version > SCHEMA_VERSION {
            return Err(MutationError::UnsupportedSchema {
                received: event.schema_version,
                supported: SCHEMA_VERSION,
            });
        }

        let _commit = self.commit_lock.lock();
        self.log.append(event)?;

        let outcome = self.projector.write().process_event(event);
        match outcome {
            Ok(ProjectionOutcome::Applied) => {
                self.notify_subscribers(event);
                self.bus.publish(CoreEvent::EventCommitted(event.clone()));
                Ok(ProjectionOutcome::Applied)
            }
            Ok(ProjectionOutcome::Duplicate) => {
                debug!(event_id = %event.id, "remote event already applied");
                Ok(ProjectionOutcome::Duplicate)
            }
            Err(error) => {
                warn!(event_id = %event.id, %error, "remote event skipped by projector");
                Err(error.into())
            }
        }
    }

    // =========================================================================
    // PIPELINE INTERNALS
    // =========================================================================

    fn require_operation(&self) -> Result<OperationId, MutationError> {
        self.current_operation
            .read()
            .clone()
            .ok_or(MutationError::NoCurrentOperation)
    }

    /// Build and commit an event against the current operation.
    fn commit(
        &self,
        actor: &ActorId,
        payload: EventPayload,
    ) -> Result<AggregateRecord, MutationError> {
        let operation_id = self.require_operation()?;
        self.commit_for(operation_id, actor, payload)
    }

    /// Build and commit an event against an explicit operation.
    fn commit_for(
        &self,
        operation_id: OperationId,
        actor: &ActorId,
        payload: EventPayload,
    ) -> Result<AggregateRecord, MutationError> {
        let event = self
            .factory
            .build(operation_id, actor.clone(), payload);

        let _commit = self.commit_lock.lock();
        self.log.append(&event)?;

        // The log has accepted the event regardless of what the reducer
        // thinks of it; a projection failure surfaces to the caller with
        // state unchanged.
        if let Err(error) = self.projector.write().process_event(&event) {
            warn!(event_id = %event.id, %error, "projection skipped");
            return Err(error.into());
        }

        let record = self.notify_subscribers(&event);
        self.bus.publish(CoreEvent::EventCommitted(event.clone()));

        match record {
            Some(record) => Ok(record),
            // Unreachable in practice: the projector just applied this
            // event, so the aggregate exists.
            None => {
                let (kind, id) = Projector::target(&event);
                Err(MutationError::Projection(
                    shared_types::ProjectionError::MissingAggregate {
                        kind,
                        id,
                        event_kind: event.kind(),
                    },
                ))
            }
        }
    }

    /// Deliver post-mutation state to subscribers. Returns the affected
    /// record.
    fn notify_subscribers(&self, event: &EventEnvelope) -> Option<AggregateRecord> {
        let (kind, id) = Projector::target(event);
        let (rows, record) = {
            let projector = self.projector.read();
            (
                projector.table(&event.operation_id, kind),
                projector
                    .get_aggregate(&event.operation_id, kind, &id)
                    .cloned(),
            )
        };

        let record = record?;
        let delivered = self
            .registry
            .read()
            .notify(&event.operation_id, kind, &rows, &record);
        debug!(event_id = %event.id, table = %kind, delivered, "subscribers notified");
        Some(record)
    }
}
