//! # Conflict Resolver Service
//!
//! Owns the pending queue and applies operator decisions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use oc_01_event_log::EventStore;
use oc_02_projector::AggregateRecord;
use oc_03_master_data::{MasterDataService, TimeSource};
use shared_bus::{CoreEvent, EventPublisher, InMemoryEventBus};
use shared_types::{
    ActorId, Conflict, ConflictId, ConflictState, ResolveError, Resolution,
};

use crate::detect;
use crate::resolution::events_for_resolution;

/// Queues detected conflicts and applies resolutions.
///
/// Conflicts never expire: once queued they stay queryable until an
/// operator resolves them, and stay on record (as resolved) afterwards.
pub struct ConflictResolver<S: EventStore> {
    master_data: Arc<MasterDataService<S>>,
    bus: Arc<InMemoryEventBus>,
    clock: Arc<dyn TimeSource>,
    conflicts: RwLock<HashMap<ConflictId, Conflict>>,
}

impl<S: EventStore> ConflictResolver<S> {
    /// Wire the resolver to its collaborators.
    pub fn new(
        master_data: Arc<MasterDataService<S>>,
        bus: Arc<InMemoryEventBus>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            master_data,
            bus,
            clock,
            conflicts: RwLock::new(HashMap::new()),
        }
    }

    /// Diff two versions of one entity; queue and announce the conflict
    /// if they diverge.
    pub fn detect_and_queue(
        &self,
        local: &AggregateRecord,
        remote: &AggregateRecord,
    ) -> Option<ConflictId> {
        let conflict = detect::detect(local, remote, self.clock.now_ms())?;
        Some(self.queue(conflict))
    }

    /// Queue an already-built conflict and announce it on the bus.
    pub fn queue(&self, conflict: Conflict) -> ConflictId {
        let id = conflict.id;
        info!(
            conflict = %id,
            entity = %conflict.entity_id,
            fields = ?conflict.diverging_fields,
            "conflict queued for operator"
        );
        self.conflicts.write().insert(id, conflict.clone());
        self.bus.publish(CoreEvent::ConflictDetected(conflict));
        id
    }

    /// All conflicts awaiting a decision, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<Conflict> {
        let mut pending: Vec<_> = self
            .conflicts
            .read()
            .values()
            .filter(|conflict| conflict.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|conflict| conflict.detected_at_ms);
        pending
    }

    /// One conflict, pending or resolved.
    #[must_use]
    pub fn get(&self, id: &ConflictId) -> Option<Conflict> {
        self.conflicts.read().get(id).cloned()
    }

    /// Apply an operator decision.
    ///
    /// `Local`/`Remote` re-apply the recorded side; `Merge` requires the
    /// operator's merged record. The chosen record becomes ordinary
    /// update events against the conflict's operation — history is never
    /// rewritten.
    pub fn resolve(
        &self,
        id: &ConflictId,
        decision: Resolution,
        merged: Option<serde_json::Value>,
        actor: &ActorId,
    ) -> Result<(), ResolveError> {
        let conflict = {
            let conflicts = self.conflicts.read();
            let conflict = conflicts
                .get(id)
                .ok_or_else(|| ResolveError::UnknownConflict(id.to_string()))?;
            if !conflict.is_pending() {
                return Err(ResolveError::AlreadyResolved(id.to_string()));
            }
            conflict.clone()
        };

        let chosen = match decision {
            Resolution::Local => conflict.local.clone(),
            Resolution::Remote => conflict.remote.clone(),
            Resolution::Merge => merged.ok_or(ResolveError::MergedPayloadRequired)?,
        };

        let resolved: AggregateRecord = serde_json::from_value(chosen)
            .map_err(|e| ResolveError::InvalidPayload(e.to_string()))?;
        if resolved.kind() != conflict.entity_kind || resolved.id() != &conflict.entity_id {
            return Err(ResolveError::InvalidPayload(format!(
                "payload targets {}/{}, conflict is {}/{}",
                resolved.kind(),
                resolved.id(),
                conflict.entity_kind,
                conflict.entity_id
            )));
        }

        let current = self
            .master_data
            .record_for(&conflict.operation_id, conflict.entity_kind, &conflict.entity_id)
            .ok_or_else(|| {
                ResolveError::InvalidPayload(format!(
                    "entity {} no longer projected",
                    conflict.entity_id
                ))
            })?;

        for payload in events_for_resolution(&current, &resolved, &conflict.diverging_fields) {
            self.master_data
                .apply_resolution(actor, conflict.operation_id.clone(), payload)
                .map_err(|e| {
                    warn!(conflict = %id, error = %e, "resolution event rejected");
                    ResolveError::Apply(e.to_string())
                })?;
        }

        if let Some(stored) = self.conflicts.write().get_mut(id) {
            stored.state = ConflictState::Resolved {
                decision,
                resolved_at_ms: self.clock.now_ms(),
            };
        }
        info!(conflict = %id, ?decision, "conflict resolved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oc_01_event_log::{EventLog, InMemoryEventStore};
    use oc_03_master_data::{EventFactory, ManualTimeSource};
    use shared_types::{
        AggregateId, AggregateKind, DeviceId, FacilityKind, OperationId, SessionId,
    };

    fn harness() -> (
        Arc<MasterDataService<InMemoryEventStore>>,
        ConflictResolver<InMemoryEventStore>,
        Arc<ManualTimeSource>,
    ) {
        let clock = Arc::new(ManualTimeSource::starting_at(1_000));
        let log = Arc::new(EventLog::new(InMemoryEventStore::new()));
        let bus = Arc::new(InMemoryEventBus::new());
        let factory = EventFactory::new(
            DeviceId::from("device-a"),
            SessionId::generate(),
            Arc::clone(&clock) as Arc<dyn TimeSource>,
        );
        let master_data = Arc::new(MasterDataService::new(log, Arc::clone(&bus), factory));
        let resolver = ConflictResolver::new(Arc::clone(&master_data), bus, clock.clone());
        (master_data, resolver, clock)
    }

    fn actor() -> ActorId {
        ActorId::from("operator-1")
    }

    fn seed_facility(master_data: &MasterDataService<InMemoryEventStore>) -> AggregateRecord {
        master_data
            .create_operation(&actor(), OperationId::from("op-1"), "DR-2026-041", None)
            .unwrap();
        master_data
            .create_facility(
                &actor(),
                AggregateId::from("f1"),
                "Shelter A",
                FacilityKind::Shelter,
                None,
                Some(120),
            )
            .unwrap()
    }

    fn divergent_copy(record: &AggregateRecord) -> AggregateRecord {
        let AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        let mut remote = facility.clone();
        remote.capacity = Some(80);
        remote.updated_at_ms = 99_000;
        AggregateRecord::Facility(remote)
    }

    #[test]
    fn queued_conflicts_stay_pending_until_resolved() {
        let (master_data, resolver, _) = harness();
        let local = seed_facility(&master_data);
        let remote = divergent_copy(&local);

        let id = resolver.detect_and_queue(&local, &remote).unwrap();
        assert_eq!(resolver.pending().len(), 1);
        assert!(resolver.get(&id).unwrap().is_pending());
    }

    #[test]
    fn resolve_remote_reapplies_remote_side_as_new_event() {
        let (master_data, resolver, _) = harness();
        let local = seed_facility(&master_data);
        let remote = divergent_copy(&local);
        let id = resolver.detect_and_queue(&local, &remote).unwrap();

        resolver
            .resolve(&id, Resolution::Remote, None, &actor())
            .unwrap();

        let record = master_data
            .record(AggregateKind::Facility, &AggregateId::from("f1"))
            .unwrap()
            .unwrap();
        let AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        assert_eq!(facility.capacity, Some(80));
        assert!(!resolver.get(&id).unwrap().is_pending());
        assert!(resolver.pending().is_empty());
    }

    #[test]
    fn merge_without_payload_is_rejected() {
        let (master_data, resolver, _) = harness();
        let local = seed_facility(&master_data);
        let remote = divergent_copy(&local);
        let id = resolver.detect_and_queue(&local, &remote).unwrap();

        let result = resolver.resolve(&id, Resolution::Merge, None, &actor());
        assert!(matches!(result, Err(ResolveError::MergedPayloadRequired)));
        // Still pending after the rejected call.
        assert_eq!(resolver.pending().len(), 1);
    }

    #[test]
    fn merge_applies_operator_payload() {
        let (master_data, resolver, _) = harness();
        let local = seed_facility(&master_data);
        let remote = divergent_copy(&local);
        let id = resolver.detect_and_queue(&local, &remote).unwrap();

        let AggregateRecord::Facility(facility) = &local else {
            panic!("expected facility");
        };
        let mut merged = facility.clone();
        merged.capacity = Some(100);
        let merged = serde_json::to_value(AggregateRecord::Facility(merged)).unwrap();

        resolver
            .resolve(&id, Resolution::Merge, Some(merged), &actor())
            .unwrap();

        let record = master_data
            .record(AggregateKind::Facility, &AggregateId::from("f1"))
            .unwrap()
            .unwrap();
        let AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        assert_eq!(facility.capacity, Some(100));
    }

    #[test]
    fn double_resolve_is_rejected() {
        let (master_data, resolver, _) = harness();
        let local = seed_facility(&master_data);
        let remote = divergent_copy(&local);
        let id = resolver.detect_and_queue(&local, &remote).unwrap();

        resolver
            .resolve(&id, Resolution::Local, None, &actor())
            .unwrap();
        let result = resolver.resolve(&id, Resolution::Remote, None, &actor());
        assert!(matches!(result, Err(ResolveError::AlreadyResolved(_))));
    }

    #[test]
    fn unknown_conflict_is_rejected() {
        let (_, resolver, _) = harness();
        let result = resolver.resolve(
            &ConflictId::generate(),
            Resolution::Local,
            None,
            &actor(),
        );
        assert!(matches!(result, Err(ResolveError::UnknownConflict(_))));
    }
}
