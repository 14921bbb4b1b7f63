//! # Resolution Events
//!
//! Translates an operator's decision back into domain events. The
//! chosen side never replaces state directly — it re-enters the log as
//! ordinary update events, so every client (this one and its peers)
//! converges through the same replay path.

use oc_02_projector::{AggregateRecord, AssignmentStatus, GapStatus, IapStatus};
use shared_types::{
    EventPayload, FacilityChanges, FacilityStatus, PersonnelChanges, WorkAssignmentChanges,
};

/// Events asserting the chosen record's values for every diverging
/// field.
///
/// `fields` is the conflict's diverging-field list: each updatable field
/// in it is re-asserted even when it already matches local state, so the
/// resolution also reaches peers holding the other side. `current` (the
/// live local record) only guards status transitions. Creation-only
/// fields and a kind mismatch yield no events.
#[must_use]
pub fn events_for_resolution(
    current: &AggregateRecord,
    resolved: &AggregateRecord,
    fields: &[String],
) -> Vec<EventPayload> {
    let wants = |field: &str| fields.iter().any(|f| f == field);
    let mut events = Vec::new();

    match (current, resolved) {
        (AggregateRecord::Facility(current), AggregateRecord::Facility(resolved)) => {
            let changes = FacilityChanges {
                name: wants("name").then(|| resolved.name.clone()),
                address: wants("address").then(|| resolved.address.clone()).flatten(),
                capacity: wants("capacity").then_some(resolved.capacity).flatten(),
                notes: wants("notes").then(|| resolved.notes.clone()).flatten(),
            };
            if !changes.is_empty() {
                events.push(EventPayload::FacilityUpdated {
                    facility_id: current.id.clone(),
                    changes,
                });
            }
            if wants("status")
                && current.status != resolved.status
                && current.status != FacilityStatus::Closed
            {
                events.push(EventPayload::FacilityStatusChanged {
                    facility_id: current.id.clone(),
                    status: resolved.status,
                });
            }
        }

        (AggregateRecord::Personnel(current), AggregateRecord::Personnel(resolved)) => {
            let changes = PersonnelChanges {
                name: wants("name").then(|| resolved.name.clone()),
                role: wants("role").then(|| resolved.role.clone()),
                section: wants("section").then_some(resolved.section).flatten(),
                contact: wants("contact").then(|| resolved.contact.clone()).flatten(),
            };
            if !changes.is_empty() {
                events.push(EventPayload::PersonnelUpdated {
                    personnel_id: current.id.clone(),
                    changes,
                });
            }
            if wants("assigned_facility") || wants("shift") || wants("status") {
                if let Some(facility_id) = &resolved.assigned_facility {
                    events.push(EventPayload::PersonnelAssigned {
                        personnel_id: current.id.clone(),
                        facility_id: facility_id.clone(),
                        shift: resolved.shift,
                    });
                }
            }
        }

        (
            AggregateRecord::WorkAssignment(current),
            AggregateRecord::WorkAssignment(resolved),
        ) => {
            let changes = WorkAssignmentChanges {
                role: wants("role").then(|| resolved.role.clone()),
                shift: wants("shift").then_some(resolved.shift),
                personnel: wants("personnel").then(|| resolved.personnel.clone()),
            };
            if !changes.is_empty() {
                events.push(EventPayload::WorkAssignmentUpdated {
                    assignment_id: current.id.clone(),
                    changes,
                });
            }
            if wants("status")
                && resolved.status == AssignmentStatus::Completed
                && current.status != AssignmentStatus::Completed
            {
                events.push(EventPayload::WorkAssignmentCompleted {
                    assignment_id: current.id.clone(),
                });
            }
        }

        (AggregateRecord::Gap(current), AggregateRecord::Gap(resolved)) => {
            if (wants("status") || wants("filled_by"))
                && current.status == GapStatus::Open
                && resolved.status == GapStatus::Filled
            {
                if let Some(personnel_id) = &resolved.filled_by {
                    events.push(EventPayload::GapFilled {
                        gap_id: current.id.clone(),
                        personnel_id: personnel_id.clone(),
                    });
                }
            }
        }

        (AggregateRecord::IapDocument(current), AggregateRecord::IapDocument(resolved)) => {
            if wants("sections") {
                for (section, content) in &resolved.sections {
                    if current.sections.get(section) != Some(content) {
                        events.push(EventPayload::IapSectionUpdated {
                            document_id: current.id.clone(),
                            section: section.clone(),
                            content: content.clone(),
                        });
                    }
                }
            }
            if wants("status")
                && resolved.status == IapStatus::Published
                && current.status != IapStatus::Published
            {
                events.push(EventPayload::IapDocumentPublished {
                    document_id: current.id.clone(),
                });
            }
        }

        (AggregateRecord::Operation(current), AggregateRecord::Operation(resolved)) => {
            if wants("setup_complete") && resolved.setup_complete && !current.setup_complete {
                events.push(EventPayload::SetupCompleted);
            }
        }

        // Kind mismatch: nothing sensible to emit.
        _ => {}
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use oc_02_projector::FacilityRecord;
    use shared_types::{ActorId, AggregateId, FacilityKind, OperationId};

    fn facility(status: FacilityStatus, capacity: Option<u32>) -> AggregateRecord {
        AggregateRecord::Facility(FacilityRecord {
            id: AggregateId::from("f1"),
            operation_id: OperationId::from("op-1"),
            name: "Shelter A".to_owned(),
            facility_type: FacilityKind::Shelter,
            status,
            address: None,
            capacity,
            notes: None,
            created_at_ms: 100,
            updated_at_ms: 100,
            updated_by: ActorId::from("actor-1"),
        })
    }

    #[test]
    fn diverging_fields_become_update_and_status_events() {
        let current = facility(FacilityStatus::Open, Some(120));
        let resolved = facility(FacilityStatus::Standby, Some(80));
        let fields = vec!["capacity".to_owned(), "status".to_owned()];

        let events = events_for_resolution(&current, &resolved, &fields);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            EventPayload::FacilityUpdated { changes, .. } if changes.capacity == Some(80)
        ));
        assert!(matches!(
            &events[1],
            EventPayload::FacilityStatusChanged { status, .. } if *status == FacilityStatus::Standby
        ));
    }

    #[test]
    fn chosen_values_are_asserted_even_when_local_already_matches() {
        // Keeping "local" must still emit the field so peers holding the
        // other side converge.
        let current = facility(FacilityStatus::Open, Some(120));
        let resolved = current.clone();
        let fields = vec!["capacity".to_owned()];

        let events = events_for_resolution(&current, &resolved, &fields);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            EventPayload::FacilityUpdated { changes, .. } if changes.capacity == Some(120)
        ));
    }

    #[test]
    fn fields_outside_the_conflict_are_untouched() {
        let current = facility(FacilityStatus::Open, Some(120));
        let mut resolved = facility(FacilityStatus::Open, Some(80));
        if let AggregateRecord::Facility(f) = &mut resolved {
            f.name = "Renamed".to_owned();
        }
        let fields = vec!["capacity".to_owned()];

        let events = events_for_resolution(&current, &resolved, &fields);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            EventPayload::FacilityUpdated { changes, .. }
                if changes.capacity == Some(80) && changes.name.is_none()
        ));
    }
}
