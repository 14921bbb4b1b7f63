//! End-to-end apply pipeline: mutation entry point -> event log ->
//! projector -> subscribers -> bus.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{client, op};
    use oc_02_projector::{AggregateRecord, IapStatus};
    use parking_lot::RwLock;
    use shared_bus::{CoreEvent, EventFilter, EventTopic};
    use shared_types::{AggregateId, AggregateKind, FacilityKind, FacilityStatus, Shift};
    use std::sync::Arc;

    #[test]
    fn facility_create_then_close_reads_back_merged() {
        let c = client("device-a", 1_000);
        c.context
            .master_data
            .create_operation(&c.actor, op(), "DR-2026-041", Some("DR-2026-041"))
            .unwrap();

        c.context
            .master_data
            .create_facility(
                &c.actor,
                AggregateId::from("f1"),
                "Shelter A",
                FacilityKind::Shelter,
                None,
                None,
            )
            .unwrap();
        c.clock.advance(60_000);
        c.context
            .master_data
            .change_facility_status(&c.actor, AggregateId::from("f1"), FacilityStatus::Closed)
            .unwrap();

        let record = c
            .context
            .master_data
            .record(AggregateKind::Facility, &AggregateId::from("f1"))
            .unwrap()
            .unwrap();
        let AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        assert_eq!(facility.name, "Shelter A");
        assert_eq!(facility.status, FacilityStatus::Closed);
    }

    #[test]
    fn update_against_missing_aggregate_is_skipped_loudly() {
        let c = client("device-a", 1_000);
        c.context
            .master_data
            .create_operation(&c.actor, op(), "DR-2026-041", None)
            .unwrap();

        // A status change for a facility that was never created: the
        // entry point surfaces the projection error and nothing is
        // silently accepted as a create.
        let result = c.context.master_data.change_facility_status(
            &c.actor,
            AggregateId::from("ghost"),
            FacilityStatus::Closed,
        );
        assert!(result.is_err());
        assert!(c
            .context
            .master_data
            .record(AggregateKind::Facility, &AggregateId::from("ghost"))
            .unwrap()
            .is_none());

        // The event was still appended: the log accepts everything.
        assert_eq!(c.context.event_log.len().unwrap(), 2);
    }

    #[test]
    fn full_planning_flow_populates_all_tables() {
        let c = client("device-a", 1_000);
        let md = &c.context.master_data;
        md.create_operation(&c.actor, op(), "DR-2026-041", None).unwrap();
        md.complete_setup(&c.actor).unwrap();
        md.create_facility(
            &c.actor,
            AggregateId::from("f1"),
            "Shelter A",
            FacilityKind::Shelter,
            Some("500 Main St"),
            Some(120),
        )
        .unwrap();
        md.create_personnel(
            &c.actor,
            AggregateId::from("p1"),
            "J. Alvarez",
            "shelter manager",
            None,
            None,
        )
        .unwrap();
        md.assign_personnel(
            &c.actor,
            AggregateId::from("p1"),
            AggregateId::from("f1"),
            Some(Shift::Day),
        )
        .unwrap();
        md.create_work_assignment(
            &c.actor,
            AggregateId::from("w1"),
            AggregateId::from("f1"),
            "overnight supervision",
            Shift::Night,
            vec![],
        )
        .unwrap();
        md.create_gap(
            &c.actor,
            AggregateId::from("g1"),
            AggregateId::from("f1"),
            "nurse",
            Shift::Night,
        )
        .unwrap();
        md.fill_gap(&c.actor, AggregateId::from("g1"), AggregateId::from("p1"))
            .unwrap();
        md.create_iap_document(&c.actor, AggregateId::from("iap-1"), "2026-08-07 18:00")
            .unwrap();
        md.update_iap_section(
            &c.actor,
            AggregateId::from("iap-1"),
            "objectives",
            serde_json::json!({"text": "open two shelters"}),
        )
        .unwrap();
        md.publish_iap_document(&c.actor, AggregateId::from("iap-1"))
            .unwrap();

        for (kind, expected) in [
            (AggregateKind::Facility, 1),
            (AggregateKind::Personnel, 1),
            (AggregateKind::WorkAssignment, 1),
            (AggregateKind::Gap, 1),
            (AggregateKind::IapDocument, 1),
        ] {
            assert_eq!(md.table(kind).unwrap().len(), expected, "{kind}");
        }

        let AggregateRecord::IapDocument(doc) = md
            .record(AggregateKind::IapDocument, &AggregateId::from("iap-1"))
            .unwrap()
            .unwrap()
        else {
            panic!("expected document");
        };
        assert_eq!(doc.status, IapStatus::Published);
    }

    #[test]
    fn committed_events_appear_on_the_bus_in_order() {
        let c = client("device-a", 1_000);
        let kinds = Arc::new(RwLock::new(Vec::new()));
        let sink = Arc::clone(&kinds);
        let _guard = c.context.bus.subscribe_handler(
            EventFilter::topics(vec![EventTopic::Domain]),
            move |event| {
                if let CoreEvent::EventCommitted(envelope) = event {
                    sink.write().push(envelope.kind());
                }
            },
        );

        c.context
            .master_data
            .create_operation(&c.actor, op(), "DR-2026-041", None)
            .unwrap();
        c.context
            .master_data
            .create_facility(
                &c.actor,
                AggregateId::from("f1"),
                "Shelter A",
                FacilityKind::Shelter,
                None,
                None,
            )
            .unwrap();

        let seen = kinds.read();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].as_str(), "OPERATION_CREATED");
        assert_eq!(seen[1].as_str(), "FACILITY_CREATED");
    }

    #[test]
    fn official_snapshot_survives_later_edits() {
        let c = client("device-a", 1_000);
        let md = &c.context.master_data;
        md.create_operation(&c.actor, op(), "DR-2026-041", None).unwrap();
        md.create_iap_document(&c.actor, AggregateId::from("iap-1"), "2026-08-07 18:00")
            .unwrap();
        md.update_iap_section(
            &c.actor,
            AggregateId::from("iap-1"),
            "objectives",
            serde_json::json!({"text": "open two shelters"}),
        )
        .unwrap();

        let snapshot = md
            .create_official_snapshot(AggregateId::from("iap-1"), &c.actor)
            .unwrap();
        assert_eq!(snapshot.version, 1);

        md.update_iap_section(
            &c.actor,
            AggregateId::from("iap-1"),
            "objectives",
            serde_json::json!({"text": "consolidate to one shelter"}),
        )
        .unwrap();

        let frozen = md.snapshot(&snapshot.id).unwrap();
        assert_eq!(
            frozen.document.sections["objectives"],
            serde_json::json!({"text": "open two shelters"})
        );

        // A second snapshot gets the next version and the new content.
        let second = md
            .create_official_snapshot(AggregateId::from("iap-1"), &c.actor)
            .unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(
            second.document.sections["objectives"],
            serde_json::json!({"text": "consolidate to one shelter"})
        );
    }
}
