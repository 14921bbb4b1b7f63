//! Append/replay idempotency and order-permutation determinism.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{client, op};
    use oc_02_projector::{ProjectionOutcome, Projector};
    use rand::seq::SliceRandom;
    use shared_types::{AggregateId, AggregateKind, EventPayload, FacilityChanges, FacilityKind};

    #[test]
    fn appending_the_same_event_twice_has_one_effect() {
        let c = client("device-a", 1_000);
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

        let events = c.context.event_log.replay(&op(), None).unwrap();
        let create = events.last().unwrap().clone();

        // Redelivery through the remote path: one log entry, one
        // projection effect.
        assert_eq!(
            c.context.master_data.apply_remote_event(&create).unwrap(),
            ProjectionOutcome::Duplicate
        );
        assert_eq!(c.context.event_log.len().unwrap(), 2);
        assert_eq!(
            c.context.master_data.table(AggregateKind::Facility).unwrap().len(),
            1
        );
    }

    #[test]
    fn any_storage_order_replays_to_the_same_state() {
        let c = client("device-a", 1_000);
        let md = &c.context.master_data;
        md.create_operation(&c.actor, op(), "DR-2026-041", None).unwrap();
        for (id, name) in [("f1", "Shelter A"), ("f2", "Kitchen B")] {
            c.clock.advance(500);
            md.create_facility(
                &c.actor,
                AggregateId::from(id),
                name,
                FacilityKind::Shelter,
                None,
                None,
            )
            .unwrap();
        }
        c.clock.advance(500);
        md.update_facility(
            &c.actor,
            AggregateId::from("f1"),
            FacilityChanges {
                capacity: Some(80),
                ..FacilityChanges::default()
            },
        )
        .unwrap();

        let baseline = md.table(AggregateKind::Facility).unwrap();
        let mut events = c.context.event_log.replay(&op(), None).unwrap();

        // Shuffle arbitrarily, restore the defined total order, rebuild
        // from empty state: the result must match the incremental fold.
        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            events.shuffle(&mut rng);
            events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
            let rebuilt = Projector::rebuild(events.iter());
            assert_eq!(rebuilt.table(&op(), AggregateKind::Facility), baseline);
        }
    }

    #[test]
    fn replay_of_an_orphan_update_reports_a_skip() {
        let c = client("device-a", 1_000);
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
        c.context
            .master_data
            .update_facility(
                &c.actor,
                AggregateId::from("f1"),
                FacilityChanges {
                    capacity: Some(80),
                    ..FacilityChanges::default()
                },
            )
            .unwrap();

        // Replay ONLY the update against empty state: no crash, no
        // phantom create, and the skip is visible in the metrics.
        let events = c.context.event_log.replay(&op(), None).unwrap();
        let update = events
            .iter()
            .find(|e| matches!(e.payload, EventPayload::FacilityUpdated { .. }))
            .unwrap();

        let mut lone = Projector::new();
        lone.process_all(std::iter::once(update));
        assert!(lone
            .get_aggregate(&op(), AggregateKind::Facility, &AggregateId::from("f1"))
            .is_none());
        assert_eq!(lone.metrics().skipped(), 1);
        assert_eq!(lone.metrics().applied(), 0);
    }

    #[test]
    fn cross_operation_streams_are_independent() {
        let c = client("device-a", 1_000);
        let md = &c.context.master_data;
        md.create_operation(&c.actor, op(), "DR-2026-041", None).unwrap();
        md.create_facility(
            &c.actor,
            AggregateId::from("f1"),
            "Shelter A",
            FacilityKind::Shelter,
            None,
            None,
        )
        .unwrap();

        md.create_operation(
            &c.actor,
            shared_types::OperationId::from("op-2"),
            "DR-2026-042",
            None,
        )
        .unwrap();
        md.create_facility(
            &c.actor,
            AggregateId::from("f1"),
            "Different Shelter",
            FacilityKind::Shelter,
            None,
            None,
        )
        .unwrap();

        // Same aggregate id, different partitions: no interference.
        assert_eq!(c.context.event_log.replay(&op(), None).unwrap().len(), 2);
        assert_eq!(
            c.context
                .event_log
                .replay(&shared_types::OperationId::from("op-2"), None)
                .unwrap()
                .len(),
            2
        );
    }
}
