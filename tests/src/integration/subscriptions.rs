//! Subscriber delivery and unsubscribe guarantees.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{client, op};
    use shared_types::{AggregateId, AggregateKind, FacilityKind, FacilityStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn every_subscriber_sees_post_mutation_state_before_return() {
        let c = client("device-a", 1_000);
        c.context
            .master_data
            .create_operation(&c.actor, op(), "DR-2026-041", None)
            .unwrap();

        let table_rows = Arc::new(AtomicUsize::new(usize::MAX));
        let rows_sink = Arc::clone(&table_rows);
        let _table = c
            .context
            .master_data
            .subscribe_to_table(AggregateKind::Facility, move |rows| {
                rows_sink.store(rows.len(), Ordering::SeqCst);
            })
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

        // By the time the entry point returned, the callback had fired
        // with the post-mutation row set.
        assert_eq!(table_rows.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fifty_mount_unmount_cycles_leak_nothing() {
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

        let stale = Arc::new(AtomicUsize::new(0));
        for cycle in 0..50 {
            let sink = Arc::clone(&stale);
            let guard = c
                .context
                .master_data
                .subscribe_to_record(
                    AggregateKind::Facility,
                    AggregateId::from("f1"),
                    move |_| {
                        sink.fetch_add(1, Ordering::SeqCst);
                    },
                )
                .unwrap();
            // Alternate release styles, as a component tree would.
            if cycle % 2 == 0 {
                guard.unsubscribe();
            } else {
                drop(guard);
            }
        }

        c.context
            .master_data
            .change_facility_status(&c.actor, AggregateId::from("f1"), FacilityStatus::Open)
            .unwrap();

        // No callback ran after its unsubscribe returned.
        assert_eq!(stale.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn live_subscriber_keeps_firing_while_released_ones_stay_silent() {
        let c = client("device-a", 1_000);
        c.context
            .master_data
            .create_operation(&c.actor, op(), "DR-2026-041", None)
            .unwrap();

        let live = Arc::new(AtomicUsize::new(0));
        let live_sink = Arc::clone(&live);
        let _keep = c
            .context
            .master_data
            .subscribe_to_table(AggregateKind::Facility, move |_| {
                live_sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let released = Arc::new(AtomicUsize::new(0));
        let released_sink = Arc::clone(&released);
        let guard = c
            .context
            .master_data
            .subscribe_to_table(AggregateKind::Facility, move |_| {
                released_sink.fetch_add(1, Ordering::SeqCst);
            })
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
        guard.unsubscribe();
        c.context
            .master_data
            .create_facility(
                &c.actor,
                AggregateId::from("f2"),
                "Kitchen B",
                FacilityKind::Kitchen,
                None,
                None,
            )
            .unwrap();

        assert_eq!(live.load(Ordering::SeqCst), 2);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
