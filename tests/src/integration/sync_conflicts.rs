//! Two clients, one remote: offline divergence, the conflict threshold,
//! and operator resolution.

#[cfg(test)]
mod tests {
    use crate::integration::harness::{client_on, op, Client};
    use oc_04_presence_sync::MockRemoteChannel;
    use shared_types::{
        AggregateId, AggregateKind, FacilityChanges, FacilityKind, Resolution,
    };
    use std::sync::Arc;

    /// Client A seeds the operation and a facility, pushes to the shared
    /// remote, and client B catches up.
    async fn converged_pair() -> (Client, Client, Arc<MockRemoteChannel>) {
        let remote = Arc::new(MockRemoteChannel::new());
        let a = client_on("device-a", 10_000, Arc::clone(&remote));
        let b = client_on("device-b", 10_000, Arc::clone(&remote));

        a.context
            .master_data
            .create_operation(&a.actor, op(), "DR-2026-041", None)
            .unwrap();
        a.context
            .master_data
            .create_facility(
                &a.actor,
                AggregateId::from("f1"),
                "Shelter A",
                FacilityKind::Shelter,
                None,
                Some(120),
            )
            .unwrap();

        a.context.sync.connect().unwrap();
        b.context.sync.connect().unwrap();
        assert_eq!(a.context.sync.flush().await.synced, 2);

        // B starts from the remote history.
        b.context.master_data.open_operation(op()).unwrap();
        let report = b.context.sync.pull().await.unwrap();
        assert_eq!(report.applied, 2);

        (a, b, remote)
    }

    fn capacity_of(client: &Client) -> Option<u32> {
        let record = client
            .context
            .master_data
            .record(AggregateKind::Facility, &AggregateId::from("f1"))
            .unwrap()
            .unwrap();
        let oc_02_projector::AggregateRecord::Facility(facility) = record else {
            panic!("expected facility");
        };
        facility.capacity
    }

    #[tokio::test]
    async fn clients_converge_through_the_shared_remote() {
        let (a, b, _remote) = converged_pair().await;
        assert_eq!(capacity_of(&a), Some(120));
        assert_eq!(capacity_of(&b), Some(120));
    }

    #[tokio::test]
    async fn long_offline_divergence_raises_exactly_one_conflict() {
        let (a, b, _remote) = converged_pair().await;

        // B edits far in the future relative to A's last local change
        // (a long offline stretch), then pushes.
        b.clock.set(600_000);
        b.context
            .master_data
            .update_facility(
                &b.actor,
                AggregateId::from("f1"),
                FacilityChanges {
                    capacity: Some(80),
                    ..FacilityChanges::default()
                },
            )
            .unwrap();
        b.context.sync.flush().await;

        // A pulls: its own two events are duplicates; B's update is a
        // divergence beyond the threshold.
        let report = a.context.sync.pull().await.unwrap();
        assert_eq!(report.conflicts, 1);
        assert_eq!(report.duplicates, 2);

        let pending = a.context.resolver.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].diverging_fields, vec!["capacity".to_owned()]);

        // The conflicted update was not folded into A's state.
        assert_eq!(capacity_of(&a), Some(120));

        // Pulling again must not raise a second conflict for the same
        // already-known event.
        let report = a.context.sync.pull().await.unwrap();
        assert_eq!(report.conflicts, 0);
    }

    #[tokio::test]
    async fn near_simultaneous_edits_fold_without_conflict() {
        let (a, b, _remote) = converged_pair().await;

        // B edits within the threshold window of A's last change.
        b.clock.set(14_000);
        b.context
            .master_data
            .update_facility(
                &b.actor,
                AggregateId::from("f1"),
                FacilityChanges {
                    capacity: Some(90),
                    ..FacilityChanges::default()
                },
            )
            .unwrap();
        b.context.sync.flush().await;

        let report = a.context.sync.pull().await.unwrap();
        assert_eq!(report.conflicts, 0);
        assert_eq!(report.applied, 1);
        assert_eq!(capacity_of(&a), Some(90));
        assert!(a.context.resolver.pending().is_empty());
    }

    #[tokio::test]
    async fn resolving_remote_converges_both_clients() {
        let (a, b, _remote) = converged_pair().await;

        b.clock.set(600_000);
        b.context
            .master_data
            .update_facility(
                &b.actor,
                AggregateId::from("f1"),
                FacilityChanges {
                    capacity: Some(80),
                    ..FacilityChanges::default()
                },
            )
            .unwrap();
        b.context.sync.flush().await;
        a.context.sync.pull().await.unwrap();

        let conflict = a.context.resolver.pending().remove(0);
        a.context
            .resolver
            .resolve(&conflict.id, Resolution::Remote, None, &a.actor)
            .unwrap();

        // A now carries B's value, applied as a fresh event.
        assert_eq!(capacity_of(&a), Some(80));

        // The resolution event flows back to B as an ordinary update.
        a.context.sync.flush().await;
        let report = b.context.sync.pull().await.unwrap();
        assert_eq!(report.conflicts, 0);
        assert_eq!(capacity_of(&b), Some(80));
    }

    #[tokio::test]
    async fn resolving_local_keeps_local_state_and_stays_resolved() {
        let (a, b, _remote) = converged_pair().await;

        b.clock.set(600_000);
        b.context
            .master_data
            .update_facility(
                &b.actor,
                AggregateId::from("f1"),
                FacilityChanges {
                    capacity: Some(80),
                    ..FacilityChanges::default()
                },
            )
            .unwrap();
        b.context.sync.flush().await;
        a.context.sync.pull().await.unwrap();

        let conflict = a.context.resolver.pending().remove(0);
        a.context
            .resolver
            .resolve(&conflict.id, Resolution::Local, None, &a.actor)
            .unwrap();

        assert_eq!(capacity_of(&a), Some(120));
        assert!(a.context.resolver.pending().is_empty());
        // The record of the decision is retained, not expired.
        assert!(!a.context.resolver.get(&conflict.id).unwrap().is_pending());
    }
}
