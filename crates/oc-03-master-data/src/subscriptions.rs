//! # Subscription Registry
//!
//! Table- and record-level subscriptions with RAII release.
//!
//! ## Unsubscribe Fence
//!
//! Notification holds the registry read lock while invoking callbacks;
//! guard release takes the write lock. Releasing therefore blocks until
//! an in-flight notification finishes, and once `unsubscribe()` (or the
//! drop) returns, no further callback runs — across any number of rapid
//! subscribe/release cycles, nothing accumulates. Callbacks must not
//! subscribe or release from inside a notification.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use oc_02_projector::AggregateRecord;
use shared_types::{AggregateId, AggregateKind, OperationId};

pub(crate) type TableCallback = Box<dyn Fn(&[AggregateRecord]) + Send + Sync>;
pub(crate) type RecordCallback = Box<dyn Fn(&AggregateRecord) + Send + Sync>;

struct TableSubscription {
    id: u64,
    operation_id: OperationId,
    kind: AggregateKind,
    callback: TableCallback,
}

struct RecordSubscription {
    id: u64,
    operation_id: OperationId,
    kind: AggregateKind,
    record_id: AggregateId,
    callback: RecordCallback,
}

/// Shared registry of live subscriptions.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    tables: Vec<TableSubscription>,
    records: Vec<RecordSubscription>,
    next_id: u64,
}

pub(crate) type SharedRegistry = Arc<RwLock<SubscriptionRegistry>>;

impl SubscriptionRegistry {
    pub(crate) fn subscribe_table(
        registry: &SharedRegistry,
        operation_id: OperationId,
        kind: AggregateKind,
        callback: TableCallback,
    ) -> SubscriptionGuard {
        let mut inner = registry.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.tables.push(TableSubscription {
            id,
            operation_id,
            kind,
            callback,
        });
        debug!(id, table = %kind, "table subscription registered");
        SubscriptionGuard {
            id,
            registry: Arc::clone(registry),
            released: false,
        }
    }

    pub(crate) fn subscribe_record(
        registry: &SharedRegistry,
        operation_id: OperationId,
        kind: AggregateKind,
        record_id: AggregateId,
        callback: RecordCallback,
    ) -> SubscriptionGuard {
        let mut inner = registry.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.push(RecordSubscription {
            id,
            operation_id,
            kind,
            record_id,
            callback,
        });
        debug!(id, table = %kind, "record subscription registered");
        SubscriptionGuard {
            id,
            registry: Arc::clone(registry),
            released: false,
        }
    }

    /// Deliver post-mutation state to every matching subscriber.
    ///
    /// Only subscriptions registered under `operation_id` fire; the rest
    /// never observe another operation's data.
    pub(crate) fn notify(
        &self,
        operation_id: &OperationId,
        kind: AggregateKind,
        rows: &[AggregateRecord],
        record: &AggregateRecord,
    ) -> usize {
        let mut delivered = 0;
        for sub in &self.tables {
            if &sub.operation_id == operation_id && sub.kind == kind {
                (sub.callback)(rows);
                delivered += 1;
            }
        }
        let record_id = record.id();
        for sub in &self.records {
            if &sub.operation_id == operation_id
                && sub.kind == kind
                && &sub.record_id == record_id
            {
                (sub.callback)(record);
                delivered += 1;
            }
        }
        delivered
    }

    fn remove(&mut self, id: u64) {
        self.tables.retain(|sub| sub.id != id);
        self.records.retain(|sub| sub.id != id);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tables.len() + self.records.len()
    }
}

/// Handle owning one subscription.
///
/// Release is guaranteed on every exit path of the owning scope: either
/// explicitly through [`SubscriptionGuard::unsubscribe`] or by the drop.
pub struct SubscriptionGuard {
    id: u64,
    registry: SharedRegistry,
    released: bool,
}

impl SubscriptionGuard {
    /// Remove the subscription now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            // Blocks while a notification holds the read lock.
            self.registry.write().remove(self.id);
            debug!(id = self.id, "subscription released");
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
