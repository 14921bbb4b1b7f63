//! # Conflict Detection
//!
//! Field-by-field diff over serialized aggregate records.

use oc_02_projector::AggregateRecord;
use shared_types::{Conflict, ConflictId, ConflictState};
use tracing::debug;

/// Bookkeeping fields excluded from divergence checks: they differ on
/// every edit and carry no operator-meaningful content.
const HOUSEKEEPING_FIELDS: &[&str] = &["updated_at_ms", "updated_by"];

/// Names of top-level fields whose values differ between two serialized
/// records, housekeeping excluded. Field order is stable (sorted).
#[must_use]
pub fn diverging_fields(local: &serde_json::Value, remote: &serde_json::Value) -> Vec<String> {
    let empty = serde_json::Map::new();
    let local_map = local.as_object().unwrap_or(&empty);
    let remote_map = remote.as_object().unwrap_or(&empty);

    let mut fields: Vec<String> = local_map
        .keys()
        .chain(remote_map.keys())
        .filter(|key| !HOUSEKEEPING_FIELDS.contains(&key.as_str()))
        .filter(|key| local_map.get(key.as_str()) != remote_map.get(key.as_str()))
        .cloned()
        .collect();
    fields.sort();
    fields.dedup();
    fields
}

/// Diff two versions of one entity.
///
/// Returns `None` when nothing but housekeeping diverges — concurrent
/// edits that happen to agree are not conflicts.
#[must_use]
pub fn detect(
    local: &AggregateRecord,
    remote: &AggregateRecord,
    detected_at_ms: u64,
) -> Option<Conflict> {
    let local_value = serde_json::to_value(local).ok()?;
    let remote_value = serde_json::to_value(remote).ok()?;

    let fields = diverging_fields(&local_value, &remote_value);
    if fields.is_empty() {
        return None;
    }

    let operation_id = match local {
        AggregateRecord::Facility(r) => r.operation_id.clone(),
        AggregateRecord::Personnel(r) => r.operation_id.clone(),
        AggregateRecord::WorkAssignment(r) => r.operation_id.clone(),
        AggregateRecord::Gap(r) => r.operation_id.clone(),
        AggregateRecord::IapDocument(r) => r.operation_id.clone(),
        // Operation records carry their own id as the partition key.
        AggregateRecord::Operation(r) => shared_types::OperationId::new(r.id.0.clone()),
    };

    debug!(
        entity = %local.id(),
        fields = ?fields,
        "divergence detected"
    );

    Some(Conflict {
        id: ConflictId::generate(),
        operation_id,
        entity_kind: local.kind(),
        entity_id: local.id().clone(),
        local: local_value,
        remote: remote_value,
        diverging_fields: fields,
        detected_at_ms,
        state: ConflictState::Pending,
    })
}
