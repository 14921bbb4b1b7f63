//! # Conflict Record
//!
//! A detected divergence between two updates to the same entity from
//! different sources. Conflicts are derived records created by the
//! resolver, never by the projector, and stay queryable until explicitly
//! resolved.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::entities::{AggregateId, AggregateKind, OperationId};

/// Unique conflict identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConflictId(pub Uuid);

impl ConflictId {
    /// Generate a fresh conflict id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operator decision applied to a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Keep the local version; re-applied as a new event.
    Local,
    /// Take the remote version; re-applied as a new event.
    Remote,
    /// Apply an operator-supplied merged payload.
    Merge,
}

/// Lifecycle of a conflict record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum ConflictState {
    /// Awaiting an operator decision. Never expires.
    Pending,
    /// Resolved with the recorded decision.
    Resolved {
        decision: Resolution,
        resolved_at_ms: u64,
    },
}

/// A detected divergence between a local and a remote version of one
/// entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Unique id of this conflict record.
    pub id: ConflictId,
    /// Operation the entity belongs to.
    pub operation_id: OperationId,
    /// Kind of the diverging entity.
    pub entity_kind: AggregateKind,
    /// Id of the diverging entity.
    pub entity_id: AggregateId,
    /// Local version of the entity, serialized.
    pub local: serde_json::Value,
    /// Remote version of the entity, serialized.
    pub remote: serde_json::Value,
    /// Names of the fields whose values diverge (housekeeping fields
    /// excluded).
    pub diverging_fields: Vec<String>,
    /// Wall-clock milliseconds when the divergence was detected.
    pub detected_at_ms: u64,
    /// Current lifecycle state.
    pub state: ConflictState,
}

impl Conflict {
    /// True while the conflict awaits an operator decision.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, ConflictState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_until_resolved() {
        let mut conflict = Conflict {
            id: ConflictId::generate(),
            operation_id: OperationId::from("op-1"),
            entity_kind: AggregateKind::Facility,
            entity_id: AggregateId::from("f1"),
            local: serde_json::json!({"status": "open"}),
            remote: serde_json::json!({"status": "closed"}),
            diverging_fields: vec!["status".to_owned()],
            detected_at_ms: 1_700_000_000_000,
            state: ConflictState::Pending,
        };
        assert!(conflict.is_pending());

        conflict.state = ConflictState::Resolved {
            decision: Resolution::Remote,
            resolved_at_ms: 1_700_000_060_000,
        };
        assert!(!conflict.is_pending());
    }
}
