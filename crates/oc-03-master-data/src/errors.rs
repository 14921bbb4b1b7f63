//! Errors surfaced by mutation entry points.

use thiserror::Error;

use shared_types::{AppendError, ProjectionError, SnapshotId};

/// A mutation entry point failed.
///
/// `Projection` deserves a note: the event has already been appended by
/// the time the reducer rejects it — the log accepts everything — so the
/// caller sees the semantic failure while the audit trail keeps the
/// attempt.
#[derive(Debug, Error)]
pub enum MutationError {
    /// No current operation has been selected.
    #[error("no current operation set")]
    NoCurrentOperation,

    /// The event log could not persist the event.
    #[error(transparent)]
    Append(#[from] AppendError),

    /// The reducer rejected the event; aggregate state is unchanged.
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    /// An update entry point was called with an empty change set.
    #[error("empty change set")]
    EmptyChanges,

    /// A remote event carried a schema version this build cannot replay.
    #[error("unsupported schema version {received}, supported {supported}")]
    UnsupportedSchema { received: u16, supported: u16 },

    /// The projector applied a snapshot event but no snapshot material
    /// exists. Indicates a bug, not an operator-facing condition.
    #[error("snapshot {0} missing after projection")]
    SnapshotMissing(SnapshotId),
}
