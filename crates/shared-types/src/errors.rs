//! # Error Types
//!
//! The shared error taxonomy. Failures are isolated per event/aggregate:
//! a storage failure aborts only its own append, a projection failure is
//! logged and skipped, a sync failure is retried and only surfaced after
//! the retry budget is spent. Conflicts are NOT errors; they are
//! first-class records (see `conflict`).

use thiserror::Error;

use crate::entities::{AggregateId, AggregateKind, EventId};
use crate::payloads::EventKind;

/// Errors from appending to the event log.
///
/// Appends fail only on local storage I/O; payload content is never
/// rejected, keeping the log infallible with respect to business rules.
#[derive(Debug, Clone, Error)]
pub enum AppendError {
    /// The backing store failed to persist or read.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The envelope could not be encoded for storage.
    #[error("encoding failure for event {id}: {reason}")]
    Encoding { id: EventId, reason: String },
}

/// Errors from folding an event into an aggregate.
///
/// Never fatal to the pipeline: callers log the failure and continue with
/// the next event.
#[derive(Debug, Clone, Error)]
pub enum ProjectionError {
    /// An update arrived for an aggregate that has no creating event.
    #[error("no {kind} aggregate {id} to apply {event_kind} to")]
    MissingAggregate {
        kind: AggregateKind,
        id: AggregateId,
        event_kind: EventKind,
    },

    /// The payload was structurally valid but semantically unusable.
    #[error("bad payload for {event_kind}: {reason}")]
    BadPayload { event_kind: EventKind, reason: String },
}

/// Errors from the presence/sync layer.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The remote channel could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote rejected a batch.
    #[error("remote rejected batch: {reason}")]
    Rejected { reason: String },

    /// A channel state transition that the FSM does not allow.
    #[error("invalid channel transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

/// Errors from resolving a conflict.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// No pending conflict with the given id.
    #[error("unknown conflict: {0}")]
    UnknownConflict(String),

    /// The conflict was already resolved.
    #[error("conflict already resolved: {0}")]
    AlreadyResolved(String),

    /// A merge decision arrived without a merged payload.
    #[error("merge resolution requires a merged payload")]
    MergedPayloadRequired,

    /// The chosen/merged payload does not deserialize into a record of
    /// the conflicted entity's kind.
    #[error("invalid resolution payload: {0}")]
    InvalidPayload(String),

    /// Committing the resolution event failed.
    #[error("failed to apply resolution: {0}")]
    Apply(String),
}
