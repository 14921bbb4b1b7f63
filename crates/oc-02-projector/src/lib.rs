//! # oc-02-projector
//!
//! Deterministic projector for OpsCore: one pure reducer per event kind,
//! folding the append-only log into read-optimized aggregates.
//!
//! ## Role in System
//!
//! - **Exclusive Owner of Aggregates**: no other component mutates
//!   projected state; the master data service only reads through it.
//! - **Idempotent**: applying the same event id twice is a no-op, tracked
//!   per aggregate, so redelivery and replay are harmless.
//! - **Isolation**: a reducer failure affects only its own event; the
//!   pipeline logs the skip and keeps folding.
//!
//! ## Snapshots
//!
//! Official snapshots are reducer-driven: the `OFFICIAL_SNAPSHOT_CREATED`
//! event deep-copies the target document at its fold point. A full replay
//! therefore regenerates byte-identical snapshots, and the log stays the
//! only durable truth.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;

pub use domain::{
    AggregateRecord, AssignmentStatus, FacilityRecord, GapRecord, GapStatus, IapDocumentRecord,
    IapStatus, OperationRecord, PersonnelRecord, PersonnelStatus, ProjectionOutcome, Projector,
    ProjectorMetrics, Snapshot, SnapshotRef, WorkAssignmentRecord,
};
