//! # Domain
//!
//! Aggregate records, reducers, snapshots, and the projector service.

mod aggregates;
mod projector;
mod reducers;
mod snapshot;

pub use aggregates::{
    AggregateRecord, AssignmentStatus, FacilityRecord, GapRecord, GapStatus, IapDocumentRecord,
    IapStatus, OperationRecord, PersonnelRecord, PersonnelStatus, WorkAssignmentRecord,
};
pub use projector::{ProjectionOutcome, Projector, ProjectorMetrics};
pub use snapshot::{Snapshot, SnapshotRef};
