//! # oc-01-event-log
//!
//! Append-only event log for OpsCore. The unit of truth: every other
//! entity in the system is derived from this log.
//!
//! ## Role in System
//!
//! - **Single Durable Writer**: the only component permitted to mutate
//!   durable state.
//! - **Idempotent Append**: re-appending an already-stored event id is a
//!   no-op, which makes redelivery from the sync layer harmless.
//! - **Total Order per Operation**: within one operation, events are
//!   ordered by `(wall_ms, device_id, sequence)`; across operations no
//!   ordering is defined.
//!
//! ## Failure Policy
//!
//! Appends fail only on local storage I/O. Malformed payload content is
//! accepted and surfaced later as a projection error; the log stays
//! infallible with respect to business rules.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{InMemoryEventStore, JournalEventStore};
pub use domain::{EventLog, LogMetrics};
pub use ports::EventStore;
