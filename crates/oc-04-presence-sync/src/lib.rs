//! # oc-04-presence-sync
//!
//! Presence and synchronization layer: tracks which actors are connected
//! and what they are editing, exchanges events with remote peers, and
//! raises conflicts when concurrent updates diverge.
//!
//! ## Role in System
//!
//! - **Channel FSM**: `disconnected -> connecting -> subscribed ->
//!   (tracking <-> idle) -> disconnected`, with invalid transitions
//!   rejected.
//! - **Outbound Queue**: committed local events are queued `pending`,
//!   pushed in batches, retried with exponential backoff, and surfaced
//!   as `failed` once the retry budget is spent — never silently
//!   dropped.
//! - **Conflict Trigger**: a remote update to an entity also changed
//!   locally raises a conflict when the wall-clock delta exceeds the
//!   configured threshold; below it, the write is folded and the total
//!   order decides (last write by timestamp wins on replay).
//! - **Presence**: heartbeats re-broadcast on a fixed interval; a peer
//!   missing its allowance of intervals is expired and announced on the
//!   bus. Presence is never durable.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
mod service;

pub use adapters::MockRemoteChannel;
pub use config::SyncConfig;
pub use domain::{ChannelState, PresenceTracker, SyncQueue};
pub use ports::{PushAck, RemoteChannel};
pub use service::{FlushReport, PullReport, RemoteOutcome, SyncService};
