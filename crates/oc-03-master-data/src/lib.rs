//! # oc-03-master-data
//!
//! Table-scoped cache of projected aggregates; the single source of truth
//! consumed by every UI surface.
//!
//! ## Role in System
//!
//! - **Only Read Path**: external callers read aggregates exclusively
//!   through this service; the projector is never exposed directly.
//! - **Only Write Path**: mutations go through named entry points that
//!   wrap build-event → append → project → notify as one logical unit.
//! - **Notification Before Return**: when a mutation entry point returns,
//!   every subscriber registered for the affected table/record has
//!   already observed the post-mutation state.
//!
//! ## Operation Context
//!
//! Subscriptions capture the operation that was current at registration
//! and only ever fire for events of that operation, so switching the
//! current operation can neither leak subscriptions nor deliver
//! stale-operation data.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod errors;
mod factory;
mod ports;
mod service;
mod subscriptions;

pub use errors::MutationError;
pub use factory::EventFactory;
pub use ports::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use service::MasterDataService;
pub use subscriptions::SubscriptionGuard;
