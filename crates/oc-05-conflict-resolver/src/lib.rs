//! # oc-05-conflict-resolver
//!
//! Classifies divergences between local and remote versions of one
//! entity, queues them for operator action, and applies resolutions.
//!
//! ## Contract
//!
//! - Conflicts stay pending (visible, queryable) until explicitly
//!   resolved; nothing expires them.
//! - `local`/`remote` decisions re-apply the chosen side as NEW events
//!   through the master data service; history is never rewritten.
//! - `merge` requires an explicit merged payload, otherwise rejected.
//! - Detection diffs fields of the serialized records, ignoring
//!   housekeeping fields (`updated_at_ms`, `updated_by`).

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod detect;
mod resolution;
mod resolver;

pub use detect::{detect, diverging_fields};
pub use resolution::events_for_resolution;
pub use resolver::ConflictResolver;
