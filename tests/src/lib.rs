//! # OpsCore Test Suite
//!
//! Unified test crate exercising the core across subsystem boundaries:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── e2e_flow.rs        # mutation -> log -> projector -> subscribers
//!     ├── replay.rs          # append/replay idempotency, order permutations
//!     ├── subscriptions.rs   # delivery and unsubscribe guarantees
//!     └── sync_conflicts.rs  # two clients, one remote, divergence handling
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p oc-tests
//! cargo test -p oc-tests integration::sync_conflicts
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
