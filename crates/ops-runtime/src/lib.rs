//! # ops-runtime
//!
//! Composition root for the OpsCore sync node: configuration, the
//! explicit core context (dependency injection instead of module-level
//! singletons), optional storage backends, and the runtime loops.

pub mod adapters;
pub mod container;
pub mod wiring;

pub use container::{ConfigError, CoreContext, MemoryContext, OpsConfig};
