//! # Core Context Container
//!
//! Builds every subsystem with its dependencies passed in explicitly.
//! Nothing in the workspace holds module-level state: tests construct as
//! many isolated contexts as they want.

pub mod config;
pub mod context;

pub use config::{ConfigError, DeviceConfig, OpsConfig, StorageConfig, SyncSettings};
pub use context::{CoreContext, JournalContext, MemoryContext};
