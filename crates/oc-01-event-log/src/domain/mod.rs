//! # Domain
//!
//! The event log service and its metrics.

mod log;
mod metrics;

pub use log::EventLog;
pub use metrics::LogMetrics;
