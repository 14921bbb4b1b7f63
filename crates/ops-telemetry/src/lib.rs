//! # Ops Telemetry
//!
//! Structured logging bootstrap for OpsCore.
//!
//! The sync node is an offline-first field tool: there is no log
//! aggregator or trace collector to talk to, so telemetry means local
//! structured logs — human-readable on a terminal, JSON when another
//! process scrapes them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ops_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_telemetry(&config).expect("telemetry init");
//!     // tracing macros are live from here on
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OC_LOG_LEVEL` | `info` | Log level filter (EnvFilter syntax) |
//! | `OC_LOG_FORMAT` | `text` | `text` or `json` |

mod config;
mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::init_telemetry;

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log filter expression did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(String),
}
