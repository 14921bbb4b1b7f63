//! # Ports
//!
//! Interfaces the event log requires the host to provide.

mod outbound;

pub use outbound::EventStore;
