//! # Ports
//!
//! The remote channel the sync layer drives.

mod remote;

pub use remote::{PushAck, RemoteChannel};
