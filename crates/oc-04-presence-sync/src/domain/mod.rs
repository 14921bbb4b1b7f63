//! # Domain
//!
//! Channel state machine, presence tracker, and outbound queue.

mod channel;
mod presence;
mod queue;

pub use channel::ChannelState;
pub use presence::PresenceTracker;
pub use queue::SyncQueue;
