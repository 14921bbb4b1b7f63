//! # Remote Channel State Machine
//!
//! ```text
//! disconnected -> connecting -> subscribed -> (tracking <-> idle)
//!       ^                                          |
//!       └──────────────────────────────────────────┘
//! ```
//!
//! Disconnect is reachable from every state; everything else must follow
//! the arrows.

use shared_types::SyncError;

/// Lifecycle of the connection to the remote channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection; events accumulate locally.
    #[default]
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Joined the operation channel; sync may run.
    Subscribed,
    /// Actively exchanging presence and edits.
    Tracking,
    /// Subscribed but quiescent (no local activity).
    Idle,
}

impl ChannelState {
    /// Validate and perform a transition.
    pub fn transition(self, to: ChannelState) -> Result<ChannelState, SyncError> {
        use ChannelState::{Connecting, Disconnected, Idle, Subscribed, Tracking};

        let allowed = matches!(
            (self, to),
            (_, Disconnected)
                | (Disconnected, Connecting)
                | (Connecting, Subscribed)
                | (Subscribed, Tracking | Idle)
                | (Tracking, Idle)
                | (Idle, Tracking)
        );

        if allowed {
            Ok(to)
        } else {
            Err(SyncError::InvalidTransition {
                from: format!("{self:?}"),
                to: format!("{to:?}"),
            })
        }
    }

    /// Whether the channel can exchange data with the remote.
    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(
            self,
            ChannelState::Subscribed | ChannelState::Tracking | ChannelState::Idle
        )
    }
}
