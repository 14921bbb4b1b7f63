//! # Outbound Port: Remote Channel
//!
//! The transport to whatever backend relays events and presence between
//! clients. Deliberately opaque: the core only needs push/pull of
//! serialized envelopes plus presence/change broadcasts.

use async_trait::async_trait;

use shared_types::{
    ChangeBroadcast, EventEnvelope, EventId, OperationId, PresenceRecord, SyncError,
};

/// Result of pushing a batch of events.
#[derive(Debug, Clone, Default)]
pub struct PushAck {
    /// Events the remote accepted (or already had).
    pub accepted: Vec<EventId>,
    /// Events the remote rejected, with reasons; retried locally.
    pub rejected: Vec<(EventId, String)>,
}

/// Abstract interface to the remote persistence/relay service.
///
/// Production: a network adapter in the host application.
/// Testing: [`crate::adapters::MockRemoteChannel`].
#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Push a batch of local events. Partial acceptance is expressed in
    /// the ack; transport failure fails the whole batch.
    async fn push_events(&self, batch: Vec<EventEnvelope>) -> Result<PushAck, SyncError>;

    /// Pull an operation's events appended remotely after `since`
    /// (everything when `None`).
    async fn pull_events(
        &self,
        operation_id: &OperationId,
        since: Option<EventId>,
    ) -> Result<Vec<EventEnvelope>, SyncError>;

    /// Re-broadcast this client's presence on the operation channel.
    async fn broadcast_presence(&self, record: &PresenceRecord) -> Result<(), SyncError>;

    /// Announce a record-level change on the operation channel.
    async fn broadcast_change(&self, change: &ChangeBroadcast) -> Result<(), SyncError>;
}
