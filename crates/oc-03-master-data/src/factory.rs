//! # Event Factory
//!
//! Builds fully-formed envelopes for local mutations: fresh event id,
//! hybrid timestamp (wall clock + per-device sequence), device/session
//! identity, and the current schema version.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use shared_types::{
    ActorId, DeviceId, EventEnvelope, EventId, EventPayload, EventTimestamp, OperationId,
    SessionId, SyncStatus, SCHEMA_VERSION,
};

use crate::ports::TimeSource;

/// Stamps envelopes with this installation's identity.
pub struct EventFactory {
    device_id: DeviceId,
    session_id: SessionId,
    clock: Arc<dyn TimeSource>,
    /// Per-device monotonic counter; the final tie-break of the total
    /// order, so it must never move backwards within a process.
    sequence: AtomicU64,
}

impl EventFactory {
    /// Create a factory for this device and session.
    pub fn new(device_id: DeviceId, session_id: SessionId, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            device_id,
            session_id,
            clock,
            sequence: AtomicU64::new(0),
        }
    }

    /// Build an envelope for a local mutation.
    pub fn build(
        &self,
        operation_id: OperationId,
        actor_id: ActorId,
        payload: EventPayload,
    ) -> EventEnvelope {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        EventEnvelope {
            id: EventId::generate(),
            operation_id,
            actor_id,
            payload,
            timestamp: EventTimestamp::new(self.clock.now_ms(), sequence),
            schema_version: SCHEMA_VERSION,
            device_id: self.device_id.clone(),
            session_id: self.session_id,
            sync_status: SyncStatus::Local,
            sync_attempts: 0,
        }
    }

    /// The device this factory stamps.
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    /// The session this factory stamps.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}
