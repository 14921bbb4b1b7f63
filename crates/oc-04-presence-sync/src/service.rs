//! # Sync Service
//!
//! Drives the remote channel: queues outbound events, folds inbound
//! ones, raises conflicts, and keeps the connected-user set fresh.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use oc_01_event_log::EventStore;
use oc_02_projector::{ProjectionOutcome, Projector};
use oc_03_master_data::{MasterDataService, TimeSource};
use oc_05_conflict_resolver::ConflictResolver;
use shared_bus::{CoreEvent, EventFilter, EventPublisher, EventTopic, HandlerGuard, InMemoryEventBus};
use shared_types::{
    ChangeBroadcast, ConflictId, EventEnvelope, EventId, PresenceRecord, SyncError, SyncStatus,
};

use crate::config::SyncConfig;
use crate::domain::{ChannelState, PresenceTracker, SyncQueue};
use crate::ports::RemoteChannel;

/// What a flush accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Events acked and removed from the queue.
    pub synced: usize,
    /// Events that failed and will retry after backoff.
    pub retried: usize,
    /// Events that exhausted their budget this flush.
    pub failed: usize,
}

/// What a pull accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Remote events folded into local state.
    pub applied: usize,
    /// Remote events we already had.
    pub duplicates: usize,
    /// Remote events parked as conflicts.
    pub conflicts: usize,
    /// Remote events the projector rejected.
    pub skipped: usize,
}

/// Outcome of handling one remote event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Folded into local state and fanned out.
    Applied,
    /// Already known; no effect.
    Duplicate,
    /// Divergence above the threshold; queued for the operator.
    ConflictRaised(ConflictId),
    /// Rejected by the projector; logged and dropped.
    Skipped,
}

/// The presence/sync layer service.
pub struct SyncService<S: EventStore, R: RemoteChannel> {
    master_data: Arc<MasterDataService<S>>,
    resolver: Arc<ConflictResolver<S>>,
    remote: Arc<R>,
    bus: Arc<InMemoryEventBus>,
    clock: Arc<dyn TimeSource>,
    config: SyncConfig,
    queue: Arc<Mutex<SyncQueue>>,
    presence: RwLock<PresenceTracker>,
    state: RwLock<ChannelState>,
    local_presence: RwLock<Option<PresenceRecord>>,
    pull_cursor: RwLock<Option<EventId>>,
    /// Keeps the outbound enqueue handler registered for our lifetime.
    _outbound: HandlerGuard,
}

impl<S: EventStore, R: RemoteChannel> SyncService<S, R> {
    /// Wire the service and start capturing committed local events.
    pub fn new(
        master_data: Arc<MasterDataService<S>>,
        resolver: Arc<ConflictResolver<S>>,
        remote: Arc<R>,
        bus: Arc<InMemoryEventBus>,
        clock: Arc<dyn TimeSource>,
        config: SyncConfig,
    ) -> Self {
        let queue = Arc::new(Mutex::new(SyncQueue::new()));

        // Every committed event stamped with our device id goes outbound.
        // Remote-origin events arriving via apply_remote_event carry a
        // foreign device id and are not echoed back.
        let outbound_queue = Arc::clone(&queue);
        let local_device = config.device_id.clone();
        let outbound = bus.subscribe_handler(
            EventFilter::topics(vec![EventTopic::Domain]),
            move |event| {
                if let CoreEvent::EventCommitted(envelope) = event {
                    if envelope.device_id == local_device {
                        outbound_queue.lock().enqueue(envelope.clone());
                    }
                }
            },
        );

        let presence_timeout = config.presence_timeout_ms();
        Self {
            master_data,
            resolver,
            remote,
            bus,
            clock,
            config,
            queue,
            presence: RwLock::new(PresenceTracker::new(presence_timeout)),
            state: RwLock::new(ChannelState::Disconnected),
            local_presence: RwLock::new(None),
            pull_cursor: RwLock::new(None),
            _outbound: outbound,
        }
    }

    // =========================================================================
    // CHANNEL LIFECYCLE
    // =========================================================================

    /// Current channel state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        *self.state.read()
    }

    /// Handshake onto the operation channel.
    pub fn connect(&self) -> Result<(), SyncError> {
        self.transition(ChannelState::Connecting)?;
        self.transition(ChannelState::Subscribed)
    }

    /// Leave the channel. Queued events stay queued.
    pub fn disconnect(&self) {
        // Reachable from every state, so the transition cannot fail.
        let _ = self.transition(ChannelState::Disconnected);
    }

    /// Begin actively exchanging edits and presence.
    pub fn start_tracking(&self) -> Result<(), SyncError> {
        self.transition(ChannelState::Tracking)
    }

    /// Go quiescent while staying subscribed.
    pub fn go_idle(&self) -> Result<(), SyncError> {
        self.transition(ChannelState::Idle)
    }

    fn transition(&self, to: ChannelState) -> Result<(), SyncError> {
        let mut state = self.state.write();
        let next = state.transition(to)?;
        info!(from = ?*state, ?to, "channel transition");
        *state = next;
        Ok(())
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Queue one event explicitly (startup re-queue of local history;
    /// live commits arrive via the bus handler).
    pub fn enqueue_event(&self, event: EventEnvelope) {
        self.queue.lock().enqueue(event);
    }

    /// Push due events to the remote channel.
    ///
    /// Offline states return an empty report and keep everything
    /// queued. Exhausted events surface as `SyncFailed` on the bus and
    /// in [`SyncService::failed_events`]; they are never dropped.
    pub async fn flush(&self) -> FlushReport {
        let mut report = FlushReport::default();
        if !self.state.read().is_online() {
            debug!("flush skipped, channel offline");
            return report;
        }

        let now = self.clock.now_ms();
        let batch = self.queue.lock().due(now, self.config.batch_size);
        if batch.is_empty() {
            return report;
        }

        match self.remote.push_events(batch.clone()).await {
            Ok(ack) => {
                for id in &ack.accepted {
                    if let Some(attempts) = self.queue.lock().mark_synced(id) {
                        report.synced += 1;
                        self.bus.publish(CoreEvent::SyncCompleted {
                            event_id: *id,
                            attempts,
                        });
                    }
                }
                for (id, reason) in &ack.rejected {
                    self.record_failure(id, reason, now, &mut report);
                }
                self.broadcast_changes(&batch, &ack.accepted).await;
            }
            Err(error) => {
                warn!(%error, events = batch.len(), "push failed, batch will retry");
                let reason = error.to_string();
                for event in &batch {
                    self.record_failure(&event.id, &reason, now, &mut report);
                }
            }
        }
        report
    }

    fn record_failure(&self, id: &EventId, reason: &str, now: u64, report: &mut FlushReport) {
        let status = self.queue.lock().record_failure(id, now, &self.config);
        if status == SyncStatus::Failed {
            let attempts = self
                .queue
                .lock()
                .attempts(id)
                .unwrap_or(self.config.max_attempts);
            report.failed += 1;
            warn!(event_id = %id, attempts, reason, "sync retry budget exhausted");
            self.bus.publish(CoreEvent::SyncFailed {
                event_id: *id,
                attempts,
                reason: reason.to_owned(),
            });
        } else {
            report.retried += 1;
        }
    }

    /// Best-effort record-level change announcements for acked events.
    async fn broadcast_changes(&self, batch: &[EventEnvelope], accepted: &[EventId]) {
        for event in batch {
            if !accepted.contains(&event.id) {
                continue;
            }
            let (entity_kind, entity_id) = Projector::target(event);
            let change = ChangeBroadcast {
                entity_kind,
                entity_id,
                change: event.kind().as_str().to_owned(),
                actor_id: event.actor_id.clone(),
                timestamp_ms: event.timestamp.wall_ms,
            };
            if let Err(error) = self.remote.broadcast_change(&change).await {
                debug!(%error, "change broadcast dropped");
            }
        }
    }

    /// Events parked after exhausting their retry budget.
    #[must_use]
    pub fn failed_events(&self) -> Vec<EventEnvelope> {
        self.queue.lock().failed()
    }

    /// Events awaiting an ack.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.lock().pending_len()
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Pull and fold remote history for the current operation.
    pub async fn pull(&self) -> Result<PullReport, SyncError> {
        let mut report = PullReport::default();
        if !self.state.read().is_online() {
            return Ok(report);
        }
        let Some(operation_id) = self.master_data.current_operation_id() else {
            return Ok(report);
        };

        let cursor = *self.pull_cursor.read();
        let events = self.remote.pull_events(&operation_id, cursor).await?;
        for event in &events {
            match self.handle_remote(event) {
                RemoteOutcome::Applied => report.applied += 1,
                RemoteOutcome::Duplicate => report.duplicates += 1,
                RemoteOutcome::ConflictRaised(_) => report.conflicts += 1,
                RemoteOutcome::Skipped => report.skipped += 1,
            }
        }
        if let Some(last) = events.last() {
            *self.pull_cursor.write() = Some(last.id);
        }
        Ok(report)
    }

    /// Fold one remote event, raising a conflict when it diverges from
    /// locally-changed state beyond the configured threshold.
    ///
    /// Below the threshold the event is folded as-is; the log's total
    /// order makes the later write win on any rebuild, which is the
    /// documented last-write-wins behavior.
    pub fn handle_remote(&self, event: &EventEnvelope) -> RemoteOutcome {
        let (kind, id) = Projector::target(event);

        if event.device_id != self.config.device_id {
            if let Some(local) = self
                .master_data
                .record_for(&event.operation_id, kind, &id)
            {
                let delta = local.updated_at_ms().abs_diff(event.timestamp.wall_ms);
                if delta > self.config.conflict_threshold_ms {
                    match self.master_data.preview_event(event) {
                        Ok(remote_record) => {
                            if let Some(conflict_id) =
                                self.resolver.detect_and_queue(&local, &remote_record)
                            {
                                return RemoteOutcome::ConflictRaised(conflict_id);
                            }
                            // Divergent clocks but identical content:
                            // nothing to argue about, fold it.
                        }
                        Err(error) => {
                            warn!(event_id = %event.id, %error, "remote event preview failed");
                            return RemoteOutcome::Skipped;
                        }
                    }
                }
            }
        }

        match self.master_data.apply_remote_event(event) {
            Ok(ProjectionOutcome::Applied) => RemoteOutcome::Applied,
            Ok(ProjectionOutcome::Duplicate) => RemoteOutcome::Duplicate,
            Err(error) => {
                warn!(event_id = %event.id, %error, "remote event skipped");
                RemoteOutcome::Skipped
            }
        }
    }

    // =========================================================================
    // PRESENCE
    // =========================================================================

    /// Set what this client broadcasts about itself.
    pub fn set_local_presence(&self, record: PresenceRecord) {
        *self.local_presence.write() = Some(record);
    }

    /// Re-broadcast local presence. Call on the heartbeat interval.
    pub async fn heartbeat(&self) -> Result<(), SyncError> {
        let record = {
            let mut guard = self.local_presence.write();
            let Some(record) = guard.as_mut() else {
                return Ok(());
            };
            record.last_seen_ms = self.clock.now_ms();
            record.clone()
        };
        if !self.state.read().is_online() {
            return Ok(());
        }
        self.remote.broadcast_presence(&record).await
    }

    /// Fold a peer's presence broadcast and announce it on the bus.
    pub fn observe_presence(&self, record: PresenceRecord) {
        self.presence.write().observe(record.clone());
        self.bus.publish(CoreEvent::PresenceUpdated(record));
    }

    /// Expire peers past their heartbeat allowance, announcing each.
    pub fn sweep_presence(&self) -> usize {
        let expired = self.presence.write().sweep(self.clock.now_ms());
        let count = expired.len();
        for record in expired {
            info!(actor = %record.actor_id, "peer presence expired");
            self.bus
                .publish(CoreEvent::PresenceExpired(record.actor_id));
        }
        count
    }

    /// The connected-user set, ordered by actor id.
    #[must_use]
    pub fn connected_users(&self) -> Vec<PresenceRecord> {
        self.presence.read().connected()
    }
}
