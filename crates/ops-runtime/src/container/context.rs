//! # Core Context
//!
//! The explicit context object passed to everything that needs the core:
//! event log, master data, resolver, sync, and the bus that joins them.
//!
//! ## Initialization Order
//!
//! ```text
//! Phase 1: shared infrastructure (bus, clock)
//! Phase 2: event log over the chosen storage backend
//! Phase 3: master data service (projector inside)
//! Phase 4: conflict resolver
//! Phase 5: presence/sync layer (subscribes to the bus)
//! ```

use std::sync::Arc;

use tracing::{info, instrument};

use oc_01_event_log::{EventLog, EventStore, InMemoryEventStore, JournalEventStore};
use oc_02_projector::AggregateRecord;
use oc_03_master_data::{EventFactory, MasterDataService, SystemTimeSource, TimeSource};
use oc_04_presence_sync::{MockRemoteChannel, RemoteChannel, SyncService};
use oc_05_conflict_resolver::ConflictResolver;
use shared_bus::InMemoryEventBus;
use shared_types::{
    ActorId, AppendError, DeviceId, OperationId, PresenceRecord, SessionId,
};

use crate::container::config::OpsConfig;

/// Context over the durable journal with the loopback remote.
pub type JournalContext = CoreContext<JournalEventStore, MockRemoteChannel>;

/// Fully in-memory context for tests and ephemeral runs.
pub type MemoryContext = CoreContext<InMemoryEventStore, MockRemoteChannel>;

/// Central container holding the wired core.
pub struct CoreContext<S: EventStore, R: RemoteChannel> {
    /// Node configuration (immutable after initialization).
    pub config: OpsConfig,

    /// Event bus joining the subsystems.
    pub bus: Arc<InMemoryEventBus>,

    /// The append-only log; sole owner of durable state.
    pub event_log: Arc<EventLog<S>>,

    /// Read models, subscriptions, mutation entry points.
    pub master_data: Arc<MasterDataService<S>>,

    /// Pending conflicts and resolutions.
    pub resolver: Arc<ConflictResolver<S>>,

    /// Presence tracking and remote exchange.
    pub sync: Arc<SyncService<S, R>>,
}

impl<S: EventStore, R: RemoteChannel> CoreContext<S, R> {
    /// Wire all subsystems over the given storage backend and remote
    /// channel.
    #[instrument(name = "context_init", skip_all)]
    pub fn build(
        config: OpsConfig,
        store: S,
        remote: Arc<R>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        info!("initializing OpsCore context");

        info!("phase 1: shared infrastructure");
        let bus = Arc::new(InMemoryEventBus::new());

        info!("phase 2: event log");
        let event_log = Arc::new(EventLog::new(store));

        info!("phase 3: master data service");
        let factory = EventFactory::new(
            DeviceId::new(config.device.device_id.clone()),
            SessionId::generate(),
            Arc::clone(&clock),
        );
        let master_data = Arc::new(MasterDataService::new(
            Arc::clone(&event_log),
            Arc::clone(&bus),
            factory,
        ));

        info!("phase 4: conflict resolver");
        let resolver = Arc::new(ConflictResolver::new(
            Arc::clone(&master_data),
            Arc::clone(&bus),
            Arc::clone(&clock),
        ));

        info!("phase 5: presence/sync layer");
        let sync = Arc::new(SyncService::new(
            Arc::clone(&master_data),
            Arc::clone(&resolver),
            remote,
            Arc::clone(&bus),
            Arc::clone(&clock),
            config.sync_config(),
        ));

        info!("all subsystems initialized");
        Self {
            config,
            bus,
            event_log,
            master_data,
            resolver,
            sync,
        }
    }

    /// Replay an operation's log into the projector, make it current,
    /// and re-queue this device's events for the remote (the remote
    /// dedupes by id, so over-queueing after a restart is harmless).
    pub fn open_operation(&self, operation_id: OperationId) -> Result<usize, AppendError> {
        let applied = self
            .master_data
            .open_operation(operation_id.clone())
            .map_err(|e| AppendError::Storage(e.to_string()))?;

        let device = DeviceId::new(self.config.device.device_id.clone());
        let mut requeued = 0usize;
        for event in self.event_log.replay(&operation_id, None)? {
            if event.device_id == device {
                self.sync.enqueue_event(event);
                requeued += 1;
            }
        }
        info!(operation = %operation_id, applied, requeued, "operation opened");
        Ok(applied)
    }

    /// The presence record this node broadcasts about its operator.
    #[must_use]
    pub fn local_presence(&self, operation_id: OperationId) -> PresenceRecord {
        PresenceRecord {
            actor_id: ActorId::new(self.config.device.actor_id.clone()),
            name: self.config.device.actor_name.clone(),
            role: self.config.device.role.clone(),
            color: self.config.device.color.clone(),
            last_seen_ms: 0,
            current_operation: operation_id,
            current_facility: None,
            current_section: None,
        }
    }

    /// The acting user for local mutations.
    #[must_use]
    pub fn actor(&self) -> ActorId {
        ActorId::new(self.config.device.actor_id.clone())
    }

    /// One-line status for the periodic runtime log.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "pending={} failed={} conflicts={} peers={}",
            self.sync.pending_events(),
            self.sync.failed_events().len(),
            self.resolver.pending().len(),
            self.sync.connected_users().len(),
        )
    }

    /// Convenience read used by the binary's startup summary.
    pub fn table_sizes(&self) -> Vec<(String, usize)> {
        use shared_types::AggregateKind;
        let mut sizes = Vec::new();
        for kind in [
            AggregateKind::Facility,
            AggregateKind::Personnel,
            AggregateKind::WorkAssignment,
            AggregateKind::Gap,
            AggregateKind::IapDocument,
        ] {
            let rows: Vec<AggregateRecord> =
                self.master_data.table(kind).unwrap_or_default();
            sizes.push((kind.table_name().to_owned(), rows.len()));
        }
        sizes
    }
}

impl CoreContext<InMemoryEventStore, MockRemoteChannel> {
    /// Fully in-memory context with the loopback remote and system
    /// clock. The workhorse constructor for tests.
    #[must_use]
    pub fn in_memory(config: OpsConfig) -> Self {
        Self::build(
            config,
            InMemoryEventStore::new(),
            Arc::new(MockRemoteChannel::new()),
            Arc::new(SystemTimeSource),
        )
    }
}

impl CoreContext<JournalEventStore, MockRemoteChannel> {
    /// Durable context over the journal at the configured data dir,
    /// with the loopback remote (a deployment supplies its own network
    /// adapter via [`CoreContext::build`]).
    pub fn open(config: OpsConfig) -> Result<Self, AppendError> {
        let store = JournalEventStore::open(config.journal_path())?;
        Ok(Self::build(
            config,
            store,
            Arc::new(MockRemoteChannel::new()),
            Arc::new(SystemTimeSource),
        ))
    }
}
