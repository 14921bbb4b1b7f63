//! Shared fixtures: isolated in-memory contexts over a manual clock,
//! optionally joined through one mock remote to simulate multiple
//! clients of the same operation.

use std::sync::Arc;

use oc_01_event_log::InMemoryEventStore;
use oc_03_master_data::{ManualTimeSource, TimeSource};
use oc_04_presence_sync::MockRemoteChannel;
use ops_runtime::container::{CoreContext, OpsConfig};
use shared_types::{ActorId, OperationId};

pub type TestContext = CoreContext<InMemoryEventStore, MockRemoteChannel>;

/// One simulated client: its context, clock, and acting user.
pub struct Client {
    pub context: TestContext,
    pub clock: Arc<ManualTimeSource>,
    pub actor: ActorId,
}

/// A client on its own private remote.
pub fn client(device_id: &str, start_ms: u64) -> Client {
    client_on(device_id, start_ms, Arc::new(MockRemoteChannel::new()))
}

/// A client joined to a shared remote channel.
pub fn client_on(device_id: &str, start_ms: u64, remote: Arc<MockRemoteChannel>) -> Client {
    let clock = Arc::new(ManualTimeSource::starting_at(start_ms));
    let mut config = OpsConfig::default();
    config.device.device_id = device_id.to_owned();
    config.device.actor_id = format!("actor-{device_id}");

    let context = CoreContext::build(
        config,
        InMemoryEventStore::new(),
        remote,
        Arc::clone(&clock) as Arc<dyn TimeSource>,
    );
    let actor = context.actor();
    Client {
        context,
        clock,
        actor,
    }
}

/// The operation used throughout the suite.
pub fn op() -> OperationId {
    OperationId::from("op-1")
}
