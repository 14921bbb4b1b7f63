//! Sync layer configuration.

use shared_types::DeviceId;

/// Tunables for the presence/sync layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// This installation's device id; events stamped with it are ours
    /// and get queued outbound.
    pub device_id: DeviceId,
    /// Presence re-broadcast interval.
    pub heartbeat_interval_ms: u64,
    /// Heartbeat intervals a peer may miss before being expired.
    pub missed_allowance: u32,
    /// Push attempts per event before it is marked failed.
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Upper bound on the retry delay.
    pub backoff_cap_ms: u64,
    /// Wall-clock divergence between a local record and a remote update
    /// above which a conflict is raised instead of folding the update.
    /// A heuristic, not a correctness guarantee: it does not account
    /// for clock skew between devices.
    pub conflict_threshold_ms: u64,
    /// Maximum events per outbound push batch.
    pub batch_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            device_id: DeviceId::new("device-local"),
            heartbeat_interval_ms: 30_000,
            missed_allowance: 3,
            max_attempts: 5,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 60_000,
            conflict_threshold_ms: 5_000,
            batch_size: 64,
        }
    }
}

impl SyncConfig {
    /// How long a peer may stay silent before expiry.
    #[must_use]
    pub fn presence_timeout_ms(&self) -> u64 {
        self.heartbeat_interval_ms * u64::from(self.missed_allowance)
    }
}
