//! # Node Configuration
//!
//! Unified configuration for the sync node, read from the environment.
//! All timeouts and limits have sane defaults with override capability.

use std::path::PathBuf;

use shared_types::DeviceId;

use oc_04_presence_sync::SyncConfig;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct OpsConfig {
    /// Device and actor identity.
    pub device: DeviceConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Sync layer tunables.
    pub sync: SyncSettings,
    /// Operation to open at startup, if any.
    pub operation_id: Option<String>,
}

impl OpsConfig {
    /// Read configuration from `OC_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var("OC_DEVICE_ID") {
            if !value.is_empty() {
                config.device.device_id = value;
            }
        }
        if let Ok(value) = std::env::var("OC_ACTOR_ID") {
            if !value.is_empty() {
                config.device.actor_id = value;
            }
        }
        if let Ok(value) = std::env::var("OC_ACTOR_NAME") {
            if !value.is_empty() {
                config.device.actor_name = value;
            }
        }
        if let Ok(value) = std::env::var("OC_DATA_DIR") {
            if !value.is_empty() {
                config.storage.data_dir = PathBuf::from(value);
            }
        }
        if let Ok(value) = std::env::var("OC_OPERATION_ID") {
            if !value.is_empty() {
                config.operation_id = Some(value);
            }
        }
        if let Ok(value) = std::env::var("OC_HEARTBEAT_SECS") {
            if let Ok(secs) = value.parse::<u64>() {
                config.sync.heartbeat_secs = secs;
            }
        }
        if let Ok(value) = std::env::var("OC_CONFLICT_THRESHOLD_MS") {
            if let Ok(ms) = value.parse::<u64>() {
                config.sync.conflict_threshold_ms = ms;
            }
        }
        config
    }

    /// Validate before running.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.device_id.is_empty() {
            return Err(ConfigError::MissingDeviceId);
        }
        if self.sync.heartbeat_secs == 0 {
            return Err(ConfigError::ZeroHeartbeat);
        }
        Ok(())
    }

    /// The sync layer view of this configuration.
    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            device_id: DeviceId::new(self.device.device_id.clone()),
            heartbeat_interval_ms: self.sync.heartbeat_secs * 1_000,
            missed_allowance: self.sync.missed_allowance,
            max_attempts: self.sync.max_attempts,
            backoff_base_ms: self.sync.backoff_base_ms,
            backoff_cap_ms: self.sync.backoff_cap_ms,
            conflict_threshold_ms: self.sync.conflict_threshold_ms,
            batch_size: self.sync.batch_size,
        }
    }

    /// Path of the durable event journal.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.storage.data_dir.join("events.journal")
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The device id must identify this installation.
    #[error("OC_DEVICE_ID must not be empty")]
    MissingDeviceId,

    /// The heartbeat drives presence expiry; it cannot be zero.
    #[error("OC_HEARTBEAT_SECS must be at least 1")]
    ZeroHeartbeat,
}

/// Identity of this installation and its operator.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Stable device id, part of the event total order.
    pub device_id: String,
    /// Acting user id stamped on local events.
    pub actor_id: String,
    /// Display name for presence broadcasts.
    pub actor_name: String,
    /// Role shown to other connected users.
    pub role: String,
    /// Identity color for presence.
    pub color: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: "device-local".to_owned(),
            actor_id: "operator".to_owned(),
            actor_name: "Operator".to_owned(),
            role: "planning".to_owned(),
            color: "#1c6e8c".to_owned(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Data directory for the event journal.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Sync layer tunables (seconds/milliseconds as named).
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub heartbeat_secs: u64,
    pub missed_allowance: u32,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub conflict_threshold_ms: u64,
    pub batch_size: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            heartbeat_secs: 30,
            missed_allowance: 3,
            max_attempts: 5,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 60_000,
            conflict_threshold_ms: 5_000,
            batch_size: 64,
        }
    }
}
