//! Telemetry configuration.

/// Output format for the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable terminal output.
    Text,
    /// One JSON object per line, for scraping.
    Json,
}

/// Logging configuration, usually read from the environment.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name included in every log line.
    pub service_name: String,
    /// `EnvFilter` expression, e.g. `info` or `oc_04_presence_sync=debug,info`.
    pub log_level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ops-core".to_owned(),
            log_level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

impl TelemetryConfig {
    /// Read configuration from `OC_LOG_LEVEL` / `OC_LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(level) = std::env::var("OC_LOG_LEVEL") {
            if !level.is_empty() {
                config.log_level = level;
            }
        }
        if let Ok(format) = std::env::var("OC_LOG_FORMAT") {
            if format.eq_ignore_ascii_case("json") {
                config.format = LogFormat::Json;
            }
        }
        config
    }
}
