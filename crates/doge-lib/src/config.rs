// ============================
// doge-lib/src/config.rs
// ============================
//! Configuration management.
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default multipart upload cap (10 MiB), enforced at the transport boundary.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path for the document store
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// Maximum multipart upload body size in bytes
    pub max_upload_bytes: usize,
    /// Outbound dispatch pool sizing
    pub dispatch: DispatchSettings,
    /// Metrics egress to a Graphite-style collector
    pub graphite: GraphiteSettings,
    /// Broker destination namespaces
    pub broker: BrokerSettings,
}

/// Bounds for the outbound dispatch worker pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Minimum number of concurrent dispatch workers
    pub min_workers: usize,
    /// Maximum number of concurrent dispatch workers
    pub max_workers: usize,
}

/// Metrics collector endpoint and reporting cadence
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphiteSettings {
    /// Collector host
    pub host: String,
    /// Collector port
    pub port: u16,
    /// Prefix prepended to every reported metric key
    pub prefix: String,
    /// Reporting period in seconds
    pub period_secs: u64,
}

/// Destination prefixes understood by the message broker
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Prefix for application-bound destinations
    pub application_prefix: String,
    /// Prefixes for broker-internal (fan-out) destinations
    pub broker_prefixes: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            dispatch: DispatchSettings::default(),
            graphite: GraphiteSettings::default(),
            broker: BrokerSettings::default(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            min_workers: 4,
            max_workers: 10,
        }
    }
}

impl Default for GraphiteSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2003,
            prefix: "doge.spring.io".to_string(),
            period_secs: 2,
        }
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            application_prefix: "/app".to_string(),
            broker_prefixes: vec!["/queue/".to_string(), "/topic/".to_string()],
        }
    }
}

impl Settings {
    /// Load settings from config files and environment variables
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("config.toml"))
                .merge(Yaml::file("config.yaml"))
                .merge(Json::file("config.json"))
                .merge(Env::prefixed("DOGE_").split("__")),
        )
    }

    /// Extract and validate settings from an assembled figment
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.as_str()) {
            anyhow::bail!("invalid log level: {}", self.log_level);
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be non-zero");
        }
        if self.dispatch.min_workers == 0
            || self.dispatch.min_workers > self.dispatch.max_workers
        {
            anyhow::bail!(
                "dispatch pool bounds invalid: min {} max {}",
                self.dispatch.min_workers,
                self.dispatch.max_workers
            );
        }
        if self.graphite.period_secs == 0 {
            anyhow::bail!("graphite period must be non-zero");
        }
        if self.broker.application_prefix.is_empty() || self.broker.broker_prefixes.is_empty()
        {
            anyhow::bail!("broker prefixes must be configured");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config/config_tests.rs"]
mod config_tests;
