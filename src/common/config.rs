//! Configuration for minipoints components

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Initial balance for newly activated accounts unless `ctrl_init` changes it.
pub const DEFAULT_INITIAL_BALANCE: i64 = 100;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Front-end config
    #[serde(default)]
    pub frontend: FrontendConfig,

    /// Replica config
    #[serde(default)]
    pub replica: ReplicaConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frontend: FrontendConfig::default(),
            replica: ReplicaConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// How the front-end contacts the replica set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutMode {
    /// One replica after the other, in name order
    #[default]
    Sequential,
    /// All replicas at once; results are still aggregated in name order
    Parallel,
}

impl std::str::FromStr for FanOutMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(FanOutMode::Sequential),
            "parallel" => Ok(FanOutMode::Parallel),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown fan-out mode: {}",
                other
            ))),
        }
    }
}

/// Maps a logical replica name to the base URL it is served on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    pub url: String,
}

/// Front-end configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Bind address for the public HTTP API
    #[serde(default = "default_frontend_bind")]
    pub bind_addr: SocketAddr,

    /// Replica names are `<service_name>1 ..= <service_name>N`
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Number of replicas (N)
    #[serde(default = "default_replicas")]
    pub replicas: usize,

    /// Static name registry
    #[serde(default)]
    pub registry: Vec<RegistryEntry>,

    /// Per-call timeout towards a replica
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub fan_out: FanOutMode,
}

fn default_frontend_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}
fn default_service_name() -> String {
    "Points".to_string()
}
fn default_replicas() -> usize {
    3
}
fn default_request_timeout() -> u64 {
    5_000
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_frontend_bind(),
            service_name: default_service_name(),
            replicas: default_replicas(),
            registry: Vec::new(),
            request_timeout_ms: default_request_timeout(),
            fan_out: FanOutMode::default(),
        }
    }
}

impl FrontendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Logical replica names in contact order
    pub fn replica_names(&self) -> Vec<String> {
        (1..=self.replicas)
            .map(|i| format!("{}{}", self.service_name, i))
            .collect()
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.replicas == 0 {
            return Err(crate::Error::InvalidConfig(
                "at least one replica is required".into(),
            ));
        }
        if self.service_name.trim().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "service name must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Replica configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Logical name this replica answers to
    #[serde(default = "default_replica_name")]
    pub name: String,

    /// Bind address for the replica RPC surface
    #[serde(default = "default_replica_bind")]
    pub bind_addr: SocketAddr,

    /// Initial balance given to newly activated accounts
    #[serde(default = "default_initial_balance")]
    pub initial_balance: i64,
}

fn default_replica_name() -> String {
    "Points1".to_string()
}
fn default_replica_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6001))
}
fn default_initial_balance() -> i64 {
    DEFAULT_INITIAL_BALANCE
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            name: default_replica_name(),
            bind_addr: default_replica_bind(),
            initial_balance: default_initial_balance(),
        }
    }
}

impl Config {
    /// Load `path` (extension optional, skipped if missing) and apply
    /// `MINIPOINTS__*` environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("MINIPOINTS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
