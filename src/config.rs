//! Configuration handling for the SQL bridge.
//!
//! Pool configuration arrives as a string-properties map from the outer
//! collaborator (connector/config loader); `StoreConfig::from_properties`
//! is the single validation path for it. The binary's CLI flags feed the
//! same path.

use crate::error::{EngineError, EngineResult};
use clap::Parser;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_MAX_IDLE_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_OPEN_CONNECTIONS: u32 = 100;
pub const DEFAULT_CONNECTION_MAX_LIFETIME_SECS: u64 = 3600;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Property keys consumed from the external configuration map.
pub const PROP_CONNECTION: &str = "connection";
pub const PROP_MAX_IDLE_CONNECTIONS: &str = "max_idle_connections";
pub const PROP_MAX_OPEN_CONNECTIONS: &str = "max_open_connections";
pub const PROP_CONNECTION_MAX_LIFETIME_SECONDS: &str = "connection_max_lifetime_seconds";

/// Validated pool configuration for the relational store.
///
/// Parsed once at engine initialization; the resulting pool lives for the
/// process lifetime.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store-native connection string (sensitive - not logged).
    pub connection: String,
    /// Idle connections the pool retains (maps to sqlx `min_connections`,
    /// the closest knob to a max-idle bound).
    pub max_idle_connections: u32,
    /// Upper bound on open connections (sqlx `max_connections`).
    pub max_open_connections: u32,
    /// Maximum lifetime of a single pooled connection.
    pub connection_max_lifetime_secs: u64,
}

impl StoreConfig {
    /// Parse and validate a configuration from a string-properties map.
    ///
    /// Absent or blank numeric properties fall back to the documented
    /// defaults (10 / 100 / 3600). Explicitly supplied values must be >= 1;
    /// zero or negative values are rejected rather than clamped.
    pub fn from_properties(properties: &HashMap<String, String>) -> EngineResult<Self> {
        let connection = properties
            .get(PROP_CONNECTION)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::configuration("missing required property 'connection'"))?
            .to_string();

        let max_idle_connections = parse_positive_u32(
            properties,
            PROP_MAX_IDLE_CONNECTIONS,
            DEFAULT_MAX_IDLE_CONNECTIONS,
        )?;
        let max_open_connections = parse_positive_u32(
            properties,
            PROP_MAX_OPEN_CONNECTIONS,
            DEFAULT_MAX_OPEN_CONNECTIONS,
        )?;
        let connection_max_lifetime_secs = parse_positive(
            properties,
            PROP_CONNECTION_MAX_LIFETIME_SECONDS,
            DEFAULT_CONNECTION_MAX_LIFETIME_SECS,
        )?;

        Ok(Self {
            connection,
            max_idle_connections,
            max_open_connections,
            connection_max_lifetime_secs,
        })
    }

    /// Get the connection max lifetime as a Duration.
    pub fn connection_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.connection_max_lifetime_secs)
    }
}

/// Parse an optional positive property that must fit a pool-sizing knob.
fn parse_positive_u32(
    properties: &HashMap<String, String>,
    key: &str,
    default: u32,
) -> EngineResult<u32> {
    let value = parse_positive(properties, key, u64::from(default))?;
    u32::try_from(value).map_err(|_| {
        EngineError::configuration(format!("property '{key}' is out of range: {value}"))
    })
}

/// Parse an optional positive integer property; blank means default.
fn parse_positive(
    properties: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> EngineResult<u64> {
    match properties.get(key).map(|s| s.trim()) {
        None | Some("") => Ok(default),
        Some(raw) => {
            let value: i64 = raw.parse().map_err(|_| {
                EngineError::configuration(format!("property '{key}' is not an integer: {raw:?}"))
            })?;
            if value < 1 {
                return Err(EngineError::configuration(format!(
                    "property '{key}' must be >= 1, got {value}"
                )));
            }
            Ok(value as u64)
        }
    }
}

/// CLI configuration for the sql-bridge binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sql-bridge",
    about = "Message-driven SQL execution engine over a pooled relational store",
    version
)]
pub struct Config {
    /// Store connection string (postgres://, mysql://, or sqlite:)
    #[arg(short, long, env = "SQL_BRIDGE_CONNECTION")]
    pub connection: String,

    /// Idle connections retained by the pool (default: 10)
    #[arg(long, env = "SQL_BRIDGE_MAX_IDLE_CONNECTIONS")]
    pub max_idle_connections: Option<i64>,

    /// Maximum open connections (default: 100)
    #[arg(long, env = "SQL_BRIDGE_MAX_OPEN_CONNECTIONS")]
    pub max_open_connections: Option<i64>,

    /// Maximum lifetime of a pooled connection in seconds (default: 3600)
    #[arg(long, env = "SQL_BRIDGE_CONNECTION_MAX_LIFETIME_SECONDS")]
    pub connection_max_lifetime_seconds: Option<i64>,

    /// Timeout for the initial connection and liveness probe, in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "SQL_BRIDGE_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Per-request deadline in seconds (statement execution, commit, rollback)
    #[arg(
        long,
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        env = "SQL_BRIDGE_REQUEST_TIMEOUT"
    )]
    pub request_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SQL_BRIDGE_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SQL_BRIDGE_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Build the validated store configuration from the CLI flags.
    ///
    /// Routes through `StoreConfig::from_properties` so CLI values get the
    /// same bounds validation as externally supplied property maps.
    pub fn store_config(&self) -> EngineResult<StoreConfig> {
        let mut properties = HashMap::new();
        properties.insert(PROP_CONNECTION.to_string(), self.connection.clone());
        if let Some(v) = self.max_idle_connections {
            properties.insert(PROP_MAX_IDLE_CONNECTIONS.to_string(), v.to_string());
        }
        if let Some(v) = self.max_open_connections {
            properties.insert(PROP_MAX_OPEN_CONNECTIONS.to_string(), v.to_string());
        }
        if let Some(v) = self.connection_max_lifetime_seconds {
            properties.insert(
                PROP_CONNECTION_MAX_LIFETIME_SECONDS.to_string(),
                v.to_string(),
            );
        }
        StoreConfig::from_properties(&properties)
    }

    /// Get the connect timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Get the per-request deadline as a Duration.
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
