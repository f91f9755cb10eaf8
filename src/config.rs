//! Server configuration loaded from environment variables.
//!
//! Twelve-factor style: every setting comes from an environment variable
//! (or a `.env` file via `dotenvy`) and has a default, so the server runs
//! with no configuration at all.

use std::net::SocketAddr;
use std::time::Duration;

use crate::discovery::mdns::DEFAULT_WITHDRAW_TIMEOUT;
use crate::discovery::{Protocol, ServiceRecord};

/// Default listen address: all interfaces, port 3000.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Default mDNS instance name and service type.
pub const DEFAULT_SERVICE_NAME: &str = "pos-server";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level server configuration.
///
/// Loaded once at startup via [`ServerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the HTTP/WebSocket server to.
    pub listen_addr: SocketAddr,

    /// mDNS instance name.
    pub service_name: String,

    /// Bare DNS-SD service type (`pos-server` → `_pos-server._tcp`).
    pub service_type: String,

    /// Advertise over multicast DNS. When off, the advertisement is only
    /// kept in memory.
    pub mdns_enabled: bool,

    /// Interval between order updates on each connection.
    pub emit_interval: Duration,

    /// Undelivered updates buffered per connection before dropping.
    pub update_queue_capacity: usize,

    /// Upper bound on closing the listener during shutdown.
    pub shutdown_timeout: Duration,

    /// Upper bound on each mDNS daemon confirmation during withdrawal.
    pub withdraw_timeout: Duration,

    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            service_type: DEFAULT_SERVICE_NAME.to_string(),
            mdns_enabled: true,
            emit_interval: Duration::from_secs(5),
            update_queue_capacity: 16,
            shutdown_timeout: Duration::from_secs(5),
            withdraw_timeout: DEFAULT_WITHDRAW_TIMEOUT,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing or unparseable values fall back to their defaults, except
    /// `LISTEN_ADDR` which must parse when present.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr: SocketAddr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()?;

        let service_name = lookup("SERVICE_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.service_name);
        let service_type = lookup("SERVICE_TYPE")
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.service_type);

        let mdns_enabled = parse_bool(&lookup, "MDNS_ENABLED", defaults.mdns_enabled);

        let emit_interval = lookup("EMIT_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(defaults.emit_interval, |secs| Duration::from_secs(secs.max(1)));
        let update_queue_capacity =
            parse(&lookup, "UPDATE_CHANNEL_CAPACITY", defaults.update_queue_capacity).max(1);
        let shutdown_timeout = lookup("SHUTDOWN_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map_or(defaults.shutdown_timeout, Duration::from_secs);
        let withdraw_timeout = lookup("MDNS_WITHDRAW_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .map_or(defaults.withdraw_timeout, Duration::from_millis);

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            listen_addr,
            service_name,
            service_type,
            mdns_enabled,
            emit_interval,
            update_queue_capacity,
            shutdown_timeout,
            withdraw_timeout,
            log_format,
        })
    }

    /// The record to advertise for a server bound on `port`.
    #[must_use]
    pub fn service_record(&self, port: u16) -> ServiceRecord {
        ServiceRecord::new(
            self.service_name.clone(),
            self.service_type.clone(),
            port,
            Protocol::Tcp,
        )
    }
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Parses `key` as a boolean. Accepts `"true"`, `"1"`, `"false"`, `"0"`
/// (case-insensitive). Returns `default` otherwise.
fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}
