// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Telemock emulator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of being silently ignored.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Telemock configuration.
///
/// Every section is optional and falls back to the defaults below.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemockConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Persistence backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Real-time connection limits and keepalive timing.
    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Update queue and webhook behavior.
    #[serde(default)]
    pub bots: BotsConfig,

    /// Simulated delivery latency.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Demo data created at startup.
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

/// Which store implementation backs the emulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite database file, created with its parent directory when missing.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "data/telemock.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebSocketConfig {
    /// Outbound frames buffered per connection before the client is dropped.
    #[serde(default = "default_send_buffer")]
    pub send_buffer: usize,
    /// Largest inbound frame accepted, in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Silence on the socket longer than this closes the connection.
    #[serde(default = "default_pong_wait_secs")]
    pub pong_wait_secs: u64,
    /// Keepalive ping interval. Must be shorter than `pong_wait_secs`.
    #[serde(default = "default_ping_period_secs")]
    pub ping_period_secs: u64,
    #[serde(default = "default_write_wait_secs")]
    pub write_wait_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl WebSocketConfig {
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    pub fn ping_period(&self) -> Duration {
        Duration::from_secs(self.ping_period_secs)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            send_buffer: default_send_buffer(),
            max_message_size: default_max_message_size(),
            pong_wait_secs: default_pong_wait_secs(),
            ping_period_secs: default_ping_period_secs(),
            write_wait_secs: default_write_wait_secs(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_send_buffer() -> usize {
    256
}

fn default_max_message_size() -> usize {
    512
}

fn default_pong_wait_secs() -> u64 {
    60
}

fn default_ping_period_secs() -> u64 {
    54
}

fn default_write_wait_secs() -> u64 {
    10
}

fn default_max_connections() -> usize {
    1000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotsConfig {
    /// Updates kept per bot. Older entries are evicted first.
    #[serde(default = "default_retention")]
    pub retention: usize,
    /// How often a waiting long poll re-checks its queue.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_timeout_secs")]
    pub max_poll_timeout_secs: u64,
    /// Per-request timeout for webhook POSTs.
    #[serde(default = "default_webhook_timeout_secs")]
    pub webhook_timeout_secs: u64,
}

impl BotsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_timeout_secs: default_max_poll_timeout_secs(),
            webhook_timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

fn default_retention() -> usize {
    1000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_poll_timeout_secs() -> u64 {
    50
}

fn default_webhook_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Delay before `sending -> sent`.
    #[serde(default = "default_sent_delay_ms")]
    pub sent_delay_ms: u64,
    /// Delay before `sent -> delivered`.
    #[serde(default = "default_delivered_delay_ms")]
    pub delivered_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            sent_delay_ms: default_sent_delay_ms(),
            delivered_delay_ms: default_delivered_delay_ms(),
        }
    }
}

fn default_sent_delay_ms() -> u64 {
    100
}

fn default_delivered_delay_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keepalive_durations_follow_seconds() {
        let ws = WebSocketConfig::default();
        assert_eq!(ws.pong_wait(), Duration::from_secs(60));
        assert_eq!(ws.ping_period(), Duration::from_secs(54));
        assert_eq!(ws.write_wait(), Duration::from_secs(10));
    }

    #[test]
    fn storage_backend_parses_lowercase() {
        let cfg: StorageConfig = toml::from_str("backend = \"memory\"").unwrap();
        assert_eq!(cfg.backend, StorageBackend::Memory);
        assert_eq!(cfg.database_path, "data/telemock.db");
    }

    #[test]
    fn bots_deny_unknown_fields() {
        let result = toml::from_str::<BotsConfig>("retension = 5");
        assert!(result.is_err());
    }

    #[test]
    fn log_format_defaults_to_pretty() {
        let cfg: LoggingConfig = toml::from_str("level = \"debug\"").unwrap();
        assert_eq!(cfg.format, LogFormat::Pretty);
        assert_eq!(cfg.level, "debug");
    }
}
