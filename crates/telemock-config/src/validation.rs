// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use crate::diagnostic::ConfigError;
use crate::model::{StorageBackend, TelemockConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &TelemockConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not an IP address or hostname"
        )));
    }

    if config.server.port == 0 {
        errors.push(ConfigError::validation("server.port must be non-zero"));
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty when backend is sqlite",
        ));
    }

    let ws = &config.websocket;
    if ws.send_buffer == 0 {
        errors.push(ConfigError::validation("websocket.send_buffer must be at least 1"));
    }
    if ws.max_message_size == 0 {
        errors.push(ConfigError::validation(
            "websocket.max_message_size must be at least 1",
        ));
    }
    if ws.ping_period_secs == 0 || ws.ping_period_secs >= ws.pong_wait_secs {
        errors.push(ConfigError::validation(format!(
            "websocket.ping_period_secs ({}) must be non-zero and shorter than pong_wait_secs ({})",
            ws.ping_period_secs, ws.pong_wait_secs
        )));
    }
    if ws.write_wait_secs == 0 {
        errors.push(ConfigError::validation("websocket.write_wait_secs must be at least 1"));
    }

    if config.bots.retention == 0 {
        errors.push(ConfigError::validation("bots.retention must be at least 1"));
    }
    if config.bots.poll_interval_ms == 0 {
        errors.push(ConfigError::validation("bots.poll_interval_ms must be at least 1"));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &TelemockConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&TelemockConfig::default()).is_ok());
    }

    #[test]
    fn ping_must_be_shorter_than_pong_wait() {
        let mut config = TelemockConfig::default();
        config.websocket.ping_period_secs = 60;
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("ping_period_secs"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = TelemockConfig::default();
        config.server.port = 0;
        config.bots.retention = 0;
        config.logging.level = "verbose".into();
        assert_eq!(messages(&config).len(), 3);
    }

    #[test]
    fn memory_backend_ignores_database_path() {
        let mut config = TelemockConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.database_path = String::new();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_garbage_host() {
        let mut config = TelemockConfig::default();
        config.server.host = "local host!".into();
        assert!(messages(&config)[0].contains("server.host"));
    }
}
