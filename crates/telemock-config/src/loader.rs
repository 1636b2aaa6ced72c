// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with figment.
//!
//! Lookup order, later layers win: compiled defaults,
//! `/etc/telemock/telemock.toml`, `~/.config/telemock/telemock.toml`,
//! `./telemock.toml`, then `TELEMOCK_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TelemockConfig;

const SYSTEM_CONFIG: &str = "/etc/telemock/telemock.toml";
const LOCAL_CONFIG: &str = "telemock.toml";

/// Section names recognised in `TELEMOCK_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "server",
    "storage",
    "websocket",
    "bots",
    "delivery",
    "logging",
    "seed",
];

/// Every TOML file consulted, lowest priority first.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("telemock").join(LOCAL_CONFIG));
    }
    paths.push(PathBuf::from(LOCAL_CONFIG));
    paths
}

/// The full figment stack before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(TelemockConfig::default()));
    for path in config_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Load from the standard file hierarchy plus environment overrides.
pub fn load_config() -> Result<TelemockConfig, figment::Error> {
    build_figment().extract()
}

/// Load one explicit file plus environment overrides, skipping the hierarchy.
pub fn load_config_from_path(path: &Path) -> Result<TelemockConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TelemockConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load from an inline TOML document with no file or env layers.
pub fn load_config_from_str(toml_content: &str) -> Result<TelemockConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TelemockConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Maps `TELEMOCK_WEBSOCKET_SEND_BUFFER` to `websocket.send_buffer`.
///
/// Only the first underscore after a known section becomes a dot, so keys
/// that themselves contain underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("TELEMOCK_").map(|key| {
        let key = key.as_str();
        for section in ENV_SECTIONS {
            if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
                return format!("{section}.{rest}").into();
            }
        }
        key.to_string().into()
    })
}
