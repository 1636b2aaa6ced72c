// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Telemock emulator.
//!
//! Strict TOML parsing (`deny_unknown_fields`), a file hierarchy with
//! `TELEMOCK_*` environment overrides, semantic validation, and miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! let config = telemock_config::load_and_validate().expect("config errors");
//! println!("listening on {}:{}", config.server.host, config.server.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TelemockConfig;

/// Load from the standard hierarchy and validate.
pub fn load_and_validate() -> Result<TelemockConfig, Vec<ConfigError>> {
    finish(loader::load_config(), read_sources(&loader::config_paths()))
}

/// Load a specific file (plus env overrides) and validate.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<TelemockConfig, Vec<ConfigError>> {
    finish(
        loader::load_config_from_path(path),
        read_sources(&[path.to_path_buf()]),
    )
}

/// Load an inline TOML document and validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<TelemockConfig, Vec<ConfigError>> {
    finish(
        loader::load_config_from_str(toml_content),
        vec![("<inline>".to_string(), toml_content.to_string())],
    )
}

fn finish(
    loaded: Result<TelemockConfig, figment::Error>,
    sources: Vec<(String, String)>,
) -> Result<TelemockConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources)),
    }
}

/// Contents of the config files that exist, keyed by the path figment reports.
fn read_sources(paths: &[std::path::PathBuf]) -> Vec<(String, String)> {
    paths
        .iter()
        .filter_map(|p| {
            let content = std::fs::read_to_string(p).ok()?;
            tracing::debug!(path = %p.display(), "read config file");
            let shown = std::fs::canonicalize(p).unwrap_or_else(|_| p.clone());
            Some((shown.display().to_string(), content))
        })
        .collect()
}
