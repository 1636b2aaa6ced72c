// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `telemock serve` command implementation.
//!
//! Opens the configured store, wires the emulator, optionally seeds demo
//! data, and serves HTTP until SIGINT or SIGTERM.

use telemock_config::TelemockConfig;
use telemock_config::model::{LogFormat, LoggingConfig};
use telemock_core::TelemockError;
use telemock_emulator::Emulator;
use telemock_gateway::{AppState, router, serve};
use telemock_storage::open_store;
use tracing::info;

use crate::shutdown;

pub async fn run_serve(config: TelemockConfig) -> Result<(), TelemockError> {
    init_tracing(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "starting telemock serve");

    let store = open_store(&config.storage).await?;
    let emulator = Emulator::new(store, &config)?;
    emulator.seed_if_enabled(&config).await?;

    let app = router(AppState::new(emulator));
    let cancel = shutdown::install_signal_handler();
    serve(&config.server, app, cancel).await?;

    info!("telemock serve shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins when set. Otherwise the configured level applies to
/// telemock's own crates and the HTTP trace layer, `warn` to everything else.
fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let level = &logging.level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("telemock={level},tower_http={level},warn")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
