// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telemock - a Telegram Bot API compatible chat emulator.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use telemock_config::{ConfigError, TelemockConfig};

/// Telemock - a Telegram Bot API compatible chat emulator.
#[derive(Parser, Debug)]
#[command(name = "telemock", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the emulator server.
    Serve,
    /// Validate the configuration and print a summary.
    CheckConfig,
}

fn load(path: Option<&Path>) -> Result<TelemockConfig, Vec<ConfigError>> {
    match path {
        Some(path) => telemock_config::load_and_validate_path(path),
        None => telemock_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            telemock_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!(
                "telemock: config ok (server={}:{}, storage={:?}, seed={})",
                config.server.host, config.server.port, config.storage.backend, config.seed.enabled
            );
        }
        None => {
            println!("telemock: use --help for available commands");
        }
    }
}
