// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling for graceful shutdown.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Installs handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal arrives.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}
