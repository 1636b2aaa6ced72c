// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence backends for the Telemock chat emulator.
//!
//! Two implementations of [`telemock_core::Store`]: [`MemoryStore`] keeps
//! everything in process and is what tests use, [`SqliteStore`] writes
//! through a single tokio-rusqlite background thread.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use telemock_config::model::{StorageBackend, StorageConfig};
use telemock_core::{Store, TelemockError};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Open the backend selected by configuration.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>, TelemockError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            let store = SqliteStore::open(&config.database_path).await?;
            Ok(Arc::new(store))
        }
    }
}
