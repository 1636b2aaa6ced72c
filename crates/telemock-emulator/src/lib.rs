// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The emulator proper: message orchestration, the user and chat
//! directory, and the wiring that connects them to the hub and the bot
//! subsystem.

pub mod directory;
pub mod events;
pub mod messages;
pub mod seed;

use std::sync::Arc;

use telemock_bot::BotManager;
use telemock_config::TelemockConfig;
use telemock_core::{Store, TelemockError};
use telemock_hub::{ConnectionHub, WsContext};

pub use directory::Directory;
pub use messages::MessageManager;
pub use seed::seed_demo_data;

/// Every long-lived service, built once at startup and shared by handle.
#[derive(Clone)]
pub struct Emulator {
    pub store: Arc<dyn Store>,
    pub hub: Arc<ConnectionHub>,
    pub bots: Arc<BotManager>,
    pub messages: Arc<MessageManager>,
    pub directory: Arc<Directory>,
    pub ws: Arc<WsContext>,
}

impl Emulator {
    pub fn new(store: Arc<dyn Store>, config: &TelemockConfig) -> Result<Self, TelemockError> {
        let hub = Arc::new(ConnectionHub::new());
        let bots = Arc::new(BotManager::new(store.clone(), &config.bots)?);
        let messages = Arc::new(MessageManager::new(
            store.clone(),
            hub.clone(),
            bots.clone(),
            &config.delivery,
        ));
        let directory = Arc::new(Directory::new(store.clone()));
        let ws = Arc::new(WsContext {
            hub: hub.clone(),
            store: store.clone(),
            submitter: messages.clone(),
            notifier: messages.clone(),
            config: config.websocket.clone(),
        });
        Ok(Self {
            store,
            hub,
            bots,
            messages,
            directory,
            ws,
        })
    }

    /// Seed demo data if the config asks for it.
    pub async fn seed_if_enabled(&self, config: &TelemockConfig) -> Result<(), TelemockError> {
        if config.seed.enabled {
            seed_demo_data(self.store.as_ref(), &self.directory, &self.bots).await?;
        }
        Ok(())
    }
}
