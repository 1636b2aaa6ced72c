// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Demo data for a fresh install.

use tracing::info;

use telemock_bot::{BotManager, NewBot};
use telemock_core::{Store, TelemockError};

use crate::directory::Directory;

pub const DEMO_BOT_TOKEN: &str = "123456:demo-token";

/// Create two users, a demo bot, and a group chat holding all three.
///
/// Does nothing when the demo user already exists, so it is safe to run on
/// every start.
pub async fn seed_demo_data(
    store: &dyn Store,
    directory: &Directory,
    bots: &BotManager,
) -> Result<(), TelemockError> {
    if store.get_user_by_username("alice").await?.is_some() {
        info!("demo data already present");
        return Ok(());
    }

    let alice = directory.create_user("alice", "Alice", None, false).await?;
    let bob = directory.create_user("bob", "Bob", Some("Builder"), false).await?;
    let bot = bots
        .create_bot(NewBot {
            name: "Demo Bot".into(),
            username: "demo_bot".into(),
            token: DEMO_BOT_TOKEN.into(),
            webhook_url: None,
        })
        .await?;
    let lobby = directory
        .create_group_chat("Lobby", &[alice.id, bob.id, bot.id])
        .await?;
    directory.create_private_chat(&alice.id, &bob.id).await?;

    info!(chat_id = %lobby.id, bot_id = %bot.id, "demo data seeded");
    Ok(())
}
