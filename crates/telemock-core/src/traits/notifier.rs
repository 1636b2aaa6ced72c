// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Narrow capabilities handed to the real-time layer.
//!
//! The WebSocket pumps never see the orchestrator directly. They receive
//! these two capabilities at construction, so the hub can be built and
//! tested in isolation.

use async_trait::async_trait;

use crate::error::TelemockError;
use crate::types::{CallbackQuery, Id, Message, NewMessage};

/// Routes a pressed inline button to the bot that owns the keyboard.
#[async_trait]
pub trait BotNotifier: Send + Sync {
    /// Mint a callback query from `user_id` pressing a button on `message_id`
    /// and enqueue it for the owning bot.
    async fn enqueue_callback(
        &self,
        user_id: &Id,
        message_id: &Id,
        data: &str,
    ) -> Result<CallbackQuery, TelemockError>;
}

/// Accepts a message typed by a connected client.
#[async_trait]
pub trait MessageSubmitter: Send + Sync {
    async fn submit_message(&self, message: NewMessage) -> Result<Message, TelemockError>;
}
