// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot-facing side of Telemock.
//!
//! Bots see the emulator through numbered [`Update`]s, read either by
//! long-polling their [`UpdateQueue`] or pushed to a webhook by the
//! [`WebhookDispatcher`]. [`BotManager`] ties these to the bot registry.

pub mod ids;
pub mod manager;
pub mod markup;
pub mod protocol;
pub mod queue;
pub mod webhook;

pub use ids::ProtocolIds;
pub use manager::{BotManager, NewBot, validate_webhook_url};
pub use markup::{parse_reply_markup, validate_reply_markup};
pub use protocol::{
    ApiResponse, BotInfo, Update, UpdateKind, WebhookInfo, WireCallbackQuery, WireChat,
    WireMessage, WireUser,
};
pub use queue::UpdateQueue;
pub use webhook::WebhookDispatcher;
