// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation between internal ids and Bot API numeric ids.
//!
//! The numeric alias is derived from the id itself, so rendering needs no
//! lookup. Every alias handed out is remembered for the reverse direction;
//! aliases minted before a restart are recovered from the store.

use dashmap::DashMap;
use tracing::debug;

use telemock_core::{CallbackQuery, Chat, Id, Message, Store, TelemockError, User};

use crate::protocol::{WireCallbackQuery, WireChat, WireMessage, WireUser};

/// Page size when scanning a chat for an unknown message alias.
const MESSAGE_SCAN_LIMIT: usize = 10_000;

#[derive(Default)]
pub struct ProtocolIds {
    chats: DashMap<i64, Id>,
    messages: DashMap<i64, Id>,
}

impl ProtocolIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self, user: &User) -> WireUser {
        WireUser {
            id: user.id.protocol_alias(),
            is_bot: user.is_bot,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: Some(user.username.clone()).filter(|u| !u.is_empty()),
        }
    }

    pub fn chat(&self, chat: &Chat) -> WireChat {
        let alias = chat.id.protocol_alias();
        self.chats.insert(alias, chat.id);
        WireChat {
            id: alias,
            kind: chat.kind.to_string(),
            title: chat.title.clone(),
            username: chat.username.clone(),
        }
    }

    /// Render `message`, sent by `sender` into `chat`.
    pub fn message(&self, message: &Message, sender: &User, chat: &Chat) -> WireMessage {
        let alias = message.id.protocol_alias();
        self.messages.insert(alias, message.id);
        WireMessage {
            message_id: alias,
            from: Some(self.user(sender)),
            chat: self.chat(chat),
            date: message.timestamp.timestamp(),
            text: message.text.clone(),
            entities: message.entities.clone(),
            reply_markup: message.reply_markup.clone(),
            edit_date: message.edited_at.map(|t| t.timestamp()),
        }
    }

    /// Render a callback query. `author` wrote the message carrying the keyboard.
    pub fn callback(&self, query: &CallbackQuery, author: &User, chat: &Chat) -> WireCallbackQuery {
        WireCallbackQuery {
            id: query.id.clone(),
            from: self.user(&query.from),
            message: Some(self.message(&query.message, author, chat)),
            chat_instance: query.chat_instance.clone(),
            data: Some(query.data.clone()).filter(|d| !d.is_empty()),
        }
    }

    /// Resolve a `chat_id` parameter: either an internal id or a numeric alias.
    pub async fn resolve_chat(&self, store: &dyn Store, raw: &str) -> Result<Id, TelemockError> {
        let raw = raw.trim();
        if let Ok(alias) = raw.parse::<i64>() {
            if let Some(id) = self.chats.get(&alias) {
                return Ok(*id);
            }
            debug!(alias, "chat alias not cached, scanning store");
            for chat in store.list_chats().await? {
                let known = chat.id.protocol_alias();
                self.chats.insert(known, chat.id);
                if known == alias {
                    return Ok(chat.id);
                }
            }
            return Err(TelemockError::not_found("chat", alias));
        }
        raw.parse::<Id>()
    }

    /// Resolve a numeric `message_id` within `chat_id`.
    pub async fn resolve_message(
        &self,
        store: &dyn Store,
        chat_id: &Id,
        alias: i64,
    ) -> Result<Id, TelemockError> {
        if let Some(id) = self.messages.get(&alias) {
            return Ok(*id);
        }
        for message in store.chat_messages(chat_id, MESSAGE_SCAN_LIMIT, 0).await? {
            let known = message.id.protocol_alias();
            if known == alias {
                self.messages.insert(known, message.id);
                return Ok(message.id);
            }
        }
        Err(TelemockError::not_found("message", alias))
    }
}
