// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payloads of the events the orchestrator pushes to live clients.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use telemock_core::{Id, Message, MessageEntity, MessageKind, MessageStatus, User};

#[derive(Debug, Serialize)]
pub struct Sender<'a> {
    pub id: Id,
    pub username: &'a str,
    pub first_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<&'a str>,
    pub is_bot: bool,
}

impl<'a> From<&'a User> for Sender<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id,
            username: &user.username,
            first_name: &user.first_name,
            last_name: user.last_name.as_deref(),
            is_bot: user.is_bot,
        }
    }
}

/// Body of `message` and `message_edited` events.
#[derive(Debug, Serialize)]
pub struct MessageEvent<'a> {
    pub id: Id,
    pub chat_id: Id,
    pub from: Sender<'a>,
    pub text: &'a str,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub status: MessageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<&'a Value>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    pub entities: &'a [MessageEntity],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

impl<'a> MessageEvent<'a> {
    pub fn new(message: &'a Message, sender: &'a User) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            from: Sender::from(sender),
            text: &message.text,
            kind: message.kind,
            timestamp: message.timestamp,
            status: message.status,
            reply_markup: message.reply_markup.as_ref(),
            entities: &message.entities,
            edited_at: message.edited_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusUpdate {
    pub message_id: Id,
    pub status: MessageStatus,
}

#[derive(Debug, Serialize)]
pub struct MessageDeleted {
    pub message_id: Id,
    pub chat_id: Id,
}

#[derive(Debug, Serialize)]
pub struct ChatRead {
    pub chat_id: Id,
    pub user_id: Id,
}
