// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by every Telemock crate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::TelemockError;

/// Mask keeping the low 52 bits, so aliases stay exact in JavaScript clients.
const ALIAS_MASK: u64 = (1 << 52) - 1;

/// Opaque identifier used for every entity.
///
/// Backed by a UUIDv7, so identifiers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Mint a fresh time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Small positive integer used where the Bot API expects numeric ids.
    ///
    /// Derived from the random tail of the UUID, so it is stable across restarts.
    pub fn protocol_alias(&self) -> i64 {
        let bytes = self.0.as_bytes();
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&bytes[8..16]);
        let alias = u64::from_be_bytes(tail) & ALIAS_MASK;
        if alias == 0 { 1 } else { alias as i64 }
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for Id {
    type Err = TelemockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| TelemockError::invalid(format!("malformed id `{s}`: {e}")))
    }
}

/// A human or bot participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub is_bot: bool,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with a fresh id.
    pub fn new(username: impl Into<String>, first_name: impl Into<String>, is_bot: bool) -> Self {
        Self {
            id: Id::new(),
            username: username.into(),
            first_name: first_name.into(),
            last_name: None,
            is_bot,
            is_online: false,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    /// Going offline stamps `last_seen`.
    pub fn set_online(&mut self, online: bool) {
        self.is_online = online;
        if !online {
            self.last_seen = Some(Utc::now());
        }
    }

    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {last}", self.first_name),
            _ => self.first_name.clone(),
        }
    }
}

/// One-to-one or multi-member chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// See [`Store::unread_count`](crate::Store::unread_count).
    pub unread_count: i64,
    /// When the chat was last marked as read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(kind: ChatKind, title: Option<String>) -> Self {
        Self {
            id: Id::new(),
            kind,
            title,
            username: None,
            description: None,
            unread_count: 0,
            last_read_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    File,
    Voice,
    Photo,
}

/// Delivery state of a message: `sending -> sent -> delivered`, with `read` as a terminal override.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Sending => 0,
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
        }
    }

    /// True when moving from `self` to `next` does not regress.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        next.rank() >= self.rank()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    BotCommand,
    Mention,
    Url,
    Hashtag,
}

/// Annotation over a span of message text. Offsets are UTF-16 code units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub chat_id: Id,
    pub from_id: Id,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub status: MessageStatus,
    pub is_outgoing: bool,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
}

impl Message {
    /// True when the text carries a bot command entity.
    pub fn is_command(&self) -> bool {
        self.entities.iter().any(|e| e.kind == EntityKind::BotCommand)
    }
}

/// Input to the message orchestrator.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: Id,
    pub from_id: Id,
    pub text: String,
    pub kind: MessageKind,
    pub reply_markup: Option<serde_json::Value>,
}

impl NewMessage {
    pub fn text(chat_id: Id, from_id: Id, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            from_id,
            text: text.into(),
            kind: MessageKind::Text,
            reply_markup: None,
        }
    }

    pub fn with_reply_markup(mut self, markup: serde_json::Value) -> Self {
        self.reply_markup = Some(markup);
        self
    }
}

/// A registered bot. Its user identity shares the same [`Id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    pub id: Id,
    pub name: String,
    pub username: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub is_active: bool,
    /// Default offset for polls that omit one.
    pub last_update_offset: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bot {
    pub fn new(name: impl Into<String>, username: impl Into<String>, token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Id::new(),
            name: name.into(),
            username: username.into(),
            token: token.into(),
            webhook_url: None,
            is_active: true,
            last_update_offset: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Produced when a user presses an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Message,
    pub chat_instance: String,
    pub data: String,
}
