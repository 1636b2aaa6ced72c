// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot API wire types.
//!
//! These are the shapes bots see from `getUpdates` and webhook pushes.
//! Every identifier is a numeric protocol alias, see [`crate::ids`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use telemock_core::MessageEntity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<WireUser>,
    pub chat: WireChat,
    /// Unix seconds.
    pub date: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<MessageEntity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireCallbackQuery {
    pub id: String,
    pub from: WireUser,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<WireMessage>,
    pub chat_instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// The event an [`Update`] carries. Exactly one is ever present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Message(WireMessage),
    EditedMessage(WireMessage),
    CallbackQuery(WireCallbackQuery),
}

/// One bot-addressed event with its per-bot sequence number.
///
/// Serializes as `{"update_id": 1, "message": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    /// When the update was enqueued. Not part of the wire shape.
    #[serde(skip)]
    pub enqueued_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: UpdateKind,
}

impl Update {
    pub fn message(&self) -> Option<&WireMessage> {
        match &self.kind {
            UpdateKind::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn callback_query(&self) -> Option<&WireCallbackQuery> {
        match &self.kind {
            UpdateKind::CallbackQuery(q) => Some(q),
            _ => None,
        }
    }
}

/// The Bot API response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error_code: None,
            description: None,
        }
    }

    pub fn error(code: u16, description: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error_code: Some(code),
            description: Some(description.into()),
        }
    }
}

/// `getMe` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub username: String,
    pub can_join_groups: bool,
    pub can_read_all_group_messages: bool,
    pub supports_inline_queries: bool,
}

/// `getWebhookInfo` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookInfo {
    pub url: String,
    pub has_custom_certificate: bool,
    pub pending_update_count: usize,
    pub max_connections: u32,
    pub allowed_updates: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_message() -> WireMessage {
        WireMessage {
            message_id: 7,
            from: Some(WireUser {
                id: 1,
                is_bot: false,
                first_name: "Alice".into(),
                last_name: None,
                username: Some("alice".into()),
            }),
            chat: WireChat {
                id: 2,
                kind: "group".into(),
                title: Some("Lobby".into()),
                username: None,
            },
            date: 1_700_000_000,
            text: "hello".into(),
            entities: Vec::new(),
            reply_markup: None,
            edit_date: None,
        }
    }

    #[test]
    fn update_carries_only_the_populated_field() {
        let update = Update {
            update_id: 3,
            enqueued_at: Utc::now(),
            kind: UpdateKind::Message(wire_message()),
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["update_id"], 3);
        assert_eq!(value["message"]["text"], "hello");
        assert_eq!(value["message"]["chat"]["type"], "group");
        assert!(value.get("edited_message").is_none());
        assert!(value.get("callback_query").is_none());
        assert!(value.get("enqueued_at").is_none());
    }

    #[test]
    fn edited_message_uses_its_own_key() {
        let update = Update {
            update_id: 1,
            enqueued_at: Utc::now(),
            kind: UpdateKind::EditedMessage(wire_message()),
        };
        let value = serde_json::to_value(&update).unwrap();
        assert!(value.get("message").is_none());
        assert_eq!(value["edited_message"]["message_id"], 7);
    }

    #[test]
    fn update_parses_from_wire() {
        let raw = json!({
            "update_id": 9,
            "callback_query": {
                "id": "cq_1",
                "from": {"id": 1, "is_bot": false, "first_name": "A"},
                "chat_instance": "c",
                "data": "go"
            }
        });
        let update: Update = serde_json::from_value(raw).unwrap();
        assert_eq!(update.update_id, 9);
        assert_eq!(update.callback_query().unwrap().data.as_deref(), Some("go"));
        assert!(update.message().is_none());
    }

    #[test]
    fn error_envelope_omits_result() {
        let value = serde_json::to_value(ApiResponse::<()>::error(401, "Unauthorized")).unwrap();
        assert_eq!(value, json!({"ok": false, "error_code": 401, "description": "Unauthorized"}));
    }
}
