// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket frame shapes.
//!
//! Every frame in either direction is `{"type": ..., "data": ...}`.

use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display};

use telemock_core::{Id, MessageKind};

/// Outbound event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    Message,
    MessageStatusUpdate,
    MessageEdited,
    MessageDelete,
    ChatRead,
    CallbackQuery,
    Typing,
    Pong,
    Subscribed,
}

#[derive(Serialize)]
struct OutboundFrame<'a, T: Serialize + ?Sized> {
    #[serde(rename = "type")]
    kind: Event,
    data: &'a T,
}

/// Serialize a frame once, ready to be cloned into any number of queues.
pub fn encode<T: Serialize + ?Sized>(event: Event, data: &T) -> serde_json::Result<Utf8Bytes> {
    let json = serde_json::to_string(&OutboundFrame { kind: event, data })?;
    Ok(Utf8Bytes::from(json))
}

/// A frame received from a client, before its payload is interpreted.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeData {
    #[serde(default)]
    pub events: Vec<String>,
}

/// Payload of an inbound `send_message`.
#[derive(Debug, Deserialize)]
pub struct SendMessageData {
    pub chat_id: Id,
    pub text: String,
    #[serde(default, rename = "type")]
    pub kind: Option<MessageKind>,
    #[serde(default)]
    pub reply_markup: Option<Value>,
    /// Claimed sender. Must match the connection's user when present.
    #[serde(default)]
    pub from_user_id: Option<Id>,
}

/// Payload of an inbound `callback_query`.
#[derive(Debug, Deserialize)]
pub struct CallbackQueryData {
    pub chat_id: Id,
    pub message_id: Id,
    /// The pressed button, echoed back verbatim in the rebroadcast.
    pub button: Value,
}

impl CallbackQueryData {
    /// Non-empty `button.callback_data`, if present.
    pub fn callback_data(&self) -> Option<&str> {
        self.button
            .get("callback_data")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_type_and_data() {
        let bytes = encode(Event::MessageStatusUpdate, &json!({"status": "sent"})).unwrap();
        let value: Value = serde_json::from_str(bytes.as_str()).unwrap();
        assert_eq!(value["type"], "message_status_update");
        assert_eq!(value["data"]["status"], "sent");
    }

    #[test]
    fn event_names_are_snake_case() {
        assert_eq!(Event::ChatRead.to_string(), "chat_read");
        assert_eq!(Event::MessageDelete.as_ref(), "message_delete");
    }

    #[test]
    fn inbound_frame_tolerates_missing_data() {
        let frame: InboundFrame = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame.kind, "ping");
        assert!(frame.data.is_null());
    }

    #[test]
    fn send_message_data_parses_optional_fields() {
        let chat = Id::new();
        let raw = json!({"chat_id": chat.to_string(), "text": "hi", "type": "photo"});
        let data: SendMessageData = serde_json::from_value(raw).unwrap();
        assert_eq!(data.chat_id, chat);
        assert_eq!(data.kind, Some(MessageKind::Photo));
        assert!(data.from_user_id.is_none());
    }

    #[test]
    fn empty_callback_data_is_rejected() {
        let raw = json!({
            "chat_id": Id::new().to_string(),
            "message_id": Id::new().to_string(),
            "button": {"text": "Go", "callback_data": ""}
        });
        let data: CallbackQueryData = serde_json::from_value(raw).unwrap();
        assert!(data.callback_data().is_none());
    }
}
