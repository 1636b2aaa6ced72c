// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API compatible endpoints.
//!
//! Every method accepts its parameters from the query string, a JSON body,
//! or a urlencoded form, in any combination. Body values win.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use telemock_bot::{ApiResponse, BotInfo, WebhookInfo, WireMessage, parse_reply_markup};
use telemock_core::{Bot, Id, NewMessage, TelemockError};

use crate::error::BotApiError;
use crate::server::AppState;

const DEFAULT_LIMIT: i64 = 100;
const WEBHOOK_MAX_CONNECTIONS: u32 = 40;

/// Request parameters merged from every place a client may put them.
#[derive(Debug, Default)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn parse(
        query: Option<&str>,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<Self, TelemockError> {
        let mut params = Map::new();
        if let Some(query) = query {
            for (key, value) in form_pairs(query.as_bytes())? {
                params.insert(key, Value::String(value));
            }
        }

        let content_type = content_type.unwrap_or_default();
        let body_params = if body.iter().all(u8::is_ascii_whitespace) {
            Map::new()
        } else if content_type.contains("json") {
            json_object(body)?
        } else if content_type.contains("x-www-form-urlencoded") {
            form_object(body)?
        } else if content_type.starts_with("multipart/") {
            return Err(TelemockError::invalid("multipart bodies are not supported"));
        } else {
            json_object(body).or_else(|_| form_object(body))?
        };
        params.extend(body_params);
        Ok(Self(params))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// A string parameter. Numbers and booleans are rendered as text.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn required(&self, key: &str) -> Result<String, TelemockError> {
        self.string(key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| TelemockError::invalid(format!("{key} is required")))
    }

    /// An integer parameter given as a JSON number or a numeric string.
    pub fn int(&self, key: &str) -> Result<Option<i64>, TelemockError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| TelemockError::invalid(format!("{key} must be an integer"))),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| TelemockError::invalid(format!("{key} must be an integer"))),
            Some(_) => Err(TelemockError::invalid(format!("{key} must be an integer"))),
        }
    }

    fn reply_markup(&self) -> Result<Option<Value>, TelemockError> {
        match self.get("reply_markup") {
            None => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(raw) => parse_reply_markup(raw).map(Some),
        }
    }
}

fn form_pairs(raw: &[u8]) -> Result<Vec<(String, String)>, TelemockError> {
    serde_urlencoded::from_bytes(raw)
        .map_err(|e| TelemockError::invalid(format!("malformed form data: {e}")))
}

fn form_object(raw: &[u8]) -> Result<Map<String, Value>, TelemockError> {
    Ok(form_pairs(raw)?
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect())
}

fn json_object(raw: &[u8]) -> Result<Map<String, Value>, TelemockError> {
    match serde_json::from_slice(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TelemockError::invalid("request body must be a JSON object")),
        Err(e) => Err(TelemockError::invalid(format!("malformed JSON body: {e}"))),
    }
}

/// `/bot<token>/<method>`.
pub async fn prefixed(
    State(state): State<Arc<AppState>>,
    Path((segment, method)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(token) = segment.strip_prefix("bot") else {
        let body: ApiResponse<()> = ApiResponse::error(404, "Not Found");
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };
    handle(&state, token, &method, query.as_deref(), &headers, &body).await
}

/// `/bot/<token>/<method>`.
pub async fn separated(
    State(state): State<Arc<AppState>>,
    Path((token, method)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&state, &token, &method, query.as_deref(), &headers, &body).await
}

async fn handle(
    state: &AppState,
    token: &str,
    method: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    let bot = match state.emulator.bots.bot_by_token(token).await {
        Ok(bot) => bot,
        Err(e) => return BotApiError(e).into_response(),
    };
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let params = match Params::parse(query, content_type, body) {
        Ok(params) => params,
        Err(e) => return BotApiError(e).into_response(),
    };

    debug!(bot_id = %bot.id, method, "bot api call");
    let api = BotApi { state, bot };
    match method.to_ascii_lowercase().as_str() {
        "getme" => reply(api.get_me()),
        "getupdates" => reply(api.get_updates(&params).await),
        "sendmessage" => reply(api.send_message(&params).await),
        "setwebhook" => reply(api.set_webhook(&params).await),
        "deletewebhook" => reply(api.delete_webhook().await),
        "getwebhookinfo" => reply(api.webhook_info().await),
        "answercallbackquery" => reply(api.answer_callback_query(&params)),
        "editmessagetext" => reply(api.edit_message_text(&params).await),
        "editmessagereplymarkup" => reply(api.edit_message_reply_markup(&params).await),
        _ => {
            let body: ApiResponse<()> = ApiResponse::error(404, "Not Found: method not found");
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

fn reply<T: Serialize>(result: Result<T, TelemockError>) -> Response {
    match result {
        Ok(value) => Json(ApiResponse::ok(value)).into_response(),
        Err(e) => BotApiError(e).into_response(),
    }
}

/// One authenticated call.
struct BotApi<'a> {
    state: &'a AppState,
    bot: Bot,
}

impl BotApi<'_> {
    fn get_me(&self) -> Result<BotInfo, TelemockError> {
        Ok(BotInfo {
            id: self.bot.id.protocol_alias(),
            is_bot: true,
            first_name: self.bot.name.clone(),
            username: self.bot.username.clone(),
            can_join_groups: true,
            can_read_all_group_messages: false,
            supports_inline_queries: false,
        })
    }

    async fn get_updates(&self, params: &Params) -> Result<Vec<telemock_bot::Update>, TelemockError> {
        let offset = params.int("offset")?.unwrap_or(0);
        let limit = params.int("limit")?.unwrap_or(DEFAULT_LIMIT);
        let timeout = params.int("timeout")?.unwrap_or(0);
        self.state
            .emulator
            .bots
            .get_updates(&self.bot.id, offset, limit, timeout)
            .await
    }

    async fn send_message(&self, params: &Params) -> Result<WireMessage, TelemockError> {
        let emulator = &self.state.emulator;
        let chat_id = self.resolve_chat(params).await?;
        let text = params.required("text")?;
        let mut draft = NewMessage::text(chat_id, self.bot.id, text);
        if let Some(markup) = params.reply_markup()? {
            draft = draft.with_reply_markup(markup);
        }

        let message = emulator.messages.send_message(draft).await?;
        let sender = emulator.directory.get_user(&self.bot.id).await?;
        let chat = emulator.directory.get_chat(&chat_id).await?;
        Ok(emulator.bots.ids().message(&message, &sender, &chat))
    }

    async fn set_webhook(&self, params: &Params) -> Result<bool, TelemockError> {
        let bots = &self.state.emulator.bots;
        match params.string("url").filter(|u| !u.trim().is_empty()) {
            Some(url) => {
                bots.set_webhook(&self.bot.id, &url).await?;
                info!(bot_id = %self.bot.id, url = %url, "webhook set");
            }
            None => {
                bots.delete_webhook(&self.bot.id).await?;
                info!(bot_id = %self.bot.id, "webhook removed");
            }
        }
        Ok(true)
    }

    async fn delete_webhook(&self) -> Result<bool, TelemockError> {
        self.state.emulator.bots.delete_webhook(&self.bot.id).await?;
        info!(bot_id = %self.bot.id, "webhook removed");
        Ok(true)
    }

    async fn webhook_info(&self) -> Result<WebhookInfo, TelemockError> {
        let bots = &self.state.emulator.bots;
        let bot = bots.get_bot(&self.bot.id).await?;
        Ok(WebhookInfo {
            url: bot.webhook_url.unwrap_or_default(),
            has_custom_certificate: false,
            pending_update_count: bots.pending_updates(&bot.id).await,
            max_connections: WEBHOOK_MAX_CONNECTIONS,
            allowed_updates: Vec::new(),
        })
    }

    fn answer_callback_query(&self, params: &Params) -> Result<bool, TelemockError> {
        let callback_id = params.required("callback_query_id")?;
        info!(
            bot_id = %self.bot.id,
            callback_query_id = %callback_id,
            text = %params.string("text").unwrap_or_default(),
            show_alert = params.string("show_alert").as_deref() == Some("true"),
            "callback query answered"
        );
        Ok(true)
    }

    async fn edit_message_text(&self, params: &Params) -> Result<WireMessage, TelemockError> {
        let emulator = &self.state.emulator;
        let target = self.resolve_own_message(params).await?;
        let text = params.required("text")?;
        let markup = params.reply_markup()?;

        let message = emulator
            .messages
            .edit_message_text(&target, &text, markup)
            .await?;
        let sender = emulator.directory.get_user(&message.from_id).await?;
        let chat = emulator.directory.get_chat(&message.chat_id).await?;
        Ok(emulator.bots.ids().message(&message, &sender, &chat))
    }

    /// Validates the markup and echoes it back on the message. Nothing is stored.
    async fn edit_message_reply_markup(&self, params: &Params) -> Result<WireMessage, TelemockError> {
        let emulator = &self.state.emulator;
        let target = self.resolve_own_message(params).await?;
        let markup = params.reply_markup()?;

        let mut message = emulator.messages.get_message(&target).await?;
        message.reply_markup = markup;
        let sender = emulator.directory.get_user(&message.from_id).await?;
        let chat = emulator.directory.get_chat(&message.chat_id).await?;
        info!(bot_id = %self.bot.id, message_id = %message.id, "reply markup edit echoed");
        Ok(emulator.bots.ids().message(&message, &sender, &chat))
    }

    async fn resolve_chat(&self, params: &Params) -> Result<Id, TelemockError> {
        let raw = params.required("chat_id")?;
        let emulator = &self.state.emulator;
        emulator
            .bots
            .ids()
            .resolve_chat(emulator.store.as_ref(), &raw)
            .await
    }

    /// Resolve `chat_id` plus `message_id` to a message this bot wrote.
    async fn resolve_own_message(&self, params: &Params) -> Result<Id, TelemockError> {
        let emulator = &self.state.emulator;
        let chat_id = self.resolve_chat(params).await?;
        let alias = params
            .int("message_id")?
            .ok_or_else(|| TelemockError::invalid("message_id is required"))?;
        let id = emulator
            .bots
            .ids()
            .resolve_message(emulator.store.as_ref(), &chat_id, alias)
            .await?;

        let message = emulator.messages.get_message(&id).await?;
        if message.chat_id != chat_id {
            return Err(TelemockError::not_found("message", alias));
        }
        if message.from_id != self.bot.id {
            return Err(TelemockError::invalid("message can't be edited"));
        }
        Ok(id)
    }
}
