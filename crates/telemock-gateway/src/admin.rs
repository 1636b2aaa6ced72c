// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative REST API mounted under `/api`.
//!
//! Responses wrap the entity in a named field (`{"user": {...}}`,
//! `{"chats": [...], "count": 2}`). Failures are `{"error": "..."}`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use telemock_bot::{NewBot, parse_reply_markup};
use telemock_core::{ChatKind, Id, MessageKind, MessageStatus, NewMessage, TelemockError};

use crate::error::ApiError;
use crate::server::AppState;

type Shared = State<Arc<AppState>>;
type ApiResult = Result<Json<Value>, ApiError>;
type Created = Result<(StatusCode, Json<Value>), ApiError>;

const DEFAULT_PAGE: usize = 50;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/users/{id}/chats", get(user_chats))
        .route("/chats", get(list_chats).post(create_chat))
        .route("/chats/{id}", get(get_chat).put(update_chat).delete(delete_chat))
        .route("/chats/{id}/members", get(chat_members).post(add_member))
        .route("/chats/{id}/members/{user_id}", delete(remove_member))
        .route("/chats/{id}/messages", get(chat_messages).post(send_message))
        .route("/chats/{id}/read", put(mark_read))
        .route("/chats/{id}/search", get(search_messages))
        .route("/messages/{id}", get(get_message).delete(delete_message))
        .route("/messages/{id}/status", put(update_status))
        .route("/bots", get(list_bots).post(create_bot))
        .route("/bots/{id}", get(get_bot).put(update_bot).delete(delete_bot))
        .route("/bots/{id}/updates", get(bot_updates).delete(clear_bot_updates))
        .route("/bots/{id}/sendMessage", post(bot_send_message))
}

fn id(raw: &str) -> Result<Id, ApiError> {
    Ok(raw.parse::<Id>()?)
}

fn created(body: Value) -> Created {
    Ok((StatusCode::CREATED, Json(body)))
}

// --- users ---

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

/// Fields left out, or blank names, keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_online: Option<bool>,
}

async fn list_users(State(state): Shared) -> ApiResult {
    let users = state.emulator.directory.list_users().await?;
    Ok(Json(json!({ "count": users.len(), "users": users })))
}

async fn create_user(State(state): Shared, Json(req): Json<CreateUserRequest>) -> Created {
    let user = state
        .emulator
        .directory
        .create_user(&req.username, &req.first_name, req.last_name.as_deref(), req.is_bot)
        .await?;
    created(json!({ "user": user }))
}

async fn get_user(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    let user = state.emulator.directory.get_user(&id(&raw)?).await?;
    Ok(Json(json!({ "user": user })))
}

async fn update_user(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult {
    let user = state
        .emulator
        .directory
        .update_user(
            &id(&raw)?,
            req.first_name.as_deref(),
            req.last_name.as_deref(),
            req.is_online,
        )
        .await?;
    Ok(Json(json!({ "user": user })))
}

async fn delete_user(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    state.emulator.directory.delete_user(&id(&raw)?).await?;
    Ok(Json(json!({ "deleted": true })))
}

async fn user_chats(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    let chats = state.emulator.directory.chats_for_user(&id(&raw)?).await?;
    Ok(Json(json!({ "count": chats.len(), "chats": chats })))
}

// --- chats ---

#[derive(Debug, Deserialize)]
pub struct ChatFilter {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "user_ids")]
    pub member_ids: Vec<Id>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChatRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub user_id: Id,
}

async fn list_chats(State(state): Shared, Query(filter): Query<ChatFilter>) -> ApiResult {
    let directory = &state.emulator.directory;
    let chats = match filter.user_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => directory.chats_for_user(&id(raw)?).await?,
        None => directory.list_chats().await?,
    };
    Ok(Json(json!({ "count": chats.len(), "chats": chats })))
}

async fn create_chat(State(state): Shared, Json(req): Json<CreateChatRequest>) -> Created {
    let chat = state
        .emulator
        .directory
        .create_chat(req.kind, req.title, &req.member_ids)
        .await?;
    created(json!({ "chat": chat }))
}

async fn get_chat(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    let chat = state.emulator.directory.get_chat(&id(&raw)?).await?;
    Ok(Json(json!({ "chat": chat })))
}

async fn update_chat(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(req): Json<UpdateChatRequest>,
) -> ApiResult {
    let chat = state
        .emulator
        .directory
        .update_chat(
            &id(&raw)?,
            req.title.as_deref(),
            req.username.as_deref(),
            req.description.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "chat": chat })))
}

async fn delete_chat(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    state.emulator.directory.delete_chat(&id(&raw)?).await?;
    Ok(Json(json!({ "deleted": true })))
}

async fn chat_members(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    let members = state.emulator.directory.chat_members(&id(&raw)?).await?;
    Ok(Json(json!({ "count": members.len(), "members": members })))
}

async fn add_member(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(req): Json<MemberRequest>,
) -> ApiResult {
    let chat_id = id(&raw)?;
    state
        .emulator
        .directory
        .add_member(&chat_id, &req.user_id)
        .await?;
    Ok(Json(json!({ "chat_id": chat_id, "user_id": req.user_id })))
}

async fn remove_member(
    State(state): Shared,
    Path((raw_chat, raw_user)): Path<(String, String)>,
) -> ApiResult {
    let (chat_id, user_id) = (id(&raw_chat)?, id(&raw_user)?);
    state
        .emulator
        .directory
        .remove_member(&chat_id, &user_id)
        .await?;
    Ok(Json(json!({ "chat_id": chat_id, "user_id": user_id, "removed": true })))
}

// --- messages ---

#[derive(Debug, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(alias = "from_id")]
    pub from_user_id: Id,
    pub text: String,
    #[serde(default, rename = "type")]
    pub kind: Option<MessageKind>,
    #[serde(default)]
    pub reply_markup: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ReaderQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: MessageStatus,
}

async fn chat_messages(
    State(state): Shared,
    Path(raw): Path<String>,
    Query(page): Query<Page>,
) -> ApiResult {
    let limit = page.limit.unwrap_or(DEFAULT_PAGE);
    let offset = page.offset.unwrap_or(0);
    let messages = state
        .emulator
        .messages
        .chat_messages(&id(&raw)?, limit, offset)
        .await?;
    Ok(Json(json!({ "messages": messages, "limit": limit, "offset": offset })))
}

async fn send_message(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Created {
    let mut draft = NewMessage::text(id(&raw)?, req.from_user_id, req.text);
    draft.kind = req.kind.unwrap_or_default();
    if let Some(raw_markup) = req.reply_markup.filter(|v| !v.is_null()) {
        draft = draft.with_reply_markup(parse_reply_markup(&raw_markup)?);
    }
    let message = state.emulator.messages.send_message(draft).await?;
    created(json!({ "message": message }))
}

async fn mark_read(
    State(state): Shared,
    Path(raw): Path<String>,
    Query(reader): Query<ReaderQuery>,
) -> ApiResult {
    let chat_id = id(&raw)?;
    let user_id = match reader.user_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw_user) => id(raw_user)?,
        None => return Err(TelemockError::invalid("user_id is required").into()),
    };
    let changed = state
        .emulator
        .messages
        .mark_chat_as_read(&chat_id, &user_id)
        .await?;
    Ok(Json(json!({ "chat_id": chat_id, "user_id": user_id, "changed": changed })))
}

async fn search_messages(
    State(state): Shared,
    Path(raw): Path<String>,
    Query(search): Query<SearchQuery>,
) -> ApiResult {
    let messages = state
        .emulator
        .messages
        .search_messages(&id(&raw)?, &search.q)
        .await?;
    Ok(Json(json!({ "count": messages.len(), "messages": messages, "query": search.q })))
}

async fn get_message(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    let message = state.emulator.messages.get_message(&id(&raw)?).await?;
    Ok(Json(json!({ "message": message })))
}

async fn delete_message(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    state.emulator.messages.delete_message(&id(&raw)?).await?;
    Ok(Json(json!({ "deleted": true })))
}

async fn update_status(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult {
    let message = state
        .emulator
        .messages
        .update_message_status(&id(&raw)?, req.status)
        .await?;
    Ok(Json(json!({ "message": message })))
}

// --- bots ---

#[derive(Debug, Deserialize)]
pub struct CreateBotRequest {
    pub name: String,
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Fields left out keep their current value.
#[derive(Debug, Deserialize)]
pub struct UpdateBotRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub last_update_offset: Option<i64>,
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// `chat_id` is a chat id string or the numeric alias bots see.
#[derive(Debug, Deserialize)]
pub struct BotSendRequest {
    pub chat_id: Value,
    pub text: String,
    #[serde(default)]
    pub reply_markup: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub timeout: Option<i64>,
}

async fn list_bots(State(state): Shared) -> ApiResult {
    let bots = state.emulator.bots.list_bots().await?;
    Ok(Json(json!({ "count": bots.len(), "bots": bots })))
}

async fn create_bot(State(state): Shared, Json(req): Json<CreateBotRequest>) -> Created {
    let bot = state
        .emulator
        .bots
        .create_bot(NewBot {
            name: req.name,
            username: req.username,
            token: req.token,
            webhook_url: req.webhook_url,
        })
        .await?;
    created(json!({ "bot": bot }))
}

async fn get_bot(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    let bot = state.emulator.bots.get_bot(&id(&raw)?).await?;
    Ok(Json(json!({ "bot": bot })))
}

async fn update_bot(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(req): Json<UpdateBotRequest>,
) -> ApiResult {
    let bots = &state.emulator.bots;
    let bot_id = id(&raw)?;
    if let Some(url) = req.webhook_url.as_deref() {
        if url.trim().is_empty() {
            bots.delete_webhook(&bot_id).await?;
        } else {
            bots.set_webhook(&bot_id, url).await?;
        }
    }

    let mut bot = bots.get_bot(&bot_id).await?;
    if let Some(name) = req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        bot.name = name;
    }
    if let Some(active) = req.is_active {
        bot.is_active = active;
    }
    if let Some(offset) = req.last_update_offset {
        bot.last_update_offset = offset;
    }
    let bot = bots.update_bot(bot).await?;
    Ok(Json(json!({ "bot": bot })))
}

async fn delete_bot(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    state.emulator.bots.delete_bot(&id(&raw)?).await?;
    Ok(Json(json!({ "deleted": true })))
}

async fn bot_updates(
    State(state): Shared,
    Path(raw): Path<String>,
    Query(poll): Query<PollQuery>,
) -> ApiResult {
    let updates = state
        .emulator
        .bots
        .get_updates(
            &id(&raw)?,
            poll.offset.unwrap_or(0),
            poll.limit.unwrap_or(100),
            poll.timeout.unwrap_or(0),
        )
        .await?;
    Ok(Json(json!({ "count": updates.len(), "updates": updates })))
}

async fn clear_bot_updates(State(state): Shared, Path(raw): Path<String>) -> ApiResult {
    state.emulator.bots.clear_updates(&id(&raw)?).await?;
    Ok(Json(json!({ "cleared": true })))
}

async fn bot_send_message(
    State(state): Shared,
    Path(raw): Path<String>,
    Json(req): Json<BotSendRequest>,
) -> ApiResult {
    let chat = match &req.chat_id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(TelemockError::invalid("chat_id must be a string or a number").into()),
    };
    let markup = match req.reply_markup.filter(|v| !v.is_null()) {
        Some(raw_markup) => Some(parse_reply_markup(&raw_markup)?),
        None => None,
    };
    let message = state
        .emulator
        .messages
        .send_as_bot(&id(&raw)?, &chat, &req.text, markup)
        .await?;
    Ok(Json(json!({ "message": message })))
}
