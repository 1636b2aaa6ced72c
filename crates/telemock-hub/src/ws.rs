// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket endpoint and the per-connection pump pair.
//!
//! Client -> server frames:
//! ```json
//! {"type": "subscribe", "data": {"events": ["message"]}}
//! {"type": "typing", "data": {"chat_id": "..."}}
//! {"type": "ping"}
//! {"type": "send_message", "data": {"chat_id": "...", "text": "hi"}}
//! {"type": "callback_query", "data": {"chat_id": "...", "message_id": "...", "button": {"text": "Go", "callback_data": "go"}}}
//! ```
//!
//! The read pump decodes and dispatches inbound frames. The write pump
//! drains the connection's outbound queue and sends a keepalive ping every
//! `ping_period`. When the reader ends, the writer is aborted. When the
//! writer ends, the reader is cancelled between frames, so a dispatch that
//! is already running completes. Either way the connection is unregistered.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        Query, State,
        ws::{Message as WsMessage, Utf8Bytes, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use telemock_config::model::WebSocketConfig;
use telemock_core::{BotNotifier, Id, MessageSubmitter, NewMessage, Store};

use crate::connection::Connection;
use crate::frame::{CallbackQueryData, Event, InboundFrame, SendMessageData, SubscribeData};
use crate::hub::ConnectionHub;

/// Everything a connection needs besides its socket.
///
/// The orchestrator is reached only through the two narrow capabilities.
pub struct WsContext {
    pub hub: Arc<ConnectionHub>,
    pub store: Arc<dyn Store>,
    pub submitter: Arc<dyn MessageSubmitter>,
    pub notifier: Arc<dyn BotNotifier>,
    pub config: WebSocketConfig,
}

#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    user_id: Option<String>,
}

/// `GET /ws?user_id=<id>`.
///
/// Refuses with 400 when `user_id` is missing or malformed, 404 when the
/// user does not exist, and 503 once `max_connections` clients are live.
pub async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Query(params): Query<WsParams>,
    State(ctx): State<Arc<WsContext>>,
) -> Response {
    let Some(raw) = params.user_id.filter(|s| !s.trim().is_empty()) else {
        return (StatusCode::BAD_REQUEST, "user_id is required").into_response();
    };
    let user_id: Id = match raw.parse() {
        Ok(id) => id,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match ctx.store.get_user(&user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return (StatusCode::NOT_FOUND, "user not found").into_response(),
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "user lookup failed during upgrade");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    if ctx.hub.connection_count() >= ctx.config.max_connections {
        warn!(limit = ctx.config.max_connections, "connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    ws.max_message_size(ctx.config.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, ctx, user_id))
}

/// Run the pump pair for one upgraded socket until either side stops.
pub async fn handle_socket(socket: WebSocket, ctx: Arc<WsContext>, user_id: Id) {
    let (conn, rx) = Connection::new(user_id, ctx.config.send_buffer);
    let conn_id = conn.id;
    ctx.hub.register(Arc::new(conn)).await;
    info!(conn_id = %conn_id, user_id = %user_id, "client connected");

    let (sink, stream) = socket.split();
    let mut write_task = tokio::spawn(write_pump(
        sink,
        rx,
        ctx.config.ping_period(),
        ctx.config.write_wait(),
    ));
    let cancel = CancellationToken::new();
    let mut read_task = tokio::spawn(read_pump(
        stream,
        Arc::clone(&ctx),
        conn_id,
        user_id,
        cancel.clone(),
    ));

    tokio::select! {
        _ = &mut write_task => {
            cancel.cancel();
            if let Err(e) = read_task.await {
                warn!(conn_id = %conn_id, error = %e, "read pump failed");
            }
        }
        _ = &mut read_task => write_task.abort(),
    }

    ctx.hub.unregister(&conn_id).await;
    info!(conn_id = %conn_id, user_id = %user_id, "client disconnected");
}

async fn write_pump(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
    ping_period: Duration,
    write_wait: Duration,
) {
    let mut ticker = interval_at(Instant::now() + ping_period, ping_period);
    loop {
        let outgoing = tokio::select! {
            frame = rx.recv() => match frame {
                Some(text) => WsMessage::Text(text),
                None => {
                    // Hub dropped us; say goodbye and stop.
                    let _ = timeout(write_wait, sink.send(WsMessage::Close(None))).await;
                    return;
                }
            },
            _ = ticker.tick() => WsMessage::Ping(Default::default()),
        };
        match timeout(write_wait, sink.send(outgoing)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(error = %e, "websocket write failed");
                return;
            }
            Err(_) => {
                warn!("websocket write timed out");
                return;
            }
        }
    }
}

async fn read_pump(
    mut stream: SplitStream<WebSocket>,
    ctx: Arc<WsContext>,
    conn_id: Id,
    user_id: Id,
    cancel: CancellationToken,
) {
    let pong_wait = ctx.config.pong_wait();
    loop {
        // Any inbound frame, including a pong, resets the deadline.
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(conn_id = %conn_id, "read pump cancelled");
                return;
            }
            next = timeout(pong_wait, stream.next()) => match next {
                Ok(next) => next,
                Err(_) => {
                    info!(conn_id = %conn_id, "read deadline exceeded");
                    return;
                }
            },
        };
        match next {
            Some(Ok(WsMessage::Text(text))) => {
                dispatch(&ctx, conn_id, user_id, text.as_str()).await;
            }
            Some(Ok(WsMessage::Close(_))) | None => return,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(conn_id = %conn_id, error = %e, "websocket read failed");
                return;
            }
        }
    }
}

/// Interpret one inbound text frame. Malformed frames are logged and skipped.
pub async fn dispatch(ctx: &WsContext, conn_id: Id, user_id: Id, text: &str) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "invalid websocket frame");
            return;
        }
    };

    match frame.kind.as_str() {
        "subscribe" => {
            let data: SubscribeData = serde_json::from_value(frame.data).unwrap_or_default();
            ctx.hub
                .send_to_connection(
                    &conn_id,
                    Event::Subscribed,
                    &json!({"user_id": user_id, "events": data.events}),
                )
                .await;
        }
        "typing" => {
            ctx.hub
                .broadcast_all(Event::Typing, &json!({"user_id": user_id, "data": frame.data}))
                .await;
        }
        "ping" => {
            ctx.hub
                .send_to_connection(
                    &conn_id,
                    Event::Pong,
                    &json!({"timestamp": chrono::Utc::now().timestamp()}),
                )
                .await;
        }
        "send_message" => handle_send_message(ctx, user_id, frame.data).await,
        "callback_query" => handle_callback_query(ctx, user_id, frame.data).await,
        other => warn!(conn_id = %conn_id, kind = other, "unknown websocket frame type"),
    }
}

async fn handle_send_message(ctx: &WsContext, user_id: Id, data: serde_json::Value) {
    let data: SendMessageData = match serde_json::from_value(data) {
        Ok(d) => d,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "malformed send_message");
            return;
        }
    };
    if let Some(claimed) = data.from_user_id.filter(|claimed| *claimed != user_id) {
        warn!(
            user_id = %user_id,
            claimed = %claimed,
            "send_message claims another sender, discarding"
        );
        return;
    }

    let mut message = NewMessage::text(data.chat_id, user_id, data.text);
    if let Some(kind) = data.kind {
        message.kind = kind;
    }
    message.reply_markup = data.reply_markup;

    match ctx.submitter.submit_message(message).await {
        Ok(sent) => debug!(message_id = %sent.id, chat_id = %sent.chat_id, "message accepted"),
        Err(e) => warn!(user_id = %user_id, error = %e, "send_message failed"),
    }
}

async fn handle_callback_query(ctx: &WsContext, user_id: Id, data: serde_json::Value) {
    let data: CallbackQueryData = match serde_json::from_value(data) {
        Ok(d) => d,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "malformed callback_query");
            return;
        }
    };
    let Some(callback_data) = data.callback_data() else {
        warn!(user_id = %user_id, "callback_query without callback_data");
        return;
    };

    let query = match ctx
        .notifier
        .enqueue_callback(&user_id, &data.message_id, callback_data)
        .await
    {
        Ok(q) => q,
        Err(e) => {
            warn!(user_id = %user_id, message_id = %data.message_id, error = %e, "callback_query not routed");
            return;
        }
    };

    let members: Vec<Id> = match ctx.store.chat_members(&data.chat_id).await {
        Ok(users) => users.into_iter().map(|u| u.id).collect(),
        Err(e) => {
            warn!(chat_id = %data.chat_id, error = %e, "could not load chat members");
            return;
        }
    };
    let payload = json!({
        "id": query.id,
        "user_id": user_id,
        "button": data.button,
        "data": callback_data,
        "message": {
            "message_id": data.message_id,
            "chat": {"id": data.chat_id},
        },
    });
    ctx.hub
        .broadcast_to_users(&members, Event::CallbackQuery, &payload)
        .await;
}
