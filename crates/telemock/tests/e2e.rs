// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests against a real listener backed by a SQLite file.
//!
//! A bot talks to the server over HTTP exactly as it would talk to the
//! Telegram Bot API; a chat client connects over WebSocket.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use telemock_config::TelemockConfig;
use telemock_config::model::StorageBackend;
use telemock_emulator::Emulator;
use telemock_gateway::{AppState, router};
use telemock_storage::open_store;

const TOKEN: &str = "4242:e2e";

struct Harness {
    addr: SocketAddr,
    http: reqwest::Client,
    alice: String,
    chat: String,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TelemockConfig::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.database_path = dir.path().join("e2e.db").display().to_string();
        config.delivery.sent_delay_ms = 10;
        config.delivery.delivered_delay_ms = 10;
        config.bots.poll_interval_ms = 50;

        let store = open_store(&config.storage).await.unwrap();
        let emulator = Emulator::new(store, &config).unwrap();
        let app = router(AppState::new(emulator));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let http = reqwest::Client::new();
        let mut harness = Self {
            addr,
            http,
            alice: String::new(),
            chat: String::new(),
            _dir: dir,
        };

        let user = harness
            .admin("POST", "/users", json!({"username": "alice", "first_name": "Alice"}))
            .await;
        harness.alice = user["user"]["id"].as_str().unwrap().to_string();
        let bot = harness
            .admin(
                "POST",
                "/bots",
                json!({"name": "E2E Bot", "username": "e2e_bot", "token": TOKEN}),
            )
            .await;
        let bot_id = bot["bot"]["id"].as_str().unwrap().to_string();
        let chat = harness
            .admin(
                "POST",
                "/chats",
                json!({"type": "private", "member_ids": [harness.alice, bot_id]}),
            )
            .await;
        harness.chat = chat["chat"]["id"].as_str().unwrap().to_string();
        harness
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    async fn admin(&self, method: &str, path: &str, body: Value) -> Value {
        let method = reqwest::Method::from_bytes(method.as_bytes()).unwrap();
        let response = self
            .http
            .request(method, self.url(&format!("/api{path}")))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success(), "{path}: {}", response.status());
        response.json().await.unwrap()
    }

    async fn bot(&self, method: &str, params: Value) -> Value {
        self.http
            .post(self.url(&format!("/bot{TOKEN}/{method}")))
            .json(&params)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    async fn alice_says(&self, text: &str) {
        self.admin(
            "POST",
            &format!("/chats/{}/messages", self.chat),
            json!({"from_user_id": self.alice, "text": text}),
        )
        .await;
    }
}

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Read frames until one of type `kind` arrives.
async fn next_event(socket: &mut Socket, kind: &str) -> Value {
    let wait = async {
        while let Some(frame) = socket.next().await {
            if let WsMessage::Text(text) = frame.unwrap() {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                if value["type"] == kind {
                    return value["data"].clone();
                }
            }
        }
        panic!("socket closed before a {kind} frame");
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("no {kind} frame within 5s"))
}

/// Connect as `user_id` and wait until the hub has registered the socket.
async fn connect(addr: SocketAddr, user_id: &str) -> Socket {
    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws?user_id={user_id}"))
        .await
        .unwrap();
    let ping = json!({"type": "ping"}).to_string();
    socket.send(WsMessage::Text(ping.into())).await.unwrap();
    next_event(&mut socket, "pong").await;
    socket
}

#[tokio::test]
async fn long_poll_wakes_when_a_message_arrives() {
    let h = Harness::start().await;

    let poller = {
        let http = h.http.clone();
        let url = h.url(&format!("/bot{TOKEN}/getUpdates"));
        tokio::spawn(async move {
            let started = Instant::now();
            let body: Value = http
                .post(url)
                .json(&json!({"timeout": 10}))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            (started.elapsed(), body)
        })
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    h.alice_says("wake up").await;

    let (elapsed, body) = poller.await.unwrap();
    assert!(elapsed < Duration::from_secs(5), "poll took {elapsed:?}");
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"][0]["update_id"], 1);
    assert_eq!(body["result"][0]["message"]["text"], "wake up");
    assert_eq!(body["result"][0]["message"]["chat"]["type"], "private");
}

#[tokio::test]
async fn client_sees_bot_reply_and_its_delivery() {
    let h = Harness::start().await;
    let mut socket = connect(h.addr, &h.alice).await;

    let sent = h
        .bot("sendMessage", json!({"chat_id": h.chat, "text": "hello from the bot"}))
        .await;
    assert_eq!(sent["ok"], true, "{sent}");

    let message = next_event(&mut socket, "message").await;
    assert_eq!(message["text"], "hello from the bot");
    assert_eq!(message["from"]["is_bot"], true);
    assert_eq!(message["status"], "sending");

    let first = next_event(&mut socket, "message_status_update").await;
    assert_eq!(first["status"], "sent");
    let second = next_event(&mut socket, "message_status_update").await;
    assert_eq!(second["status"], "delivered");
}

#[tokio::test]
async fn inline_button_press_reaches_the_bot() {
    let h = Harness::start().await;
    let mut socket = connect(h.addr, &h.alice).await;

    h.bot(
        "sendMessage",
        json!({
            "chat_id": h.chat,
            "text": "pick one",
            "reply_markup": {"inline_keyboard": [[{"text": "Red", "callback_data": "color:red"}]]}
        }),
    )
    .await;
    let shown = next_event(&mut socket, "message").await;
    let message_id = shown["id"].as_str().unwrap().to_string();

    let press = json!({
        "type": "callback_query",
        "data": {
            "chat_id": h.chat,
            "message_id": message_id,
            "button": {"text": "Red", "callback_data": "color:red"}
        }
    });
    socket
        .send(WsMessage::Text(press.to_string().into()))
        .await
        .unwrap();

    let updates = h.bot("getUpdates", json!({"timeout": 5})).await;
    let query = &updates["result"][0]["callback_query"];
    assert_eq!(query["data"], "color:red");
    assert_eq!(query["from"]["username"], "alice");
    assert_eq!(query["message"]["text"], "pick one");

    let answered = h
        .bot("answerCallbackQuery", json!({"callback_query_id": query["id"]}))
        .await;
    assert_eq!(answered["result"], true);
}

#[tokio::test]
async fn history_survives_in_sqlite() {
    let h = Harness::start().await;
    h.alice_says("persist me").await;
    h.bot("sendMessage", json!({"chat_id": h.chat, "text": "stored too"}))
        .await;

    let history = h
        .http
        .get(h.url(&format!("/api/chats/{}/messages?limit=10", h.chat)))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let texts: Vec<&str> = history["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|m| m["text"].as_str())
        .collect();
    assert_eq!(texts, vec!["stored too", "persist me"]);
}
