// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue and webhook working together through `BotManager`.

use std::sync::Arc;
use std::time::Duration;

use telemock_bot::{BotManager, NewBot, UpdateKind, WireChat, WireMessage};
use telemock_config::model::BotsConfig;
use telemock_core::Store;
use telemock_storage::MemoryStore;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn hello(text: &str) -> UpdateKind {
    UpdateKind::Message(WireMessage {
        message_id: 10,
        from: None,
        chat: WireChat {
            id: 20,
            kind: "group".into(),
            title: Some("Lobby".into()),
            username: None,
        },
        date: 1_700_000_000,
        text: text.into(),
        entities: Vec::new(),
        reply_markup: None,
        edit_date: None,
    })
}

async fn wait_for_requests(server: &MockServer, n: usize) {
    for _ in 0..100 {
        if server.received_requests().await.unwrap_or_default().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {n} webhook calls");
}

#[tokio::test]
async fn update_is_both_queued_and_pushed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({
            "update_id": 1,
            "message": {"text": "hello"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let manager = BotManager::new(store, &BotsConfig::default()).unwrap();
    let bot = manager
        .create_bot(NewBot {
            name: "Echo".into(),
            username: "echo_bot".into(),
            token: "123:abc".into(),
            webhook_url: Some(format!("{}/hook", server.uri())),
        })
        .await
        .unwrap();

    manager.add_update(&bot.id, hello("hello")).await.unwrap();

    let polled = manager.get_updates(&bot.id, 0, 100, 0).await.unwrap();
    assert_eq!(polled.len(), 1);
    assert_eq!(polled[0].message().unwrap().text, "hello");
    wait_for_requests(&server, 1).await;
}

#[tokio::test]
async fn failing_webhook_does_not_fail_enqueue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let manager = BotManager::new(store, &BotsConfig::default()).unwrap();
    let bot = manager
        .create_bot(NewBot {
            name: "Flaky".into(),
            username: "flaky_bot".into(),
            token: "456:def".into(),
            webhook_url: Some(server.uri()),
        })
        .await
        .unwrap();

    let first = manager.add_update(&bot.id, hello("one")).await.unwrap();
    let second = manager.add_update(&bot.id, hello("two")).await.unwrap();
    assert_eq!((first.update_id, second.update_id), (1, 2));

    wait_for_requests(&server, 2).await;
    // No retries: exactly one attempt per update.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
