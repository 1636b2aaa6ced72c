// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The same scenarios run against both backends.

use std::sync::Arc;

use chrono::Utc;
use telemock_core::{Chat, ChatKind, Id, Message, MessageKind, MessageStatus, Store, User};
use telemock_storage::{MemoryStore, SqliteStore};

async fn backends() -> Vec<(&'static str, Arc<dyn Store>)> {
    vec![
        ("memory", Arc::new(MemoryStore::new()) as Arc<dyn Store>),
        (
            "sqlite",
            Arc::new(SqliteStore::open_in_memory().await.unwrap()) as Arc<dyn Store>,
        ),
    ]
}

fn message(chat: &Chat, from: &User, text: &str) -> Message {
    let now = Utc::now();
    Message {
        id: Id::new(),
        chat_id: chat.id,
        from_id: from.id,
        text: text.to_string(),
        kind: MessageKind::Text,
        status: MessageStatus::Sending,
        is_outgoing: true,
        timestamp: now,
        created_at: now,
        edited_at: None,
        reply_markup: None,
        entities: Vec::new(),
    }
}

#[tokio::test]
async fn membership_and_chat_listing_agree() {
    for (name, store) in backends().await {
        let alice = User::new("alice", "Alice", false);
        let bot = User::new("echo_bot", "Echo", true);
        store.create_user(&alice).await.unwrap();
        store.create_user(&bot).await.unwrap();

        let group = Chat::new(ChatKind::Group, Some("Room".into()));
        let private = Chat::new(ChatKind::Private, None);
        store.create_chat(&group).await.unwrap();
        store.create_chat(&private).await.unwrap();
        store.add_member(&group.id, &alice.id).await.unwrap();
        store.add_member(&group.id, &bot.id).await.unwrap();
        store.add_member(&private.id, &alice.id).await.unwrap();

        assert_eq!(store.chats_for_user(&alice.id).await.unwrap().len(), 2, "{name}");
        assert_eq!(store.chats_for_user(&bot.id).await.unwrap().len(), 1, "{name}");

        store.remove_member(&group.id, &bot.id).await.unwrap();
        let members = store.chat_members(&group.id).await.unwrap();
        assert_eq!(members.len(), 1, "{name}");
        assert_eq!(members[0].id, alice.id, "{name}");

        store.delete_user(&alice.id).await.unwrap();
        assert!(store.chat_members(&group.id).await.unwrap().is_empty(), "{name}");
    }
}

#[tokio::test]
async fn edits_persist_and_missing_rows_report_false() {
    for (name, store) in backends().await {
        let alice = User::new("alice", "Alice", false);
        let chat = Chat::new(ChatKind::Group, None);
        store.create_user(&alice).await.unwrap();
        store.create_chat(&chat).await.unwrap();

        let mut msg = message(&chat, &alice, "draft");
        store.create_message(&msg).await.unwrap();
        msg.text = "final".into();
        msg.edited_at = Some(Utc::now());
        store.update_message(&msg).await.unwrap();

        let loaded = store.get_message(&msg.id).await.unwrap().unwrap();
        assert_eq!(loaded.text, "final", "{name}");
        assert!(loaded.edited_at.is_some(), "{name}");

        assert!(store.delete_message(&msg.id).await.unwrap(), "{name}");
        assert!(!store.delete_message(&msg.id).await.unwrap(), "{name}");
        assert!(
            !store
                .set_message_status(&msg.id, MessageStatus::Read)
                .await
                .unwrap(),
            "{name}"
        );
        assert!(store.update_message(&msg).await.unwrap_err().is_not_found(), "{name}");
    }
}
