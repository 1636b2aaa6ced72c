// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status overrides racing a concurrent `read`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use telemock_config::TelemockConfig;
use telemock_core::{
    Bot, Chat, Id, Message, MessageStatus, NewMessage, Store, TelemockError, User,
};
use telemock_emulator::Emulator;
use telemock_storage::MemoryStore;

/// Marks a message read right after handing out its previous state, once
/// armed. The caller ends up holding a stale copy.
struct ReadBehindStore {
    inner: MemoryStore,
    armed: AtomicBool,
}

#[async_trait]
impl Store for ReadBehindStore {
    async fn create_user(&self, user: &User) -> Result<(), TelemockError> {
        self.inner.create_user(user).await
    }
    async fn get_user(&self, id: &Id) -> Result<Option<User>, TelemockError> {
        self.inner.get_user(id).await
    }
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, TelemockError> {
        self.inner.get_user_by_username(username).await
    }
    async fn list_users(&self) -> Result<Vec<User>, TelemockError> {
        self.inner.list_users().await
    }
    async fn update_user(&self, user: &User) -> Result<(), TelemockError> {
        self.inner.update_user(user).await
    }
    async fn delete_user(&self, id: &Id) -> Result<(), TelemockError> {
        self.inner.delete_user(id).await
    }
    async fn create_chat(&self, chat: &Chat) -> Result<(), TelemockError> {
        self.inner.create_chat(chat).await
    }
    async fn get_chat(&self, id: &Id) -> Result<Option<Chat>, TelemockError> {
        self.inner.get_chat(id).await
    }
    async fn list_chats(&self) -> Result<Vec<Chat>, TelemockError> {
        self.inner.list_chats().await
    }
    async fn update_chat(&self, chat: &Chat) -> Result<(), TelemockError> {
        self.inner.update_chat(chat).await
    }
    async fn chats_for_user(&self, user_id: &Id) -> Result<Vec<Chat>, TelemockError> {
        self.inner.chats_for_user(user_id).await
    }
    async fn delete_chat(&self, id: &Id) -> Result<(), TelemockError> {
        self.inner.delete_chat(id).await
    }
    async fn add_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        self.inner.add_member(chat_id, user_id).await
    }
    async fn remove_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        self.inner.remove_member(chat_id, user_id).await
    }
    async fn chat_members(&self, chat_id: &Id) -> Result<Vec<User>, TelemockError> {
        self.inner.chat_members(chat_id).await
    }
    async fn set_unread_count(&self, chat_id: &Id, count: i64) -> Result<(), TelemockError> {
        self.inner.set_unread_count(chat_id, count).await
    }
    async fn create_message(&self, message: &Message) -> Result<(), TelemockError> {
        self.inner.create_message(message).await
    }
    async fn get_message(&self, id: &Id) -> Result<Option<Message>, TelemockError> {
        let message = self.inner.get_message(id).await?;
        if message.is_some() && self.armed.swap(false, Ordering::SeqCst) {
            self.inner.set_message_status(id, MessageStatus::Read).await?;
        }
        Ok(message)
    }
    async fn update_message(&self, message: &Message) -> Result<(), TelemockError> {
        self.inner.update_message(message).await
    }
    async fn chat_messages(
        &self,
        chat_id: &Id,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, TelemockError> {
        self.inner.chat_messages(chat_id, limit, offset).await
    }
    async fn search_messages(
        &self,
        chat_id: &Id,
        query: &str,
    ) -> Result<Vec<Message>, TelemockError> {
        self.inner.search_messages(chat_id, query).await
    }
    async fn unread_count(&self, chat_id: &Id) -> Result<i64, TelemockError> {
        self.inner.unread_count(chat_id).await
    }
    async fn mark_chat_read(
        &self,
        chat_id: &Id,
        reader: &Id,
        at: DateTime<Utc>,
    ) -> Result<u64, TelemockError> {
        self.inner.mark_chat_read(chat_id, reader, at).await
    }
    async fn transition_message_status(
        &self,
        id: &Id,
        expected: MessageStatus,
        next: MessageStatus,
    ) -> Result<bool, TelemockError> {
        self.inner.transition_message_status(id, expected, next).await
    }
    async fn set_message_status(
        &self,
        id: &Id,
        status: MessageStatus,
    ) -> Result<bool, TelemockError> {
        self.inner.set_message_status(id, status).await
    }
    async fn delete_message(&self, id: &Id) -> Result<bool, TelemockError> {
        self.inner.delete_message(id).await
    }
    async fn create_bot(&self, bot: &Bot) -> Result<(), TelemockError> {
        self.inner.create_bot(bot).await
    }
    async fn get_bot(&self, id: &Id) -> Result<Option<Bot>, TelemockError> {
        self.inner.get_bot(id).await
    }
    async fn get_bot_by_token(&self, token: &str) -> Result<Option<Bot>, TelemockError> {
        self.inner.get_bot_by_token(token).await
    }
    async fn list_bots(&self) -> Result<Vec<Bot>, TelemockError> {
        self.inner.list_bots().await
    }
    async fn update_bot(&self, bot: &Bot) -> Result<(), TelemockError> {
        self.inner.update_bot(bot).await
    }
    async fn delete_bot(&self, id: &Id) -> Result<(), TelemockError> {
        self.inner.delete_bot(id).await
    }
}

#[tokio::test(start_paused = true)]
async fn override_does_not_regress_a_concurrent_read() {
    let store = Arc::new(ReadBehindStore {
        inner: MemoryStore::new(),
        armed: AtomicBool::new(false),
    });
    let emu = Emulator::new(store.clone(), &TelemockConfig::default()).unwrap();
    let alice = emu
        .directory
        .create_user("alice", "Alice", None, false)
        .await
        .unwrap();
    let lobby = emu
        .directory
        .create_group_chat("Lobby", &[alice.id])
        .await
        .unwrap();
    let msg = emu
        .messages
        .send_message(NewMessage::text(lobby.id, alice.id, "hi"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(
        emu.messages.get_message(&msg.id).await.unwrap().status,
        MessageStatus::Delivered
    );

    store.armed.store(true, Ordering::SeqCst);
    let err = emu
        .messages
        .update_message_status(&msg.id, MessageStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, TelemockError::InvalidInput(_)));
    assert_eq!(
        emu.messages.get_message(&msg.id).await.unwrap().status,
        MessageStatus::Read
    );
}

#[tokio::test(start_paused = true)]
async fn read_override_still_wins_over_a_stale_copy() {
    let store = Arc::new(ReadBehindStore {
        inner: MemoryStore::new(),
        armed: AtomicBool::new(false),
    });
    let emu = Emulator::new(store.clone(), &TelemockConfig::default()).unwrap();
    let alice = emu
        .directory
        .create_user("alice", "Alice", None, false)
        .await
        .unwrap();
    let lobby = emu
        .directory
        .create_group_chat("Lobby", &[alice.id])
        .await
        .unwrap();
    let msg = emu
        .messages
        .send_message(NewMessage::text(lobby.id, alice.id, "hi"))
        .await
        .unwrap();

    store.armed.store(true, Ordering::SeqCst);
    let read = emu
        .messages
        .update_message_status(&msg.id, MessageStatus::Read)
        .await
        .unwrap();
    assert_eq!(read.status, MessageStatus::Read);
}
