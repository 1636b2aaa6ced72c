// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator for users, chats, messages, and bots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TelemockError;
use crate::types::{Bot, Chat, Id, Message, MessageStatus, User};

/// Durable storage backend.
///
/// Lookups return `Ok(None)` for absent rows. Callers decide whether absence
/// is an error. Every call re-reads from the backend; implementations must
/// not hand out cached values that could go stale.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Users ---

    /// Insert a user. Usernames are unique.
    async fn create_user(&self, user: &User) -> Result<(), TelemockError>;
    async fn get_user(&self, id: &Id) -> Result<Option<User>, TelemockError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, TelemockError>;
    async fn list_users(&self) -> Result<Vec<User>, TelemockError>;
    /// Persist names and presence. Fails with `NotFound` for unknown users.
    async fn update_user(&self, user: &User) -> Result<(), TelemockError>;
    async fn delete_user(&self, id: &Id) -> Result<(), TelemockError>;

    // --- Chats ---

    async fn create_chat(&self, chat: &Chat) -> Result<(), TelemockError>;
    async fn get_chat(&self, id: &Id) -> Result<Option<Chat>, TelemockError>;
    async fn list_chats(&self) -> Result<Vec<Chat>, TelemockError>;
    /// Persist title, username and description. Fails with `NotFound` for
    /// unknown chats.
    async fn update_chat(&self, chat: &Chat) -> Result<(), TelemockError>;
    async fn chats_for_user(&self, user_id: &Id) -> Result<Vec<Chat>, TelemockError>;
    /// Delete a chat together with its memberships and messages.
    async fn delete_chat(&self, id: &Id) -> Result<(), TelemockError>;
    /// Add a member. Adding an existing member is a no-op.
    async fn add_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError>;
    async fn remove_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError>;
    async fn chat_members(&self, chat_id: &Id) -> Result<Vec<User>, TelemockError>;
    async fn set_unread_count(&self, chat_id: &Id, count: i64) -> Result<(), TelemockError>;

    // --- Messages ---

    async fn create_message(&self, message: &Message) -> Result<(), TelemockError>;
    async fn get_message(&self, id: &Id) -> Result<Option<Message>, TelemockError>;
    /// Replace text, entities, reply markup and edit time of an existing message.
    async fn update_message(&self, message: &Message) -> Result<(), TelemockError>;
    /// Messages of a chat, newest first.
    async fn chat_messages(
        &self,
        chat_id: &Id,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, TelemockError>;
    /// Substring search over message text, newest first.
    async fn search_messages(&self, chat_id: &Id, query: &str)
        -> Result<Vec<Message>, TelemockError>;
    /// The chat's unread counter: messages whose status is not `read` and
    /// that were created after the chat's `last_read_at`. A chat never marked
    /// as read counts all of its messages. This is the only definition; every
    /// write to `Chat::unread_count` uses it.
    async fn unread_count(&self, chat_id: &Id) -> Result<i64, TelemockError>;
    /// Force every message in the chat not authored by `reader` to `read` and
    /// set the chat's `last_read_at` to `at`. Returns how many messages
    /// changed.
    async fn mark_chat_read(
        &self,
        chat_id: &Id,
        reader: &Id,
        at: DateTime<Utc>,
    ) -> Result<u64, TelemockError>;
    /// Compare-and-set on status. Returns `false` when the message is gone or
    /// no longer in `expected`.
    async fn transition_message_status(
        &self,
        id: &Id,
        expected: MessageStatus,
        next: MessageStatus,
    ) -> Result<bool, TelemockError>;
    /// Unconditional status write. Returns `false` when the message is gone.
    async fn set_message_status(&self, id: &Id, status: MessageStatus)
        -> Result<bool, TelemockError>;
    async fn delete_message(&self, id: &Id) -> Result<bool, TelemockError>;

    // --- Bots ---

    async fn create_bot(&self, bot: &Bot) -> Result<(), TelemockError>;
    async fn get_bot(&self, id: &Id) -> Result<Option<Bot>, TelemockError>;
    async fn get_bot_by_token(&self, token: &str) -> Result<Option<Bot>, TelemockError>;
    async fn list_bots(&self) -> Result<Vec<Bot>, TelemockError>;
    /// Persist every mutable bot field.
    async fn update_bot(&self, bot: &Bot) -> Result<(), TelemockError>;
    async fn delete_bot(&self, id: &Id) -> Result<(), TelemockError>;
}
