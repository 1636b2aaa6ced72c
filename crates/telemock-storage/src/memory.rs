// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local store.
//!
//! Messages live in a `BTreeMap` keyed by [`Id`], so iteration order is
//! creation order. Nothing survives a restart.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use telemock_core::{Bot, Chat, Id, Message, MessageStatus, Store, TelemockError, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Id, User>,
    chats: HashMap<Id, Chat>,
    members: HashMap<Id, BTreeSet<Id>>,
    messages: BTreeMap<Id, Message>,
    bots: HashMap<Id, Bot>,
}

/// In-memory [`Store`] guarded by a single async `RwLock`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<'a>(iter: impl DoubleEndedIterator<Item = &'a Message>) -> Vec<Message> {
    iter.rev().cloned().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(TelemockError::invalid(format!(
                "username `{}` is already taken",
                user.username
            )));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: &Id) -> Result<Option<User>, TelemockError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, TelemockError> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, TelemockError> {
        let t = self.tables.read().await;
        let mut users: Vec<User> = t.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        let stored = t
            .users
            .get_mut(&user.id)
            .ok_or_else(|| TelemockError::not_found("user", user.id))?;
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.is_online = user.is_online;
        stored.last_seen = user.last_seen;
        Ok(())
    }

    async fn delete_user(&self, id: &Id) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        t.users.remove(id);
        for members in t.members.values_mut() {
            members.remove(id);
        }
        Ok(())
    }

    async fn create_chat(&self, chat: &Chat) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        t.chats.insert(chat.id, chat.clone());
        t.members.entry(chat.id).or_default();
        Ok(())
    }

    async fn get_chat(&self, id: &Id) -> Result<Option<Chat>, TelemockError> {
        Ok(self.tables.read().await.chats.get(id).cloned())
    }

    async fn list_chats(&self) -> Result<Vec<Chat>, TelemockError> {
        let t = self.tables.read().await;
        let mut chats: Vec<Chat> = t.chats.values().cloned().collect();
        chats.sort_by_key(|c| c.id);
        Ok(chats)
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        let stored = t
            .chats
            .get_mut(&chat.id)
            .ok_or_else(|| TelemockError::not_found("chat", chat.id))?;
        stored.title = chat.title.clone();
        stored.username = chat.username.clone();
        stored.description = chat.description.clone();
        Ok(())
    }

    async fn chats_for_user(&self, user_id: &Id) -> Result<Vec<Chat>, TelemockError> {
        let t = self.tables.read().await;
        let mut chats: Vec<Chat> = t
            .members
            .iter()
            .filter(|(_, members)| members.contains(user_id))
            .filter_map(|(chat_id, _)| t.chats.get(chat_id).cloned())
            .collect();
        chats.sort_by_key(|c| c.id);
        Ok(chats)
    }

    async fn delete_chat(&self, id: &Id) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        t.chats.remove(id);
        t.members.remove(id);
        t.messages.retain(|_, m| m.chat_id != *id);
        Ok(())
    }

    async fn add_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        if !t.chats.contains_key(chat_id) {
            return Err(TelemockError::not_found("chat", chat_id));
        }
        if !t.users.contains_key(user_id) {
            return Err(TelemockError::not_found("user", user_id));
        }
        t.members.entry(*chat_id).or_default().insert(*user_id);
        Ok(())
    }

    async fn remove_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        if let Some(members) = t.members.get_mut(chat_id) {
            members.remove(user_id);
        }
        Ok(())
    }

    async fn chat_members(&self, chat_id: &Id) -> Result<Vec<User>, TelemockError> {
        let t = self.tables.read().await;
        Ok(t.members
            .get(chat_id)
            .map(|ids| ids.iter().filter_map(|id| t.users.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    async fn set_unread_count(&self, chat_id: &Id, count: i64) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        if let Some(chat) = t.chats.get_mut(chat_id) {
            chat.unread_count = count;
        }
        Ok(())
    }

    async fn create_message(&self, message: &Message) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        if !t.chats.contains_key(&message.chat_id) {
            return Err(TelemockError::not_found("chat", message.chat_id));
        }
        t.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn get_message(&self, id: &Id) -> Result<Option<Message>, TelemockError> {
        Ok(self.tables.read().await.messages.get(id).cloned())
    }

    async fn update_message(&self, message: &Message) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        let stored = t
            .messages
            .get_mut(&message.id)
            .ok_or_else(|| TelemockError::not_found("message", message.id))?;
        stored.text = message.text.clone();
        stored.entities = message.entities.clone();
        stored.reply_markup = message.reply_markup.clone();
        stored.edited_at = message.edited_at;
        Ok(())
    }

    async fn chat_messages(
        &self,
        chat_id: &Id,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, TelemockError> {
        let t = self.tables.read().await;
        let all = newest_first(t.messages.values().filter(|m| m.chat_id == *chat_id));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn search_messages(
        &self,
        chat_id: &Id,
        query: &str,
    ) -> Result<Vec<Message>, TelemockError> {
        let t = self.tables.read().await;
        Ok(newest_first(
            t.messages
                .values()
                .filter(|m| m.chat_id == *chat_id && m.text.contains(query)),
        ))
    }

    async fn unread_count(&self, chat_id: &Id) -> Result<i64, TelemockError> {
        let t = self.tables.read().await;
        let since = t.chats.get(chat_id).and_then(|c| c.last_read_at);
        let count = t
            .messages
            .values()
            .filter(|m| m.chat_id == *chat_id && m.status != MessageStatus::Read)
            .filter(|m| since.is_none_or(|read_at| m.created_at > read_at))
            .count();
        Ok(count as i64)
    }

    async fn mark_chat_read(
        &self,
        chat_id: &Id,
        reader: &Id,
        at: DateTime<Utc>,
    ) -> Result<u64, TelemockError> {
        let mut t = self.tables.write().await;
        let mut changed = 0;
        for m in t.messages.values_mut() {
            if m.chat_id == *chat_id && m.from_id != *reader && m.status != MessageStatus::Read {
                m.status = MessageStatus::Read;
                changed += 1;
            }
        }
        if let Some(chat) = t.chats.get_mut(chat_id) {
            chat.last_read_at = Some(at);
        }
        Ok(changed)
    }

    async fn transition_message_status(
        &self,
        id: &Id,
        expected: MessageStatus,
        next: MessageStatus,
    ) -> Result<bool, TelemockError> {
        let mut t = self.tables.write().await;
        match t.messages.get_mut(id) {
            Some(m) if m.status == expected => {
                m.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_message_status(
        &self,
        id: &Id,
        status: MessageStatus,
    ) -> Result<bool, TelemockError> {
        let mut t = self.tables.write().await;
        let Some(m) = t.messages.get_mut(id) else {
            return Ok(false);
        };
        m.status = status;
        Ok(true)
    }

    async fn delete_message(&self, id: &Id) -> Result<bool, TelemockError> {
        Ok(self.tables.write().await.messages.remove(id).is_some())
    }

    async fn create_bot(&self, bot: &Bot) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        if t
            .bots
            .values()
            .any(|b| b.token == bot.token || b.username == bot.username)
        {
            return Err(TelemockError::invalid(format!(
                "bot `{}` or its token is already registered",
                bot.username
            )));
        }
        t.bots.insert(bot.id, bot.clone());
        Ok(())
    }

    async fn get_bot(&self, id: &Id) -> Result<Option<Bot>, TelemockError> {
        Ok(self.tables.read().await.bots.get(id).cloned())
    }

    async fn get_bot_by_token(&self, token: &str) -> Result<Option<Bot>, TelemockError> {
        let t = self.tables.read().await;
        Ok(t.bots.values().find(|b| b.token == token).cloned())
    }

    async fn list_bots(&self) -> Result<Vec<Bot>, TelemockError> {
        let t = self.tables.read().await;
        let mut bots: Vec<Bot> = t.bots.values().cloned().collect();
        bots.sort_by_key(|b| b.id);
        Ok(bots)
    }

    async fn update_bot(&self, bot: &Bot) -> Result<(), TelemockError> {
        let mut t = self.tables.write().await;
        match t.bots.get_mut(&bot.id) {
            Some(stored) => {
                *stored = bot.clone();
                Ok(())
            }
            None => Err(TelemockError::not_found("bot", bot.id)),
        }
    }

    async fn delete_bot(&self, id: &Id) -> Result<(), TelemockError> {
        self.tables.write().await.bots.remove(id);
        Ok(())
    }
}
