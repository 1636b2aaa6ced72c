// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Users, chats, and chat membership.

use std::sync::Arc;

use tracing::info;

use telemock_core::{Chat, ChatKind, Id, Store, TelemockError, User};

pub struct Directory {
    store: Arc<dyn Store>,
}

impl Directory {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_user(
        &self,
        username: &str,
        first_name: &str,
        last_name: Option<&str>,
        is_bot: bool,
    ) -> Result<User, TelemockError> {
        let username = username.trim();
        if username.is_empty() || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(TelemockError::invalid(
                "username must be non-empty and contain only letters, digits and underscores",
            ));
        }
        let first_name = first_name.trim();
        if first_name.is_empty() {
            return Err(TelemockError::invalid("first_name is required"));
        }

        let mut user = User::new(username, first_name, is_bot);
        user.last_name = last_name.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        self.store.create_user(&user).await?;
        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn get_user(&self, id: &Id) -> Result<User, TelemockError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| TelemockError::not_found("user", id))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, TelemockError> {
        self.store.list_users().await
    }

    /// Apply a partial profile change. Blank names leave the current value.
    pub async fn update_user(
        &self,
        id: &Id,
        first_name: Option<&str>,
        last_name: Option<&str>,
        is_online: Option<bool>,
    ) -> Result<User, TelemockError> {
        let mut user = self.get_user(id).await?;
        if let Some(first) = non_blank(first_name) {
            user.first_name = first;
        }
        if let Some(last) = non_blank(last_name) {
            user.last_name = Some(last);
        }
        if let Some(online) = is_online {
            user.set_online(online);
        }
        self.store.update_user(&user).await?;
        info!(user_id = %user.id, online = user.is_online, "user updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: &Id) -> Result<(), TelemockError> {
        self.get_user(id).await?;
        self.store.delete_user(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// Create a chat of either kind. A private chat takes exactly two members.
    pub async fn create_chat(
        &self,
        kind: ChatKind,
        title: Option<String>,
        members: &[Id],
    ) -> Result<Chat, TelemockError> {
        match (kind, members) {
            (ChatKind::Private, [a, b]) => self.create_private_chat(a, b).await,
            (ChatKind::Private, _) => Err(TelemockError::invalid(
                "a private chat needs exactly two members",
            )),
            (ChatKind::Group, _) => {
                let title = title.unwrap_or_default();
                self.create_group_chat(&title, members).await
            }
        }
    }

    pub async fn create_group_chat(&self, title: &str, members: &[Id]) -> Result<Chat, TelemockError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TelemockError::invalid("group chats need a title"));
        }
        for id in members {
            self.get_user(id).await?;
        }

        let chat = Chat::new(ChatKind::Group, Some(title.to_string()));
        self.store.create_chat(&chat).await?;
        for id in members {
            self.store.add_member(&chat.id, id).await?;
        }
        info!(chat_id = %chat.id, members = members.len(), "group chat created");
        Ok(chat)
    }

    /// Return the private chat between `a` and `b`, creating it on first use.
    pub async fn create_private_chat(&self, a: &Id, b: &Id) -> Result<Chat, TelemockError> {
        if a == b {
            return Err(TelemockError::invalid("a private chat needs two different users"));
        }
        self.get_user(a).await?;
        self.get_user(b).await?;

        for chat in self.store.chats_for_user(a).await? {
            if chat.kind != ChatKind::Private {
                continue;
            }
            let members = self.store.chat_members(&chat.id).await?;
            if members.iter().any(|m| m.id == *b) {
                return Ok(chat);
            }
        }

        let chat = Chat::new(ChatKind::Private, None);
        self.store.create_chat(&chat).await?;
        self.store.add_member(&chat.id, a).await?;
        self.store.add_member(&chat.id, b).await?;
        info!(chat_id = %chat.id, "private chat created");
        Ok(chat)
    }

    pub async fn get_chat(&self, id: &Id) -> Result<Chat, TelemockError> {
        self.store
            .get_chat(id)
            .await?
            .ok_or_else(|| TelemockError::not_found("chat", id))
    }

    pub async fn list_chats(&self) -> Result<Vec<Chat>, TelemockError> {
        self.store.list_chats().await
    }

    pub async fn chats_for_user(&self, user_id: &Id) -> Result<Vec<Chat>, TelemockError> {
        self.get_user(user_id).await?;
        self.store.chats_for_user(user_id).await
    }

    /// Apply a partial change to title, username and description. Blank
    /// values leave the current one.
    pub async fn update_chat(
        &self,
        id: &Id,
        title: Option<&str>,
        username: Option<&str>,
        description: Option<&str>,
    ) -> Result<Chat, TelemockError> {
        let mut chat = self.get_chat(id).await?;
        if let Some(title) = non_blank(title) {
            chat.title = Some(title);
        }
        if let Some(username) = non_blank(username) {
            chat.username = Some(username);
        }
        if let Some(description) = non_blank(description) {
            chat.description = Some(description);
        }
        self.store.update_chat(&chat).await?;
        info!(chat_id = %chat.id, "chat updated");
        Ok(chat)
    }

    pub async fn delete_chat(&self, id: &Id) -> Result<(), TelemockError> {
        self.get_chat(id).await?;
        self.store.delete_chat(id).await?;
        info!(chat_id = %id, "chat deleted");
        Ok(())
    }

    /// Add a member to a group chat. Private chat membership is fixed.
    pub async fn add_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        let chat = self.get_chat(chat_id).await?;
        if chat.is_private() {
            return Err(TelemockError::invalid("private chat membership is fixed"));
        }
        self.get_user(user_id).await?;
        self.store.add_member(chat_id, user_id).await
    }

    pub async fn remove_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        let chat = self.get_chat(chat_id).await?;
        if chat.is_private() {
            return Err(TelemockError::invalid("private chat membership is fixed"));
        }
        self.store.remove_member(chat_id, user_id).await
    }

    pub async fn chat_members(&self, chat_id: &Id) -> Result<Vec<User>, TelemockError> {
        self.get_chat(chat_id).await?;
        self.store.chat_members(chat_id).await
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemock_storage::MemoryStore;

    fn directory() -> Directory {
        Directory::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn usernames_are_validated_and_unique() {
        let dir = directory();
        dir.create_user("alice", "Alice", None, false).await.unwrap();
        assert!(dir.create_user("alice", "Again", None, false).await.is_err());
        assert!(dir.create_user("bad name", "Bad", None, false).await.is_err());
        assert!(dir.create_user("ok", "  ", None, false).await.is_err());
    }

    #[tokio::test]
    async fn private_chat_is_reused() {
        let dir = directory();
        let a = dir.create_user("alice", "Alice", None, false).await.unwrap();
        let b = dir.create_user("bob", "Bob", Some("B"), false).await.unwrap();

        let first = dir.create_private_chat(&a.id, &b.id).await.unwrap();
        let again = dir.create_private_chat(&b.id, &a.id).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(dir.chat_members(&first.id).await.unwrap().len(), 2);
        assert!(dir.create_private_chat(&a.id, &a.id).await.is_err());
    }

    #[tokio::test]
    async fn private_membership_is_fixed() {
        let dir = directory();
        let a = dir.create_user("alice", "Alice", None, false).await.unwrap();
        let b = dir.create_user("bob", "Bob", None, false).await.unwrap();
        let c = dir.create_user("carol", "Carol", None, false).await.unwrap();
        let chat = dir.create_private_chat(&a.id, &b.id).await.unwrap();
        assert!(dir.add_member(&chat.id, &c.id).await.is_err());
        assert!(dir.remove_member(&chat.id, &a.id).await.is_err());
    }

    #[tokio::test]
    async fn group_chat_with_unknown_member_fails() {
        let dir = directory();
        let a = dir.create_user("alice", "Alice", None, false).await.unwrap();
        let err = dir
            .create_group_chat("Lobby", &[a.id, Id::new()])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(dir.list_chats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_chat_dispatches_on_kind() {
        let dir = directory();
        let a = dir.create_user("alice", "Alice", None, false).await.unwrap();
        let b = dir.create_user("bob", "Bob", None, false).await.unwrap();

        let private = dir
            .create_chat(ChatKind::Private, None, &[a.id, b.id])
            .await
            .unwrap();
        assert!(private.is_private());
        assert!(dir.create_chat(ChatKind::Private, None, &[a.id]).await.is_err());

        let group = dir
            .create_chat(ChatKind::Group, Some("Lobby".into()), &[a.id])
            .await
            .unwrap();
        assert_eq!(group.title.as_deref(), Some("Lobby"));
        assert_eq!(dir.chats_for_user(&a.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn partial_updates_keep_unset_fields() {
        let dir = directory();
        let alice = dir.create_user("alice", "Alice", Some("A"), false).await.unwrap();

        let updated = dir
            .update_user(&alice.id, Some("  "), None, Some(true))
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Alice");
        assert_eq!(updated.last_name.as_deref(), Some("A"));
        assert!(updated.is_online);

        let offline = dir.update_user(&alice.id, None, None, Some(false)).await.unwrap();
        assert!(!offline.is_online);
        assert!(offline.last_seen.is_some());

        let chat = dir.create_group_chat("Lobby", &[alice.id]).await.unwrap();
        let chat = dir
            .update_chat(&chat.id, None, Some("lobby"), Some("general talk"))
            .await
            .unwrap();
        assert_eq!(chat.title.as_deref(), Some("Lobby"));
        assert_eq!(chat.username.as_deref(), Some("lobby"));
        let stored = dir.get_chat(&chat.id).await.unwrap();
        assert_eq!(stored.description.as_deref(), Some("general talk"));

        let err = dir.update_chat(&Id::new(), Some("x"), None, None).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
