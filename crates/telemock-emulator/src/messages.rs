// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message lifecycle: persist, fan out to clients and bots, then walk
//! the delivery state machine in the background.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use telemock_bot::{BotManager, UpdateKind};
use telemock_config::model::DeliveryConfig;
use telemock_core::entities::parse_entities;
use telemock_core::{
    BotNotifier, CallbackQuery, Chat, ChatKind, Id, Message, MessageKind, MessageStatus,
    MessageSubmitter, NewMessage, Store, TelemockError, User,
};
use telemock_hub::{ConnectionHub, Event};

use crate::events::{ChatRead, MessageDeleted, MessageEvent, StatusUpdate};

/// Largest page `chat_messages` will serve.
pub const MAX_PAGE: usize = 1000;

/// Orchestrates every message mutation.
///
/// Holds no cached entities. Each call re-reads what it needs from the store.
pub struct MessageManager {
    store: Arc<dyn Store>,
    hub: Arc<ConnectionHub>,
    bots: Arc<BotManager>,
    sent_delay: Duration,
    delivered_delay: Duration,
}

impl MessageManager {
    pub fn new(
        store: Arc<dyn Store>,
        hub: Arc<ConnectionHub>,
        bots: Arc<BotManager>,
        delivery: &DeliveryConfig,
    ) -> Self {
        Self {
            store,
            hub,
            bots,
            sent_delay: Duration::from_millis(delivery.sent_delay_ms),
            delivered_delay: Duration::from_millis(delivery.delivered_delay_ms),
        }
    }

    /// Create a message and deliver it everywhere it needs to go.
    ///
    /// Succeeds or fails on the sender, chat and persistence only. Live and
    /// bot delivery are best effort. Bot queues are filled before this
    /// returns; webhooks fire in the background.
    pub async fn send_message(&self, new: NewMessage) -> Result<Message, TelemockError> {
        if new.kind == MessageKind::Text && new.text.trim().is_empty() {
            return Err(TelemockError::invalid("message text is empty"));
        }
        let sender = self.user(&new.from_id).await?;
        let chat = self.chat(&new.chat_id).await?;

        let mut members = self.member_ids(&chat.id).await?;
        if !members.contains(&sender.id) && chat.kind == ChatKind::Group {
            self.store.add_member(&chat.id, &sender.id).await?;
            members.insert(sender.id);
            info!(chat_id = %chat.id, user_id = %sender.id, "sender joined chat");
        }

        let now = Utc::now();
        let message = Message {
            id: Id::new(),
            chat_id: chat.id,
            from_id: sender.id,
            entities: parse_entities(&new.text),
            text: new.text,
            kind: new.kind,
            status: MessageStatus::Sending,
            is_outgoing: !sender.is_bot,
            timestamp: now,
            created_at: now,
            edited_at: None,
            reply_markup: new.reply_markup,
        };
        self.store.create_message(&message).await?;
        self.refresh_unread(&chat.id).await;

        // Echo to the sender's other sessions even when it is not a member.
        let mut recipients = members.clone();
        recipients.insert(sender.id);
        let recipients: Vec<Id> = recipients.into_iter().collect();
        self.hub
            .broadcast_to_users(&recipients, Event::Message, &MessageEvent::new(&message, &sender))
            .await;

        self.spawn_delivery(message.id, recipients);

        let wire = self.bots.ids().message(&message, &sender, &chat);
        self.notify_member_bots(&members, &sender.id, UpdateKind::Message(wire))
            .await;

        info!(
            message_id = %message.id,
            chat_id = %chat.id,
            from = %sender.username,
            "message sent"
        );
        Ok(message)
    }

    /// Send `text` as the bot's own user, the way its Bot API `sendMessage`
    /// would. `chat` is a chat id or the chat's numeric protocol alias.
    pub async fn send_as_bot(
        &self,
        bot_id: &Id,
        chat: &str,
        text: &str,
        reply_markup: Option<Value>,
    ) -> Result<Message, TelemockError> {
        let bot = self.bots.get_bot(bot_id).await?;
        if !bot.is_active {
            return Err(TelemockError::InactiveBot {
                id: bot.id.to_string(),
            });
        }
        let chat_id = self.bots.ids().resolve_chat(self.store.as_ref(), chat).await?;
        let mut draft = NewMessage::text(chat_id, bot.id, text);
        if let Some(markup) = reply_markup {
            draft = draft.with_reply_markup(markup);
        }
        self.send_message(draft).await
    }

    pub async fn get_message(&self, id: &Id) -> Result<Message, TelemockError> {
        self.store
            .get_message(id)
            .await?
            .ok_or_else(|| TelemockError::not_found("message", id))
    }

    /// A page of the chat's history, newest first.
    pub async fn chat_messages(
        &self,
        chat_id: &Id,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, TelemockError> {
        if limit == 0 || limit > MAX_PAGE {
            return Err(TelemockError::invalid(format!(
                "limit must be between 1 and {MAX_PAGE}"
            )));
        }
        self.chat(chat_id).await?;
        self.store.chat_messages(chat_id, limit, offset).await
    }

    pub async fn search_messages(
        &self,
        chat_id: &Id,
        query: &str,
    ) -> Result<Vec<Message>, TelemockError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(TelemockError::invalid("search query is empty"));
        }
        self.chat(chat_id).await?;
        self.store.search_messages(chat_id, query).await
    }

    /// Administrative status override.
    ///
    /// Moves forward only. `read` is always accepted. Any other target is
    /// written only if the status is still the one that was checked, so a
    /// concurrent change is reported instead of overwritten.
    pub async fn update_message_status(
        &self,
        id: &Id,
        status: MessageStatus,
    ) -> Result<Message, TelemockError> {
        let mut message = self.get_message(id).await?;
        if status != MessageStatus::Read && !message.status.can_advance_to(status) {
            return Err(TelemockError::invalid(format!(
                "cannot move message from {} to {status}",
                message.status
            )));
        }
        let written = if status == MessageStatus::Read {
            self.store.set_message_status(id, status).await?
        } else {
            self.store
                .transition_message_status(id, message.status, status)
                .await?
        };
        if !written {
            let current = self.get_message(id).await?;
            return Err(TelemockError::invalid(format!(
                "message status changed to {} concurrently",
                current.status
            )));
        }
        message.status = status;
        self.refresh_unread(&message.chat_id).await;

        let recipients = self.recipients(&message.chat_id).await;
        self.hub
            .broadcast_to_users(
                &recipients,
                Event::MessageStatusUpdate,
                &StatusUpdate {
                    message_id: message.id,
                    status,
                },
            )
            .await;
        Ok(message)
    }

    /// Force every message in the chat not written by `user_id` to `read`.
    /// Returns how many messages changed.
    pub async fn mark_chat_as_read(&self, chat_id: &Id, user_id: &Id) -> Result<u64, TelemockError> {
        let chat = self.chat(chat_id).await?;
        self.user(user_id).await?;

        let changed = self.store.mark_chat_read(&chat.id, user_id, Utc::now()).await?;
        let unread = self.store.unread_count(&chat.id).await?;
        self.store.set_unread_count(&chat.id, unread).await?;

        let recipients = self.recipients(&chat.id).await;
        self.hub
            .broadcast_to_users(
                &recipients,
                Event::ChatRead,
                &ChatRead {
                    chat_id: chat.id,
                    user_id: *user_id,
                },
            )
            .await;
        info!(chat_id = %chat.id, user_id = %user_id, changed, "chat marked as read");
        Ok(changed)
    }

    /// Remove a message. Updates already handed to bots are not recalled.
    pub async fn delete_message(&self, id: &Id) -> Result<(), TelemockError> {
        let message = self.get_message(id).await?;
        if !self.store.delete_message(id).await? {
            return Err(TelemockError::not_found("message", id));
        }
        self.refresh_unread(&message.chat_id).await;

        let recipients = self.recipients(&message.chat_id).await;
        self.hub
            .broadcast_to_users(
                &recipients,
                Event::MessageDelete,
                &MessageDeleted {
                    message_id: message.id,
                    chat_id: message.chat_id,
                },
            )
            .await;
        info!(message_id = %id, "message deleted");
        Ok(())
    }

    /// Replace a message's text, and its keyboard when one is given.
    ///
    /// Member bots other than the author receive an `edited_message` update.
    pub async fn edit_message_text(
        &self,
        id: &Id,
        text: &str,
        reply_markup: Option<Value>,
    ) -> Result<Message, TelemockError> {
        if text.trim().is_empty() {
            return Err(TelemockError::invalid("message text is empty"));
        }
        let mut message = self.get_message(id).await?;
        message.text = text.to_string();
        message.entities = parse_entities(text);
        if reply_markup.is_some() {
            message.reply_markup = reply_markup;
        }
        message.edited_at = Some(Utc::now());
        self.store.update_message(&message).await?;

        let author = self.user(&message.from_id).await?;
        let chat = self.chat(&message.chat_id).await?;
        let members = self.member_ids(&chat.id).await?;

        let mut recipients = members.clone();
        recipients.insert(author.id);
        let recipients: Vec<Id> = recipients.into_iter().collect();
        self.hub
            .broadcast_to_users(&recipients, Event::MessageEdited, &MessageEvent::new(&message, &author))
            .await;

        let wire = self.bots.ids().message(&message, &author, &chat);
        self.notify_member_bots(&members, &author.id, UpdateKind::EditedMessage(wire))
            .await;
        debug!(message_id = %id, "message edited");
        Ok(message)
    }

    /// Mint a callback query for a pressed inline button and hand it to the
    /// bot that wrote the message carrying the keyboard.
    pub async fn handle_callback_query(
        &self,
        user_id: &Id,
        message_id: &Id,
        data: &str,
    ) -> Result<CallbackQuery, TelemockError> {
        let message = self.get_message(message_id).await?;
        let user = self.user(user_id).await?;
        let chat = self.chat(&message.chat_id).await?;

        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let query = CallbackQuery {
            id: format!("cq_{nanos}"),
            from: user,
            chat_instance: chat.id.protocol_alias().to_string(),
            message,
            data: data.to_string(),
        };

        match self.store.get_user(&query.message.from_id).await {
            Ok(Some(author)) if author.is_bot => {
                let wire = self.bots.ids().callback(&query, &author, &chat);
                match self
                    .bots
                    .add_update(&author.id, UpdateKind::CallbackQuery(wire))
                    .await
                {
                    Ok(update) => debug!(
                        bot_id = %author.id,
                        update_id = update.update_id,
                        callback_id = %query.id,
                        "callback query queued"
                    ),
                    Err(e) => warn!(bot_id = %author.id, error = %e, "callback query not queued"),
                }
            }
            Ok(_) => debug!(message_id = %message_id, "keyboard not owned by a bot"),
            Err(e) => warn!(message_id = %message_id, error = %e, "could not load message author"),
        }

        info!(
            callback_id = %query.id,
            message_id = %message_id,
            user_id = %user_id,
            "callback query handled"
        );
        Ok(query)
    }

    /// Queue `kind` for every member bot except `author`. One bot failing
    /// never stops the rest.
    async fn notify_member_bots(&self, members: &BTreeSet<Id>, author: &Id, kind: UpdateKind) {
        let mut notified = 0usize;
        for member in members.iter().filter(|m| *m != author) {
            let user = match self.store.get_user(member).await {
                Ok(Some(user)) if user.is_bot => user,
                Ok(_) => continue,
                Err(e) => {
                    warn!(user_id = %member, error = %e, "member lookup failed");
                    continue;
                }
            };
            match self.bots.add_update(&user.id, kind.clone()).await {
                Ok(_) => notified += 1,
                Err(e @ TelemockError::InactiveBot { .. }) => {
                    debug!(bot_id = %user.id, error = %e, "skipping inactive bot");
                }
                Err(e) => warn!(bot_id = %user.id, error = %e, "failed to queue update"),
            }
        }
        debug!(notified, "member bots notified");
    }

    fn spawn_delivery(&self, message_id: Id, recipients: Vec<Id>) {
        let store = Arc::clone(&self.store);
        let hub = Arc::clone(&self.hub);
        let steps = [
            (self.sent_delay, MessageStatus::Sending, MessageStatus::Sent),
            (self.delivered_delay, MessageStatus::Sent, MessageStatus::Delivered),
        ];
        tokio::spawn(async move {
            for (delay, from, to) in steps {
                tokio::time::sleep(delay).await;
                match store.transition_message_status(&message_id, from, to).await {
                    Ok(true) => {
                        hub.broadcast_to_users(
                            &recipients,
                            Event::MessageStatusUpdate,
                            &StatusUpdate {
                                message_id,
                                status: to,
                            },
                        )
                        .await;
                    }
                    Ok(false) => {
                        debug!(message_id = %message_id, target = %to, "status moved on, stopping delivery");
                        return;
                    }
                    Err(e) => {
                        warn!(message_id = %message_id, target = %to, error = %e, "status update failed");
                        return;
                    }
                }
            }
        });
    }

    async fn refresh_unread(&self, chat_id: &Id) {
        let result = async {
            let count = self.store.unread_count(chat_id).await?;
            self.store.set_unread_count(chat_id, count).await
        }
        .await;
        if let Err(e) = result {
            warn!(chat_id = %chat_id, error = %e, "failed to refresh unread count");
        }
    }

    async fn user(&self, id: &Id) -> Result<User, TelemockError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| TelemockError::not_found("user", id))
    }

    async fn chat(&self, id: &Id) -> Result<Chat, TelemockError> {
        self.store
            .get_chat(id)
            .await?
            .ok_or_else(|| TelemockError::not_found("chat", id))
    }

    async fn member_ids(&self, chat_id: &Id) -> Result<BTreeSet<Id>, TelemockError> {
        Ok(self
            .store
            .chat_members(chat_id)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect())
    }

    /// Member ids for a broadcast. A lookup failure means nobody hears it.
    async fn recipients(&self, chat_id: &Id) -> Vec<Id> {
        match self.member_ids(chat_id).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "could not load chat members");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl MessageSubmitter for MessageManager {
    async fn submit_message(&self, message: NewMessage) -> Result<Message, TelemockError> {
        self.send_message(message).await
    }
}

#[async_trait]
impl BotNotifier for MessageManager {
    async fn enqueue_callback(
        &self,
        user_id: &Id,
        message_id: &Id,
        data: &str,
    ) -> Result<CallbackQuery, TelemockError> {
        self.handle_callback_query(user_id, message_id, data).await
    }
}
