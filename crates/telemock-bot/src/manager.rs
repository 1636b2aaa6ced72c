// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot registry operations on top of the store, the update queue, and the
//! webhook dispatcher.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Url;
use tracing::{debug, info, warn};

use telemock_config::model::BotsConfig;
use telemock_core::{Bot, Id, Store, TelemockError, User};

use crate::ids::ProtocolIds;
use crate::protocol::{Update, UpdateKind};
use crate::queue::UpdateQueue;
use crate::webhook::WebhookDispatcher;

/// Everything needed to register a bot.
#[derive(Debug, Clone)]
pub struct NewBot {
    pub name: String,
    pub username: String,
    pub token: String,
    pub webhook_url: Option<String>,
}

pub struct BotManager {
    store: Arc<dyn Store>,
    queue: UpdateQueue,
    webhooks: WebhookDispatcher,
    ids: ProtocolIds,
}

impl BotManager {
    pub fn new(store: Arc<dyn Store>, config: &BotsConfig) -> Result<Self, TelemockError> {
        Ok(Self {
            store,
            queue: UpdateQueue::new(config),
            webhooks: WebhookDispatcher::new(config.webhook_timeout())?,
            ids: ProtocolIds::new(),
        })
    }

    pub fn ids(&self) -> &ProtocolIds {
        &self.ids
    }

    /// Register a bot together with the user it speaks as. Both share one id.
    pub async fn create_bot(&self, new: NewBot) -> Result<Bot, TelemockError> {
        let name = new.name.trim();
        let username = new.username.trim();
        let token = new.token.trim();
        if name.is_empty() || username.is_empty() || token.is_empty() {
            return Err(TelemockError::invalid("name, username and token are required"));
        }
        let webhook_url = match new.webhook_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(validate_webhook_url(url)?),
            _ => None,
        };

        let mut bot = Bot::new(name, username, token);
        bot.webhook_url = webhook_url;
        self.store.create_bot(&bot).await?;

        let user = User {
            id: bot.id,
            ..User::new(username, name, true)
        };
        if let Err(e) = self.store.create_user(&user).await {
            warn!(bot_id = %bot.id, error = %e, "bot user creation failed, rolling back bot");
            if let Err(rollback) = self.store.delete_bot(&bot.id).await {
                warn!(bot_id = %bot.id, error = %rollback, "bot rollback failed");
            }
            return Err(e);
        }

        info!(bot_id = %bot.id, username = %bot.username, "bot created");
        Ok(bot)
    }

    pub async fn get_bot(&self, id: &Id) -> Result<Bot, TelemockError> {
        self.store
            .get_bot(id)
            .await?
            .ok_or_else(|| TelemockError::not_found("bot", id))
    }

    /// Look a bot up by its API token. Unknown tokens are `Unauthorized`.
    pub async fn bot_by_token(&self, token: &str) -> Result<Bot, TelemockError> {
        self.store
            .get_bot_by_token(token)
            .await?
            .ok_or(TelemockError::Unauthorized)
    }

    pub async fn list_bots(&self) -> Result<Vec<Bot>, TelemockError> {
        self.store.list_bots().await
    }

    /// Persist every mutable field. Deactivating a bot drops its queue.
    pub async fn update_bot(&self, mut bot: Bot) -> Result<Bot, TelemockError> {
        bot.updated_at = Utc::now();
        self.store.update_bot(&bot).await?;
        if !bot.is_active {
            self.queue.clear(&bot.id).await;
        }
        debug!(bot_id = %bot.id, active = bot.is_active, "bot updated");
        Ok(bot)
    }

    /// Remove the bot, its queued updates, and its user.
    pub async fn delete_bot(&self, id: &Id) -> Result<(), TelemockError> {
        self.get_bot(id).await?;
        self.store.delete_bot(id).await?;
        self.queue.remove(id);
        if let Err(e) = self.store.delete_user(id).await {
            warn!(bot_id = %id, error = %e, "failed to delete bot user");
        }
        info!(bot_id = %id, "bot deleted");
        Ok(())
    }

    pub async fn set_webhook(&self, id: &Id, url: &str) -> Result<Bot, TelemockError> {
        let url = validate_webhook_url(url.trim())?;
        let mut bot = self.get_bot(id).await?;
        bot.webhook_url = Some(url);
        self.update_bot(bot).await
    }

    pub async fn delete_webhook(&self, id: &Id) -> Result<Bot, TelemockError> {
        let mut bot = self.get_bot(id).await?;
        bot.webhook_url = None;
        self.update_bot(bot).await
    }

    /// Queue an update for an active bot and push it to its webhook, if any.
    pub async fn add_update(&self, bot_id: &Id, kind: UpdateKind) -> Result<Update, TelemockError> {
        let bot = self.get_bot(bot_id).await?;
        if !bot.is_active {
            return Err(TelemockError::InactiveBot {
                id: bot.id.to_string(),
            });
        }
        let update = self.queue.enqueue(bot_id, kind).await;
        self.webhooks.dispatch(&bot, update.clone());
        Ok(update)
    }

    /// Long-poll the bot's queue. An offset of 0 falls back to the bot's stored offset.
    pub async fn get_updates(
        &self,
        bot_id: &Id,
        offset: i64,
        limit: i64,
        timeout_secs: i64,
    ) -> Result<Vec<Update>, TelemockError> {
        let bot = self.get_bot(bot_id).await?;
        if !bot.is_active {
            return Err(TelemockError::InactiveBot {
                id: bot.id.to_string(),
            });
        }
        let offset = if offset == 0 {
            bot.last_update_offset
        } else {
            offset
        };
        let updates = self.queue.poll(bot_id, offset, limit, timeout_secs).await;
        debug!(bot_id = %bot_id, offset, count = updates.len(), "updates polled");
        Ok(updates)
    }

    pub async fn clear_updates(&self, bot_id: &Id) -> Result<(), TelemockError> {
        self.get_bot(bot_id).await?;
        self.queue.clear(bot_id).await;
        Ok(())
    }

    pub async fn pending_updates(&self, bot_id: &Id) -> usize {
        self.queue.pending(bot_id).await
    }
}

/// Accept only absolute http(s) URLs.
pub fn validate_webhook_url(raw: &str) -> Result<String, TelemockError> {
    let url = Url::parse(raw).map_err(|e| TelemockError::invalid(format!("invalid webhook url: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url.to_string()),
        scheme => Err(TelemockError::invalid(format!(
            "webhook url must be http or https, got `{scheme}`"
        ))),
    }
}
