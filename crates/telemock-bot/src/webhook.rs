// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fire-and-forget webhook delivery.
//!
//! One POST per update, no retry. Failures are logged with the bot id and
//! never reach the code path that produced the update.

use std::time::Duration;

use tracing::{debug, warn};

use telemock_core::{Bot, TelemockError};

use crate::protocol::Update;

#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new(timeout: Duration) -> Result<Self, TelemockError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("telemock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TelemockError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Push `update` to the bot's webhook in the background. No-op without a URL.
    pub fn dispatch(&self, bot: &Bot, update: Update) {
        let Some(url) = bot.webhook_url.clone().filter(|u| !u.is_empty()) else {
            return;
        };
        let this = self.clone();
        let bot_id = bot.id;
        tokio::spawn(async move {
            if let Err(e) = this.deliver(&url, &update).await {
                warn!(bot_id = %bot_id, update_id = update.update_id, error = %e, "webhook delivery failed");
            }
        });
    }

    /// POST one update and wait for the response.
    pub async fn deliver(&self, url: &str, update: &Update) -> Result<(), TelemockError> {
        let failure = |message: String| TelemockError::DeliveryFailure {
            url: url.to_string(),
            message,
        };
        let response = self
            .client
            .post(url)
            .json(update)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(url, update_id = update.update_id, status = %status, "webhook delivered");
            Ok(())
        } else {
            Err(failure(format!("endpoint returned {status}")))
        }
    }
}
