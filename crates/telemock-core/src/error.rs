// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Telemock chat emulator.

use thiserror::Error;

/// The primary error type shared by the store, the bot subsystem, and the orchestrator.
#[derive(Debug, Error)]
pub enum TelemockError {
    /// Configuration errors (invalid TOML, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced user, chat, message, or bot does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// An operation was attempted against a deactivated bot.
    #[error("bot {id} is inactive")]
    InactiveBot { id: String },

    /// Malformed payload or out-of-range parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Webhook delivery failed. Only ever logged.
    #[error("webhook delivery to {url} failed: {message}")]
    DeliveryFailure { url: String, message: String },

    /// Bot token did not match any registered bot.
    #[error("unauthorized")]
    Unauthorized,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TelemockError {
    /// Shorthand for [`TelemockError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`TelemockError::InvalidInput`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Wrap any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }

    /// Returns true for the `NotFound` variant.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
