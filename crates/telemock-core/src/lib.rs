// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Telemock chat emulator.
//!
//! Holds the domain model, the shared error type, entity parsing, and the
//! traits other crates meet at: [`Store`] for persistence, and the
//! [`BotNotifier`] / [`MessageSubmitter`] capabilities the WebSocket layer
//! is constructed with.

pub mod entities;
pub mod error;
pub mod traits;
pub mod types;

pub use error::TelemockError;
pub use types::{
    Bot, CallbackQuery, Chat, ChatKind, EntityKind, Id, Message, MessageEntity, MessageKind,
    MessageStatus, NewMessage, User,
};

pub use traits::{BotNotifier, MessageSubmitter, Store};
