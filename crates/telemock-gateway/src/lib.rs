// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of Telemock.
//!
//! One axum router serves the WebSocket endpoint for chat clients, the
//! admin REST API under `/api`, and the Telegram Bot API for bots.

pub mod admin;
pub mod bot_api;
pub mod error;
pub mod server;

pub use error::{ApiError, BotApiError, ErrorResponse};
pub use server::{AppState, router, serve};
