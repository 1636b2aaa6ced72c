// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the emulator's components.

pub mod notifier;
pub mod store;

pub use notifier::{BotNotifier, MessageSubmitter};
pub use store::Store;
