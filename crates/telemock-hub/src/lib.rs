// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time delivery for the Telemock chat emulator.
//!
//! [`ConnectionHub`] tracks live WebSocket clients and fans serialized
//! frames out to them. [`ws`] owns the upgrade handler and the read/write
//! pump pair that runs for every connection.

pub mod connection;
pub mod frame;
pub mod hub;
pub mod ws;

pub use connection::Connection;
pub use frame::Event;
pub use hub::ConnectionHub;
pub use ws::{WsContext, ws_handler};
