// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry entry for one live WebSocket client.

use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use telemock_core::Id;

/// The hub's handle on a connection: who owns it and where its frames go.
///
/// The write pump holds the receiving end. Once the hub drops the last
/// handle the channel closes and the write pump exits.
#[derive(Debug)]
pub struct Connection {
    pub id: Id,
    pub user_id: Id,
    pub connected_at: DateTime<Utc>,
    tx: mpsc::Sender<Utf8Bytes>,
}

impl Connection {
    /// Create a connection with an outbound queue of `buffer` frames.
    pub fn new(user_id: Id, buffer: usize) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let conn = Self {
            id: Id::new(),
            user_id,
            connected_at: Utc::now(),
            tx,
        };
        (conn, rx)
    }

    /// Offer a frame without waiting. Returns `false` when the queue is full
    /// or the write pump is gone.
    pub fn offer(&self, frame: Utf8Bytes) -> bool {
        self.tx.try_send(frame).is_ok()
    }
}
