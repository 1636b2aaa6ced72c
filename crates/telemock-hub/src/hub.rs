// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live connection registry and frame fan-out.
//!
//! Frames are serialized once per broadcast, before the registry lock is
//! taken. Delivery is a non-blocking offer into each connection's bounded
//! queue. A connection whose queue is full is removed from the registry,
//! which closes its queue and ends its write pump.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use telemock_core::Id;

use crate::connection::Connection;
use crate::frame::{Event, encode};

/// Registry of live client connections, keyed by connection id.
///
/// A user may hold any number of connections at once.
pub struct ConnectionHub {
    connections: RwLock<HashMap<Id, Arc<Connection>>>,
    active: AtomicUsize,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            active: AtomicUsize::new(0),
        }
    }

    pub async fn register(&self, conn: Arc<Connection>) {
        let (id, user_id) = (conn.id, conn.user_id);
        let mut conns = self.connections.write().await;
        if conns.insert(id, conn).is_none() {
            self.active.fetch_add(1, Ordering::Relaxed);
        }
        debug!(conn_id = %id, user_id = %user_id, total = conns.len(), "connection registered");
    }

    /// Remove a connection. Returns whether it was still registered.
    pub async fn unregister(&self, conn_id: &Id) -> bool {
        let mut conns = self.connections.write().await;
        let removed = conns.remove(conn_id).is_some();
        if removed {
            self.active.fetch_sub(1, Ordering::Relaxed);
            debug!(conn_id = %conn_id, total = conns.len(), "connection unregistered");
        }
        removed
    }

    /// Send to every live connection.
    pub async fn broadcast_all<T: Serialize + ?Sized>(&self, event: Event, payload: &T) {
        if let Some(frame) = serialize(event, payload) {
            self.fan_out(event, frame, |_| true).await;
        }
    }

    /// Send to every connection owned by `user_id`. Zero connections is fine.
    pub async fn broadcast_to_user<T: Serialize + ?Sized>(
        &self,
        user_id: &Id,
        event: Event,
        payload: &T,
    ) {
        if let Some(frame) = serialize(event, payload) {
            self.fan_out(event, frame, |c| c.user_id == *user_id).await;
        }
    }

    /// Send to every connection owned by any of `user_ids`, serializing once.
    pub async fn broadcast_to_users<T: Serialize + ?Sized>(
        &self,
        user_ids: &[Id],
        event: Event,
        payload: &T,
    ) {
        if user_ids.is_empty() {
            return;
        }
        if let Some(frame) = serialize(event, payload) {
            self.fan_out(event, frame, |c| user_ids.contains(&c.user_id))
                .await;
        }
    }

    /// Send to a single connection. Returns `false` if it is gone or full.
    pub async fn send_to_connection<T: Serialize + ?Sized>(
        &self,
        conn_id: &Id,
        event: Event,
        payload: &T,
    ) -> bool {
        match serialize(event, payload) {
            Some(frame) => self.fan_out(event, frame, |c| c.id == *conn_id).await > 0,
            None => false,
        }
    }

    pub async fn is_user_connected(&self, user_id: &Id) -> bool {
        let conns = self.connections.read().await;
        conns.values().any(|c| c.user_id == *user_id)
    }

    /// Distinct users with at least one live connection.
    pub async fn connected_users(&self) -> Vec<Id> {
        let conns = self.connections.read().await;
        let users: BTreeSet<Id> = conns.values().map(|c| c.user_id).collect();
        users.into_iter().collect()
    }

    /// Number of live connections, without taking the lock.
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Offer `frame` to every matching connection and drop the ones that
    /// cannot take it. Returns how many accepted it.
    async fn fan_out(
        &self,
        event: Event,
        frame: Utf8Bytes,
        filter: impl Fn(&Connection) -> bool,
    ) -> usize {
        let mut delivered = 0;
        let mut stalled = Vec::new();
        {
            let conns = self.connections.read().await;
            for conn in conns.values().filter(|c| filter(c)) {
                if conn.offer(frame.clone()) {
                    delivered += 1;
                } else {
                    stalled.push(conn.id);
                }
            }
        }
        debug!(event = %event, delivered, dropped = stalled.len(), "frame fanned out");

        if !stalled.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &stalled {
                if let Some(conn) = conns.remove(id) {
                    self.active.fetch_sub(1, Ordering::Relaxed);
                    warn!(conn_id = %id, user_id = %conn.user_id, "outbound queue full, dropping connection");
                }
            }
        }
        delivered
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize<T: Serialize + ?Sized>(event: Event, payload: &T) -> Option<Utf8Bytes> {
    match encode(event, payload) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(event = %event, error = %e, "failed to serialize frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    async fn connect(
        hub: &ConnectionHub,
        user: Id,
        buffer: usize,
    ) -> (Id, mpsc::Receiver<Utf8Bytes>) {
        let (conn, rx) = Connection::new(user, buffer);
        let id = conn.id;
        hub.register(Arc::new(conn)).await;
        (id, rx)
    }

    fn decode(frame: Utf8Bytes) -> Value {
        serde_json::from_str(frame.as_str()).unwrap()
    }

    #[tokio::test]
    async fn register_and_unregister_are_counted() {
        let hub = ConnectionHub::new();
        let (id, _rx) = connect(&hub, Id::new(), 8).await;
        assert_eq!(hub.connection_count(), 1);
        assert!(hub.unregister(&id).await);
        assert!(!hub.unregister(&id).await);
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn user_may_hold_several_connections() {
        let hub = ConnectionHub::new();
        let user = Id::new();
        let (_a, mut rx_a) = connect(&hub, user, 8).await;
        let (_b, mut rx_b) = connect(&hub, user, 8).await;
        let (_c, mut rx_other) = connect(&hub, Id::new(), 8).await;

        hub.broadcast_to_user(&user, Event::Typing, &json!({"x": 1}))
            .await;

        assert_eq!(decode(rx_a.recv().await.unwrap())["type"], "typing");
        assert_eq!(decode(rx_b.recv().await.unwrap())["data"]["x"], 1);
        assert!(rx_other.try_recv().is_err());
        assert_eq!(hub.connected_users().await.len(), 2);
    }

    #[tokio::test]
    async fn broadcast_to_absent_user_is_silent() {
        let hub = ConnectionHub::new();
        let (_id, mut rx) = connect(&hub, Id::new(), 8).await;
        hub.broadcast_to_user(&Id::new(), Event::Message, &json!({}))
            .await;
        assert!(rx.try_recv().is_err());
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn broadcast_all_reaches_everyone() {
        let hub = ConnectionHub::new();
        let (_a, mut rx_a) = connect(&hub, Id::new(), 8).await;
        let (_b, mut rx_b) = connect(&hub, Id::new(), 8).await;
        hub.broadcast_all(Event::ChatRead, &json!({"chat_id": "c"}))
            .await;
        assert_eq!(decode(rx_a.recv().await.unwrap())["type"], "chat_read");
        assert_eq!(decode(rx_b.recv().await.unwrap())["type"], "chat_read");
    }

    #[tokio::test]
    async fn full_queue_drops_the_connection() {
        let hub = ConnectionHub::new();
        let user = Id::new();
        let (_slow, mut slow_rx) = connect(&hub, user, 1).await;
        let (_fast, mut fast_rx) = connect(&hub, Id::new(), 8).await;

        hub.broadcast_all(Event::Message, &json!({"n": 1})).await;
        hub.broadcast_all(Event::Message, &json!({"n": 2})).await;

        assert_eq!(hub.connection_count(), 1);
        assert!(!hub.is_user_connected(&user).await);
        // The queued frame is still readable, then the closed channel ends the pump.
        assert_eq!(decode(slow_rx.recv().await.unwrap())["data"]["n"], 1);
        assert!(slow_rx.recv().await.is_none());
        assert_eq!(decode(fast_rx.recv().await.unwrap())["data"]["n"], 1);
        assert_eq!(decode(fast_rx.recv().await.unwrap())["data"]["n"], 2);
    }

    #[tokio::test]
    async fn send_to_connection_targets_one_socket() {
        let hub = ConnectionHub::new();
        let user = Id::new();
        let (a, mut rx_a) = connect(&hub, user, 8).await;
        let (_b, mut rx_b) = connect(&hub, user, 8).await;
        assert!(hub.send_to_connection(&a, Event::Pong, &json!({"timestamp": 1})).await);
        assert_eq!(decode(rx_a.recv().await.unwrap())["type"], "pong");
        assert!(rx_b.try_recv().is_err());
        assert!(!hub.send_to_connection(&Id::new(), Event::Pong, &json!({})).await);
    }

    #[tokio::test]
    async fn broadcast_to_users_filters_by_membership() {
        let hub = ConnectionHub::new();
        let (alice, bob, carol) = (Id::new(), Id::new(), Id::new());
        let (_a, mut rx_a) = connect(&hub, alice, 8).await;
        let (_b, mut rx_b) = connect(&hub, bob, 8).await;
        let (_c, mut rx_c) = connect(&hub, carol, 8).await;

        hub.broadcast_to_users(&[alice, bob], Event::MessageDelete, &json!({}))
            .await;
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
        assert!(rx_c.try_recv().is_err());
    }
}
