// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-bot ordered update log with long-poll reads.
//!
//! Each bot owns an independent sequence starting at 1. Reads never remove
//! entries; the oldest entries fall off once the retention cap is exceeded.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tokio::time::{Instant, sleep};
use tracing::debug;

use telemock_config::model::BotsConfig;
use telemock_core::Id;

use crate::protocol::{Update, UpdateKind};

/// Largest and default page size for a poll.
pub const MAX_POLL_LIMIT: usize = 100;

#[derive(Default)]
struct BotLog {
    state: Mutex<LogState>,
    arrived: Notify,
}

#[derive(Default)]
struct LogState {
    /// Highest id ever assigned. Survives eviction and [`UpdateQueue::clear`].
    last_id: i64,
    updates: VecDeque<Update>,
}

/// Update logs for every bot, keyed by bot id.
pub struct UpdateQueue {
    logs: DashMap<Id, Arc<BotLog>>,
    retention: usize,
    poll_interval: Duration,
    max_timeout: Duration,
}

impl UpdateQueue {
    pub fn new(config: &BotsConfig) -> Self {
        Self {
            logs: DashMap::new(),
            retention: config.retention.max(1),
            poll_interval: config.poll_interval(),
            max_timeout: Duration::from_secs(config.max_poll_timeout_secs),
        }
    }

    fn log(&self, bot_id: &Id) -> Arc<BotLog> {
        // Clone out of the map so no shard guard is held across an await.
        self.logs.entry(*bot_id).or_default().value().clone()
    }

    /// Append an update for `bot_id`, assigning the next id.
    pub async fn enqueue(&self, bot_id: &Id, kind: UpdateKind) -> Update {
        let log = self.log(bot_id);
        let update = {
            let mut state = log.state.lock().await;
            state.last_id += 1;
            let update = Update {
                update_id: state.last_id,
                enqueued_at: Utc::now(),
                kind,
            };
            state.updates.push_back(update.clone());
            while state.updates.len() > self.retention {
                state.updates.pop_front();
            }
            update
        };
        log.arrived.notify_waiters();
        debug!(bot_id = %bot_id, update_id = update.update_id, "update enqueued");
        update
    }

    /// Updates with `update_id >= offset`, oldest first.
    ///
    /// `limit <= 0` means the default of 100. `timeout_secs` is clamped to
    /// the configured maximum. An empty result waits up to the timeout,
    /// re-checking on the poll interval or as soon as an update arrives.
    /// An offset beyond the last assigned id returns at once.
    pub async fn poll(
        &self,
        bot_id: &Id,
        offset: i64,
        limit: i64,
        timeout_secs: i64,
    ) -> Vec<Update> {
        let limit = clamp_limit(limit);
        let wait = Duration::from_secs(timeout_secs.max(0) as u64).min(self.max_timeout);
        let deadline = Instant::now() + wait;
        let log = self.log(bot_id);

        loop {
            let arrived = log.arrived.notified();
            {
                let state = log.state.lock().await;
                if state.last_id > 0 && offset > state.last_id {
                    debug!(bot_id = %bot_id, offset, last_id = state.last_id, "offset past last update");
                    return Vec::new();
                }
                let batch: Vec<Update> = state
                    .updates
                    .iter()
                    .filter(|u| u.update_id >= offset)
                    .take(limit)
                    .cloned()
                    .collect();
                if !batch.is_empty() {
                    return batch;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Vec::new();
            }
            let nap = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = arrived => {}
                _ = sleep(nap) => {}
            }
        }
    }

    /// Drop every queued update for `bot_id`. Ids keep counting upward.
    pub async fn clear(&self, bot_id: &Id) {
        let Some(log) = self.logs.get(bot_id).map(|l| l.value().clone()) else {
            return;
        };
        let dropped = {
            let mut state = log.state.lock().await;
            let n = state.updates.len();
            state.updates.clear();
            n
        };
        debug!(bot_id = %bot_id, dropped, "update queue cleared");
    }

    /// Forget the bot entirely, including its id sequence.
    pub fn remove(&self, bot_id: &Id) {
        self.logs.remove(bot_id);
    }

    /// Number of updates currently retained for `bot_id`.
    pub async fn pending(&self, bot_id: &Id) -> usize {
        match self.logs.get(bot_id).map(|l| l.value().clone()) {
            Some(log) => log.state.lock().await.updates.len(),
            None => 0,
        }
    }
}

fn clamp_limit(limit: i64) -> usize {
    if limit <= 0 {
        MAX_POLL_LIMIT
    } else {
        (limit as usize).min(MAX_POLL_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{WireChat, WireMessage};
    use proptest::prelude::*;

    fn config(retention: usize) -> BotsConfig {
        BotsConfig {
            retention,
            ..BotsConfig::default()
        }
    }

    fn text(n: usize) -> UpdateKind {
        UpdateKind::Message(WireMessage {
            message_id: n as i64,
            from: None,
            chat: WireChat {
                id: 1,
                kind: "group".into(),
                title: None,
                username: None,
            },
            date: 0,
            text: format!("m{n}"),
            entities: Vec::new(),
            reply_markup: None,
            edit_date: None,
        })
    }

    fn ids(updates: &[Update]) -> Vec<i64> {
        updates.iter().map(|u| u.update_id).collect()
    }

    #[tokio::test]
    async fn ids_start_at_one_per_bot() {
        let queue = UpdateQueue::new(&config(1000));
        let (a, b) = (Id::new(), Id::new());
        for n in 0..3 {
            queue.enqueue(&a, text(n)).await;
        }
        queue.enqueue(&b, text(9)).await;

        assert_eq!(ids(&queue.poll(&a, 0, 100, 0).await), vec![1, 2, 3]);
        assert_eq!(ids(&queue.poll(&b, 0, 100, 0).await), vec![1]);
    }

    #[tokio::test]
    async fn offset_is_inclusive_and_limit_truncates() {
        let queue = UpdateQueue::new(&config(1000));
        let bot = Id::new();
        for n in 0..5 {
            queue.enqueue(&bot, text(n)).await;
        }
        assert_eq!(ids(&queue.poll(&bot, 3, 100, 0).await), vec![3, 4, 5]);
        assert_eq!(ids(&queue.poll(&bot, 2, 1, 0).await), vec![2]);
        assert_eq!(ids(&queue.poll(&bot, 3, 100, 0).await), vec![3, 4, 5]);
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(clamp_limit(0), 100);
        assert_eq!(clamp_limit(-5), 100);
        assert_eq!(clamp_limit(1), 1);
        assert_eq!(clamp_limit(500), 100);
    }

    #[tokio::test]
    async fn retention_keeps_the_newest() {
        let queue = UpdateQueue::new(&config(1000));
        let bot = Id::new();
        for n in 0..1005 {
            queue.enqueue(&bot, text(n)).await;
        }
        assert_eq!(queue.pending(&bot).await, 1000);
        let first = queue.poll(&bot, 0, 1, 0).await;
        assert_eq!(first[0].update_id, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn offset_past_the_end_returns_immediately() {
        let queue = UpdateQueue::new(&config(1000));
        let bot = Id::new();
        queue.enqueue(&bot, text(0)).await;

        let started = Instant::now();
        let got = queue.poll(&bot, 5, 100, 30).await;
        assert!(got.is_empty());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_poll_waits_for_the_timeout() {
        let queue = UpdateQueue::new(&config(1000));
        let started = Instant::now();
        let got = queue.poll(&Id::new(), 0, 100, 3).await;
        assert!(got.is_empty());
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_capped() {
        let queue = UpdateQueue::new(&config(1000));
        let started = Instant::now();
        queue.poll(&Id::new(), 0, 100, 3600).await;
        assert_eq!(started.elapsed(), Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn long_poll_wakes_on_enqueue() {
        let queue = Arc::new(UpdateQueue::new(&config(1000)));
        let bot = Id::new();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.poll(&bot, 0, 100, 50).await })
        };
        sleep(Duration::from_millis(2500)).await;
        queue.enqueue(&bot, text(0)).await;

        let got = waiter.await.unwrap();
        assert_eq!(ids(&got), vec![1]);
    }

    #[tokio::test]
    async fn clear_keeps_the_sequence() {
        let queue = UpdateQueue::new(&config(1000));
        let bot = Id::new();
        queue.enqueue(&bot, text(0)).await;
        queue.enqueue(&bot, text(1)).await;
        queue.clear(&bot).await;
        assert_eq!(queue.pending(&bot).await, 0);

        let next = queue.enqueue(&bot, text(2)).await;
        assert_eq!(next.update_id, 3);
    }

    #[tokio::test]
    async fn remove_restarts_the_sequence() {
        let queue = UpdateQueue::new(&config(1000));
        let bot = Id::new();
        queue.enqueue(&bot, text(0)).await;
        queue.remove(&bot);
        assert_eq!(queue.enqueue(&bot, text(1)).await.update_id, 1);
    }

    proptest! {
        #[test]
        fn advancing_offset_never_redelivers_or_skips(count in 1usize..60, k in 1i64..60) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
            rt.block_on(async {
                let queue = UpdateQueue::new(&config(1000));
                let bot = Id::new();
                for n in 0..count {
                    queue.enqueue(&bot, text(n)).await;
                }
                let max = count as i64;
                let head = queue.poll(&bot, k, 1, 0).await;
                let rest = queue.poll(&bot, k + 1, 100, 0).await;
                if k <= max {
                    prop_assert_eq!(ids(&head), vec![k]);
                    let expected: Vec<i64> = ((k + 1)..=max).collect();
                    prop_assert_eq!(ids(&rest), expected);
                } else {
                    prop_assert!(head.is_empty());
                    prop_assert!(rest.is_empty());
                }
                Ok(())
            })?;
        }
    }
}
