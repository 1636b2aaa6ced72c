// SPDX-FileCopyrightText: 2026 Telemock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`Store`].
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! also serializes writes. Timestamps are stored as RFC 3339 text with
//! microsecond precision so lexical order matches time order. Reply markup
//! and entities are stored as JSON text.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, info};

use telemock_core::{
    Bot, Chat, Id, Message, MessageEntity, MessageStatus, Store, TelemockError, User,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT,
    is_bot INTEGER NOT NULL DEFAULT 0,
    is_online INTEGER NOT NULL DEFAULT 0,
    last_seen TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY NOT NULL,
    kind TEXT NOT NULL,
    title TEXT,
    username TEXT,
    description TEXT,
    unread_count INTEGER NOT NULL DEFAULT 0,
    last_read_at TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS chat_members (
    chat_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    joined_at TEXT NOT NULL,
    PRIMARY KEY (chat_id, user_id)
);
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY NOT NULL,
    chat_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    from_id TEXT NOT NULL,
    text TEXT NOT NULL,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    is_outgoing INTEGER NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL,
    created_at TEXT NOT NULL,
    edited_at TEXT,
    reply_markup TEXT,
    entities TEXT
);
CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, created_at);
CREATE TABLE IF NOT EXISTS bots (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    username TEXT NOT NULL UNIQUE,
    token TEXT NOT NULL UNIQUE,
    webhook_url TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_update_offset INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

const USER_COLS: &str = "id, username, first_name, last_name, is_bot, is_online, last_seen, \
                         created_at";
const CHAT_COLS: &str = "id, kind, title, username, description, unread_count, last_read_at, \
                         created_at";
const MESSAGE_COLS: &str = "id, chat_id, from_id, text, kind, status, is_outgoing, timestamp, \
                            created_at, edited_at, reply_markup, entities";
const BOT_COLS: &str = "id, name, username, token, webhook_url, is_active, last_update_offset, \
                        created_at, updated_at";

fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TelemockError {
    TelemockError::Storage {
        source: Box::new(e),
    }
}

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn opt_time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parsed(row, 0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        is_bot: row.get(4)?,
        is_online: row.get(5)?,
        last_seen: opt_time_col(row, 6)?,
        created_at: time_col(row, 7)?,
    })
}

fn row_to_chat(row: &Row<'_>) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: parsed(row, 0)?,
        kind: parsed(row, 1)?,
        title: row.get(2)?,
        username: row.get(3)?,
        description: row.get(4)?,
        unread_count: row.get(5)?,
        last_read_at: opt_time_col(row, 6)?,
        created_at: time_col(row, 7)?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let markup: Option<String> = row.get(10)?;
    let reply_markup = markup
        .map(|s| serde_json::from_str(&s).map_err(|e| conversion_err(10, e)))
        .transpose()?;
    let entities: Option<String> = row.get(11)?;
    let entities: Vec<MessageEntity> = match entities {
        Some(s) => serde_json::from_str(&s).map_err(|e| conversion_err(11, e))?,
        None => Vec::new(),
    };
    Ok(Message {
        id: parsed(row, 0)?,
        chat_id: parsed(row, 1)?,
        from_id: parsed(row, 2)?,
        text: row.get(3)?,
        kind: parsed(row, 4)?,
        status: parsed(row, 5)?,
        is_outgoing: row.get(6)?,
        timestamp: time_col(row, 7)?,
        created_at: time_col(row, 8)?,
        edited_at: opt_time_col(row, 9)?,
        reply_markup,
        entities,
    })
}

fn row_to_bot(row: &Row<'_>) -> rusqlite::Result<Bot> {
    Ok(Bot {
        id: parsed(row, 0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        token: row.get(3)?,
        webhook_url: row.get(4)?,
        is_active: row.get(5)?,
        last_update_offset: row.get(6)?,
        created_at: time_col(row, 7)?,
        updated_at: time_col(row, 8)?,
    })
}

fn entities_json(entities: &[MessageEntity]) -> Result<Option<String>, TelemockError> {
    if entities.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(entities)
        .map(Some)
        .map_err(TelemockError::storage)
}

fn markup_json(markup: &Option<serde_json::Value>) -> Result<Option<String>, TelemockError> {
    markup
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(TelemockError::storage)
}

/// SQLite-backed [`Store`].
pub struct SqliteStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
    /// Open (or create) the database file, creating its parent directory.
    pub async fn open(path: &str) -> Result<Self, TelemockError> {
        let parent = Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent).map_err(TelemockError::storage)?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| TelemockError::Storage {
                source: Box::new(e),
            })?;
        let store = Self::init(conn).await?;
        info!(path, "SQLite store opened");
        Ok(store)
    }

    /// Private in-memory database, mostly for tests.
    pub async fn open_in_memory() -> Result<Self, TelemockError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| TelemockError::Storage {
                source: Box::new(e),
            })?;
        Self::init(conn).await
    }

    async fn init(conn: tokio_rusqlite::Connection) -> Result<Self, TelemockError> {
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;",
            )?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        debug!("schema ready");
        Ok(Self { conn })
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), TelemockError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    // --- Users ---

    async fn create_user(&self, user: &User) -> Result<(), TelemockError> {
        let user = user.clone();
        let username = user.username.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    &format!(
                        "INSERT OR IGNORE INTO users ({USER_COLS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                    ),
                    params![
                        user.id.to_string(),
                        user.username,
                        user.first_name,
                        user.last_name,
                        user.is_bot,
                        user.is_online,
                        user.last_seen.as_ref().map(ts),
                        ts(&user.created_at),
                    ],
                )?;
                Ok(n == 1)
            })
            .await
            .map_err(map_tr_err)?;
        if !inserted {
            return Err(TelemockError::invalid(format!(
                "username `{username}` is already taken"
            )));
        }
        Ok(())
    }

    async fn get_user(&self, id: &Id) -> Result<Option<User>, TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        &format!("SELECT {USER_COLS} FROM users WHERE id = ?1"),
                        params![id],
                        row_to_user,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, TelemockError> {
        let username = username.to_string();
        self.conn
            .call(move |conn| {
                let user = conn
                    .query_row(
                        &format!("SELECT {USER_COLS} FROM users WHERE username = ?1"),
                        params![username],
                        row_to_user,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_users(&self) -> Result<Vec<User>, TelemockError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("SELECT {USER_COLS} FROM users ORDER BY id"))?;
                let users = stmt
                    .query_map([], row_to_user)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn update_user(&self, user: &User) -> Result<(), TelemockError> {
        let user = user.clone();
        let id = user.id;
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE users SET first_name = ?2, last_name = ?3, is_online = ?4, last_seen = ?5
                     WHERE id = ?1",
                    params![
                        user.id.to_string(),
                        user.first_name,
                        user.last_name,
                        user.is_online,
                        user.last_seen.as_ref().map(ts),
                    ],
                )?;
                Ok(n)
            })
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(TelemockError::not_found("user", id));
        }
        Ok(())
    }

    async fn delete_user(&self, id: &Id) -> Result<(), TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    // --- Chats ---

    async fn create_chat(&self, chat: &Chat) -> Result<(), TelemockError> {
        let chat = chat.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT INTO chats ({CHAT_COLS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                    ),
                    params![
                        chat.id.to_string(),
                        chat.kind.to_string(),
                        chat.title,
                        chat.username,
                        chat.description,
                        chat.unread_count,
                        chat.last_read_at.as_ref().map(ts),
                        ts(&chat.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_chat(&self, id: &Id) -> Result<Option<Chat>, TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let chat = conn
                    .query_row(
                        &format!("SELECT {CHAT_COLS} FROM chats WHERE id = ?1"),
                        params![id],
                        row_to_chat,
                    )
                    .optional()?;
                Ok(chat)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_chats(&self) -> Result<Vec<Chat>, TelemockError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("SELECT {CHAT_COLS} FROM chats ORDER BY id"))?;
                let chats = stmt
                    .query_map([], row_to_chat)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(chats)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn chats_for_user(&self, user_id: &Id) -> Result<Vec<Chat>, TelemockError> {
        let user_id = user_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CHAT_COLS} FROM chats
                     WHERE id IN (SELECT chat_id FROM chat_members WHERE user_id = ?1)
                     ORDER BY id"
                ))?;
                let chats = stmt
                    .query_map(params![user_id], row_to_chat)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(chats)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn update_chat(&self, chat: &Chat) -> Result<(), TelemockError> {
        let chat = chat.clone();
        let id = chat.id;
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE chats SET title = ?2, username = ?3, description = ?4 WHERE id = ?1",
                    params![chat.id.to_string(), chat.title, chat.username, chat.description],
                )?;
                Ok(n)
            })
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(TelemockError::not_found("chat", id));
        }
        Ok(())
    }

    async fn delete_chat(&self, id: &Id) -> Result<(), TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM chats WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn add_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        let (chat, user) = (*chat_id, *user_id);
        let inserted = self
            .conn
            .call(move |conn| {
                let chat_exists = conn
                    .query_row(
                        "SELECT 1 FROM chats WHERE id = ?1",
                        params![chat.to_string()],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                let user_exists = conn
                    .query_row(
                        "SELECT 1 FROM users WHERE id = ?1",
                        params![user.to_string()],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                if !chat_exists || !user_exists {
                    return Ok((chat_exists, user_exists));
                }
                conn.execute(
                    "INSERT OR IGNORE INTO chat_members (chat_id, user_id, joined_at)
                     VALUES (?1, ?2, ?3)",
                    params![chat.to_string(), user.to_string(), ts(&Utc::now())],
                )?;
                Ok((true, true))
            })
            .await
            .map_err(map_tr_err)?;
        match inserted {
            (false, _) => Err(TelemockError::not_found("chat", chat)),
            (_, false) => Err(TelemockError::not_found("user", user)),
            _ => Ok(()),
        }
    }

    async fn remove_member(&self, chat_id: &Id, user_id: &Id) -> Result<(), TelemockError> {
        let (chat, user) = (chat_id.to_string(), user_id.to_string());
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM chat_members WHERE chat_id = ?1 AND user_id = ?2",
                    params![chat, user],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn chat_members(&self, chat_id: &Id) -> Result<Vec<User>, TelemockError> {
        let chat = chat_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT u.id, u.username, u.first_name, u.last_name, u.is_bot, u.is_online,
                            u.last_seen, u.created_at
                     FROM users u JOIN chat_members m ON u.id = m.user_id
                     WHERE m.chat_id = ?1 ORDER BY m.joined_at, u.id",
                )?;
                let users = stmt
                    .query_map(params![chat], row_to_user)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn set_unread_count(&self, chat_id: &Id, count: i64) -> Result<(), TelemockError> {
        let chat = chat_id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE chats SET unread_count = ?2 WHERE id = ?1",
                    params![chat, count],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    // --- Messages ---

    async fn create_message(&self, message: &Message) -> Result<(), TelemockError> {
        let markup = markup_json(&message.reply_markup)?;
        let entities = entities_json(&message.entities)?;
        let m = message.clone();
        let chat_id = m.chat_id;
        let inserted = self
            .conn
            .call(move |conn| {
                let chat_exists = conn
                    .query_row(
                        "SELECT 1 FROM chats WHERE id = ?1",
                        params![m.chat_id.to_string()],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                if !chat_exists {
                    return Ok(false);
                }
                conn.execute(
                    &format!(
                        "INSERT INTO messages ({MESSAGE_COLS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                    ),
                    params![
                        m.id.to_string(),
                        m.chat_id.to_string(),
                        m.from_id.to_string(),
                        m.text,
                        m.kind.to_string(),
                        m.status.to_string(),
                        m.is_outgoing,
                        ts(&m.timestamp),
                        ts(&m.created_at),
                        m.edited_at.as_ref().map(ts),
                        markup,
                        entities,
                    ],
                )?;
                Ok(true)
            })
            .await
            .map_err(map_tr_err)?;
        if inserted {
            Ok(())
        } else {
            Err(TelemockError::not_found("chat", chat_id))
        }
    }

    async fn get_message(&self, id: &Id) -> Result<Option<Message>, TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let message = conn
                    .query_row(
                        &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
                        params![id],
                        row_to_message,
                    )
                    .optional()?;
                Ok(message)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn update_message(&self, message: &Message) -> Result<(), TelemockError> {
        let markup = markup_json(&message.reply_markup)?;
        let entities = entities_json(&message.entities)?;
        let id = message.id;
        let text = message.text.clone();
        let edited_at = message.edited_at.as_ref().map(ts);
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE messages SET text = ?2, entities = ?3, reply_markup = ?4, edited_at = ?5
                     WHERE id = ?1",
                    params![id.to_string(), text, entities, markup, edited_at],
                )?;
                Ok(n)
            })
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(TelemockError::not_found("message", id));
        }
        Ok(())
    }

    async fn chat_messages(
        &self,
        chat_id: &Id,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Message>, TelemockError> {
        let chat = chat_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {MESSAGE_COLS} FROM messages WHERE chat_id = ?1
                     ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3"
                ))?;
                let messages = stmt
                    .query_map(params![chat, limit, offset], row_to_message)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(messages)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn search_messages(
        &self,
        chat_id: &Id,
        query: &str,
    ) -> Result<Vec<Message>, TelemockError> {
        let chat = chat_id.to_string();
        let query = query.to_string();
        self.conn
            .call(move |conn| {
                // instr() keeps the match literal and case-sensitive, unlike LIKE.
                let mut stmt = conn.prepare(&format!(
                    "SELECT {MESSAGE_COLS} FROM messages
                     WHERE chat_id = ?1 AND instr(text, ?2) > 0
                     ORDER BY created_at DESC, id DESC"
                ))?;
                let messages = stmt
                    .query_map(params![chat, query], row_to_message)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(messages)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn unread_count(&self, chat_id: &Id) -> Result<i64, TelemockError> {
        let chat = chat_id.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM messages m JOIN chats c ON c.id = m.chat_id
                     WHERE m.chat_id = ?1 AND m.status != 'read'
                       AND (c.last_read_at IS NULL OR m.created_at > c.last_read_at)",
                    params![chat],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn mark_chat_read(
        &self,
        chat_id: &Id,
        reader: &Id,
        at: DateTime<Utc>,
    ) -> Result<u64, TelemockError> {
        let (chat, reader) = (chat_id.to_string(), reader.to_string());
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let n = tx.execute(
                    "UPDATE messages SET status = 'read'
                     WHERE chat_id = ?1 AND from_id != ?2 AND status != 'read'",
                    params![chat, reader],
                )?;
                tx.execute(
                    "UPDATE chats SET last_read_at = ?2 WHERE id = ?1",
                    params![chat, ts(&at)],
                )?;
                tx.commit()?;
                Ok(n as u64)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn transition_message_status(
        &self,
        id: &Id,
        expected: MessageStatus,
        next: MessageStatus,
    ) -> Result<bool, TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE messages SET status = ?3 WHERE id = ?1 AND status = ?2",
                    params![id, expected.to_string(), next.to_string()],
                )?;
                Ok(n == 1)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn set_message_status(
        &self,
        id: &Id,
        status: MessageStatus,
    ) -> Result<bool, TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE messages SET status = ?2 WHERE id = ?1",
                    params![id, status.to_string()],
                )?;
                Ok(n == 1)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn delete_message(&self, id: &Id) -> Result<bool, TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let n = conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
                Ok(n == 1)
            })
            .await
            .map_err(map_tr_err)
    }

    // --- Bots ---

    async fn create_bot(&self, bot: &Bot) -> Result<(), TelemockError> {
        let bot = bot.clone();
        let username = bot.username.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    &format!(
                        "INSERT OR IGNORE INTO bots ({BOT_COLS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                    ),
                    params![
                        bot.id.to_string(),
                        bot.name,
                        bot.username,
                        bot.token,
                        bot.webhook_url,
                        bot.is_active,
                        bot.last_update_offset,
                        ts(&bot.created_at),
                        ts(&bot.updated_at),
                    ],
                )?;
                Ok(n == 1)
            })
            .await
            .map_err(map_tr_err)?;
        if !inserted {
            return Err(TelemockError::invalid(format!(
                "bot `{username}` or its token is already registered"
            )));
        }
        Ok(())
    }

    async fn get_bot(&self, id: &Id) -> Result<Option<Bot>, TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let bot = conn
                    .query_row(
                        &format!("SELECT {BOT_COLS} FROM bots WHERE id = ?1"),
                        params![id],
                        row_to_bot,
                    )
                    .optional()?;
                Ok(bot)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn get_bot_by_token(&self, token: &str) -> Result<Option<Bot>, TelemockError> {
        let token = token.to_string();
        self.conn
            .call(move |conn| {
                let bot = conn
                    .query_row(
                        &format!("SELECT {BOT_COLS} FROM bots WHERE token = ?1"),
                        params![token],
                        row_to_bot,
                    )
                    .optional()?;
                Ok(bot)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn list_bots(&self) -> Result<Vec<Bot>, TelemockError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("SELECT {BOT_COLS} FROM bots ORDER BY id"))?;
                let bots = stmt
                    .query_map([], row_to_bot)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(bots)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn update_bot(&self, bot: &Bot) -> Result<(), TelemockError> {
        let bot = bot.clone();
        let id = bot.id;
        let changed = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE bots SET name = ?2, username = ?3, token = ?4, webhook_url = ?5,
                     is_active = ?6, last_update_offset = ?7, updated_at = ?8 WHERE id = ?1",
                    params![
                        bot.id.to_string(),
                        bot.name,
                        bot.username,
                        bot.token,
                        bot.webhook_url,
                        bot.is_active,
                        bot.last_update_offset,
                        ts(&bot.updated_at),
                    ],
                )?;
                Ok(n)
            })
            .await
            .map_err(map_tr_err)?;
        if changed == 0 {
            return Err(TelemockError::not_found("bot", id));
        }
        Ok(())
    }

    async fn delete_bot(&self, id: &Id) -> Result<(), TelemockError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM bots WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
