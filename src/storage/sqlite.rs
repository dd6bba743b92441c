//! SQLite Game Storage
//!
//! Information Hiding:
//! - Schema, row mapping and timestamp encoding stay private
//! - Each commit is one transaction; blocking calls run on the blocking pool
//! - The unique `(session_id, question_number, role)` key backs the
//!   duplicate-turn check at the database level

use super::{check_batch_keys, GameStore, StoreError, StoreResult};
use crate::game::types::{GameSession, GameStatus, Message};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS sessions (
    id              TEXT PRIMARY KEY,
    category        TEXT NOT NULL,
    mode            TEXT NOT NULL,
    secret_item     TEXT,
    status          TEXT NOT NULL,
    questions_asked INTEGER NOT NULL,
    hints_used      INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    id              TEXT NOT NULL UNIQUE,
    session_id      TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    role            TEXT NOT NULL,
    content         TEXT NOT NULL,
    message_type    TEXT NOT NULL,
    question_number INTEGER NOT NULL,
    created_at      TEXT NOT NULL,
    UNIQUE (session_id, question_number, role)
);
CREATE INDEX IF NOT EXISTS idx_sessions_finished ON sessions(status, updated_at);
";

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.into())
    }
}

/// SQLite-backed store. Cloning shares the connection
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        tracing::info!("[SqliteStore] Opened database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.execute_batch(SCHEMA).context("Failed to initialise schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StoreError::Backend(anyhow!("database mutex poisoned")))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Backend(anyhow!("blocking task failed: {}", e)))?
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    // Fixed width so that text comparison orders correctly.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("bad timestamp '{}'", raw))?
        .with_timezone(&Utc))
}

fn parse_text<T: std::str::FromStr<Err = String>>(raw: String) -> anyhow::Result<T> {
    raw.parse::<T>().map_err(|e| anyhow!(e))
}

struct SessionRow {
    id: String,
    category: String,
    mode: String,
    secret_item: Option<String>,
    status: String,
    questions_asked: u32,
    hints_used: u32,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            mode: row.get(2)?,
            secret_item: row.get(3)?,
            status: row.get(4)?,
            questions_asked: row.get(5)?,
            hints_used: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_session(self) -> anyhow::Result<GameSession> {
        Ok(GameSession {
            id: self.id,
            category: self.category,
            mode: parse_text(self.mode)?,
            secret_item: self.secret_item,
            status: parse_text(self.status)?,
            questions_asked: self.questions_asked,
            hints_used: self.hints_used,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    message_type: String,
    question_number: u32,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            session_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            message_type: row.get(4)?,
            question_number: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_message(self) -> anyhow::Result<Message> {
        Ok(Message {
            id: self.id,
            session_id: self.session_id,
            role: parse_text(self.role)?,
            content: self.content,
            message_type: parse_text(self.message_type)?,
            question_number: self.question_number,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

fn write_session(conn: &Connection, session: &GameSession) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO sessions (id, category, mode, secret_item, status, questions_asked,
                               hints_used, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
             status = excluded.status,
             questions_asked = excluded.questions_asked,
             hints_used = excluded.hints_used,
             updated_at = excluded.updated_at",
        params![
            session.id,
            session.category,
            session.mode.as_str(),
            session.secret_item,
            session.status.as_str(),
            session.questions_asked,
            session.hints_used,
            timestamp(&session.created_at),
            timestamp(&session.updated_at),
        ],
    )
}

fn insert_messages(conn: &Connection, session_id: &str, messages: &[Message]) -> StoreResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO messages (id, session_id, role, content, message_type, question_number, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for m in messages {
        let result = stmt.execute(params![
            m.id,
            session_id,
            m.role.as_str(),
            m.content,
            m.message_type.as_str(),
            m.question_number,
            timestamp(&m.created_at),
        ]);
        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                return Err(StoreError::Duplicate {
                    session_id: session_id.to_string(),
                    question_number: m.question_number,
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[async_trait]
impl GameStore for SqliteStore {
    async fn create_session(&self, session: &GameSession, messages: &[Message]) -> StoreResult<()> {
        check_batch_keys(&session.id, messages)?;
        let session = session.clone();
        let messages = messages.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let exists: Option<String> = tx
                .query_row("SELECT id FROM sessions WHERE id = ?1", params![session.id], |r| r.get(0))
                .optional()?;
            if exists.is_some() {
                return Err(anyhow!("session {} already exists", session.id).into());
            }
            write_session(&tx, &session)?;
            insert_messages(&tx, &session.id, &messages)?;
            tx.commit()?;
            tracing::debug!("[SqliteStore] Created session '{}'", session.id);
            Ok(())
        })
        .await
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<GameSession>> {
        let id = session_id.to_string();
        self.run(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, category, mode, secret_item, status, questions_asked, hints_used,
                            created_at, updated_at
                     FROM sessions WHERE id = ?1",
                    params![id],
                    SessionRow::from_row,
                )
                .optional()?;
            Ok(row.map(SessionRow::into_session).transpose()?)
        })
        .await
    }

    async fn get_messages(&self, session_id: &str) -> StoreResult<Vec<Message>> {
        let id = session_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, session_id, role, content, message_type, question_number, created_at
                 FROM messages WHERE session_id = ?1 ORDER BY seq",
            )?;
            let rows = stmt
                .query_map(params![id], MessageRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let messages = rows
                .into_iter()
                .map(MessageRow::into_message)
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(messages)
        })
        .await
    }

    async fn commit_turn(
        &self,
        session: &GameSession,
        expected_questions_asked: u32,
        messages: &[Message],
    ) -> StoreResult<()> {
        check_batch_keys(&session.id, messages)?;
        let session = session.clone();
        let messages = messages.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let row: Option<(u32, String)> = tx
                .query_row(
                    "SELECT questions_asked, status FROM sessions WHERE id = ?1",
                    params![session.id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            let (found, status) = row.ok_or_else(|| StoreError::NotFound(session.id.clone()))?;
            if status != GameStatus::Active.as_str() {
                return Err(StoreError::Finished {
                    session_id: session.id.clone(),
                    status,
                });
            }
            if found != expected_questions_asked {
                return Err(StoreError::Conflict {
                    session_id: session.id.clone(),
                    expected: expected_questions_asked,
                    found,
                });
            }

            insert_messages(&tx, &session.id, &messages)?;
            write_session(&tx, &session)?;
            tx.commit()?;
            tracing::debug!(
                "[SqliteStore] Committed {} messages for session '{}'",
                messages.len(),
                session.id
            );
            Ok(())
        })
        .await
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        let id = session_id.to_string();
        self.run(move |conn| {
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    async fn purge_finished(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let cutoff = timestamp(&cutoff);
        self.run(move |conn| {
            let purged = conn.execute(
                "DELETE FROM sessions WHERE status != 'active' AND updated_at < ?1",
                params![cutoff],
            )?;
            Ok(purged)
        })
        .await
    }
}
