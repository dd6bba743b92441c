//! Game Storage Abstraction
//!
//! Information Hiding:
//! - Storage backend implementation details hidden behind trait
//! - Allows swapping between memory and SQLite without touching the orchestrator
//! - Each backend guarantees that a turn's messages and counters land together

use crate::game::types::{GameSession, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("session {0} does not exist")]
    NotFound(String),

    /// The optimistic counter check failed: another turn committed first.
    #[error("session {session_id} expected questions_asked={expected}, found {found}")]
    Conflict {
        session_id: String,
        expected: u32,
        found: u32,
    },

    /// A message with the same (session, question number, role) already exists.
    #[error("duplicate message for session {session_id} question {question_number}")]
    Duplicate {
        session_id: String,
        question_number: u32,
    },

    /// The stored session already ended; its row is frozen.
    #[error("session {session_id} is already {status}")]
    Finished { session_id: String, status: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Trait defining the game persistence interface
/// Implementations can use different backends (memory, database)
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Insert a new session together with its opening messages
    async fn create_session(&self, session: &GameSession, messages: &[Message]) -> StoreResult<()>;

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<GameSession>>;

    /// Messages in insertion order. Empty when the session doesn't exist
    async fn get_messages(&self, session_id: &str) -> StoreResult<Vec<Message>>;

    /// Append `messages` and overwrite the session row in one atomic step.
    ///
    /// Fails with `Finished` if the stored session is no longer active,
    /// with `Conflict` unless the stored `questions_asked` still equals
    /// `expected_questions_asked`, and with `Duplicate` if any message repeats
    /// a `(session_id, question_number, role)` key. Nothing is written on
    /// failure.
    async fn commit_turn(
        &self,
        session: &GameSession,
        expected_questions_asked: u32,
        messages: &[Message],
    ) -> StoreResult<()>;

    async fn delete_session(&self, session_id: &str) -> StoreResult<()>;

    /// Remove finished sessions last updated before `cutoff`. Returns the count
    async fn purge_finished(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;
}

/// Reject batches that repeat a key within themselves.
fn check_batch_keys(session_id: &str, messages: &[Message]) -> StoreResult<()> {
    for (i, m) in messages.iter().enumerate() {
        if messages[..i]
            .iter()
            .any(|o| o.question_number == m.question_number && o.role == m.role)
        {
            return Err(StoreError::Duplicate {
                session_id: session_id.to_string(),
                question_number: m.question_number,
            });
        }
    }
    Ok(())
}
