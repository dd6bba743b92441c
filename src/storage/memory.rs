//! In-Memory Game Storage
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - A single write lock per commit makes message append + counter update atomic
//! - Suitable for testing and ephemeral sessions

use super::{check_batch_keys, GameStore, StoreError, StoreResult};
use crate::game::types::{GameSession, Message};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct SessionRecord {
    session: GameSession,
    messages: Vec<Message>,
}

/// In-memory storage using HashMap
/// Data is lost when process terminates
#[derive(Clone)]
pub struct InMemoryStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameStore for InMemoryStore {
    async fn create_session(&self, session: &GameSession, messages: &[Message]) -> StoreResult<()> {
        check_batch_keys(&session.id, messages)?;
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(anyhow::anyhow!("session {} already exists", session.id).into());
        }
        sessions.insert(
            session.id.clone(),
            SessionRecord {
                session: session.clone(),
                messages: messages.to_vec(),
            },
        );
        tracing::debug!(
            "[InMemoryStore] Created session '{}' with {} messages",
            session.id,
            messages.len()
        );
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> StoreResult<Option<GameSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).map(|r| r.session.clone()))
    }

    async fn get_messages(&self, session_id: &str) -> StoreResult<Vec<Message>> {
        let sessions = self.sessions.read().await;
        let messages = sessions
            .get(session_id)
            .map(|r| r.messages.clone())
            .unwrap_or_default();
        tracing::debug!(
            "[InMemoryStore] Loaded {} messages for session '{}'",
            messages.len(),
            session_id
        );
        Ok(messages)
    }

    async fn commit_turn(
        &self,
        session: &GameSession,
        expected_questions_asked: u32,
        messages: &[Message],
    ) -> StoreResult<()> {
        check_batch_keys(&session.id, messages)?;
        let mut sessions = self.sessions.write().await;
        let record = sessions
            .get_mut(&session.id)
            .ok_or_else(|| StoreError::NotFound(session.id.clone()))?;

        if !record.session.is_active() {
            return Err(StoreError::Finished {
                session_id: session.id.clone(),
                status: record.session.status.to_string(),
            });
        }
        if record.session.questions_asked != expected_questions_asked {
            return Err(StoreError::Conflict {
                session_id: session.id.clone(),
                expected: expected_questions_asked,
                found: record.session.questions_asked,
            });
        }
        if let Some(dup) = messages.iter().find(|m| {
            record
                .messages
                .iter()
                .any(|o| o.question_number == m.question_number && o.role == m.role)
        }) {
            return Err(StoreError::Duplicate {
                session_id: session.id.clone(),
                question_number: dup.question_number,
            });
        }

        record.messages.extend_from_slice(messages);
        record.session = session.clone();
        tracing::debug!(
            "[InMemoryStore] Committed {} messages for session '{}' (questions_asked={})",
            messages.len(),
            session.id,
            session.questions_asked
        );
        Ok(())
    }

    async fn delete_session(&self, session_id: &str) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        tracing::debug!("[InMemoryStore] Deleted session '{}'", session_id);
        Ok(())
    }

    async fn purge_finished(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, r| r.session.is_active() || r.session.updated_at >= cutoff);
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{GameMode, GameStatus, MessageType, Role};

    fn new_session() -> (GameSession, Vec<Message>) {
        let session = GameSession::new("Animals", GameMode::Guess, Some("Cat".into()));
        let prime = Message::new(&session.id, Role::System, MessageType::Question, 0, "prime");
        (session, vec![prime])
    }

    fn turn(session: &GameSession, n: u32) -> Vec<Message> {
        vec![
            Message::new(&session.id, Role::User, MessageType::Question, n, "Is it a mammal?"),
            Message::new(&session.id, Role::Assistant, MessageType::Answer, n, "Yes"),
        ]
    }

    #[tokio::test]
    async fn test_create_and_load() {
        let store = InMemoryStore::new();
        let (session, prime) = new_session();
        store.create_session(&session, &prime).await.unwrap();

        let loaded = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded, session);
        assert_eq!(store.get_messages(&session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_nonexistent_session() {
        let store = InMemoryStore::new();
        assert!(store.get_session("nope").await.unwrap().is_none());
        assert!(store.get_messages("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_turn_appends_and_updates() {
        let store = InMemoryStore::new();
        let (mut session, prime) = new_session();
        store.create_session(&session, &prime).await.unwrap();

        let msgs = turn(&session, 1);
        session.questions_asked = 1;
        store.commit_turn(&session, 0, &msgs).await.unwrap();

        assert_eq!(store.get_messages(&session.id).await.unwrap().len(), 3);
        assert_eq!(
            store.get_session(&session.id).await.unwrap().unwrap().questions_asked,
            1
        );
    }

    #[tokio::test]
    async fn test_stale_commit_conflicts_without_writing() {
        let store = InMemoryStore::new();
        let (mut session, prime) = new_session();
        store.create_session(&session, &prime).await.unwrap();

        session.questions_asked = 1;
        store.commit_turn(&session, 0, &turn(&session, 1)).await.unwrap();

        // A second writer that loaded before the first commit.
        let err = store.commit_turn(&session, 0, &turn(&session, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 0, found: 1, .. }));
        assert_eq!(store.get_messages(&session.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_question_number_rejected() {
        let store = InMemoryStore::new();
        let (mut session, prime) = new_session();
        store.create_session(&session, &prime).await.unwrap();
        session.questions_asked = 1;
        store.commit_turn(&session, 0, &turn(&session, 1)).await.unwrap();

        session.questions_asked = 2;
        let err = store.commit_turn(&session, 1, &turn(&session, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { question_number: 1, .. }));
    }

    #[tokio::test]
    async fn test_finished_session_rejects_late_turn() {
        let store = InMemoryStore::new();
        let (session, prime) = new_session();
        store.create_session(&session, &prime).await.unwrap();

        let mut quit = session.clone();
        quit.status = GameStatus::Lost;
        store.commit_turn(&quit, 0, &[]).await.unwrap();

        // A turn prepared against the still-active row.
        let mut late = session.clone();
        late.questions_asked = 1;
        let err = store.commit_turn(&late, 0, &turn(&late, 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Finished { ref status, .. } if status == "lost"));

        let stored = store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GameStatus::Lost);
        assert_eq!(stored.questions_asked, 0);
        assert_eq!(store.get_messages(&session.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_drops_session_and_log() {
        let store = InMemoryStore::new();
        let (session, prime) = new_session();
        store.create_session(&session, &prime).await.unwrap();

        store.delete_session(&session.id).await.unwrap();
        assert!(store.get_session(&session.id).await.unwrap().is_none());
        assert!(store.get_messages(&session.id).await.unwrap().is_empty());
        // Deleting twice is harmless.
        store.delete_session(&session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_purge_finished_keeps_active() {
        let store = InMemoryStore::new();
        let (active, prime) = new_session();
        store.create_session(&active, &prime).await.unwrap();

        let (mut done, prime) = new_session();
        store.create_session(&done, &prime).await.unwrap();
        done.status = GameStatus::Lost;
        store.commit_turn(&done, 0, &[]).await.unwrap();

        let purged = store.purge_finished(Utc::now() + chrono::Duration::minutes(1)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.get_session(&active.id).await.unwrap().is_some());
        assert!(store.get_session(&done.id).await.unwrap().is_none());
    }
}
