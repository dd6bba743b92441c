//! Error taxonomy for the game engine.
//!
//! Information Hiding:
//! - Provider and storage failures are folded into a small set of kinds
//! - Callers match on the kind, never on backend-specific details

use crate::core::llm::LlmError;
use crate::storage::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    /// Missing or invalid provider credentials. Cached by the registry.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// LLM or search backend failure that survived the retry policy.
    #[error("Upstream error from {provider}: {message}")]
    Upstream { provider: String, message: String },

    /// Malformed request, inactive session or exhausted budget.
    #[error("{0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Another turn for the same session committed first.
    #[error("Concurrent update on session {0}, please retry")]
    Conflict(String),

    #[error("Turn exceeded its time budget of {0}s")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GameError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Whether the failure leaves the session replayable as-is.
    pub fn is_turn_failure(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::Timeout(_) | Self::Conflict(_))
    }
}

impl From<LlmError> for GameError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(message) => Self::Configuration(message),
            LlmError::Http { ref provider, .. }
            | LlmError::RetriesExhausted { ref provider, .. }
            | LlmError::InvalidResponse { ref provider, .. } => {
                let provider = provider.clone();
                Self::Upstream {
                    provider,
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::SessionNotFound(id),
            StoreError::Conflict { session_id, .. } | StoreError::Duplicate { session_id, .. } => {
                Self::Conflict(session_id)
            }
            StoreError::Finished { status, .. } => {
                Self::Validation(format!("Game is already over (status: {})", status))
            }
            StoreError::Backend(e) => Self::Storage(format!("{:#}", e)),
        }
    }
}

pub type GameResult<T> = std::result::Result<T, GameError>;
