//! Persistent game records and the fixed contract vocabularies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Human asks, AI answers
    Guess,
    /// AI asks, human answers
    AiGuessing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Active,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Question,
    Answer,
    Hint,
    Guess,
}

/// The canonical answer vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    Yes,
    No,
    Sometimes,
    #[serde(rename = "Not sure")]
    NotSure,
}

macro_rules! text_enum {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("invalid {}: {}", stringify!($ty), other)),
                }
            }
        }
    };
}

text_enum!(GameMode { Guess => "guess", AiGuessing => "ai_guessing" });
text_enum!(GameStatus { Active => "active", Won => "won", Lost => "lost" });
text_enum!(Role { System => "system", User => "user", Assistant => "assistant" });
text_enum!(MessageType { Question => "question", Answer => "answer", Hint => "hint", Guess => "guess" });
text_enum!(Answer { Yes => "Yes", No => "No", Sometimes => "Sometimes", NotSure => "Not sure" });

impl Answer {
    pub const ALL: [Answer; 4] = [Answer::Yes, Answer::No, Answer::Sometimes, Answer::NotSure];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub category: String,
    pub mode: GameMode,
    pub secret_item: Option<String>,
    pub status: GameStatus,
    pub questions_asked: u32,
    pub hints_used: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(category: impl Into<String>, mode: GameMode, secret_item: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            category: category.into(),
            mode,
            secret_item,
            status: GameStatus::Active,
            questions_asked: 0,
            hints_used: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    pub fn questions_remaining(&self, budget: u32) -> u32 {
        budget.saturating_sub(self.questions_asked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub message_type: MessageType,
    /// 0 for system priming, 1..=20 for gameplay turns
    pub question_number: u32,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        session_id: &str,
        role: Role,
        message_type: MessageType,
        question_number: u32,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role,
            content: content.into(),
            message_type,
            question_number,
            created_at: Utc::now(),
        }
    }
}
