//! 20 Questions reasoning engine: vocabularies, derived state (facts and
//! possibility space), question strategy, answer normalization and the
//! per-turn orchestrator that ties them to storage and the LLM layer.

pub mod catalog;
pub mod consistency;
pub mod facts;
pub mod normalizer;
pub mod orchestrator;
pub mod possibility;
pub mod similarity;
pub mod strategist;
pub mod types;

pub use catalog::{ItemKnowledge, StaticCatalog};
pub use facts::FactLedger;
pub use normalizer::Verdict;
pub use orchestrator::{
    AnswerType, AskQuestionRequest, AskQuestionResponse, HintResponse, QuitResponse,
    SessionRequest, StartGameRequest, StartGameResponse, SubmitAnswerRequest,
    SubmitAnswerResponse, TurnOrchestrator,
};
pub use possibility::PossibilitySpace;
pub use types::{Answer, GameMode, GameSession, GameStatus, Message, MessageType, Role};
