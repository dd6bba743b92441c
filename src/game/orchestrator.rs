//! Turn Orchestrator
//!
//! Information Hiding:
//! - Prompt construction and the search round-trip hidden behind the five
//!   game operations
//! - Every operation reloads session + history, so no state survives
//!   between requests
//! - All writes for a turn go through one `commit_turn` call
//!
//! Each turn is split in two phases: a preparation phase (load, reason,
//! call the model) that runs under the turn time budget and writes nothing,
//! and a single commit. A turn that times out leaves the session untouched.

use super::catalog::ItemKnowledge;
use super::consistency;
use super::facts::{asked_questions, classify_answer, FactLedger, Polarity};
use super::normalizer::{self, Verdict};
use super::possibility::PossibilitySpace;
use super::strategist::{ProposedQuestion, QuestionContext, QuestionStrategist};
use super::types::{Answer, GameMode, GameSession, GameStatus, Message, MessageType, Role};
use crate::config::Settings;
use crate::core::llm::{ChatMessage, LlmRequest, LlmResponse};
use crate::core::registry::{ProviderRegistry, FN_ANSWER_QUESTION, FN_GENERATE_HINT};
use crate::error::{GameError, GameResult};
use crate::storage::{GameStore, StoreError};
use crate::tools::Tool;
use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

const MAX_QUESTION_LEN: usize = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartGameRequest {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub mode: Option<GameMode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartGameResponse {
    pub session_id: String,
    pub category: String,
    pub mode: GameMode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_question: Option<String>,
    pub questions_remaining: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskQuestionRequest {
    pub session_id: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskQuestionResponse {
    pub answer: String,
    pub is_guess: bool,
    pub questions_remaining: u32,
    pub status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_item: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HintResponse {
    pub hint: String,
    pub hints_remaining: u32,
    pub questions_remaining: u32,
    pub status: GameStatus,
    /// Set when the hint spent the last question.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_item: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    #[default]
    Chip,
    Text,
    Voice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswerRequest {
    pub session_id: String,
    pub answer: String,
    #[serde(default)]
    pub answer_type: AnswerType,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<String>,
    pub questions_asked: u32,
    pub questions_remaining: u32,
    pub status: GameStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuitResponse {
    pub message: String,
    pub secret_item: Option<String>,
}

/// Outcome of the preparation phase: what to write and what to return.
struct PreparedTurn<R> {
    session: GameSession,
    expected_questions_asked: u32,
    messages: Vec<Message>,
    response: R,
}

pub struct TurnOrchestrator {
    store: Arc<dyn GameStore>,
    providers: Arc<ProviderRegistry>,
    knowledge: Arc<dyn ItemKnowledge>,
    strategist: QuestionStrategist,
    search: Option<Arc<dyn Tool>>,
    settings: Settings,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<dyn GameStore>,
        providers: Arc<ProviderRegistry>,
        knowledge: Arc<dyn ItemKnowledge>,
        settings: Settings,
    ) -> Self {
        let strategist = QuestionStrategist::new(Arc::clone(&knowledge))
            .with_temperature(settings.llm.question_temperature);
        Self {
            store,
            providers,
            knowledge,
            strategist,
            search: None,
            settings,
        }
    }

    /// Offer `tool` to the model when answering questions.
    pub fn with_search(mut self, tool: Arc<dyn Tool>) -> Self {
        tracing::info!("[TurnOrchestrator] Search enabled: {}", tool.metadata());
        self.search = Some(tool);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    fn budget(&self) -> u32 {
        self.settings.game.max_questions
    }

    async fn within_budget<T>(&self, work: impl Future<Output = GameResult<T>>) -> GameResult<T> {
        let limit = self.settings.turn_timeout();
        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("[TurnOrchestrator] Turn exceeded {}s budget", limit.as_secs());
                Err(GameError::Timeout(limit.as_secs()))
            }
        }
    }

    async fn commit<R>(&self, turn: PreparedTurn<R>) -> GameResult<R> {
        self.store
            .commit_turn(&turn.session, turn.expected_questions_asked, &turn.messages)
            .await?;
        Ok(turn.response)
    }

    async fn load_active(&self, session_id: &str, mode: GameMode) -> GameResult<GameSession> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
        if !session.is_active() {
            return Err(GameError::validation(format!(
                "Game is already over (status: {})",
                session.status
            )));
        }
        if session.mode != mode {
            return Err(GameError::validation(format!(
                "This action is not available in {} mode",
                session.mode
            )));
        }
        Ok(session)
    }

    // ---- start_game ----

    pub async fn start_game(&self, req: StartGameRequest) -> GameResult<StartGameResponse> {
        let mode = req.mode.unwrap_or(GameMode::Guess);
        let category = self.pick_category(req.category.as_deref())?;
        let secret = match mode {
            GameMode::Guess => Some(self.pick_secret(&category)?),
            GameMode::AiGuessing => None,
        };

        let mut session = GameSession::new(category.clone(), mode, secret.clone());
        let mut messages = vec![Message::new(
            &session.id,
            Role::System,
            MessageType::Question,
            0,
            priming_text(&category, mode, secret.as_deref()),
        )];

        let first_question = match mode {
            GameMode::Guess => None,
            GameMode::AiGuessing => {
                let proposal = self
                    .within_budget(self.propose_question(&session, &[]))
                    .await?;
                messages.push(Message::new(
                    &session.id,
                    Role::Assistant,
                    proposal.message_type,
                    1,
                    proposal.text.clone(),
                ));
                session.questions_asked = 1;
                Some(proposal.text)
            }
        };

        self.store.create_session(&session, &messages).await?;
        tracing::info!(
            "[TurnOrchestrator] Started {} game {} in category {}",
            mode,
            session.id,
            category
        );

        let message = match mode {
            GameMode::Guess => format!(
                "I'm thinking of something in the category {}. Ask me yes/no questions!",
                category
            ),
            GameMode::AiGuessing => format!(
                "Think of something in the category {}. I'll try to guess it!",
                category
            ),
        };

        Ok(StartGameResponse {
            session_id: session.id.clone(),
            category,
            mode,
            message,
            first_question,
            questions_remaining: session.questions_remaining(self.budget()),
        })
    }

    fn pick_category(&self, requested: Option<&str>) -> GameResult<String> {
        match requested.map(str::trim).filter(|c| !c.is_empty()) {
            Some(name) => Ok(self
                .knowledge
                .resolve_category(name)
                .unwrap_or_else(|| name.to_string())),
            None => self
                .knowledge
                .categories()
                .choose(&mut rand::thread_rng())
                .cloned()
                .ok_or_else(|| GameError::Configuration("no categories available".into())),
        }
    }

    fn pick_secret(&self, category: &str) -> GameResult<String> {
        self.knowledge
            .items(category)
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| {
                GameError::validation(format!(
                    "Unknown category '{}'. Choose one of: {}",
                    category,
                    self.knowledge.categories().join(", ")
                ))
            })
    }

    // ---- ask_question (guess mode) ----

    pub async fn ask_question(&self, req: AskQuestionRequest) -> GameResult<AskQuestionResponse> {
        let question = req.question.trim().to_string();
        if question.is_empty() {
            return Err(GameError::validation("Question must not be empty"));
        }
        if question.chars().count() > MAX_QUESTION_LEN {
            return Err(GameError::validation(format!(
                "Question is too long (max {} characters)",
                MAX_QUESTION_LEN
            )));
        }

        let turn = self
            .within_budget(self.prepare_answer(&req.session_id, question))
            .await?;
        self.commit(turn).await
    }

    async fn prepare_answer(
        &self,
        session_id: &str,
        question: String,
    ) -> GameResult<PreparedTurn<AskQuestionResponse>> {
        let mut session = self.load_active(session_id, GameMode::Guess).await?;
        let expected = session.questions_asked;
        let secret = session.secret_item.clone().unwrap_or_default();

        if session.questions_asked >= self.budget() {
            // Budget spent without a win: finalize instead of erroring.
            session.status = GameStatus::Lost;
            session.updated_at = Utc::now();
            tracing::info!("[TurnOrchestrator] Session {} out of questions", session.id);
            return Ok(PreparedTurn {
                expected_questions_asked: expected,
                messages: Vec::new(),
                response: AskQuestionResponse {
                    answer: String::new(),
                    is_guess: false,
                    questions_remaining: 0,
                    status: GameStatus::Lost,
                    message: Some(format!("Out of questions! The answer was {}.", secret)),
                    secret_item: Some(secret),
                },
                session,
            });
        }

        let history = self.store.get_messages(&session.id).await?;
        let ledger = FactLedger::extract(&history);
        let number = session.questions_asked + 1;

        let (verdict, searched) = self.answer_with_model(&session, &history, &ledger, &question).await?;
        if let Verdict::Malformed { raw } = &verdict {
            tracing::warn!(
                "[TurnOrchestrator] Unrecognized answer for Q{} on {}, passing through: {}",
                number,
                session.id,
                raw
            );
        }
        consistency::check_answer(&question, &verdict.text(), &ledger, searched);

        session.questions_asked = number;
        session.updated_at = Utc::now();
        let (message, secret_item) = if verdict.is_guess() {
            session.status = GameStatus::Won;
            tracing::info!("[TurnOrchestrator] Session {} won on question {}", session.id, number);
            (Some(format!("You got it! The answer was {}.", secret)), Some(secret))
        } else if number >= self.budget() {
            session.status = GameStatus::Lost;
            tracing::info!("[TurnOrchestrator] Session {} lost after {} questions", session.id, number);
            (Some(format!("Out of questions! The answer was {}.", secret)), Some(secret))
        } else {
            (None, None)
        };

        let question_type = if verdict.is_guess() {
            MessageType::Guess
        } else {
            MessageType::Question
        };
        let messages = vec![
            Message::new(&session.id, Role::User, question_type, number, question),
            Message::new(&session.id, Role::Assistant, MessageType::Answer, number, verdict.text()),
        ];

        Ok(PreparedTurn {
            expected_questions_asked: expected,
            messages,
            response: AskQuestionResponse {
                answer: verdict.text(),
                is_guess: verdict.is_guess(),
                questions_remaining: session.questions_remaining(self.budget()),
                status: session.status,
                message,
                secret_item,
            },
            session,
        })
    }

    /// Ask the answering model, with at most one search round-trip.
    async fn answer_with_model(
        &self,
        session: &GameSession,
        history: &[Message],
        ledger: &FactLedger,
        question: &str,
    ) -> GameResult<(Verdict, bool)> {
        let provider = self.providers.resolve(FN_ANSWER_QUESTION)?;
        let system = answer_system_prompt(session, ledger);

        let mut transcript = replay_transcript(history);
        transcript.push(ChatMessage::user(question));

        let mut request = LlmRequest::new(transcript.clone())
            .with_system(system.clone())
            .with_temperature(self.settings.llm.temperature)
            .with_max_tokens(self.settings.llm.max_tokens);
        if let Some(tool) = &self.search {
            request = request.with_function(tool.metadata().to_declaration());
        }

        let response = provider.generate_response(&request).await?;
        let Some((tool, call)) = self.requested_search(&response) else {
            return Ok((normalizer::normalize_reply(&response.content), false));
        };

        tracing::info!(
            "[TurnOrchestrator] Model called {} for session {}: {}",
            call.name,
            session.id,
            call.arguments
        );
        let result = tool.execute(call.arguments.clone()).await.map_err(|e| {
            GameError::upstream(tool.metadata().name, format!("{:#}", e))
        })?;
        let findings = if result.success {
            result.output
        } else {
            format!("Search failed: {}", result.error.unwrap_or_default())
        };

        transcript.push(ChatMessage::user(format!(
            "[SEARCH FUNCTION CALLED: {}]\n{}\n\n\
             Using these results, answer my question \"{}\". Reply ONLY with JSON \
             {{\"answer\": \"Yes\" | \"No\" | \"Sometimes\" | \"Not sure\", \"is_guess\": true|false}}.",
            call.name, findings, question
        )));
        // No function declaration on the follow-up: one round-trip at most.
        let follow_up = LlmRequest::new(transcript)
            .with_system(system)
            .with_temperature(self.settings.llm.temperature)
            .with_max_tokens(self.settings.llm.max_tokens);
        let response = provider.generate_response(&follow_up).await?;
        Ok((normalizer::normalize_reply(&response.content), true))
    }

    fn requested_search<'a>(
        &'a self,
        response: &'a LlmResponse,
    ) -> Option<(&'a Arc<dyn Tool>, &'a crate::core::llm::FunctionCall)> {
        let tool = self.search.as_ref()?;
        let call = response.function_call.as_ref()?;
        if call.name == tool.metadata().name {
            Some((tool, call))
        } else {
            tracing::warn!("[TurnOrchestrator] Ignoring call to unknown function '{}'", call.name);
            None
        }
    }

    // ---- get_hint (guess mode) ----

    pub async fn get_hint(&self, req: SessionRequest) -> GameResult<HintResponse> {
        let turn = self.within_budget(self.prepare_hint(&req.session_id)).await?;
        self.commit(turn).await
    }

    async fn prepare_hint(&self, session_id: &str) -> GameResult<PreparedTurn<HintResponse>> {
        let mut session = self.load_active(session_id, GameMode::Guess).await?;
        let max_hints = self.settings.game.max_hints;
        if session.hints_used >= max_hints {
            return Err(GameError::validation(format!("All hints used ({} max)", max_hints)));
        }
        if session.questions_asked >= self.budget() {
            return Err(GameError::validation("No questions left to spend on a hint"));
        }

        let history = self.store.get_messages(&session.id).await?;
        let ledger = FactLedger::extract(&history);
        let secret = session.secret_item.clone().unwrap_or_default();
        let hint_number = session.hints_used + 1;

        let provider = self.providers.resolve(FN_GENERATE_HINT)?;
        let request = LlmRequest::new(vec![ChatMessage::user("Give me a hint.")])
            .with_system(hint_system_prompt(&session.category, &secret, &ledger, hint_number, max_hints))
            .with_temperature(self.settings.llm.temperature)
            .with_max_tokens(self.settings.llm.max_tokens);
        let response = provider.generate_response(&request).await?;

        let mut hint = normalizer::clean_hint(&response.content);
        if hint.is_empty() || hint.to_lowercase().contains(&secret.to_lowercase()) {
            tracing::warn!("[TurnOrchestrator] Unusable hint for {}, using category hint", session.id);
            hint = format!("It belongs to the category {}.", session.category);
        }

        let expected = session.questions_asked;
        let number = expected + 1;
        session.questions_asked = number;
        session.hints_used = hint_number;
        session.updated_at = Utc::now();
        let (message, secret_item) = if number >= self.budget() {
            session.status = GameStatus::Lost;
            (Some(format!("Out of questions! The answer was {}.", secret)), Some(secret))
        } else {
            (None, None)
        };
        tracing::debug!(
            "[TurnOrchestrator] Hint {}/{} for session {} (question slot {})",
            hint_number,
            max_hints,
            session.id,
            number
        );

        Ok(PreparedTurn {
            expected_questions_asked: expected,
            messages: vec![Message::new(
                &session.id,
                Role::Assistant,
                MessageType::Hint,
                number,
                hint.clone(),
            )],
            response: HintResponse {
                hint,
                hints_remaining: max_hints - hint_number,
                questions_remaining: session.questions_remaining(self.budget()),
                status: session.status,
                message,
                secret_item,
            },
            session,
        })
    }

    // ---- submit_answer (ai_guessing mode) ----

    pub async fn submit_answer(&self, req: SubmitAnswerRequest) -> GameResult<SubmitAnswerResponse> {
        let answer = canonical_answer(&req.answer, req.answer_type)?;
        let turn = self
            .within_budget(self.prepare_next_question(&req.session_id, answer))
            .await?;
        self.commit(turn).await
    }

    async fn prepare_next_question(
        &self,
        session_id: &str,
        answer: String,
    ) -> GameResult<PreparedTurn<SubmitAnswerResponse>> {
        let mut session = self.load_active(session_id, GameMode::AiGuessing).await?;
        let expected = session.questions_asked;
        let number = expected;

        let mut history = self.store.get_messages(&session.id).await?;
        let pending = history
            .iter()
            .find(|m| {
                m.question_number == number
                    && m.role == Role::Assistant
                    && matches!(m.message_type, MessageType::Question | MessageType::Guess)
            })
            .cloned()
            .ok_or_else(|| GameError::validation("No question is awaiting an answer"))?;

        let ledger_before = FactLedger::extract(&history);
        consistency::check_answer(&pending.content, &answer, &ledger_before, false);

        let answer_message = Message::new(&session.id, Role::User, MessageType::Answer, number, answer.clone());
        history.push(answer_message.clone());
        let mut messages = vec![answer_message];
        session.updated_at = Utc::now();

        let polarity = classify_answer(&answer);
        let won = (pending.message_type == MessageType::Guess && polarity == Polarity::Affirmative)
            || (normalizer::has_correctness_marker(&answer) && polarity != Polarity::Negative);

        let (next_question, message) = if won {
            session.status = GameStatus::Won;
            tracing::info!("[TurnOrchestrator] AI guessed session {} on question {}", session.id, number);
            (None, Some(format!("I got it in {} questions!", number)))
        } else if number >= self.budget() {
            session.status = GameStatus::Lost;
            tracing::info!("[TurnOrchestrator] AI out of questions on session {}", session.id);
            (None, Some("I'm out of questions. You stumped me!".to_string()))
        } else {
            let proposal = self.propose_question(&session, &history).await?;
            let next = number + 1;
            messages.push(Message::new(
                &session.id,
                Role::Assistant,
                proposal.message_type,
                next,
                proposal.text.clone(),
            ));
            session.questions_asked = next;
            (Some(proposal.text), None)
        };

        Ok(PreparedTurn {
            expected_questions_asked: expected,
            messages,
            response: SubmitAnswerResponse {
                next_question,
                questions_asked: session.questions_asked,
                questions_remaining: session.questions_remaining(self.budget()),
                status: session.status,
                message,
            },
            session,
        })
    }

    async fn propose_question(&self, session: &GameSession, history: &[Message]) -> GameResult<ProposedQuestion> {
        let ledger = FactLedger::extract(history);
        let space = PossibilitySpace::build(&session.category, &ledger, self.knowledge.as_ref());
        let asked = asked_questions(history);
        let ctx = QuestionContext {
            category: &session.category,
            turn: session.questions_asked + 1,
            max_questions: self.budget(),
            ledger: &ledger,
            space: &space,
            asked: &asked,
        };
        self.strategist.next_question(&ctx, &self.providers).await
    }

    // ---- quit ----

    pub async fn quit(&self, req: SessionRequest) -> GameResult<QuitResponse> {
        loop {
            let mut session = self
                .store
                .get_session(&req.session_id)
                .await?
                .ok_or_else(|| GameError::SessionNotFound(req.session_id.clone()))?;

            let response = QuitResponse {
                message: match &session.secret_item {
                    Some(secret) => format!("The answer was {}. Thanks for playing!", secret),
                    None => "Thanks for playing!".to_string(),
                },
                secret_item: session.secret_item.clone(),
            };
            if !session.is_active() {
                return Ok(response);
            }

            let expected = session.questions_asked;
            session.status = GameStatus::Lost;
            session.updated_at = Utc::now();
            match self.store.commit_turn(&session, expected, &[]).await {
                Ok(()) => return Ok(response),
                // A turn landed between load and commit; end from its state.
                Err(StoreError::Conflict { .. }) | Err(StoreError::Finished { .. }) => {
                    tracing::debug!(
                        "[TurnOrchestrator] Session {} moved during quit, reloading",
                        req.session_id
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Chips must be one of the fixed answers; free text is kept as typed.
fn canonical_answer(raw: &str, kind: AnswerType) -> GameResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GameError::validation("Answer must not be empty"));
    }
    match kind {
        AnswerType::Chip => Answer::ALL
            .iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(trimmed))
            .map(|a| a.to_string())
            .ok_or_else(|| {
                GameError::validation(format!(
                    "Invalid answer '{}'. Expected one of: Yes, No, Sometimes, Not sure",
                    trimmed
                ))
            }),
        AnswerType::Text | AnswerType::Voice => Ok(trimmed.to_string()),
    }
}

fn priming_text(category: &str, mode: GameMode, secret: Option<&str>) -> String {
    match (mode, secret) {
        (GameMode::Guess, Some(secret)) => format!(
            "20 Questions, category {}. The secret item is {}. The player asks; answer truthfully.",
            category, secret
        ),
        _ => format!(
            "20 Questions, category {}. The player holds the secret; ask yes/no questions to find it.",
            category
        ),
    }
}

/// Earlier Q/A pairs as chat turns, hints left out.
fn replay_transcript(history: &[Message]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|m| m.question_number > 0 && m.message_type != MessageType::Hint)
        .map(|m| match m.role {
            Role::Assistant => ChatMessage::assistant(m.content.clone()),
            _ => ChatMessage::user(m.content.clone()),
        })
        .collect()
}

fn answer_system_prompt(session: &GameSession, ledger: &FactLedger) -> String {
    let secret = session.secret_item.as_deref().unwrap_or("unknown");
    format!(
        "You are the host of a game of 20 Questions. The secret item is \"{secret}\" \
         (category: {category}). The player asks yes/no questions to find it.\n\n\
         Answer each question truthfully about \"{secret}\" with exactly one of: \
         Yes, No, Sometimes, Not sure.\n\
         Set \"is_guess\" to true ONLY when the question names \"{secret}\" itself and the answer is Yes.\n\
         Never reveal the item.\n\n\
         Your earlier answers:\n{facts}\n\
         If you are unsure about a factual detail, you may call the search function once.\n\
         Reply ONLY with JSON: {{\"answer\": \"Yes\", \"is_guess\": false}}",
        secret = secret,
        category = session.category,
        facts = ledger.summary(),
    )
}

fn hint_system_prompt(
    category: &str,
    secret: &str,
    ledger: &FactLedger,
    hint_number: u32,
    max_hints: u32,
) -> String {
    format!(
        "You are the host of a game of 20 Questions. The secret item is \"{secret}\" \
         (category: {category}).\n\
         The player asked for hint {hint_number} of {max_hints}; make later hints more specific.\n\
         What the player already knows:\n{facts}\n\
         Give ONE short hint (one sentence) that does not repeat known facts and never \
         contains the word \"{secret}\". Reply with the hint only.",
        secret = secret,
        category = category,
        hint_number = hint_number,
        max_hints = max_hints,
        facts = ledger.summary(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_answers_are_canonical() {
        assert_eq!(canonical_answer(" not sure ", AnswerType::Chip).unwrap(), "Not sure");
        assert_eq!(canonical_answer("YES", AnswerType::Chip).unwrap(), "Yes");
        assert!(matches!(
            canonical_answer("perhaps", AnswerType::Chip),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn test_text_answers_are_trimmed_not_rewritten() {
        assert_eq!(
            canonical_answer("  yeah, it's a pet  ", AnswerType::Voice).unwrap(),
            "yeah, it's a pet"
        );
        assert!(canonical_answer("   ", AnswerType::Text).is_err());
    }

    #[test]
    fn test_transcript_skips_priming_and_hints() {
        let msgs = vec![
            Message::new("s", Role::System, MessageType::Question, 0, "prime"),
            Message::new("s", Role::User, MessageType::Question, 1, "Is it alive?"),
            Message::new("s", Role::Assistant, MessageType::Answer, 1, "Yes"),
            Message::new("s", Role::Assistant, MessageType::Hint, 2, "It purrs."),
        ];
        let transcript = replay_transcript(&msgs);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].content, "Yes");
    }

    #[test]
    fn test_request_defaults() {
        let req: SubmitAnswerRequest =
            serde_json::from_str(r#"{"session_id":"s","answer":"Yes"}"#).unwrap();
        assert_eq!(req.answer_type, AnswerType::Chip);

        let start: StartGameRequest = serde_json::from_str(r#"{"mode":"ai_guessing"}"#).unwrap();
        assert_eq!(start.mode, Some(GameMode::AiGuessing));
        assert!(start.category.is_none());
    }
}
