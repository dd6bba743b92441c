//! Route table and handlers: one POST endpoint per game action.

use super::{ApiError, AppState};
use crate::error::{GameError, GameResult};
use crate::game::{
    AskQuestionRequest, AskQuestionResponse, HintResponse, QuitResponse, SessionRequest,
    StartGameRequest, StartGameResponse, SubmitAnswerRequest, SubmitAnswerResponse,
    TurnOrchestrator,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

type Shared = Arc<AppState>;
type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/game/start", post(start_game))
        .route("/v1/game/ask", post(ask_question))
        .route("/v1/game/hint", post(get_hint))
        .route("/v1/game/answer", post(submit_answer))
        .route("/v1/game/quit", post(quit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Body parse failures use the same `{"error": ...}` shape as game errors.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError(GameError::validation(rejection.body_text())))
}

/// Run a turn on its own task: dropping the request does not cancel it.
async fn spawn_turn<T, F, Fut>(state: &Shared, turn: F) -> ApiResult<T>
where
    T: Serialize + Send + 'static,
    F: FnOnce(Arc<TurnOrchestrator>) -> Fut,
    Fut: Future<Output = GameResult<T>> + Send + 'static,
{
    let task = tokio::spawn(turn(Arc::clone(&state.orchestrator)));
    match task.await {
        Ok(result) => Ok(Json(result?)),
        Err(e) => Err(ApiError(GameError::Storage(format!("turn task failed: {}", e)))),
    }
}

async fn health(State(state): State<Shared>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn start_game(
    State(state): State<Shared>,
    payload: Result<Json<StartGameRequest>, JsonRejection>,
) -> ApiResult<StartGameResponse> {
    let req = body(payload)?;
    spawn_turn(&state, move |o| async move { o.start_game(req).await }).await
}

async fn ask_question(
    State(state): State<Shared>,
    payload: Result<Json<AskQuestionRequest>, JsonRejection>,
) -> ApiResult<AskQuestionResponse> {
    let req = body(payload)?;
    spawn_turn(&state, move |o| async move { o.ask_question(req).await }).await
}

async fn get_hint(
    State(state): State<Shared>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> ApiResult<HintResponse> {
    let req = body(payload)?;
    spawn_turn(&state, move |o| async move { o.get_hint(req).await }).await
}

async fn submit_answer(
    State(state): State<Shared>,
    payload: Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> ApiResult<SubmitAnswerResponse> {
    let req = body(payload)?;
    spawn_turn(&state, move |o| async move { o.submit_answer(req).await }).await
}

async fn quit(
    State(state): State<Shared>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> ApiResult<QuitResponse> {
    let req = body(payload)?;
    spawn_turn(&state, move |o| async move { o.quit(req).await }).await
}
