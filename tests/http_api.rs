mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{cat_game, harness, ScriptedProvider};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use twentyq::api::{router, AppState};
use twentyq::game::StaticCatalog;
use twentyq::Settings;

fn app(provider: ScriptedProvider) -> Router {
    let h = cat_game(provider);
    router(Arc::new(AppState::new(Arc::new(h.orchestrator))))
}

fn full_catalog_app() -> Router {
    let h = harness(Arc::new(StaticCatalog::new()), ScriptedProvider::new(&[]), Settings::default());
    router(Arc::new(AppState::new(Arc::new(h.orchestrator))))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = app(ScriptedProvider::new(&[]));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_start_then_ask_over_http() {
    let app = app(ScriptedProvider::new(&[r#"{"answer": "No", "is_guess": false}"#]));

    let (status, started) = send(
        &app,
        post("/v1/game/start", json!({"category": "Animals", "mode": "guess"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["category"], "Animals");
    assert_eq!(started["questions_remaining"], 20);
    assert!(started.get("secret_item").is_none());
    let session_id = started["session_id"].as_str().unwrap().to_string();

    let (status, reply) = send(
        &app,
        post(
            "/v1/game/ask",
            json!({"session_id": session_id, "question": "Does it fly?"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["answer"], "No");
    assert_eq!(reply["is_guess"], false);
    assert_eq!(reply["status"], "active");
    assert_eq!(reply["questions_remaining"], 19);
    assert!(reply.get("secret_item").is_none());

    let (status, quit) = send(&app, post("/v1/game/quit", json!({"session_id": session_id}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quit["secret_item"], "Cat");
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let app = app(ScriptedProvider::new(&[]));
    let (status, body) = send(
        &app,
        post("/v1/game/ask", json!({"session_id": "nope", "question": "Is it red?"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_malformed_body_is_400_with_error_shape() {
    let app = app(ScriptedProvider::new(&[]));
    let (status, body) = send(&app, post("/v1/game/hint", json!({"wrong": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        post(
            "/v1/game/answer",
            json!({"session_id": "x", "answer": "Perhaps", "answer_type": "chip"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Perhaps"));
}

#[tokio::test]
async fn test_ai_guessing_start_returns_first_question() {
    let app = full_catalog_app();
    let (status, started) = send(
        &app,
        post("/v1/game/start", json!({"category": "Animals", "mode": "ai_guessing"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["mode"], "ai_guessing");
    assert_eq!(started["first_question"], "Is it a mammal?");
    assert_eq!(started["questions_remaining"], 19);

    let session_id = started["session_id"].as_str().unwrap();
    let (status, reply) = send(
        &app,
        post(
            "/v1/game/answer",
            json!({"session_id": session_id, "answer": "yes"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["questions_asked"], 2);
    assert!(reply["next_question"].is_string());
}
