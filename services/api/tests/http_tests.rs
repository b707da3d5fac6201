//! HTTP-level tests for the flashcards API.
//!
//! The router is driven with `tower::ServiceExt::oneshot` on top of the
//! in-memory store and a scripted flashcard generator.

use api_lib::{
    config::Config,
    error::ErrorBody,
    web::{build_router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use flashcards_core::{
    FlashcardGenerationService, FlashcardProposal, FlashcardState, InMemoryStore, PortError,
    PortResult,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct ScriptedGenerator {
    fail: bool,
}

#[async_trait]
impl FlashcardGenerationService for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted-model"
    }

    async fn generate_flashcards(&self, _source_text: &str) -> PortResult<Vec<FlashcardProposal>> {
        if self.fail {
            return Err(PortError::Unexpected("model unavailable".to_string()));
        }
        Ok((1..=3)
            .map(|i| FlashcardProposal {
                front: format!("Question {}", i),
                back: format!("Answer {}", i),
            })
            .collect())
    }
}

fn app_with(store: InMemoryStore, failing_generator: bool) -> Router {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://unused".to_string()),
        _ => None,
    })
    .unwrap();
    let state = AppState::new(
        Arc::new(store),
        Arc::new(ScriptedGenerator {
            fail: failing_generator,
        }),
        Arc::new(config),
    );
    build_router(Arc::new(state)).unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Signs up a fresh user and returns the `Cookie` header value for it.
async fn signup(app: &Router, email: &str) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "correct horse" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn study_text() -> String {
    "Photosynthesis converts light energy into chemical energy. ".repeat(20)
}

/// Creates a generation and returns its id and candidate ids.
async fn generate(app: &Router, cookie: &str) -> (String, Vec<String>) {
    let (status, body) = send(
        app,
        Method::POST,
        "/generations",
        Some(cookie),
        Some(json!({ "source_text": study_text() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let id = body["generation"]["id"].as_str().unwrap().to_string();
    let candidates = body["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap().to_string())
        .collect();
    (id, candidates)
}

fn error_body(value: Value) -> ErrorBody {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn test_protected_routes_require_a_session() {
    let app = app_with(InMemoryStore::new(), false);

    let (status, body) = send(&app, Method::GET, "/flashcards", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_body(body).kind, "unauthenticated");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/generations/{}/candidates/actions", Uuid::new_v4()),
        Some("session=not-a-real-session"),
        Some(json!({ "actions": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_logout_round() {
    let app = app_with(InMemoryStore::new(), false);
    signup(&app, "reader@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "reader@example.com", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": "Reader@Example.com", "password": "correct horse" }).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let (status, _) = send(&app, Method::POST, "/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, "/flashcards", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = app_with(InMemoryStore::new(), false);
    signup(&app, "twice@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/signup",
        None,
        Some(json!({ "email": "twice@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_generation_creates_candidates_not_visible_as_flashcards() {
    let app = app_with(InMemoryStore::new(), false);
    let cookie = signup(&app, "gen@example.com").await;
    let (generation_id, candidates) = generate(&app, &cookie).await;
    assert_eq!(candidates.len(), 3);

    let (status, body) = send(&app, Method::GET, "/flashcards", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/generations/{}", generation_id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"]["model"], "scripted-model");
    assert_eq!(body["candidates"].as_array().unwrap().len(), 3);

    let (status, body) = send(&app, Method::GET, "/generations", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generation_rejects_short_text_and_reports_generator_failure() {
    let app = app_with(InMemoryStore::new(), false);
    let cookie = signup(&app, "short@example.com").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/generations",
        Some(&cookie),
        Some(json!({ "source_text": "too short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = error_body(body);
    assert_eq!(body.kind, "validation");
    assert_eq!(body.issues[0].field, "source_text");

    let failing = app_with(InMemoryStore::new(), true);
    let cookie = signup(&failing, "upstream@example.com").await;
    let (status, body) = send(
        &failing,
        Method::POST,
        "/generations",
        Some(&cookie),
        Some(json!({ "source_text": study_text() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_body(body).kind, "upstream");
}

#[tokio::test]
async fn test_candidate_actions_apply_and_group_results() {
    let store = InMemoryStore::new();
    let app = app_with(store.clone(), false);
    let cookie = signup(&app, "review@example.com").await;
    let (generation_id, candidates) = generate(&app, &cookie).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/generations/{}/candidates/actions", generation_id),
        Some(&cookie),
        Some(json!({
            "actions": [
                { "candidate_id": candidates[0], "action": "accept" },
                {
                    "candidate_id": candidates[1],
                    "action": "edit",
                    "edited_front": "Edited question",
                    "edited_back": "Edited answer"
                },
                { "candidate_id": candidates[2], "action": "reject" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], json!([candidates[0]]));
    assert_eq!(body["edited"], json!([candidates[1]]));
    assert_eq!(body["rejected"], json!([candidates[2]]));

    let edited_id = Uuid::parse_str(&candidates[1]).unwrap();
    let edited = store.flashcard(edited_id).await.unwrap();
    assert_eq!(edited.front, "Edited question");
    assert_eq!(edited.state(), FlashcardState::Active);

    let (_, body) = send(&app, Method::GET, "/flashcards", Some(&cookie), None).await;
    assert_eq!(body["total"], 2);

    let (_, body) = send(
        &app,
        Method::GET,
        &format!("/generations/{}", generation_id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(body["generation"]["accepted_unedited_count"], 1);
    assert_eq!(body["generation"]["accepted_edited_count"], 1);
    assert!(body["candidates"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_candidate_actions_validation_lists_every_issue() {
    let app = app_with(InMemoryStore::new(), false);
    let cookie = signup(&app, "invalid@example.com").await;
    let (generation_id, candidates) = generate(&app, &cookie).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/generations/{}/candidates/actions", generation_id),
        Some(&cookie),
        Some(json!({
            "actions": [
                { "candidate_id": "not-a-uuid", "action": "accept" },
                { "candidate_id": candidates[0], "action": "edit", "edited_back": "Answer" },
                { "candidate_id": candidates[1], "action": "archive" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = error_body(body);
    assert_eq!(body.kind, "validation");
    let indexes: Vec<Option<usize>> = body.issues.iter().map(|i| i.index).collect();
    assert!(indexes.contains(&Some(0)));
    assert!(indexes.contains(&Some(1)));
    assert!(indexes.contains(&Some(2)));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/generations/{}/candidates/actions", generation_id),
        Some(&cookie),
        Some(json!({ "actions": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(body).issues[0].field, "actions");
}

#[tokio::test]
async fn test_candidate_actions_malformed_json_is_a_validation_error() {
    let app = app_with(InMemoryStore::new(), false);
    let cookie = signup(&app, "malformed@example.com").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/generations/{}/candidates/actions", Uuid::new_v4()))
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ \"actions\": [ "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_candidate_actions_on_foreign_or_missing_session_is_not_found() {
    let app = app_with(InMemoryStore::new(), false);
    let owner = signup(&app, "owner@example.com").await;
    let intruder = signup(&app, "intruder@example.com").await;
    let (generation_id, candidates) = generate(&app, &owner).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/generations/{}/candidates/actions", generation_id),
        Some(&intruder),
        Some(json!({ "actions": [{ "candidate_id": candidates[0], "action": "accept" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_body(body).kind, "not_found");

    let unknown = Uuid::new_v4();
    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/generations/{}/candidates/actions", generation_id),
        Some(&owner),
        Some(json!({ "actions": [
            { "candidate_id": candidates[0], "action": "accept" },
            { "candidate_id": unknown.to_string(), "action": "reject" }
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_body(body).missing_ids, vec![unknown]);

    // Nothing from the aborted batch was applied.
    let (_, body) = send(&app, Method::GET, "/flashcards", Some(&owner), None).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_manual_flashcard_crud() {
    let app = app_with(InMemoryStore::new(), false);
    let cookie = signup(&app, "crud@example.com").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/flashcards",
        Some(&cookie),
        Some(json!({ "front": "  Capital of France?  ", "back": "Paris" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["front"], "Capital of France?");
    assert_eq!(body["source"], "manual");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/flashcards/{}", id),
        Some(&cookie),
        Some(json!({ "back": "Paris, on the Seine" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["back"], "Paris, on the Seine");
    assert_eq!(body["front"], "Capital of France?");

    let (status, body) = send(
        &app,
        Method::POST,
        "/flashcards",
        Some(&cookie),
        Some(json!({ "front": "x".repeat(201), "back": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(body).issues.len(), 2);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/flashcards/{}", id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/flashcards/{}", id),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_flashcard_paging_bounds() {
    let app = app_with(InMemoryStore::new(), false);
    let cookie = signup(&app, "paging@example.com").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/flashcards?page=0&limit=500",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_body(body).issues.len(), 2);

    let (status, body) = send(
        &app,
        Method::GET,
        "/flashcards?page=2&limit=5",
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["limit"], 5);
}
