//! services/api/src/web/generations.rs
//!
//! REST handlers for AI generation sessions and the review of their candidates.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use flashcards_core::{
    CandidateActionInput, CandidateActionsRequest, CandidateActionsResult, FieldIssue,
    GenerationSession,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{ApiError, ErrorBody},
    web::{flashcards::FlashcardDto, state::AppState},
};

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Study material, 1000 to 10000 characters.
    pub source_text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationDto {
    pub id: Uuid,
    pub model: String,
    pub source_text_length: usize,
    pub generation_duration_ms: i64,
    pub accepted_unedited_count: Option<i32>,
    pub accepted_edited_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<GenerationSession> for GenerationDto {
    fn from(session: GenerationSession) -> Self {
        Self {
            id: session.id,
            model: session.model,
            source_text_length: session.source_text.chars().count(),
            generation_duration_ms: session.generation_duration_ms,
            accepted_unedited_count: session.accepted_unedited_count,
            accepted_edited_count: session.accepted_edited_count,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerationResponse {
    pub generation: GenerationDto,
    pub candidates: Vec<FlashcardDto>,
}

/// One review decision. Fields are validated by the review pipeline, so
/// missing ones are accepted here and reported with their index.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CandidateActionBody {
    #[serde(default)]
    pub candidate_id: String,
    /// `accept`, `edit` or `reject`.
    #[serde(default)]
    pub action: String,
    pub edited_front: Option<String>,
    pub edited_back: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CandidateActionsBody {
    #[serde(default)]
    pub actions: Vec<CandidateActionBody>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CandidateActionsResponse {
    pub accepted: Vec<Uuid>,
    pub edited: Vec<Uuid>,
    pub rejected: Vec<Uuid>,
}

impl From<CandidateActionsResult> for CandidateActionsResponse {
    fn from(result: CandidateActionsResult) -> Self {
        Self {
            accepted: result.accepted,
            edited: result.edited,
            rejected: result.rejected,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate candidate flashcards from a block of text.
#[utoipa::path(
    post,
    path = "/generations",
    request_body = GenerateRequest,
    responses(
        (status = 201, description = "Generation session with its candidates", body = GenerationResponse),
        (status = 400, description = "Source text out of bounds", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 502, description = "The generation model failed", body = ErrorBody)
    )
)]
pub async fn create_generation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, candidates) = state.generation.generate(user_id, &req.source_text).await?;

    let response = GenerationResponse {
        generation: session.into(),
        candidates: candidates.into_iter().map(FlashcardDto::from).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// List the caller's generation sessions, newest first.
#[utoipa::path(
    get,
    path = "/generations",
    responses(
        (status = 200, description = "Generation sessions", body = Vec<GenerationDto>),
        (status = 401, description = "Not logged in", body = ErrorBody)
    )
)]
pub async fn list_generations_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<GenerationDto>>, ApiError> {
    let sessions = state.db.list_generations(user_id).await?;
    Ok(Json(sessions.into_iter().map(GenerationDto::from).collect()))
}

/// Fetch a generation session with the candidates still awaiting review.
#[utoipa::path(
    get,
    path = "/generations/{id}",
    params(("id" = Uuid, Path, description = "Generation session id")),
    responses(
        (status = 200, description = "Session and pending candidates", body = GenerationResponse),
        (status = 404, description = "No such session", body = ErrorBody)
    )
)]
pub async fn get_generation_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<GenerationResponse>, ApiError> {
    let session = state.db.get_generation(user_id, id).await?;
    let candidates = state.db.get_candidates_for_generation(session.id).await?;

    Ok(Json(GenerationResponse {
        generation: session.into(),
        candidates: candidates.into_iter().map(FlashcardDto::from).collect(),
    }))
}

/// Accept, edit or reject a batch of candidates of one generation session.
#[utoipa::path(
    post,
    path = "/generations/{id}/candidates/actions",
    params(("id" = String, Path, description = "Generation session id")),
    request_body = CandidateActionsBody,
    responses(
        (status = 200, description = "Candidate ids grouped by outcome", body = CandidateActionsResponse),
        (status = 400, description = "Malformed batch", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody),
        (status = 404, description = "Session or candidates not found", body = ErrorBody),
        (status = 500, description = "Storage failure, nothing applied", body = ErrorBody)
    )
)]
pub async fn candidate_actions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<String>,
    body: Result<Json<CandidateActionsBody>, JsonRejection>,
) -> Result<Json<CandidateActionsResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        ApiError::Validation(vec![FieldIssue::batch("body", rejection.body_text())])
    })?;

    let request = CandidateActionsRequest {
        session_id,
        actions: body
            .actions
            .into_iter()
            .map(|a| CandidateActionInput {
                candidate_id: a.candidate_id,
                action: a.action,
                edited_front: a.edited_front,
                edited_back: a.edited_back,
            })
            .collect(),
    };

    let result = state
        .review
        .process_candidate_actions(user_id, &request)
        .await?;
    info!(user_id = %user_id, session_id = %request.session_id, "Processed candidate actions");

    Ok(Json(result.into()))
}
