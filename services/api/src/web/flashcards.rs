//! services/api/src/web/flashcards.rs
//!
//! REST handlers for the user's active flashcards.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use flashcards_core::{
    content::{check_back, check_front},
    FieldIssue, Flashcard, FlashcardUpdate, NewFlashcard,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{ApiError, ErrorBody},
    web::state::AppState,
};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlashcardDto {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    /// `manual` or `ai`.
    pub source: String,
    pub generation_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Flashcard> for FlashcardDto {
    fn from(card: Flashcard) -> Self {
        Self {
            id: card.id,
            front: card.front,
            back: card.back,
            source: card.source.to_string(),
            generation_id: card.generation_id,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlashcardListResponse {
    pub items: Vec<FlashcardDto>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size, 1 to 100.
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFlashcardRequest {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFlashcardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
}

fn check_field(
    issues: &mut Vec<FieldIssue>,
    field: &str,
    value: &str,
    check: fn(&str) -> Result<(), String>,
) {
    if let Err(message) = check(value) {
        issues.push(FieldIssue::batch(field, message));
    }
}

fn reject_if_any(issues: Vec<FieldIssue>) -> Result<(), ApiError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(issues))
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the caller's active flashcards, newest first.
#[utoipa::path(
    get,
    path = "/flashcards",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of flashcards", body = FlashcardListResponse),
        (status = 400, description = "Invalid paging parameters", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody)
    )
)]
pub async fn list_flashcards_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FlashcardListResponse>, ApiError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let mut issues = Vec::new();
    if page == 0 {
        issues.push(FieldIssue::batch("page", "must be at least 1"));
    }
    if limit == 0 || limit > MAX_PAGE_SIZE {
        issues.push(FieldIssue::batch(
            "limit",
            format!("must be between 1 and {}", MAX_PAGE_SIZE),
        ));
    }
    reject_if_any(issues)?;

    let result = state.db.list_flashcards(user_id, page, limit).await?;
    Ok(Json(FlashcardListResponse {
        items: result.items.into_iter().map(FlashcardDto::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// Create a flashcard by hand.
#[utoipa::path(
    post,
    path = "/flashcards",
    request_body = CreateFlashcardRequest,
    responses(
        (status = 201, description = "Flashcard created", body = FlashcardDto),
        (status = 400, description = "Invalid front or back", body = ErrorBody),
        (status = 401, description = "Not logged in", body = ErrorBody)
    )
)]
pub async fn create_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateFlashcardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut issues = Vec::new();
    check_field(&mut issues, "front", &req.front, check_front);
    check_field(&mut issues, "back", &req.back, check_back);
    reject_if_any(issues)?;

    let card = state
        .db
        .create_flashcard(
            user_id,
            NewFlashcard {
                front: req.front.trim().to_string(),
                back: req.back.trim().to_string(),
            },
        )
        .await?;
    info!(user_id = %user_id, flashcard_id = %card.id, "Created manual flashcard");

    Ok((StatusCode::CREATED, Json(FlashcardDto::from(card))))
}

/// Fetch one active flashcard.
#[utoipa::path(
    get,
    path = "/flashcards/{id}",
    params(("id" = Uuid, Path, description = "Flashcard id")),
    responses(
        (status = 200, description = "The flashcard", body = FlashcardDto),
        (status = 404, description = "No such flashcard", body = ErrorBody)
    )
)]
pub async fn get_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlashcardDto>, ApiError> {
    let card = state.db.get_flashcard(user_id, id).await?;
    Ok(Json(card.into()))
}

/// Change the front and/or back of an active flashcard.
#[utoipa::path(
    put,
    path = "/flashcards/{id}",
    params(("id" = Uuid, Path, description = "Flashcard id")),
    request_body = UpdateFlashcardRequest,
    responses(
        (status = 200, description = "Updated flashcard", body = FlashcardDto),
        (status = 400, description = "Invalid front or back", body = ErrorBody),
        (status = 404, description = "No such flashcard", body = ErrorBody)
    )
)]
pub async fn update_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFlashcardRequest>,
) -> Result<Json<FlashcardDto>, ApiError> {
    let mut issues = Vec::new();
    if req.front.is_none() && req.back.is_none() {
        issues.push(FieldIssue::batch("body", "front or back is required"));
    }
    if let Some(front) = &req.front {
        check_field(&mut issues, "front", front, check_front);
    }
    if let Some(back) = &req.back {
        check_field(&mut issues, "back", back, check_back);
    }
    reject_if_any(issues)?;

    let update = FlashcardUpdate {
        front: req.front.map(|f| f.trim().to_string()),
        back: req.back.map(|b| b.trim().to_string()),
    };
    let card = state.db.update_flashcard(user_id, id, update).await?;
    Ok(Json(card.into()))
}

/// Soft-delete an active flashcard.
#[utoipa::path(
    delete,
    path = "/flashcards/{id}",
    params(("id" = Uuid, Path, description = "Flashcard id")),
    responses(
        (status = 204, description = "Flashcard deleted"),
        (status = 404, description = "No such flashcard", body = ErrorBody)
    )
)]
pub async fn delete_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.soft_delete_flashcard(user_id, id).await?;
    info!(user_id = %user_id, flashcard_id = %id, "Deleted flashcard");
    Ok(StatusCode::NO_CONTENT)
}
