//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification of the REST API.

use utoipa::OpenApi;

use crate::{
    error::{ErrorBody, IssueBody},
    web::{auth, flashcards, generations},
};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        flashcards::list_flashcards_handler,
        flashcards::create_flashcard_handler,
        flashcards::get_flashcard_handler,
        flashcards::update_flashcard_handler,
        flashcards::delete_flashcard_handler,
        generations::create_generation_handler,
        generations::list_generations_handler,
        generations::get_generation_handler,
        generations::candidate_actions_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            flashcards::FlashcardDto,
            flashcards::FlashcardListResponse,
            flashcards::CreateFlashcardRequest,
            flashcards::UpdateFlashcardRequest,
            generations::GenerateRequest,
            generations::GenerationDto,
            generations::GenerationResponse,
            generations::CandidateActionBody,
            generations::CandidateActionsBody,
            generations::CandidateActionsResponse,
            ErrorBody,
            IssueBody,
        )
    ),
    tags(
        (name = "Flashcards API", description = "Manual flashcards, AI generation sessions and candidate review.")
    )
)]
pub struct ApiDoc;
