pub mod auth;
pub mod flashcards;
pub mod generations;
pub mod middleware;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;

pub use middleware::require_auth;
use rest::ApiDoc;
use state::AppState;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Builds the full application router: auth routes, protected resource
/// routes and the Swagger UI.
pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = state.config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid CORS origin '{}': {}",
            state.config.cors_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/flashcards",
            get(flashcards::list_flashcards_handler).post(flashcards::create_flashcard_handler),
        )
        .route(
            "/flashcards/{id}",
            get(flashcards::get_flashcard_handler)
                .put(flashcards::update_flashcard_handler)
                .delete(flashcards::delete_flashcard_handler),
        )
        .route(
            "/generations",
            get(generations::list_generations_handler).post(generations::create_generation_handler),
        )
        .route("/generations/{id}", get(generations::get_generation_handler))
        .route(
            "/generations/{id}/candidates/actions",
            post(generations::candidate_actions_handler),
        )
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())))
}
