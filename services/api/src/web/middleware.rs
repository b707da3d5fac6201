//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use flashcards_core::PortError;
use std::sync::Arc;
use tracing::{debug, error};

use crate::{error::ApiError, web::state::AppState};

/// Name of the cookie carrying the auth session id.
pub const SESSION_COOKIE: &str = "session";

/// Extracts the auth session id from a `Cookie` header value.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<&str> {
    cookie_header.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .filter(|id| !id.is_empty())
    })
}

/// Middleware that validates the auth session cookie and extracts the user_id.
///
/// If valid, inserts the user_id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Parse session ID from the cookie header
    let auth_session_id = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(session_id_from_cookies)
        .map(str::to_string);

    let Some(auth_session_id) = auth_session_id else {
        debug!("Request without session cookie");
        return ApiError::Port(PortError::Unauthorized).into_response();
    };

    // 2. Validate auth session in database, get user_id
    let user_id = match state.db.validate_auth_session(&auth_session_id).await {
        Ok(user_id) => user_id,
        Err(e) => {
            if !matches!(e, PortError::Unauthorized) {
                error!("Failed to validate auth session: {:?}", e);
            }
            return ApiError::Port(PortError::Unauthorized).into_response();
        }
    };

    // 3. Insert user_id into request extensions and continue to the handler
    req.extensions_mut().insert(user_id);
    next.run(req).await
}
