//! Shared-secret gate for write endpoints.
//!
//! Runs before the handler extracts the request body, so a rejected upload
//! never touches the storage directory.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::auth::UPLOAD_SECRET_HEADER;
use crate::error::AppError;
use crate::state::AppState;

/// Middleware that requires a valid `x-upload-secret` header.
///
/// - Valid secret -> request continues to the handler
/// - Missing, non-UTF-8, or wrong secret -> 401 JSON error
pub async fn require_upload_secret(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let credential = request
        .headers()
        .get(UPLOAD_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    let Some(credential) = credential else {
        debug!(path = %request.uri().path(), "write request without upload secret");
        return AppError::Unauthorized.into_response();
    };

    if !state.authenticator().verify(credential) {
        debug!(path = %request.uri().path(), "write request with invalid upload secret");
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}
