//! HTTP route handlers.

pub mod file;
pub mod front;
pub mod health;
pub mod static_files;

use axum::Router;

use crate::state::AppState;

/// Build the application router with every route mounted.
///
/// Cross-cutting layers (tracing, CORS) are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(front::router())
        .merge(health::router())
        .merge(file::router(&state))
        .merge(static_files::router())
        .with_state(state)
}
