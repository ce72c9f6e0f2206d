//! Front page route handler.

use anyhow::Context as _;
use axum::{Router, extract::State, response::Html, routing::get};

use crate::config::format_size;
use crate::error::AppResult;
use crate::state::AppState;

/// Create the front page router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(front_page))
}

/// Front page handler.
///
/// Renders the upload form and file browser. The page itself only talks to
/// the JSON API, so everything it shows is also available to scripts.
async fn front_page(State(state): State<AppState>) -> AppResult<Html<String>> {
    let config = state.config();

    let mut context = tera::Context::new();
    context.insert("max_size", &config.max_file_size);
    context.insert("max_size_human", &format_size(config.max_file_size));
    context.insert("allowed_extensions", &config.allowed_extensions());
    context.insert("accept", &config.allowed_extensions().join(","));

    let html = state
        .templates()
        .render("index.html", &context)
        .context("failed to render index page")?;

    Ok(Html(html))
}
