//! Public retrieval of stored files.

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::AppError;
use crate::file::FileError;
use crate::state::AppState;

/// Create the stored-file router.
pub fn router() -> Router<AppState> {
    Router::new().route("/files/{filename}", get(serve_file))
}

/// Serve a stored file.
///
/// GET /files/{filename}
async fn serve_file(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let (file, reader) = match state.files().open(&filename).await {
        Ok(opened) => opened,
        // Invalid names answer like missing ones.
        Err(FileError::InvalidName(_) | FileError::NotFound(_)) => {
            debug!(name = %filename, "stored file not found");
            return not_found();
        }
        Err(e) => return AppError::from(e).into_response(),
    };

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(mime_from_name(&file.name)),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(file.size)),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=86400"),
        ),
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; style-src 'unsafe-inline'; sandbox"),
        ),
    ];

    (
        StatusCode::OK,
        headers,
        Body::from_stream(ReaderStream::new(reader)),
    )
        .into_response()
}

fn not_found() -> Response {
    AppError::NotFound("File not found".to_string()).into_response()
}

fn mime_from_name(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_name() {
        assert_eq!(mime_from_name("a.jpg"), "image/jpeg");
        assert_eq!(mime_from_name("a.JPEG"), "image/jpeg");
        assert_eq!(mime_from_name("a.png"), "image/png");
        assert_eq!(mime_from_name("a.webp"), "image/webp");
        assert_eq!(mime_from_name("a.svg"), "image/svg+xml");
        assert_eq!(mime_from_name("a"), "application/octet-stream");
    }
}
