//! File upload, listing, and deletion route handlers.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header},
    middleware,
    routing::{delete, get, post},
};
use serde::Serialize;
use tokio_stream::StreamExt;

use crate::config::MULTIPART_OVERHEAD;
use crate::error::AppResult;
use crate::file::{FileError, StoredFile};
use crate::middleware::require_upload_secret;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// Create the file router.
///
/// Write routes sit behind the upload-secret gate; listing is public.
pub fn router(state: &AppState) -> Router<AppState> {
    let gate = middleware::from_fn_with_state(state.clone(), require_upload_secret);

    Router::new()
        .route(
            "/upload",
            post(upload_file)
                .layer(DefaultBodyLimit::max(state.config().request_body_limit()))
                .route_layer(gate.clone()),
        )
        .route("/api/files", get(list_files))
        .route("/api/files/{filename}", delete(delete_file).route_layer(gate))
}

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub file: String,
    pub url: String,
}

/// Plain confirmation message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Upload a file.
///
/// POST /upload
/// Header: x-upload-secret
/// Content-Type: multipart/form-data
///
/// Form fields:
/// - file: The file to upload
async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let limit = state.config().max_file_size;

    // Reject oversized requests from the declared length before reading anything.
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit.saturating_add(MULTIPART_OVERHEAD)) {
        return Err(FileError::TooLarge { limit }.into());
    }

    // A body that is not multipart at all carries no file field.
    let Ok(mut multipart) = multipart else {
        return Err(FileError::NoFile.into());
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(filename) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            return Err(FileError::NoFile.into());
        };

        let body = field.map(move |chunk| chunk.map_err(|e| multipart_error(e, limit)));
        let stored = state.files().upload(&filename, body).await?;

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully",
            file: stored.name,
            url: stored.url,
        }));
    }

    Err(FileError::NoFile.into())
}

/// List stored files, newest first.
///
/// GET /api/files
async fn list_files(State(state): State<AppState>) -> AppResult<Json<Vec<StoredFile>>> {
    let files = state.files().list().await?;
    Ok(Json(files))
}

/// Delete a stored file.
///
/// DELETE /api/files/{filename}
/// Header: x-upload-secret
async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.files().delete(&filename).await?;
    Ok(Json(MessageResponse {
        message: "File deleted successfully",
    }))
}

/// Map a multipart parsing failure onto the upload error taxonomy.
fn multipart_error(err: MultipartError, limit: u64) -> FileError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FileError::TooLarge { limit }
    } else {
        FileError::Malformed(err.body_text())
    }
}
