//! Application error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::config::format_size;
use crate::file::FileError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("File too large. Maximum size is {}", human_limit(.limit))]
    PayloadTooLarge { limit: u64 },
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NoFile => AppError::BadRequest("No file uploaded".to_string()),
            FileError::UnsupportedType(_) => {
                AppError::BadRequest("Unsupported file type".to_string())
            }
            FileError::InvalidName(_) => AppError::BadRequest("Invalid file name".to_string()),
            FileError::Malformed(reason) => AppError::BadRequest(reason),
            FileError::TooLarge { limit } => AppError::PayloadTooLarge { limit },
            FileError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            FileError::Storage(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        };

        // Internal details go to the log, never to the client.
        let body = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal server error");
                json!({ "error": "Internal server error" })
            }
            AppError::PayloadTooLarge { limit } => json!({
                "error": self.to_string(),
                "max_size": limit,
                "max_size_human": format_size(*limit),
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

fn human_limit(limit: &u64) -> String {
    format_size(*limit)
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("File not found".into())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::PayloadTooLarge { limit: 1024 }
                .into_response()
                .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("disk on fire"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_file_errors_map_to_taxonomy() {
        assert!(matches!(
            AppError::from(FileError::UnsupportedType(".exe".into())),
            AppError::BadRequest(msg) if msg == "Unsupported file type"
        ));
        assert!(matches!(
            AppError::from(FileError::NoFile),
            AppError::BadRequest(msg) if msg == "No file uploaded"
        ));
        assert!(matches!(
            AppError::from(FileError::TooLarge { limit: 10 }),
            AppError::PayloadTooLarge { limit: 10 }
        ));
        assert!(matches!(
            AppError::from(FileError::NotFound("x.png".into())),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_too_large_message_is_human_readable() {
        let err = AppError::PayloadTooLarge {
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(err.to_string(), "File too large. Maximum size is 10 MB");
    }
}
