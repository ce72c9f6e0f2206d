//! imagedrop kernel library
//!
//! Exposes the configuration, upload pipeline, and router so the binary and
//! the integration tests build exactly the same application.
//! The main entry point for running the server is the `imagedrop` binary.

pub mod auth;
pub mod config;
pub mod error;
pub mod file;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{Authenticator, SharedSecretAuthenticator};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use file::{FileError, FileService, FileStorage, LocalFileStorage, StoredFile};
pub use state::AppState;
