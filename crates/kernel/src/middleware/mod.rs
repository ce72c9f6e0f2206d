//! HTTP middleware components.
//!
//! Provides the shared-secret gate applied to write routes.

pub mod upload_secret;

pub use upload_secret::require_upload_secret;
