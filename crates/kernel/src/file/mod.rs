//! File storage and the upload pipeline.
//!
//! Provides file upload, listing, retrieval, and deletion over a flat
//! storage directory.

pub mod service;
pub mod storage;

pub use service::{
    FileError, FileService, StoredFile, generate_storage_name, validate_stored_name,
};
pub use storage::{FileReader, FileStorage, LocalFileStorage, PendingWrite, StoredEntry};
