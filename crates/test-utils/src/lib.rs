//! Imagedrop test utilities.
//!
//! Helpers for integration testing: multipart body builders, small image
//! fixtures, scratch upload directories, and JSON assertion helpers.

#![allow(clippy::expect_used)]

use tempfile::TempDir;
use uuid::Uuid;

/// Smallest valid PNG: a 1x1 transparent pixel.
pub const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Smallest valid GIF: a 1x1 pixel.
pub const GIF_1X1: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00!\xf9\x04\x01\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;";

/// A tiny SVG document.
pub const SVG_DOC: &[u8] =
    br#"<svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"><rect width="1" height="1"/></svg>"#;

/// Deterministic filler bytes of the given length.
///
/// The pattern makes truncation and reordering visible in byte comparisons.
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Create a scratch directory to serve as an upload root.
///
/// The directory is removed when the returned guard drops.
pub fn scratch_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("imagedrop-test-")
        .tempdir()
        .expect("failed to create scratch directory")
}

/// A single part of a multipart/form-data body.
#[derive(Debug, Clone)]
enum Part {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: String,
        data: Vec<u8>,
    },
}

/// Builder for multipart/form-data request bodies.
///
/// ```
/// use imagedrop_test_utils::{MultipartBody, PNG_1X1};
///
/// let (content_type, body) = MultipartBody::new()
///     .file("file", "photo.png", "image/png", PNG_1X1)
///     .build();
/// assert!(content_type.starts_with("multipart/form-data; boundary="));
/// assert!(!body.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// Start an empty body with a random boundary.
    pub fn new() -> Self {
        Self {
            boundary: format!("----TestBoundary{}", Uuid::new_v4().simple()),
            parts: Vec::new(),
        }
    }

    /// Use a fixed boundary.
    pub fn with_boundary(mut self, boundary: &str) -> Self {
        self.boundary = boundary.to_string();
        self
    }

    /// Add a plain text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.parts.push(Part::Text {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Add a file field.
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.parts.push(Part::File {
            name: name.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data: data.to_vec(),
        });
        self
    }

    /// The boundary separating parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Finish the body, returning the Content-Type header value and the bytes.
    pub fn build(self) -> (String, Vec<u8>) {
        let boundary = self.boundary;
        let mut body = Vec::new();

        for part in self.parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match part {
                Part::Text { name, value } => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    data,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
Content-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(&data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        (format!("multipart/form-data; boundary={boundary}"), body)
    }
}

/// Build a body carrying one file in the `file` field.
pub fn single_file(filename: &str, content_type: &str, data: &[u8]) -> (String, Vec<u8>) {
    MultipartBody::new()
        .file("file", filename, content_type, data)
        .build()
}

/// Assertion helpers for JSON responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{}', got: {}",
            key,
            value
        );
    }

    /// Assert that a JSON error body carries the given message.
    pub fn error_message(value: &Value, expected: &str) {
        assert_eq!(
            value.get("error").and_then(Value::as_str),
            Some(expected),
            "Unexpected error body: {}",
            value
        );
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{}'\nActual: {}",
            needle,
            haystack
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_layout() {
        let (content_type, body) = MultipartBody::new()
            .with_boundary("XYZ")
            .text("note", "hi")
            .file("file", "a.png", "image/png", b"abc")
            .build();

        assert_eq!(content_type, "multipart/form-data; boundary=XYZ");
        let text = String::from_utf8(body).unwrap();
        assert_eq!(
            text,
            "--XYZ\r\n\
Content-Disposition: form-data; name=\"note\"\r\n\r\n\
hi\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
Content-Type: image/png\r\n\r\n\
abc\r\n\
--XYZ--\r\n"
        );
    }

    #[test]
    fn test_empty_body_is_just_terminator() {
        let (_, body) = MultipartBody::new().with_boundary("B").build();
        assert_eq!(body, b"--B--\r\n");
    }

    #[test]
    fn test_boundaries_are_unique() {
        assert_ne!(MultipartBody::new().boundary(), MultipartBody::new().boundary());
    }

    #[test]
    fn test_fixtures() {
        assert_eq!(&PNG_1X1[..8], b"\x89PNG\r\n\x1a\n");
        assert!(GIF_1X1.starts_with(b"GIF89a"));
        let bytes = patterned_bytes(600);
        assert_eq!(bytes.len(), 600);
        assert_eq!(bytes[251], 0);
    }

    #[test]
    fn test_scratch_dir_is_removed() {
        let dir = scratch_dir();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_assertions() {
        let json = serde_json::json!({"error": "File not found"});
        assert::has_key(&json, "error");
        assert::error_message(&json, "File not found");
        assert::contains("hello world", "world");
    }
}
