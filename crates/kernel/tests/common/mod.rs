#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Each [`TestApp`] wires the REAL kernel routes and state over its own
//! scratch upload directory, so tests never share files.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use imagedrop_kernel::auth::UPLOAD_SECRET_HEADER;
use imagedrop_kernel::{AppState, Config, routes};
use imagedrop_test_utils::{scratch_dir, single_file};

/// Secret configured for every test app unless overridden.
pub const TEST_SECRET: &str = "test-secret";

/// Public host configured for every test app.
pub const TEST_HOST: &str = "http://files.test";

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    /// Kept alive so the upload directory outlives the app.
    dir: TempDir,
}

impl TestApp {
    /// Create an app with the default test settings.
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Create an app with extra environment overrides.
    ///
    /// `UPLOAD_DIR` always points at a fresh scratch directory.
    pub async fn with_env(overrides: &[(&str, &str)]) -> Self {
        let dir = scratch_dir();

        let mut env: HashMap<String, String> = HashMap::new();
        env.insert("UPLOAD_SECRET".into(), TEST_SECRET.into());
        env.insert("PUBLIC_HOST".into(), TEST_HOST.into());
        for (key, value) in overrides {
            env.insert((*key).to_string(), (*value).to_string());
        }
        env.insert(
            "UPLOAD_DIR".into(),
            dir.path().join("uploads").to_string_lossy().into_owned(),
        );

        let config = Config::from_lookup(|key| env.get(key).cloned()).expect("valid test config");
        let state = AppState::new(&config).await.expect("Failed to create state");
        let router = routes::app(state.clone());

        Self { router, state, dir }
    }

    /// The upload directory on disk.
    pub fn upload_dir(&self) -> PathBuf {
        self.state.config().upload_dir.clone()
    }

    /// Directory containing the upload directory; nothing is served from here.
    pub fn outside_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Names of the regular files currently in the upload directory.
    pub fn files_on_disk(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.upload_dir())
            .expect("upload dir readable")
            .filter_map(Result::ok)
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Send a request to the app.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Upload one file with the given secret (or none).
    pub async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
        secret: Option<&str>,
    ) -> Response {
        let (multipart_type, body) = single_file(filename, content_type, data);
        self.upload_raw(multipart_type, body, secret).await
    }

    /// Upload a pre-built multipart body.
    pub async fn upload_raw(
        &self,
        content_type: String,
        body: Vec<u8>,
        secret: Option<&str>,
    ) -> Response {
        let mut builder = Request::post("/upload").header(header::CONTENT_TYPE, content_type);
        if let Some(secret) = secret {
            builder = builder.header(UPLOAD_SECRET_HEADER, secret);
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }

    /// Upload a file with the test secret and return its stored name.
    pub async fn upload_ok(&self, filename: &str, data: &[u8]) -> String {
        let response = self
            .upload(filename, "application/octet-stream", data, Some(TEST_SECRET))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "upload of {filename} failed");
        let json = response_json(response).await;
        json["file"].as_str().expect("file name in response").to_string()
    }

    /// GET a path.
    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    /// DELETE a stored file by its (already encoded) path segment.
    pub async fn delete(&self, segment: &str, secret: Option<&str>) -> Response {
        let mut builder = Request::delete(format!("/api/files/{segment}"));
        if let Some(secret) = secret {
            builder = builder.header(UPLOAD_SECRET_HEADER, secret);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Fetch and decode the file listing.
    pub async fn list(&self) -> Vec<serde_json::Value> {
        let response = self.get("/api/files").await;
        assert_eq!(response.status(), StatusCode::OK);
        response_json(response)
            .await
            .as_array()
            .expect("listing is an array")
            .clone()
    }
}

/// Collect a response body into bytes.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
        .to_vec()
}

/// Collect a response body into a string.
pub async fn body_string(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).expect("body is UTF-8")
}

/// Collect and parse a JSON response body.
pub async fn response_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body is JSON")
}
