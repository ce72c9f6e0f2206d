#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Whole-app tests: front page, health, startup, and concurrent writers.

mod common;

use std::sync::Arc;

use axum::http::{StatusCode, header};
use common::{TEST_SECRET, TestApp, body_string, response_json};
use imagedrop_test_utils::{PNG_1X1, assert, patterned_bytes};
use tokio::task::JoinSet;

#[tokio::test]
async fn test_front_page_renders() {
    let app = TestApp::with_env(&[("MAX_FILE_SIZE", "5MB")]).await;

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let html = body_string(response).await;
    assert::contains(&html, "<title>imagedrop</title>");
    assert::contains(&html, "5 MB");
    assert::contains(&html, ".png");
    assert!(!html.contains(".svg"));
    assert!(!html.contains(TEST_SECRET), "page must not embed the secret");
}

#[tokio::test]
async fn test_front_page_lists_svg_when_enabled() {
    let app = TestApp::with_env(&[("ALLOW_SVG", "1")]).await;

    let html = body_string(app.get("/").await).await;
    assert::contains(&html, ".svg");
}

#[tokio::test]
async fn test_health_reports_storage() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"], true);
}

#[tokio::test]
async fn test_health_degrades_when_storage_disappears() {
    let app = TestApp::new().await;
    std::fs::remove_dir_all(app.upload_dir()).unwrap();

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response_json(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn test_startup_creates_upload_dir() {
    let app = TestApp::new().await;
    assert!(app.upload_dir().is_dir());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new().await;
    let response = app.get("/api/nothing").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_uploads_all_land() {
    let app = Arc::new(TestApp::new().await);
    let data = Arc::new(patterned_bytes(32 * 1024));

    let mut tasks = JoinSet::new();
    for i in 0..8 {
        let app = app.clone();
        let data = data.clone();
        tasks.spawn(async move { app.upload_ok(&format!("shot{i}.jpg"), &data).await });
    }

    let mut names = Vec::new();
    while let Some(name) = tasks.join_next().await {
        names.push(name.unwrap());
    }
    names.sort();
    names.dedup();

    assert_eq!(names.len(), 8);
    assert_eq!(app.list().await.len(), 8);
    assert_eq!(app.files_on_disk(), names);
}

#[tokio::test]
async fn test_concurrent_deletes_of_same_file() {
    let app = TestApp::new().await;
    let name = app.upload_ok("race.png", PNG_1X1).await;

    let (first, second) = tokio::join!(
        app.delete(&name, Some(TEST_SECRET)),
        app.delete(&name, Some(TEST_SECRET)),
    );
    let mut statuses = [first.status(), second.status()];
    statuses.sort();

    assert_eq!(statuses, [StatusCode::OK, StatusCode::NOT_FOUND]);
    assert!(app.files_on_disk().is_empty());
}
