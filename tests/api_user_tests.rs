// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP tests for `/api/v1/users` and `/api/v1/health`.

use axum::http::StatusCode;
use radar_tracker::models::User;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{
    create_offline_app, create_test_app, empty_request, json_request, read_json, BERLIN,
};

async fn create(app: &axum::Router, email: &str) -> axum::response::Response {
    app.clone()
        .oneshot(json_request("POST", "/api/v1/users", json!({ "email": email })))
        .await
        .unwrap()
}

async fn get(app: &axum::Router, uri: &str) -> axum::response::Response {
    app.clone().oneshot(empty_request("GET", uri)).await.unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = create_test_app();

    let response = get(&app, "/api/v1/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_health_check_database_down() {
    let (app, _state) = create_offline_app();

    let response = get(&app, "/api/v1/health").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = read_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["error"], "database connection failed");
}

#[tokio::test]
async fn test_create_and_get_user() {
    let (app, _state) = create_test_app();

    let response = create(&app, "alice@example.com").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: User = read_json(response).await;
    assert_eq!(created.email, "alice@example.com");

    let response = get(&app, &format!("/api/v1/users/{}", created.id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: User = read_json(response).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_user_invalid_email() {
    let (app, _state) = create_test_app();

    let response = create(&app, "not-an-email").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_create_user_duplicate_email() {
    let (app, _state) = create_test_app();

    assert_eq!(
        create(&app, "dup@example.com").await.status(),
        StatusCode::CREATED
    );
    let response = create(&app, "dup@example.com").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_list_users_newest_first() {
    let (app, _state) = create_test_app();
    let first: User = read_json(create(&app, "first@example.com").await).await;
    let second: User = read_json(create(&app, "second@example.com").await).await;

    let response = get(&app, "/api/v1/users").await;
    assert_eq!(response.status(), StatusCode::OK);
    let users: Vec<User> = read_json(response).await;
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn test_get_user_invalid_id() {
    let (app, _state) = create_test_app();

    let response = get(&app, "/api/v1/users/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_user_not_found() {
    let (app, _state) = create_test_app();

    let response = get(&app, "/api/v1/users/424242").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_cascades_location() {
    let (app, state) = create_test_app();
    let user: User = read_json(create(&app, "leaving@example.com").await).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/v1/radar/location",
            json!({ "user_id": user.id, "latitude": BERLIN.0, "longitude": BERLIN.1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/v1/users/{}", user.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = read_json(response).await;
    assert_eq!(body["message"], "user deleted successfully");

    assert!(state.locations.get_location(user.id).await.unwrap().is_none());

    let response = get(&app, "/api/v1/radar/nearby?latitude=52.52&longitude=13.405&radius=5").await;
    let body: Value = read_json(response).await;
    assert_eq!(body["count"], 0);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/v1/users/{}", user.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_storage_failure_is_opaque() {
    let (app, _state) = create_offline_app();

    let response = get(&app, "/api/v1/users").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = read_json(response).await;
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_security_headers_on_api_responses() {
    let (app, _state) = create_test_app();

    let response = get(&app, "/api/v1/health").await;
    assert_eq!(response.headers().get("Cache-Control").unwrap(), "no-store");
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
}
