// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use radar_tracker::db::StoreError;
use radar_tracker::error::AppError;
use radar_tracker::services::RadarError;

#[test]
fn test_radar_errors_map_to_distinct_statuses() {
    let validation: AppError = RadarError::Validation("latitude out of range".to_string()).into();
    assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);

    let not_found: AppError = RadarError::UserNotFound(99999).into();
    assert!(matches!(&not_found, AppError::NotFound(msg) if msg.contains("99999")));
    assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

    let storage: AppError =
        RadarError::Storage(StoreError::Backend("connection reset".to_string())).into();
    assert_eq!(
        storage.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_store_conflict_maps_to_409() {
    let err: AppError = StoreError::Conflict("Email taken".to_string()).into();
    assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
}

#[test]
fn test_internal_error_from_anyhow() {
    let err: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(
        err.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}
