// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location reporting and proximity search routes.

use crate::error::{AppError, Result};
use crate::models::{LocationRecord, NearbyQuery, NearbyResponse, UpdateLocationRequest};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/radar/location", post(update_location))
        .route("/radar/nearby", get(get_nearby_users))
}

/// Create or replace the caller's current location.
async fn update_location(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<UpdateLocationRequest>, JsonRejection>,
) -> Result<Json<LocationRecord>> {
    let Json(req) = payload?;
    req.validate()?;

    // Runs to completion even if the client disconnects mid-write.
    let radar = state.radar.clone();
    let record = tokio::spawn(async move { radar.upsert_location(&req).await })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Location update task failed: {}", e)))??;

    Ok(Json(record))
}

/// Active users within `radius` km of (`latitude`, `longitude`), nearest first.
async fn get_nearby_users(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<NearbyQuery>, QueryRejection>,
) -> Result<Json<NearbyResponse>> {
    let Query(query) = query?;
    query.validate()?;

    let nearby = state
        .radar
        .find_active_within(query.latitude, query.longitude, query.radius)
        .await?;
    Ok(Json(nearby))
}
