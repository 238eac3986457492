// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Location records and proximity query models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// The single current location of one user.
///
/// Stored in `user_radar`, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationRecord {
    /// Record ID
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    /// Owning user (unique)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Inactive records are kept but never returned by proximity queries
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocationRecord {
    pub fn point(&self) -> geo::Point<f64> {
        geo::Point::new(self.longitude, self.latitude)
    }
}

/// A validated location write handed to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewLocation {
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
}

/// Body of `POST /api/v1/radar/location`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    pub user_id: i64,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Defaults to `true` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Query string of `GET /api/v1/radar/nearby`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NearbyQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    /// Search radius in kilometers
    #[validate(range(min = 0.0))]
    pub radius: f64,
}

/// One user found by a proximity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NearbyMatch {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: i64,
    pub email: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_km: f64,
    pub last_update_at: DateTime<Utc>,
}

/// Proximity query result, ordered by ascending distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NearbyResponse {
    pub count: usize,
    pub users: Vec<NearbyMatch>,
}

impl From<Vec<NearbyMatch>> for NearbyResponse {
    fn from(users: Vec<NearbyMatch>) -> Self {
        Self {
            count: users.len(),
            users,
        }
    }
}
