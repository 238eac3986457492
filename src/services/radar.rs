// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location upsert and proximity search.
//!
//! Input is validated before anything touches the store. Upserts then check
//! that the user exists and hand a single keyed write to the
//! [`LocationStore`], which only writes while the user still exists.
//! Proximity searches fetch a latitude band of active
//! candidates, rank them with [`rank_within`] and attach each user's email.

use crate::db::{LocationStore, StoreError, UserDirectory};
use crate::models::{LocationRecord, NearbyMatch, NearbyResponse, NewLocation, UpdateLocationRequest};
use crate::services::proximity::{latitude_band, rank_within};
use futures_util::{stream, StreamExt};
use geo::Point;
use std::sync::Arc;

/// Upper bound on concurrent email lookups for one query.
const MAX_CONCURRENT_LOOKUPS: usize = 16;

/// Errors from radar operations.
#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    #[error("{0}")]
    Validation(String),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

fn validate_coordinate(latitude: f64, longitude: f64) -> Result<(), RadarError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(RadarError::Validation(format!(
            "latitude must be between -90 and 90, got {}",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(RadarError::Validation(format!(
            "longitude must be between -180 and 180, got {}",
            longitude
        )));
    }
    Ok(())
}

fn validate_radius(radius_km: f64) -> Result<(), RadarError> {
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Err(RadarError::Validation(format!(
            "radius must be a non-negative number of kilometers, got {}",
            radius_km
        )));
    }
    Ok(())
}

/// Location tracking service.
///
/// Holds no mutable state of its own; clones share the same backends.
#[derive(Clone)]
pub struct RadarService {
    users: Arc<dyn UserDirectory>,
    locations: Arc<dyn LocationStore>,
}

impl RadarService {
    pub fn new(users: Arc<dyn UserDirectory>, locations: Arc<dyn LocationStore>) -> Self {
        Self { users, locations }
    }

    /// Create or replace the reporting user's location.
    ///
    /// `is_active` defaults to `true`.
    pub async fn upsert_location(
        &self,
        req: &UpdateLocationRequest,
    ) -> Result<LocationRecord, RadarError> {
        validate_coordinate(req.latitude, req.longitude)?;

        if !self.users.user_exists(req.user_id).await? {
            return Err(RadarError::UserNotFound(req.user_id));
        }

        // The store re-checks the user atomically with the write, which
        // catches a delete that lands after the check above.
        let record = self
            .locations
            .upsert_location(NewLocation {
                user_id: req.user_id,
                latitude: req.latitude,
                longitude: req.longitude,
                is_active: req.is_active.unwrap_or(true),
            })
            .await?
            .ok_or(RadarError::UserNotFound(req.user_id))?;

        tracing::info!(
            user_id = record.user_id,
            is_active = record.is_active,
            "Location updated"
        );
        Ok(record)
    }

    /// Find active users within `radius_km` of a center point, nearest first.
    pub async fn find_active_within(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> Result<NearbyResponse, RadarError> {
        validate_coordinate(latitude, longitude)?;
        validate_radius(radius_km)?;

        let center = Point::new(longitude, latitude);
        let (min_lat, max_lat) = latitude_band(center, radius_km);
        let candidates = self
            .locations
            .active_locations_between(min_lat, max_lat)
            .await?;
        let candidate_count = candidates.len();
        let ranked = rank_within(center, radius_km, candidates);

        let users = self.users.as_ref();
        let matches = stream::iter(ranked)
            .map(|ranked| async move {
                let email = users.email_of(ranked.record.user_id).await?;
                // A user deleted mid-query drops out, as with an inner join
                Ok::<_, StoreError>(email.map(|email| NearbyMatch {
                    user_id: ranked.record.user_id,
                    email,
                    latitude: ranked.record.latitude,
                    longitude: ranked.record.longitude,
                    distance_km: ranked.distance_km,
                    last_update_at: ranked.record.updated_at,
                }))
            })
            .buffered(MAX_CONCURRENT_LOOKUPS)
            .collect::<Vec<Result<Option<NearbyMatch>, StoreError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<NearbyMatch>>, StoreError>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        tracing::debug!(
            latitude,
            longitude,
            radius_km,
            candidates = candidate_count,
            matches = matches.len(),
            "Proximity query"
        );
        Ok(NearbyResponse::from(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinate_bounds_inclusive() {
        assert!(validate_coordinate(90.0, 180.0).is_ok());
        assert!(validate_coordinate(-90.0, -180.0).is_ok());
        assert!(validate_coordinate(90.0001, 0.0).is_err());
        assert!(validate_coordinate(0.0, -180.0001).is_err());
        assert!(validate_coordinate(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_validate_radius() {
        assert!(validate_radius(0.0).is_ok());
        assert!(validate_radius(12.5).is_ok());
        assert!(validate_radius(-10.0).is_err());
        assert!(validate_radius(f64::NAN).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }
}
