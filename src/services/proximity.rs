// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance and radius filtering.
//!
//! Filtering and the reported `distance_km` both go through [`distance_km`],
//! so every returned candidate satisfies `distance_km <= radius_km`.

use crate::models::LocationRecord;
use geo::{Distance, Haversine, Point};

/// Mean Earth radius used by `geo`'s haversine measure, in kilometers.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

/// Slack added to the latitude band to absorb floating-point rounding.
const BAND_EPSILON_DEG: f64 = 1e-9;

/// Haversine distance between two points, in kilometers.
pub fn distance_km(a: Point<f64>, b: Point<f64>) -> f64 {
    Haversine.distance(a, b) / 1000.0
}

/// Latitude range that contains every point within `radius_km` of `center`.
///
/// Great-circle distance is at least `R * |dlat|`, so nothing outside the
/// band can match. Longitude is left unbounded.
pub fn latitude_band(center: Point<f64>, radius_km: f64) -> (f64, f64) {
    let delta = (radius_km / EARTH_MEAN_RADIUS_KM).to_degrees() + BAND_EPSILON_DEG;
    (
        (center.y() - delta).max(-90.0),
        (center.y() + delta).min(90.0),
    )
}

/// A candidate that passed the radius filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub record: LocationRecord,
    pub distance_km: f64,
}

/// Keep active candidates within `radius_km` of `center`, nearest first.
///
/// Equal distances fall back to record ID, then user ID.
pub fn rank_within<I>(center: Point<f64>, radius_km: f64, candidates: I) -> Vec<Ranked>
where
    I: IntoIterator<Item = LocationRecord>,
{
    let mut ranked: Vec<Ranked> = candidates
        .into_iter()
        .filter(|record| record.is_active)
        .filter_map(|record| {
            let distance_km = distance_km(center, record.point());
            (distance_km <= radius_km).then_some(Ranked {
                record,
                distance_km,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.record.id.cmp(&b.record.id))
            .then_with(|| a.record.user_id.cmp(&b.record.user_id))
    });
    ranked
}
