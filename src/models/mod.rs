// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod location;
pub mod user;

pub use location::{
    LocationRecord, NearbyMatch, NearbyQuery, NearbyResponse, NewLocation, UpdateLocationRequest,
};
pub use user::{CreateUserRequest, User};
