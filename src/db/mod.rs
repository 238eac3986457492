// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Two backends implement the same traits: [`MemoryDb`] (in-process maps)
//! and [`FirestoreDb`]. Both key location records by user ID so that a
//! location write is a single keyed operation.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::models::{LocationRecord, NewLocation, User};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness claims (keyed by URL-encoded email)
    pub const USER_EMAILS: &str = "user_emails";
    /// Current user locations (keyed by user_id)
    pub const USER_RADAR: &str = "user_radar";
}

/// Storage-layer failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Backend(String),
}

/// Registered users, as consumed by the radar core and the user routes.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Register a new user. Fails with [`StoreError::Conflict`] on a duplicate email.
    async fn create_user(&self, email: &str) -> Result<User, StoreError>;

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Delete a user and its location. Returns `false` if the user did not exist.
    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError>;

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.get_user(user_id).await?.is_some())
    }

    async fn email_of(&self, user_id: i64) -> Result<Option<String>, StoreError> {
        Ok(self.get_user(user_id).await?.map(|user| user.email))
    }
}

/// One location record per user, with latitude-band candidate retrieval.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Insert or replace the location for `location.user_id` in one keyed write.
    ///
    /// The write only happens while the owning user exists; otherwise nothing
    /// is stored and `None` is returned.
    async fn upsert_location(
        &self,
        location: NewLocation,
    ) -> Result<Option<LocationRecord>, StoreError>;

    async fn get_location(&self, user_id: i64) -> Result<Option<LocationRecord>, StoreError>;

    /// Active records with `min_lat <= latitude <= max_lat`, in record ID order.
    async fn active_locations_between(
        &self,
        min_lat: f64,
        max_lat: f64,
    ) -> Result<Vec<LocationRecord>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Timestamp for a replacement write: never earlier than, and never equal
/// to, the previous `updated_at`.
pub fn next_updated_at(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}
