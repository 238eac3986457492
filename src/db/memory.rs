// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process storage backend.
//!
//! Writes for one key go through a single `DashMap` entry, which holds the
//! shard lock for the duration of the insert-or-replace.
//!
//! Lock order is `locations` before `users`. A location upsert checks the
//! user while holding its location entry, and `delete_user` takes that same
//! entry before removing the user, so a location can never outlive its user.

use crate::db::{next_updated_at, LocationStore, StoreError, UserDirectory};
use crate::models::{LocationRecord, NewLocation, User};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// In-memory database. Clones share the same maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Tables>,
}

#[derive(Default)]
struct Tables {
    users: DashMap<i64, User>,
    /// email -> user_id
    emails: DashMap<String, i64>,
    /// user_id -> location
    locations: DashMap<i64, LocationRecord>,
    user_seq: AtomicI64,
    location_seq: AtomicI64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of location records held for a user (0 or 1).
    pub fn location_count_for_user(&self, user_id: i64) -> usize {
        usize::from(self.inner.locations.contains_key(&user_id))
    }

    /// Total number of location records.
    pub fn location_count(&self) -> usize {
        self.inner.locations.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryDb {
    async fn create_user(&self, email: &str) -> Result<User, StoreError> {
        match self.inner.emails.entry(email.to_string()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "Email {} is already registered",
                email
            ))),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let user = User {
                    id: self.inner.user_seq.fetch_add(1, Ordering::SeqCst) + 1,
                    email: email.to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.inner.users.insert(user.id, user.clone());
                slot.insert(user.id);

                tracing::debug!(user_id = user.id, "User created");
                Ok(user)
            }
        }
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.inner.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .inner
            .users
            .iter()
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError> {
        let location = self.inner.locations.entry(user_id);
        let Some((_, user)) = self.inner.users.remove(&user_id) else {
            return Ok(false);
        };
        self.inner.emails.remove(&user.email);
        let had_location = match location {
            Entry::Occupied(slot) => {
                slot.remove();
                true
            }
            Entry::Vacant(_) => false,
        };

        tracing::debug!(user_id, had_location, "User deleted");
        Ok(true)
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.users.contains_key(&user_id))
    }
}

#[async_trait]
impl LocationStore for MemoryDb {
    async fn upsert_location(
        &self,
        location: NewLocation,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let now = Utc::now();

        let slot = self.inner.locations.entry(location.user_id);
        if !self.inner.users.contains_key(&location.user_id) {
            return Ok(None);
        }

        let record = match slot {
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                record.latitude = location.latitude;
                record.longitude = location.longitude;
                record.is_active = location.is_active;
                record.updated_at = next_updated_at(Some(record.updated_at), now);
                record.clone()
            }
            Entry::Vacant(slot) => {
                let record = LocationRecord {
                    id: self.inner.location_seq.fetch_add(1, Ordering::SeqCst) + 1,
                    user_id: location.user_id,
                    latitude: location.latitude,
                    longitude: location.longitude,
                    is_active: location.is_active,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(record.clone());
                record
            }
        };

        Ok(Some(record))
    }

    async fn get_location(&self, user_id: i64) -> Result<Option<LocationRecord>, StoreError> {
        Ok(self.inner.locations.get(&user_id).map(|r| r.value().clone()))
    }

    async fn active_locations_between(
        &self,
        min_lat: f64,
        max_lat: f64,
    ) -> Result<Vec<LocationRecord>, StoreError> {
        let mut records: Vec<LocationRecord> = self
            .inner
            .locations
            .iter()
            .filter(|r| r.is_active && r.latitude >= min_lat && r.latitude <= max_lat)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
