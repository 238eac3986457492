// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Radar-Tracker: user location tracking and proximity search
//!
//! This crate provides the backend API for registering users, recording
//! each user's current location and finding active users within a radius.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::{Config, StorageBackend};
use db::{FirestoreDb, LocationStore, MemoryDb, StoreError, UserDirectory};
use services::RadarService;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserDirectory>,
    pub locations: Arc<dyn LocationStore>,
    pub radar: RadarService,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserDirectory>,
        locations: Arc<dyn LocationStore>,
    ) -> Self {
        let radar = RadarService::new(users.clone(), locations.clone());
        Self {
            config,
            users,
            locations,
            radar,
        }
    }

    /// State backed by a fresh in-memory database.
    pub fn in_memory(config: Config) -> Self {
        let db = Arc::new(MemoryDb::new());
        Self::new(config, db.clone(), db)
    }

    /// Connect to the backend selected by `config.storage`.
    pub async fn connect(config: Config) -> Result<Self, StoreError> {
        match config.storage {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(config))
            }
            StorageBackend::Firestore => {
                let project_id = config.gcp_project_id.clone().ok_or_else(|| {
                    StoreError::Backend("GCP_PROJECT_ID is required for Firestore".to_string())
                })?;
                let db = Arc::new(FirestoreDb::new(&project_id).await?);
                Ok(Self::new(config, db.clone(), db))
            }
        }
    }
}
