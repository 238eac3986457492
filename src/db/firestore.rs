// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, keyed by user ID)
//! - User emails (uniqueness claims, keyed by URL-encoded email)
//! - User radar (current location, keyed by user ID)

use crate::db::{collections, next_updated_at, LocationStore, StoreError, UserDirectory};
use crate::models::{LocationRecord, NewLocation, User};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreConsistencySelector;
use serde::{Deserialize, Serialize};

/// Document ID used by the health probe. Never written.
const HEALTH_PROBE_ID: &str = "__health__";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Marks an email as taken by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmailClaim {
    user_id: i64,
}

/// Tries at allocating a user ID before giving up.
const USER_ID_ATTEMPTS: usize = 2;

/// Firestore has no sequences; user IDs are the clock in microseconds,
/// always past the ID that just collided.
fn next_user_id(taken: Option<i64>, now: chrono::DateTime<chrono::Utc>) -> i64 {
    let candidate = now.timestamp_micros();
    match taken {
        Some(taken) if candidate <= taken => taken + 1,
        _ => candidate,
    }
}

fn email_doc_id(email: &str) -> String {
    urlencoding::encode(email).into_owned()
}

fn db_err(e: FirestoreError) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }

    /// Remove an email claim, logging instead of failing.
    async fn release_email(&self, email: &str) {
        let result = match self.get_client() {
            Ok(client) => client
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(email_doc_id(email))
                .execute()
                .await
                .map_err(db_err),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to release email claim");
        }
    }

    /// Insert a user whose email is already claimed, starting at `user_id`.
    ///
    /// A user ID collision is retried once with a later ID, re-pointing the
    /// email claim first. Any other failure releases the claim.
    async fn insert_claimed_user(
        &self,
        client: &firestore::FirestoreDb,
        email: &str,
        user_id: i64,
    ) -> Result<User, StoreError> {
        let now = chrono::Utc::now();
        let mut user = User {
            id: user_id,
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        };

        for attempt in 1..=USER_ID_ATTEMPTS {
            let created: Result<User, FirestoreError> = client
                .fluent()
                .insert()
                .into(collections::USERS)
                .document_id(user.id.to_string())
                .object(&user)
                .execute()
                .await;

            let err = match created {
                Ok(created) => {
                    tracing::debug!(user_id = created.id, attempt, "User created");
                    return Ok(created);
                }
                Err(FirestoreError::DataConflictError(_)) if attempt < USER_ID_ATTEMPTS => {
                    let taken = user.id;
                    user.id = next_user_id(Some(taken), chrono::Utc::now());
                    tracing::warn!(taken, user_id = user.id, "User ID collision, retrying");

                    let repointed: Result<EmailClaim, FirestoreError> = client
                        .fluent()
                        .update()
                        .in_col(collections::USER_EMAILS)
                        .document_id(email_doc_id(email))
                        .object(&EmailClaim { user_id: user.id })
                        .execute()
                        .await;
                    match repointed {
                        Ok(_) => continue,
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            self.release_email(email).await;
            return Err(db_err(err));
        }

        self.release_email(email).await;
        Err(StoreError::Backend(format!(
            "No free user ID after {} attempts",
            USER_ID_ATTEMPTS
        )))
    }
}

#[async_trait]
impl UserDirectory for FirestoreDb {
    /// Create a user.
    ///
    /// The email claim is inserted first with create-only semantics, so two
    /// concurrent registrations of the same email cannot both succeed.
    async fn create_user(&self, email: &str) -> Result<User, StoreError> {
        let client = self.get_client()?;
        let user_id = next_user_id(None, chrono::Utc::now());

        let claim: Result<EmailClaim, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USER_EMAILS)
            .document_id(email_doc_id(email))
            .object(&EmailClaim { user_id })
            .execute()
            .await;
        match claim {
            Ok(_) => {}
            Err(FirestoreError::DataConflictError(_)) => {
                return Err(StoreError::Conflict(format!(
                    "Email {} is already registered",
                    email
                )));
            }
            Err(e) => return Err(db_err(e)),
        }

        self.insert_claimed_user(client, email, user_id).await
    }

    /// Get a user by ID.
    async fn get_user(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(db_err)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        // Timestamps are stored as strings; order in process.
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    /// Delete a user together with its email claim and location.
    ///
    /// All three deletes commit in one transaction.
    async fn delete_user(&self, user_id: i64) -> Result<bool, StoreError> {
        let Some(user) = self.get_user(user_id).await? else {
            return Ok(false);
        };
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        let deletions = [
            (collections::USER_RADAR, user_id.to_string()),
            (collections::USER_EMAILS, email_doc_id(&user.email)),
            (collections::USERS, user_id.to_string()),
        ];
        for (collection, doc_id) in &deletions {
            client
                .fluent()
                .delete()
                .from(*collection)
                .document_id(doc_id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    StoreError::Backend(format!(
                        "Failed to add deletion to transaction for {}: {}",
                        collection, e
                    ))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Backend(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(user_id, "User and location deleted");
        Ok(true)
    }
}

#[async_trait]
impl LocationStore for FirestoreDb {
    /// Create or replace a user's location.
    ///
    /// The document ID is the user ID, so the write itself is the per-user
    /// atomic upsert. The owning user and the prior document are read inside
    /// the same transaction as the write; a concurrent `delete_user` touches
    /// the user document, so one of the two commits fails rather than leaving
    /// a location behind for a deleted user.
    async fn upsert_location(
        &self,
        location: NewLocation,
    ) -> Result<Option<LocationRecord>, StoreError> {
        let client = self.get_client()?;
        let doc_id = location.user_id.to_string();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;
        let reader = client.clone_with_consistency_selector(
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
        );

        let owner: Option<User> = reader
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to read user in transaction: {}", e)))?;
        if owner.is_none() {
            let _ = transaction.rollback().await;
            return Ok(None);
        }

        let previous: Option<LocationRecord> = reader
            .fluent()
            .select()
            .by_id_in(collections::USER_RADAR)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| {
                StoreError::Backend(format!("Failed to read location in transaction: {}", e))
            })?;
        let now = chrono::Utc::now();

        let record = LocationRecord {
            id: location.user_id,
            user_id: location.user_id,
            latitude: location.latitude,
            longitude: location.longitude,
            is_active: location.is_active,
            created_at: previous.as_ref().map_or(now, |p| p.created_at),
            updated_at: next_updated_at(previous.map(|p| p.updated_at), now),
        };

        client
            .fluent()
            .update()
            .in_col(collections::USER_RADAR)
            .document_id(&doc_id)
            .object(&record)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add location to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::Backend(format!("Transaction commit failed: {}", e)))?;

        Ok(Some(record))
    }

    async fn get_location(&self, user_id: i64) -> Result<Option<LocationRecord>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_RADAR)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(db_err)
    }

    async fn active_locations_between(
        &self,
        min_lat: f64,
        max_lat: f64,
    ) -> Result<Vec<LocationRecord>, StoreError> {
        let mut records: Vec<LocationRecord> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_RADAR)
            .filter(move |q| {
                q.for_all([
                    q.field("is_active").eq(true),
                    q.field("latitude").greater_than_or_equal(min_lat),
                    q.field("latitude").less_than_or_equal(max_lat),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_err)?;
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let _: Option<User> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(HEALTH_PROBE_ID)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
