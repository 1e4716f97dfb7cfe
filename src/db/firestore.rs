// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (platform accounts)
//! - ESO profiles (encrypted ESO credentials, one per user)
//!
//! Without a GCP project the same API is served from an in-memory store,
//! which is what local development and the test suite use.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{EsoProfile, User};
use dashmap::DashMap;
use std::sync::Arc;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

#[derive(Default)]
struct MemoryStore {
    users: DashMap<String, User>,
    profiles: DashMap<String, EsoProfile>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
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
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory database (local development and tests).
    pub fn new_in_memory() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by username.
    pub async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(username)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.users.get(username).map(|u| u.clone())),
        }
    }

    /// Create a user. Fails with `BadRequest` when the username is taken.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let taken = || AppError::BadRequest(format!("Username {} is taken", user.username));

        match &self.backend {
            Backend::Firestore(client) => {
                if self.get_user(&user.username).await?.is_some() {
                    return Err(taken());
                }
                let _: User = client
                    .fluent()
                    .insert()
                    .into(collections::USERS)
                    .document_id(&user.username)
                    .object(user)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => match store.users.entry(user.username.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => Err(taken()),
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(user.clone());
                    Ok(())
                }
            },
        }
    }

    /// Delete a user together with their ESO profile.
    pub async fn delete_user(&self, username: &str) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let mut transaction = client.begin_transaction().await.map_err(|e| {
                    AppError::Database(format!("Failed to begin transaction: {}", e))
                })?;

                for collection in [collections::ESO_PROFILES, collections::USERS] {
                    client
                        .fluent()
                        .delete()
                        .from(collection)
                        .document_id(username)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            AppError::Database(format!(
                                "Failed to add deletion to transaction for {}: {}",
                                collection, e
                            ))
                        })?;
                }

                transaction
                    .commit()
                    .await
                    .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
            }
            Backend::Memory(store) => {
                store.profiles.remove(username);
                store.users.remove(username);
            }
        }

        tracing::info!(username, "User and ESO profile deleted");
        Ok(())
    }

    // ─── ESO Profile Operations ──────────────────────────────────

    /// Get the ESO profile of a user.
    pub async fn get_profile(&self, username: &str) -> Result<Option<EsoProfile>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::ESO_PROFILES)
                .obj()
                .one(username)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.profiles.get(username).map(|p| p.clone())),
        }
    }

    /// Create or update an ESO profile.
    pub async fn upsert_profile(&self, profile: &EsoProfile) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::ESO_PROFILES)
                    .document_id(&profile.username)
                    .object(profile)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
            }
            Backend::Memory(store) => {
                store
                    .profiles
                    .insert(profile.username.clone(), profile.clone());
            }
        }
        Ok(())
    }

    // ─── Password Change ─────────────────────────────────────────

    /// Atomically store a user's new password material and re-encrypted profile.
    ///
    /// Either both documents are written or neither is.
    pub async fn commit_password_change(
        &self,
        user: &User,
        profile: Option<&EsoProfile>,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let mut transaction = client.begin_transaction().await.map_err(|e| {
                    AppError::Database(format!("Failed to begin transaction: {}", e))
                })?;

                client
                    .fluent()
                    .update()
                    .in_col(collections::USERS)
                    .document_id(&user.username)
                    .object(user)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!("Failed to add user to transaction: {}", e))
                    })?;

                if let Some(profile) = profile {
                    client
                        .fluent()
                        .update()
                        .in_col(collections::ESO_PROFILES)
                        .document_id(&profile.username)
                        .object(profile)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| {
                            AppError::Database(format!(
                                "Failed to add profile to transaction: {}",
                                e
                            ))
                        })?;
                }

                transaction
                    .commit()
                    .await
                    .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
            }
            Backend::Memory(store) => {
                store.users.insert(user.username.clone(), user.clone());
                if let Some(profile) = profile {
                    store
                        .profiles
                        .insert(profile.username.clone(), profile.clone());
                }
            }
        }

        tracing::info!(
            username = %user.username,
            profile_reencrypted = profile.is_some(),
            "Password change committed"
        );
        Ok(())
    }
}
