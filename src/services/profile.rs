// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ESO profile operations.
//!
//! Every method that touches the password takes the session key explicitly.
//! Writes of the encrypted password happen under a per-user lock and only
//! with a key derived from the user's current salt.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{EsoProfile, P2Environment};
use crate::services::crypto::{self, CryptoError, SessionKey};
use crate::services::eso_api::Credentials;
use crate::time_utils::now_rfc3339;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Result of looking up a user's ESO login.
#[derive(Debug)]
pub enum CredentialLookup {
    /// No profile, or the profile lacks a username or password.
    NotConfigured,
    Ready(Credentials),
}

/// Validated profile-edit input.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub p2_environment: P2Environment,
    pub p2_username: String,
    /// `None` keeps the stored password.
    pub p2_password: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    db: FirestoreDb,
    /// Per-user locks serializing credential writes and key changes
    credential_locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ProfileService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            credential_locks: Arc::new(DashMap::new()),
        }
    }

    /// Hold this while reading the key salt and writing the encrypted
    /// password, so a password change cannot interleave. Not reentrant.
    pub async fn lock_user(&self, username: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .credential_locks
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Reject a session key derived from a salt the user no longer has.
    async fn ensure_current_key(&self, username: &str, key_salt: &str) -> Result<(), AppError> {
        let user = self
            .db
            .get_user(username)
            .await?
            .ok_or(AppError::Unauthorized)?;
        if user.key_salt != key_salt {
            tracing::warn!(username, "Session key predates the current password");
            return Err(CryptoError::StaleKey.into());
        }
        Ok(())
    }

    /// Fetch the profile, creating an empty one on first access.
    pub async fn get_or_create(&self, username: &str) -> Result<EsoProfile, AppError> {
        if let Some(profile) = self.db.get_profile(username).await? {
            return Ok(profile);
        }

        let profile = EsoProfile::new(username, &now_rfc3339());
        self.db.upsert_profile(&profile).await?;
        tracing::info!(username, "Created empty ESO profile");
        Ok(profile)
    }

    /// Apply an edit. A submitted password is encrypted under `key`, which
    /// must have been derived with `key_salt`, the user's current salt.
    pub async fn update(
        &self,
        username: &str,
        update: ProfileUpdate,
        key: &SessionKey,
        key_salt: &str,
    ) -> Result<EsoProfile, AppError> {
        let _guard = self.lock_user(username).await;
        self.ensure_current_key(username, key_salt).await?;

        let mut profile = self.get_or_create(username).await?;

        profile.p2_environment = update.p2_environment;
        profile.p2_username = update.p2_username.trim().to_string();
        if let Some(password) = update.p2_password.filter(|p| !p.is_empty()) {
            profile.p2_password_encrypted = Some(crypto::encrypt_field(
                &password,
                key,
                &profile.password_aad(),
            )?);
        }
        profile.updated_at = now_rfc3339();

        self.db.upsert_profile(&profile).await?;
        tracing::info!(
            username,
            environment = %profile.p2_environment,
            "ESO profile updated"
        );
        Ok(profile)
    }

    /// Plaintext password, if one is stored. A wrong key is an error.
    pub fn decrypted_password(
        &self,
        profile: &EsoProfile,
        key: &SessionKey,
    ) -> Result<Option<String>, AppError> {
        profile
            .p2_password_encrypted
            .as_deref()
            .map(|stored| crypto::decrypt_field(stored, key, &profile.password_aad()))
            .transpose()
            .map_err(AppError::from)
    }

    /// The ESO login for a request, decrypted with the caller's session key.
    pub async fn credentials(
        &self,
        username: &str,
        key: &SessionKey,
    ) -> Result<CredentialLookup, AppError> {
        let Some(profile) = self.db.get_profile(username).await? else {
            return Ok(CredentialLookup::NotConfigured);
        };
        if !profile.is_configured() {
            return Ok(CredentialLookup::NotConfigured);
        }

        let password = self
            .decrypted_password(&profile, key)?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Configured profile lost its password")))?;

        Ok(CredentialLookup::Ready(Credentials {
            environment: profile.p2_environment,
            username: profile.p2_username,
            password,
        }))
    }

    /// Re-encrypt the stored password from `old_key` to `new_key`.
    ///
    /// Returns the updated profile without saving it, so the caller can
    /// commit it together with the new password material. `None` when the
    /// user has no profile. The caller must hold [`Self::lock_user`].
    pub async fn reencrypt(
        &self,
        username: &str,
        old_key: &SessionKey,
        new_key: &SessionKey,
    ) -> Result<Option<EsoProfile>, AppError> {
        let Some(mut profile) = self.db.get_profile(username).await? else {
            tracing::info!(username, "No ESO profile to re-encrypt");
            return Ok(None);
        };

        if let Some(stored) = profile.p2_password_encrypted.as_deref() {
            let moved = crypto::reencrypt_field(stored, old_key, new_key, &profile.password_aad())
                .inspect_err(|e| {
                    tracing::error!(username, error = %e, "Re-encryption of ESO password failed");
                })?;
            profile.p2_password_encrypted = Some(moved);
            profile.updated_at = now_rfc3339();
        }

        Ok(Some(profile))
    }
}
