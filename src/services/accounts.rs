// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform accounts: registration, login, password change.
//!
//! Login derives the session key from the plaintext password; it is the only
//! moment the key can be produced. A password change re-encrypts the ESO
//! profile from the old key to the new one before anything is written.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::services::crypto::{self, CryptoError, SessionKey};
use crate::services::password::{hash_password, verify_password};
use crate::services::profile::ProfileService;
use crate::time_utils::now_rfc3339;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::OnceLock;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone)]
pub struct AccountService {
    db: FirestoreDb,
    profiles: ProfileService,
    kdf_iterations: u32,
}

impl AccountService {
    pub fn new(db: FirestoreDb, profiles: ProfileService, kdf_iterations: u32) -> Self {
        Self {
            db,
            profiles,
            kdf_iterations,
        }
    }

    /// Create an account.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AppError> {
        validate_username(username)?;
        validate_password(password)?;

        let (key_salt, _) = self.new_key_material(password)?;
        let user = User {
            username: username.to_string(),
            password_hash: hash_password(password)?,
            key_salt,
            kdf_iterations: self.kdf_iterations,
            created_at: now_rfc3339(),
        };

        self.db.create_user(&user).await?;
        tracing::info!(username, "User registered");
        Ok(user)
    }

    /// Check the password and derive the session key.
    ///
    /// Unknown users and wrong passwords both yield `Unauthorized`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(User, SessionKey), AppError> {
        let Some(user) = self.db.get_user(username).await? else {
            // Same argon2 cost as a real account.
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(password, hash);
            }
            tracing::info!(username, "Login for unknown user");
            return Err(AppError::Unauthorized);
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(username, "Login with wrong password");
            return Err(AppError::Unauthorized);
        }

        let key = session_key_for(&user, password)?;
        Ok((user, key))
    }

    /// Change the password and move the ESO profile to the new key.
    ///
    /// `old_key` is the key of the caller's current session and `old_salt`
    /// the salt it was derived with. A session from before an earlier
    /// password change is rejected as stale. If the stored ESO password
    /// cannot be decrypted with `old_key`, the whole change is aborted and
    /// nothing is written.
    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
        old_key: &SessionKey,
        old_salt: &str,
    ) -> Result<(User, SessionKey), AppError> {
        validate_password(new_password)?;

        let _guard = self.profiles.lock_user(username).await;
        let mut user = self
            .db
            .get_user(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if user.key_salt != old_salt {
            tracing::warn!(username, "Password change from a stale session");
            return Err(CryptoError::StaleKey.into());
        }

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        let (key_salt, new_key) = self.new_key_material(new_password)?;
        let profile = self.profiles.reencrypt(username, old_key, &new_key).await?;

        user.password_hash = hash_password(new_password)?;
        user.key_salt = key_salt;
        user.kdf_iterations = self.kdf_iterations;

        self.db
            .commit_password_change(&user, profile.as_ref())
            .await?;

        Ok((user, new_key))
    }

    /// Delete the account and its ESO profile.
    pub async fn delete(&self, username: &str) -> Result<(), AppError> {
        let _guard = self.profiles.lock_user(username).await;
        self.db.delete_user(username).await
    }

    /// Fresh salt (base64) and the key it yields for `password`.
    fn new_key_material(&self, password: &str) -> Result<(String, SessionKey), AppError> {
        let salt = crypto::generate_salt()?;
        let key = crypto::derive_session_key(password, &salt, self.kdf_iterations);
        Ok((BASE64.encode(salt), key))
    }
}

/// Derive the session key of `user` from their plaintext password.
pub fn session_key_for(user: &User, password: &str) -> Result<SessionKey, AppError> {
    let salt = BASE64
        .decode(&user.key_salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Corrupt key salt: {}", e)))?;
    Ok(crypto::derive_session_key(
        password,
        &salt,
        user.kdf_iterations,
    ))
}

/// Hash checked for logins naming an unknown user.
fn dummy_hash() -> Option<&'static str> {
    static HASH: OnceLock<Option<String>> = OnceLock::new();
    HASH.get_or_init(|| hash_password("unknown-user-placeholder").ok())
        .as_deref()
}

fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AppError::BadRequest(format!(
            "Username must be {}-{} characters",
            MIN_USERNAME_LEN, MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@' | '+'))
    {
        return Err(AppError::BadRequest(
            "Username may only contain letters, digits and . _ - @ +".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
