// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory login sessions.
//!
//! Each session holds the key that unlocks the user's stored ESO password.
//! The map lives only in process memory, so a restart logs everyone out and
//! the keys are gone with it.

use crate::services::crypto::{CryptoError, SessionKey};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

/// One authenticated login.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub key: SessionKey,
    /// Salt `key` was derived with; a later password change replaces it.
    pub key_salt: String,
    pub expires_at: DateTime<Utc>,
}

/// Shared session map, cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Start a session and return its opaque id.
    pub fn create(
        &self,
        username: &str,
        key: SessionKey,
        key_salt: &str,
    ) -> Result<String, CryptoError> {
        let mut id_bytes = [0u8; 32];
        SystemRandom::new()
            .fill(&mut id_bytes)
            .map_err(|_| CryptoError::Encrypt)?;
        let session_id = URL_SAFE_NO_PAD.encode(id_bytes);

        self.sessions.insert(
            session_id.clone(),
            Session {
                username: username.to_string(),
                key,
                key_salt: key_salt.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        tracing::debug!(username, "Session created");
        Ok(session_id)
    }

    /// Look up a live session; expired entries are dropped on access.
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let session = self.sessions.get(session_id)?.clone();
        if session.expires_at <= Utc::now() {
            self.sessions.remove(session_id);
            return None;
        }
        Some(session)
    }

    pub fn revoke(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    /// End every session of `username` (password change, account deletion).
    pub fn revoke_user(&self, username: &str) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.username != username);
        let revoked = before.saturating_sub(self.sessions.len());
        tracing::info!(username, revoked, "Revoked user sessions");
        revoked
    }

    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.expires_at > now);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
