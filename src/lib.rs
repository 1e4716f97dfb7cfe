// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! ESO facility plugin.
//!
//! Stores each user's ESO Phase 2 credentials encrypted under a key derived
//! from their platform password, and serves the htmx fragments that walk an
//! ESO account from observing run to folder to observation block.

pub mod config;
pub mod db;
pub mod error;
pub mod facility;
pub mod forms;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use facility::EsoFacility;
use services::{AccountService, Phase2Connector, ProfileService, SessionStore};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub sessions: SessionStore,
    pub profiles: ProfileService,
    pub accounts: AccountService,
    pub eso: Arc<dyn Phase2Connector>,
    pub facility: EsoFacility,
}

impl AppState {
    pub fn new(config: Config, db: FirestoreDb, eso: Arc<dyn Phase2Connector>) -> Self {
        let profiles = ProfileService::new(db.clone());
        let accounts = AccountService::new(db.clone(), profiles.clone(), config.kdf_iterations);
        let sessions = SessionStore::new(config.session_ttl_hours);
        Self {
            config,
            db,
            sessions,
            profiles,
            accounts,
            eso,
            facility: EsoFacility,
        }
    }
}
