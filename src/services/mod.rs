// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod crypto;
pub mod eso_api;
pub mod password;
pub mod profile;
pub mod sessions;

pub use accounts::AccountService;
pub use eso_api::{EsoApiConnector, Phase2Api, Phase2Connector};
pub use profile::{CredentialLookup, ProfileService};
pub use sessions::SessionStore;
