// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-user ESO credential profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which ESO Phase 2 deployment a profile talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum P2Environment {
    #[default]
    Demo,
    Production,
    ProductionLasilla,
}

impl P2Environment {
    pub const ALL: [P2Environment; 3] = [
        P2Environment::Demo,
        P2Environment::Production,
        P2Environment::ProductionLasilla,
    ];

    /// Identifier used in forms and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            P2Environment::Demo => "demo",
            P2Environment::Production => "production",
            P2Environment::ProductionLasilla => "production_lasilla",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            P2Environment::Demo => "Demo",
            P2Environment::Production => "Production (Paranal)",
            P2Environment::ProductionLasilla => "Production (La Silla)",
        }
    }

    /// Base URL of the Phase 2 REST API.
    pub fn api_url(&self) -> &'static str {
        match self {
            P2Environment::Demo => "https://www.eso.org/copdemo/api",
            P2Environment::Production => "https://www.eso.org/cop/api",
            P2Environment::ProductionLasilla => "https://www.eso.org/copls/api",
        }
    }

    /// Base URL of the browser-facing P2 tool.
    pub fn p2_tool_url(&self) -> &'static str {
        match self {
            P2Environment::Demo => "https://www.eso.org/p2demo/home",
            P2Environment::Production => "https://www.eso.org/p2/home",
            P2Environment::ProductionLasilla => "https://www.eso.org/p2ls/home",
        }
    }
}

impl fmt::Display for P2Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for P2Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| format!("unknown P2 environment: {}", s))
    }
}

/// ESO credentials of one platform user (document id = platform username).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EsoProfile {
    /// Owning platform user
    pub username: String,
    pub p2_environment: P2Environment,
    /// ESO account name (e.g. "52052")
    #[serde(default)]
    pub p2_username: String,
    /// Encrypted ESO password (base64); only readable with the session key
    #[serde(default)]
    pub p2_password_encrypted: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl EsoProfile {
    /// Empty profile, as created on the first profile-page view.
    pub fn new(username: &str, now: &str) -> Self {
        Self {
            username: username.to_string(),
            p2_environment: P2Environment::default(),
            p2_username: String::new(),
            p2_password_encrypted: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Additional authenticated data binding the ciphertext to this profile.
    pub fn password_aad(&self) -> Vec<u8> {
        format!("eso_profile:{}", self.username).into_bytes()
    }

    pub fn has_password(&self) -> bool {
        self.p2_password_encrypted.is_some()
    }

    /// Both halves of the ESO login are present.
    pub fn is_configured(&self) -> bool {
        !self.p2_username.is_empty() && self.has_password()
    }
}
