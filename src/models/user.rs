//! Platform user account.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore (document id = username).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Login name, unique
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    /// Salt for deriving the session key (base64)
    pub key_salt: String,
    /// PBKDF2 rounds used with `key_salt`
    pub kdf_iterations: u32,
    /// When the account was created
    pub created_at: String,
}
