//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// ESO credential profiles (keyed by platform username)
    pub const ESO_PROFILES: &str = "eso_profiles";
}
