// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-bound encryption of stored ESO credentials.
//!
//! A [`SessionKey`] is derived from the user's platform password at login and
//! lives only in the in-memory session store. Every encrypt/decrypt call takes
//! the key as an explicit argument; nothing here reads it from shared state.
//!
//! Ciphertext layout: `nonce (12 bytes) || AES-256-GCM ciphertext || tag`.
//! Stored fields are the base64 encoding of that blob.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use std::num::NonZeroU32;

/// Length of a derived session key, in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the per-user key-derivation salt, in bytes.
pub const SALT_LEN: usize = 16;

/// Credential encryption errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Session key predates a password change; log in again")]
    StaleKey,

    #[error("Decryption failed: wrong key or tampered ciphertext")]
    Decrypt,

    #[error("Encryption failed")]
    Encrypt,

    #[error("Malformed encrypted field: {0}")]
    Encoding(String),
}

/// Symmetric key bound to one login session.
#[derive(Clone)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Random key, used by tests and benchmarks.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CryptoError::Encrypt)?;
        Ok(Self(bytes))
    }

    fn aead_key(&self) -> Result<LessSafeKey, CryptoError> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.0).map_err(|_| CryptoError::Encrypt)?;
        Ok(LessSafeKey::new(unbound))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(<redacted>)")
    }
}

/// Derive the session key from a platform password (PBKDF2-HMAC-SHA256).
pub fn derive_session_key(password: &str, salt: &[u8], iterations: u32) -> SessionKey {
    let rounds = NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN);
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        rounds,
        salt,
        password.as_bytes(),
        &mut key,
    );
    SessionKey(key)
}

/// Fresh random salt for key derivation.
pub fn generate_salt() -> Result<[u8; SALT_LEN], CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| CryptoError::Encrypt)?;
    Ok(salt)
}

/// Encrypt `plaintext`, binding `aad` into the authentication tag.
pub fn encrypt(plaintext: &str, key: &SessionKey, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| CryptoError::Encrypt)?;

    let mut in_out = plaintext.as_bytes().to_vec();
    key.aead_key()?
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::from(aad),
            &mut in_out,
        )
        .map_err(|_| CryptoError::Encrypt)?;

    let mut output = Vec::with_capacity(NONCE_LEN + in_out.len());
    output.extend_from_slice(&nonce_bytes);
    output.append(&mut in_out);
    Ok(output)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Fails on a wrong key, a different `aad`, truncation or any modified byte.
pub fn decrypt(ciphertext: &[u8], key: &SessionKey, aad: &[u8]) -> Result<String, CryptoError> {
    if ciphertext.len() < NONCE_LEN + AES_256_GCM.tag_len() {
        return Err(CryptoError::Decrypt);
    }

    let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CryptoError::Decrypt)?;

    let mut in_out = sealed.to_vec();
    let plaintext = key
        .aead_key()?
        .open_in_place(nonce, Aad::from(aad), &mut in_out)
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plaintext.to_vec()).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Encrypt and base64-encode for storage.
pub fn encrypt_field(plaintext: &str, key: &SessionKey, aad: &[u8]) -> Result<String, CryptoError> {
    Ok(BASE64.encode(encrypt(plaintext, key, aad)?))
}

/// Decode and decrypt a stored field.
pub fn decrypt_field(stored: &str, key: &SessionKey, aad: &[u8]) -> Result<String, CryptoError> {
    let blob = BASE64
        .decode(stored)
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    decrypt(&blob, key, aad)
}

/// Decrypt under `old_key` and encrypt under `new_key`.
///
/// Nothing is produced unless decryption under `old_key` succeeds.
pub fn reencrypt(
    ciphertext: &[u8],
    old_key: &SessionKey,
    new_key: &SessionKey,
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let plaintext = decrypt(ciphertext, old_key, aad)?;
    encrypt(&plaintext, new_key, aad)
}

/// [`reencrypt`] for a base64 stored field.
pub fn reencrypt_field(
    stored: &str,
    old_key: &SessionKey,
    new_key: &SessionKey,
    aad: &[u8],
) -> Result<String, CryptoError> {
    let blob = BASE64
        .decode(stored)
        .map_err(|e| CryptoError::Encoding(e.to_string()))?;
    Ok(BASE64.encode(reencrypt(&blob, old_key, new_key, aad)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AAD: &[u8] = b"eso_profile:alice";

    #[test]
    fn test_roundtrip() {
        let key = SessionKey::generate().unwrap();
        let ciphertext = encrypt("p2-secret", &key, AAD).unwrap();
        assert_eq!(decrypt(&ciphertext, &key, AAD).unwrap(), "p2-secret");
    }

    #[test]
    fn test_wrong_key_fails() {
        let k1 = SessionKey::from_bytes([0x11; KEY_LEN]);
        let k2 = SessionKey::from_bytes([0x22; KEY_LEN]);
        let ciphertext = encrypt("p2-secret", &k1, AAD).unwrap();
        assert!(matches!(
            decrypt(&ciphertext, &k2, AAD),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = SessionKey::generate().unwrap();
        let ciphertext = encrypt("p2-secret", &key, AAD).unwrap();
        assert!(decrypt(&ciphertext, &key, b"eso_profile:mallory").is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SessionKey::generate().unwrap();
        let mut ciphertext = encrypt("p2-secret", &key, AAD).unwrap();
        ciphertext[NONCE_LEN + 1] ^= 0xFF;
        assert!(decrypt(&ciphertext, &key, AAD).is_err());
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = SessionKey::generate().unwrap();
        assert!(matches!(
            decrypt(&[0u8; NONCE_LEN], &key, AAD),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn test_empty_plaintext_roundtrip() {
        let key = SessionKey::generate().unwrap();
        let ciphertext = encrypt("", &key, AAD).unwrap();
        assert_eq!(ciphertext.len(), NONCE_LEN + AES_256_GCM.tag_len());
        assert_eq!(decrypt(&ciphertext, &key, AAD).unwrap(), "");
    }

    #[test]
    fn test_nonces_differ() {
        let key = SessionKey::generate().unwrap();
        let a = encrypt("same", &key, AAD).unwrap();
        let b = encrypt("same", &key, AAD).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let k1 = derive_session_key("hunter22", &salt, 1_000);
        let k2 = derive_session_key("hunter22", &salt, 1_000);
        let other = derive_session_key("hunter23", &salt, 1_000);

        let ciphertext = encrypt_field("x", &k1, AAD).unwrap();
        assert_eq!(decrypt_field(&ciphertext, &k2, AAD).unwrap(), "x");
        assert!(decrypt_field(&ciphertext, &other, AAD).is_err());
    }

    #[test]
    fn test_reencrypt_moves_to_new_key() {
        let k1 = SessionKey::generate().unwrap();
        let k2 = SessionKey::generate().unwrap();
        let stored = encrypt_field("p2-secret", &k1, AAD).unwrap();

        let moved = reencrypt_field(&stored, &k1, &k2, AAD).unwrap();

        assert_eq!(decrypt_field(&moved, &k2, AAD).unwrap(), "p2-secret");
        assert!(decrypt_field(&moved, &k1, AAD).is_err());
    }

    #[test]
    fn test_reencrypt_with_wrong_old_key_aborts() {
        let k1 = SessionKey::generate().unwrap();
        let k2 = SessionKey::generate().unwrap();
        let stored = encrypt_field("p2-secret", &k1, AAD).unwrap();

        assert!(reencrypt_field(&stored, &k2, &k1, AAD).is_err());
    }

    #[test]
    fn test_reencrypt_raw_blob() {
        let k1 = SessionKey::generate().unwrap();
        let k2 = SessionKey::generate().unwrap();
        let blob = encrypt("p2-secret", &k1, AAD).unwrap();

        let moved = reencrypt(&blob, &k1, &k2, AAD).unwrap();
        assert_eq!(decrypt(&moved, &k2, AAD).unwrap(), "p2-secret");
        assert!(decrypt(&moved, &k1, AAD).is_err());
        assert!(reencrypt(&moved, &k1, &k2, b"eso_profile:bob").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SessionKey::from_bytes([0xAB; KEY_LEN]);
        assert_eq!(format!("{:?}", key), "SessionKey(<redacted>)");
    }

    #[test]
    fn test_malformed_base64() {
        let key = SessionKey::generate().unwrap();
        assert!(matches!(
            decrypt_field("not base64!!", &key, AAD),
            Err(CryptoError::Encoding(_))
        ));
    }
}
