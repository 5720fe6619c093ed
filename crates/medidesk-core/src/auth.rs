//! Password hashing and authenticated sessions.
//!
//! Stored format: `pbkdf2-sha256$<iterations>$<salt hex>$<key hex>`.
//! Rows written before hashing was introduced hold the plain password; those
//! still verify, and the caller is told to rehash them.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::models::Staff;

pub const HASH_SCHEME: &str = "pbkdf2-sha256";
pub const SALT_LENGTH: usize = 16;
pub const KEY_LENGTH: usize = 32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PasswordError {
    #[error("Malformed password hash: {0}")]
    Malformed(String),
}

/// Outcome of checking a password against its stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    /// Matched a legacy plain-text value; store a fresh hash.
    ValidLegacy,
    Invalid,
}

impl Verification {
    pub fn is_valid(self) -> bool {
        !matches!(self, Verification::Invalid)
    }
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    hash_with_salt(password, &salt, iterations)
}

fn hash_with_salt(password: &str, salt: &[u8], iterations: u32) -> String {
    let key = derive(password, salt, iterations);
    format!(
        "{}${}${}${}",
        HASH_SCHEME,
        iterations,
        hex::encode(salt),
        hex::encode(key)
    )
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LENGTH] {
    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

/// Whether a stored value is already in hashed form.
pub fn is_hashed(stored: &str) -> bool {
    stored.starts_with(HASH_SCHEME) && stored[HASH_SCHEME.len()..].starts_with('$')
}

/// Check `password` against a stored value in constant time.
pub fn verify_password(password: &str, stored: &str) -> Result<Verification, PasswordError> {
    if !is_hashed(stored) {
        let matches: bool = password.as_bytes().ct_eq(stored.as_bytes()).into();
        return Ok(if matches {
            Verification::ValidLegacy
        } else {
            Verification::Invalid
        });
    }

    let mut parts = stored.splitn(4, '$').skip(1);
    let (iterations, salt, key) = match (parts.next(), parts.next(), parts.next()) {
        (Some(i), Some(s), Some(k)) => (i, s, k),
        _ => return Err(PasswordError::Malformed("missing fields".into())),
    };
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| PasswordError::Malformed(format!("bad iteration count {:?}", iterations)))?;
    if iterations == 0 {
        return Err(PasswordError::Malformed("zero iterations".into()));
    }
    let salt = hex::decode(salt).map_err(|e| PasswordError::Malformed(e.to_string()))?;
    let expected = hex::decode(key).map_err(|e| PasswordError::Malformed(e.to_string()))?;

    let actual = derive(password, &salt, iterations);
    if actual.as_slice().ct_eq(expected.as_slice()).into() {
        Ok(Verification::Valid)
    } else {
        Ok(Verification::Invalid)
    }
}

/// Identity of the staff member behind a request.
///
/// Returned by login and handed back by the shell on every call that needs
/// an actor; nothing is kept in process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Session {
    #[serde(rename = "ID")]
    pub staff_id: i64,
    #[serde(rename = "Login")]
    pub login: String,
    #[serde(rename = "Nom")]
    pub display_name: String,
    /// Role, used by the shell to pick a dashboard
    #[serde(rename = "Type", default)]
    pub role: Option<String>,
    #[serde(rename = "Droit", default)]
    pub permission: Option<String>,
    pub started_at: String,
}

impl Session {
    pub fn for_staff(staff_id: i64, staff: &Staff) -> Self {
        Self {
            staff_id,
            login: staff.login.clone(),
            display_name: staff.display_name(),
            role: staff.role.clone(),
            permission: staff.permission.clone(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("zehri", FAST);
        assert!(is_hashed(&stored));
        assert!(!stored.contains("zehri"));
        assert_eq!(verify_password("zehri", &stored), Ok(Verification::Valid));
        assert_eq!(verify_password("wrong", &stored), Ok(Verification::Invalid));
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same", FAST);
        let b = hash_password("same", FAST);
        assert_ne!(a, b);
    }

    #[test]
    fn deterministic_with_fixed_salt() {
        let a = hash_with_salt("pw", &[7u8; SALT_LENGTH], FAST);
        let b = hash_with_salt("pw", &[7u8; SALT_LENGTH], FAST);
        assert_eq!(a, b);
        assert!(a.starts_with("pbkdf2-sha256$1000$"));
    }

    #[test]
    fn legacy_plaintext_flagged() {
        assert_eq!(verify_password("zehri", "zehri"), Ok(Verification::ValidLegacy));
        assert_eq!(verify_password("zehri", "other"), Ok(Verification::Invalid));
    }

    #[test]
    fn malformed_hash_rejected() {
        assert!(verify_password("pw", "pbkdf2-sha256$abc$00$00").is_err());
        assert!(verify_password("pw", "pbkdf2-sha256$10").is_err());
        assert!(verify_password("pw", "pbkdf2-sha256$10$zz$00").is_err());
    }
}
