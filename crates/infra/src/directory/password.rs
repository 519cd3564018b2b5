//! Argon2id password hashing shared by the shipped directories.
//!
//! Stored hashes use the PHC string format, so the parameters travel with
//! the hash and verification works regardless of the profile that wrote it.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};

use anteroom_accounts::StoreError;

/// Hashing cost profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HashProfile {
    /// Argon2id defaults. Use for real accounts.
    Interactive,
    /// Reduced memory/time cost. Only for the in-memory tests/dev store.
    Fast,
}

impl HashProfile {
    fn hasher(self) -> Argon2<'static> {
        match self {
            HashProfile::Interactive => Argon2::default(),
            HashProfile::Fast => {
                let params = Params::new(4096, 2, 1, None).unwrap_or_default();
                Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            }
        }
    }
}

pub(crate) fn hash_password(profile: HashProfile, password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    profile
        .hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Backend(format!("password hashing failed: {e}")))
}

/// Verify `password` against a stored PHC string. `Ok(false)` means the
/// password simply did not match; `Err` means the stored hash is unreadable.
pub(crate) fn verify_password(password: &str, stored: &str) -> Result<bool, StoreError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| StoreError::Backend(format!("stored password hash unreadable: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(StoreError::Backend(format!(
            "password verification failed: {e}"
        ))),
    }
}
