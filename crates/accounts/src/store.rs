//! Store seams: the external collaborators the core delegates to.
//!
//! The identity store owns credential storage and verification (password
//! hashing included); the metadata store owns per-account key/value records.
//! The core only ever talks to these traits, so backends can range from the
//! in-memory directory used in tests to a relational database.

use std::sync::Arc;

use thiserror::Error;

use anteroom_core::AccountId;

/// Metadata key holding the lifecycle status. The stored values are the
/// lowercase forms of [`crate::AccountStatus`]. An account is considered
/// known exactly when this key is present; it is written atomically with
/// account creation.
pub const STATUS_KEY: &str = "account_status";

/// Metadata key holding the phone number supplied at registration.
pub const PHONE_KEY: &str = "phone_number";

/// Store operation error.
///
/// These are **infrastructure failures** (storage, connectivity, uniqueness
/// enforcement) as opposed to domain errors (validation, authorization).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The username or email is already taken.
    #[error("username or email already exists")]
    DuplicateIdentity,

    /// Credential verification failed. Implementations must return this
    /// identically for unknown usernames and wrong passwords.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No account with the given id.
    #[error("unknown account")]
    UnknownAccount,

    /// Backend failure (connectivity, hashing, serialization). The core
    /// performs no retries; callers own retry policy.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Credentialed account storage and verification.
///
/// ## Implementation Requirements
///
/// Implementations must:
/// - Enforce `(username, email)` uniqueness **atomically** inside
///   `create_account`: a losing concurrent create returns
///   [`StoreError::DuplicateIdentity`]; there is no check-then-act window.
/// - Keep plaintext passwords inside the call boundary (hashing is the
///   implementation's concern).
/// - Make `verify_credentials` indistinguishable between unknown-user and
///   bad-password.
/// - Serve reads that observe the latest committed write (read-after-write).
pub trait IdentityStore: Send + Sync {
    /// Create a credentialed account. Returns the new account's id.
    fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountId, StoreError>;

    /// Verify a username/password pair, returning the account id on success.
    fn verify_credentials(&self, username: &str, password: &str)
    -> Result<AccountId, StoreError>;

    fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// Compensation hook: remove an account whose follow-up initialization
    /// failed, so no account is left behind in an undefined state. Removing
    /// an unknown account returns [`StoreError::UnknownAccount`].
    fn remove_account(&self, account_id: AccountId) -> Result<(), StoreError>;
}

/// Per-account string metadata.
///
/// ## Implementation Requirements
///
/// - `set_meta` against an unknown account returns
///   [`StoreError::UnknownAccount`].
/// - Reads must observe the latest committed write relative to any
///   concurrently completing `set_meta`: an admin's approval must be
///   visible to the very next read. No caching/staleness window.
pub trait MetadataStore: Send + Sync {
    fn set_meta(&self, account_id: AccountId, key: &str, value: &str) -> Result<(), StoreError>;

    fn get_meta(&self, account_id: AccountId, key: &str) -> Result<Option<String>, StoreError>;
}

impl<S> IdentityStore for Arc<S>
where
    S: IdentityStore + ?Sized,
{
    fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountId, StoreError> {
        (**self).create_account(username, email, password)
    }

    fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountId, StoreError> {
        (**self).verify_credentials(username, password)
    }

    fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        (**self).username_exists(username)
    }

    fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        (**self).email_exists(email)
    }

    fn remove_account(&self, account_id: AccountId) -> Result<(), StoreError> {
        (**self).remove_account(account_id)
    }
}

impl<S> MetadataStore for Arc<S>
where
    S: MetadataStore + ?Sized,
{
    fn set_meta(&self, account_id: AccountId, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_meta(account_id, key, value)
    }

    fn get_meta(&self, account_id: AccountId, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_meta(account_id, key)
    }
}
