//! New-account intake: validation, duplicate checks, pending initialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use anteroom_core::{AccountId, DomainError, DomainResult};

use crate::AccountStatus;
use crate::store::{IdentityStore, MetadataStore, PHONE_KEY, STATUS_KEY, StoreError};

/// A registration request as submitted by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub username: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
}

impl Candidate {
    /// Trim whitespace and normalize the email to lowercase.
    ///
    /// Usernames keep their case (the identity store decides how it compares
    /// them). The password is validated for emptiness but otherwise passed
    /// through untouched.
    fn normalized(&self) -> Candidate {
        Candidate {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password.clone(),
            phone_number: self.phone_number.trim().to_string(),
        }
    }

    /// All four fields must be present and non-empty after trimming; the
    /// email must at least look like one.
    fn validate(&self) -> DomainResult<()> {
        if self.username.is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        if self.password.trim().is_empty() {
            return Err(DomainError::validation("password must not be empty"));
        }
        if self.phone_number.is_empty() {
            return Err(DomainError::validation("phone number must not be empty"));
        }
        Ok(())
    }
}

/// Registration failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Bad input shape (missing/empty field, malformed email).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Username or email collision. Deliberately does not say which.
    #[error("username or email already exists")]
    DuplicateIdentity,

    /// The backing store failed; callers own retry policy.
    #[error("identity store failure: {0}")]
    IdentityStore(String),
}

impl From<StoreError> for RegistrationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateIdentity => RegistrationError::DuplicateIdentity,
            other => RegistrationError::IdentityStore(other.to_string()),
        }
    }
}

/// Accepts candidate identities and creates accounts awaiting approval.
#[derive(Debug, Clone)]
pub struct RegistrationHandler<I, M> {
    identity: I,
    metadata: M,
}

impl<I, M> RegistrationHandler<I, M>
where
    I: IdentityStore,
    M: MetadataStore,
{
    pub fn new(identity: I, metadata: M) -> Self {
        Self { identity, metadata }
    }

    /// Register a new account.
    ///
    /// On success exactly one account record exists, in `Pending` status,
    /// with the phone number stored as metadata. On any failure path no
    /// account is left behind: a metadata initialization failure rolls the
    /// freshly created account back.
    pub fn register(&self, candidate: &Candidate) -> Result<AccountId, RegistrationError> {
        let candidate = candidate.normalized();
        candidate
            .validate()
            .map_err(|e| RegistrationError::Validation(e.to_string()))?;

        // Combined check so the error never reveals which field collided.
        if self.identity.username_exists(&candidate.username)?
            || self.identity.email_exists(&candidate.email)?
        {
            return Err(RegistrationError::DuplicateIdentity);
        }

        // The store enforces uniqueness atomically; losing a create race
        // after the check above still surfaces as `DuplicateIdentity`.
        let account_id = self.identity.create_account(
            &candidate.username,
            &candidate.email,
            &candidate.password,
        )?;

        if let Err(e) = self.init_metadata(account_id, &candidate) {
            // Roll the account back rather than leave it without a status.
            if let Err(rollback) = self.identity.remove_account(account_id) {
                error!(
                    %account_id,
                    error = %rollback,
                    "rollback after failed metadata initialization also failed"
                );
            }
            return Err(e.into());
        }

        debug!(%account_id, username = %candidate.username, "account registered, awaiting approval");
        Ok(account_id)
    }

    fn init_metadata(&self, account_id: AccountId, candidate: &Candidate) -> Result<(), StoreError> {
        self.metadata
            .set_meta(account_id, PHONE_KEY, &candidate.phone_number)?;
        // Status last: an account becomes "known" to the gate only once this
        // write has committed.
        self.metadata
            .set_meta(account_id, STATUS_KEY, AccountStatus::Pending.as_str())
    }
}
