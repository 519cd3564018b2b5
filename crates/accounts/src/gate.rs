//! Lifecycle transitions and the authentication-time status gate.

use thiserror::Error;
use tracing::{debug, info, warn};

use anteroom_core::AccountId;

use crate::AccountStatus;
use crate::actor::{Actor, Capability, authorize};
use crate::store::{IdentityStore, MetadataStore, STATUS_KEY, StoreError};

/// Status transition failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The actor lacks the `accounts.manage` capability.
    #[error("unauthorized")]
    Unauthorized,

    /// No account with the given id.
    #[error("account not found")]
    NotFound,

    /// Requested or stored status value outside the enumerated set.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// The backing store failed; callers own retry policy.
    #[error("store failure: {0}")]
    Store(String),
}

/// Authentication failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Wrong password or unknown username; indistinguishable on purpose.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but has not been approved yet.
    #[error("account is pending approval")]
    PendingApproval,

    /// An admin rejected the registration request.
    #[error("registration request was denied")]
    RegistrationDenied,

    /// Stored status missing or outside the enumerated set. Unreachable for
    /// accounts created by the registration handler; login fails closed.
    #[error("invalid status: {0}")]
    InvalidStatus(String),

    /// The backing store failed; callers own retry policy.
    #[error("store failure: {0}")]
    Store(String),
}

/// Owns status transitions and the authentication-time status check.
///
/// Every read goes straight through the injected stores: an approval
/// committed by `set_account_status` is visible to the very next
/// `authenticate` call; there is no cache to go stale.
#[derive(Debug, Clone)]
pub struct LifecycleGate<I, M> {
    identity: I,
    metadata: M,
}

impl<I, M> LifecycleGate<I, M>
where
    I: IdentityStore,
    M: MetadataStore,
{
    pub fn new(identity: I, metadata: M) -> Self {
        Self { identity, metadata }
    }

    /// Admin-driven status transition.
    ///
    /// Any enumerated status may move to any other (permissive admin
    /// override; re-approving a rejected account is allowed). Setting the
    /// current status again is a no-op success. The capability check is
    /// re-asserted here even though the calling layer is expected to have
    /// verified it already.
    pub fn set_account_status(
        &self,
        account_id: AccountId,
        next: AccountStatus,
        actor: &Actor,
    ) -> Result<(), GateError> {
        authorize(actor, &Capability::manage_accounts()).map_err(|_| GateError::Unauthorized)?;

        // An out-of-set stored value does not block the admin from repairing
        // it; only a missing record is NotFound.
        let current = match self.load_status(account_id) {
            Ok(status) => Some(status),
            Err(GateError::InvalidStatus(raw)) => {
                warn!(%account_id, value = %raw, "replacing out-of-set stored status");
                None
            }
            Err(e) => return Err(e),
        };

        if current == Some(next) {
            return Ok(());
        }

        self.metadata
            .set_meta(account_id, STATUS_KEY, next.as_str())
            .map_err(|e| match e {
                StoreError::UnknownAccount => GateError::NotFound,
                other => GateError::Store(other.to_string()),
            })?;

        info!(
            %account_id,
            to = %next,
            actor = %actor.actor_id,
            "account status changed"
        );
        Ok(())
    }

    /// Read-only status lookup (admin UI affordances).
    pub fn get_status(&self, account_id: AccountId) -> Result<AccountStatus, GateError> {
        self.load_status(account_id)
    }

    /// Credential check wrapped with the status gate.
    ///
    /// Credentials are verified first; only then is the status consulted, so
    /// an unauthenticated caller learns nothing about an account it cannot
    /// log into. Whether `PendingApproval`/`RegistrationDenied` are shown
    /// distinctly to end users is the presentation layer's choice.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<AccountId, AuthError> {
        let account_id = self
            .identity
            .verify_credentials(username, password)
            .map_err(|e| match e {
                StoreError::InvalidCredentials => AuthError::InvalidCredentials,
                other => AuthError::Store(other.to_string()),
            })?;

        let raw = self
            .metadata
            .get_meta(account_id, STATUS_KEY)
            .map_err(|e| match e {
                // Credentials verified but the account vanished underneath
                // us; fail closed.
                StoreError::UnknownAccount => AuthError::InvalidStatus("missing".to_string()),
                other => AuthError::Store(other.to_string()),
            })?;

        let Some(raw) = raw else {
            // Account exists in the identity store but was never
            // initialized; fail closed.
            return Err(AuthError::InvalidStatus("missing".to_string()));
        };

        let status =
            AccountStatus::parse(&raw).map_err(|_| AuthError::InvalidStatus(raw.clone()))?;

        match status {
            AccountStatus::Approved => {
                debug!(%account_id, "login permitted");
                Ok(account_id)
            }
            AccountStatus::Pending => Err(AuthError::PendingApproval),
            AccountStatus::Rejected => Err(AuthError::RegistrationDenied),
        }
    }

    fn load_status(&self, account_id: AccountId) -> Result<AccountStatus, GateError> {
        let raw = self
            .metadata
            .get_meta(account_id, STATUS_KEY)
            .map_err(|e| match e {
                StoreError::UnknownAccount => GateError::NotFound,
                other => GateError::Store(other.to_string()),
            })?
            .ok_or(GateError::NotFound)?;

        AccountStatus::parse(&raw).map_err(|_| GateError::InvalidStatus(raw))
    }
}
