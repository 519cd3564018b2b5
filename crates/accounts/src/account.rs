//! Account entity and lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use anteroom_core::{AccountId, Entity};

use crate::AccountStatus;

/// The unit of identity this core manages.
///
/// # Invariants
/// - `status` always holds exactly one enumerated value; freshly created
///   accounts start at `Pending`.
/// - `username` and `email` are immutable after creation. Their global
///   uniqueness is the backing store's concern, enforced at creation time.
/// - `status` is mutated only through `set_status` (admin-driven; the owning
///   user never self-transitions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    /// Opaque contact metadata supplied at registration.
    pub phone_number: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account in `Pending` status.
    pub fn new(
        id: AccountId,
        username: impl Into<String>,
        email: impl Into<String>,
        phone_number: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            phone_number,
            status: AccountStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }

    /// Transition to `next`.
    ///
    /// Unconditional within the enumerated set (any status may move to any
    /// other; admins may re-approve a previously rejected account) and
    /// idempotent: setting the current value again is a no-op success.
    ///
    /// Returns whether the status actually changed, so callers can skip
    /// redundant writes.
    pub fn set_status(&mut self, next: AccountStatus, at: DateTime<Utc>) -> bool {
        if self.status == next {
            return false;
        }
        self.status = next;
        self.updated_at = at;
        true
    }

    pub fn login_allowed(&self) -> bool {
        self.status.login_allowed()
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
