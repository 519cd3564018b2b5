//! Account lifecycle status.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use anteroom_core::DomainError;

/// Lifecycle status of an account.
///
/// Every account holds exactly one of these at all times; freshly registered
/// accounts start at `Pending`. The lowercase string forms are the persisted
/// representation (metadata values, database rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Awaiting admin review. Login blocked.
    #[default]
    Pending,
    /// Admitted by an admin. Login allowed.
    Approved,
    /// Turned away by an admin. Login blocked.
    Rejected,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 3] = [
        AccountStatus::Pending,
        AccountStatus::Approved,
        AccountStatus::Rejected,
    ];

    /// Persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "pending",
            AccountStatus::Approved => "approved",
            AccountStatus::Rejected => "rejected",
        }
    }

    /// Parse a persisted status value.
    ///
    /// Anything outside the enumerated set fails with
    /// [`DomainError::InvalidStatus`]; no state is touched by a failed parse.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "pending" => Ok(AccountStatus::Pending),
            "approved" => Ok(AccountStatus::Approved),
            "rejected" => Ok(AccountStatus::Rejected),
            other => Err(DomainError::invalid_status(other)),
        }
    }

    /// Whether an account in this status may complete a login.
    pub fn login_allowed(&self) -> bool {
        matches!(self, AccountStatus::Approved)
    }
}

impl core::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
