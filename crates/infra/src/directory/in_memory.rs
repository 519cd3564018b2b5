//! In-memory directory.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use anteroom_accounts::{
    Account, AccountStatus, IdentityStore, MetadataStore, PHONE_KEY, STATUS_KEY, StoreError,
};
use anteroom_core::AccountId;

use super::password::{HashProfile, hash_password, verify_password};

#[derive(Debug, Clone)]
struct AccountRecord {
    account: Account,
    password_hash: String,
}

#[derive(Debug, Default)]
struct DirectoryInner {
    accounts: HashMap<AccountId, AccountRecord>,
    by_username: HashMap<String, AccountId>,
    by_email: HashMap<String, AccountId>,
    /// Free-form metadata beyond the typed `Account` fields.
    extra_meta: HashMap<(AccountId, String), String>,
}

/// In-memory directory implementing both store seams.
///
/// Intended for tests/dev. A single `RwLock` serializes all writers, which
/// makes the uniqueness check-then-insert of `create_account` atomic and
/// gives every reader the latest committed write; readers do not block each
/// other. Password hashing uses the reduced-cost profile.
///
/// The well-known metadata keys (`account_status`, `phone_number`) are
/// mapped onto the typed [`Account`] fields; anything else lands in a
/// free-form map.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    inner: RwLock<DirectoryInner>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one account (tests, admin tooling).
    pub fn account(&self, account_id: AccountId) -> Option<Account> {
        let inner = self.inner.read().ok()?;
        inner.accounts.get(&account_id).map(|r| r.account.clone())
    }

    /// Snapshot of all accounts, unordered.
    pub fn list(&self) -> Vec<Account> {
        match self.inner.read() {
            Ok(inner) => inner.accounts.values().map(|r| r.account.clone()).collect(),
            Err(_) => vec![],
        }
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, DirectoryInner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, DirectoryInner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

impl IdentityStore for InMemoryDirectory {
    fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountId, StoreError> {
        let password_hash = hash_password(HashProfile::Fast, password)?;

        // Check and insert under one write guard: concurrent creates of the
        // same identity cannot both pass.
        let mut inner = self.write()?;
        if inner.by_username.contains_key(username) || inner.by_email.contains_key(email) {
            return Err(StoreError::DuplicateIdentity);
        }

        let account_id = AccountId::new();
        let account = Account::new(account_id, username, email, None, Utc::now());
        inner.by_username.insert(username.to_string(), account_id);
        inner.by_email.insert(email.to_string(), account_id);
        inner.accounts.insert(
            account_id,
            AccountRecord {
                account,
                password_hash,
            },
        );
        Ok(account_id)
    }

    fn verify_credentials(&self, username: &str, password: &str) -> Result<AccountId, StoreError> {
        // Clone the hash out so the (CPU-bound) verification runs without
        // holding the lock.
        let found = {
            let inner = self.read()?;
            inner.by_username.get(username).and_then(|id| {
                inner
                    .accounts
                    .get(id)
                    .map(|r| (*id, r.password_hash.clone()))
            })
        };

        // Unknown username and wrong password produce the same error.
        let Some((account_id, stored)) = found else {
            return Err(StoreError::InvalidCredentials);
        };
        if verify_password(password, &stored)? {
            Ok(account_id)
        } else {
            Err(StoreError::InvalidCredentials)
        }
    }

    fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.by_username.contains_key(username))
    }

    fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.by_email.contains_key(email))
    }

    fn remove_account(&self, account_id: AccountId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let Some(record) = inner.accounts.remove(&account_id) else {
            return Err(StoreError::UnknownAccount);
        };
        inner.by_username.remove(&record.account.username);
        inner.by_email.remove(&record.account.email);
        inner.extra_meta.retain(|(id, _), _| *id != account_id);
        Ok(())
    }
}

impl MetadataStore for InMemoryDirectory {
    fn set_meta(&self, account_id: AccountId, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let Some(record) = inner.accounts.get_mut(&account_id) else {
            return Err(StoreError::UnknownAccount);
        };

        match key {
            STATUS_KEY => {
                let status = AccountStatus::parse(value)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                record.account.set_status(status, Utc::now());
            }
            PHONE_KEY => {
                record.account.phone_number = Some(value.to_string());
            }
            other => {
                inner
                    .extra_meta
                    .insert((account_id, other.to_string()), value.to_string());
            }
        }
        Ok(())
    }

    fn get_meta(&self, account_id: AccountId, key: &str) -> Result<Option<String>, StoreError> {
        let inner = self.read()?;
        let Some(record) = inner.accounts.get(&account_id) else {
            return Err(StoreError::UnknownAccount);
        };

        Ok(match key {
            STATUS_KEY => Some(record.account.status.as_str().to_string()),
            PHONE_KEY => record.account.phone_number.clone(),
            other => inner
                .extra_meta
                .get(&(account_id, other.to_string()))
                .cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_verify_credentials() {
        let dir = InMemoryDirectory::new();
        let id = dir
            .create_account("alice", "alice@example.com", "pw123")
            .unwrap();

        assert_eq!(dir.verify_credentials("alice", "pw123").unwrap(), id);
        assert_eq!(
            dir.verify_credentials("alice", "wrong").unwrap_err(),
            StoreError::InvalidCredentials
        );
        assert_eq!(
            dir.verify_credentials("nobody", "pw123").unwrap_err(),
            StoreError::InvalidCredentials
        );
    }

    #[test]
    fn duplicate_create_is_rejected_atomically() {
        let dir = InMemoryDirectory::new();
        dir.create_account("alice", "alice@example.com", "pw123")
            .unwrap();

        let err = dir
            .create_account("alice", "other@example.com", "pw123")
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateIdentity);

        let err = dir
            .create_account("bob", "alice@example.com", "pw123")
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateIdentity);

        assert_eq!(dir.list().len(), 1);
    }

    #[test]
    fn well_known_meta_maps_onto_account_fields() {
        let dir = InMemoryDirectory::new();
        let id = dir
            .create_account("alice", "alice@example.com", "pw123")
            .unwrap();

        // New records start pending.
        assert_eq!(
            dir.get_meta(id, STATUS_KEY).unwrap().as_deref(),
            Some("pending")
        );

        dir.set_meta(id, STATUS_KEY, "approved").unwrap();
        dir.set_meta(id, PHONE_KEY, "555-0100").unwrap();
        dir.set_meta(id, "shoe_size", "43").unwrap();

        let account = dir.account(id).unwrap();
        assert_eq!(account.status, AccountStatus::Approved);
        assert_eq!(account.phone_number.as_deref(), Some("555-0100"));
        assert_eq!(
            dir.get_meta(id, "shoe_size").unwrap().as_deref(),
            Some("43")
        );
    }

    #[test]
    fn out_of_set_status_value_is_refused() {
        let dir = InMemoryDirectory::new();
        let id = dir
            .create_account("alice", "alice@example.com", "pw123")
            .unwrap();

        let err = dir.set_meta(id, STATUS_KEY, "limbo").unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(
            dir.get_meta(id, STATUS_KEY).unwrap().as_deref(),
            Some("pending")
        );
    }

    #[test]
    fn meta_against_unknown_account_is_an_error() {
        let dir = InMemoryDirectory::new();
        let ghost = AccountId::new();

        assert_eq!(
            dir.set_meta(ghost, PHONE_KEY, "555-0100").unwrap_err(),
            StoreError::UnknownAccount
        );
        assert_eq!(
            dir.get_meta(ghost, STATUS_KEY).unwrap_err(),
            StoreError::UnknownAccount
        );
    }

    #[test]
    fn remove_frees_the_identity_for_reuse() {
        let dir = InMemoryDirectory::new();
        let id = dir
            .create_account("alice", "alice@example.com", "pw123")
            .unwrap();
        dir.set_meta(id, "shoe_size", "43").unwrap();

        dir.remove_account(id).unwrap();

        assert!(!dir.username_exists("alice").unwrap());
        assert!(!dir.email_exists("alice@example.com").unwrap());
        assert_eq!(dir.remove_account(id).unwrap_err(), StoreError::UnknownAccount);

        // Identity can be taken again.
        dir.create_account("alice", "alice@example.com", "pw456")
            .unwrap();
    }
}
