//! Postgres-backed directory implementation.
//!
//! Uniqueness and referential integrity live in the database, so concurrent
//! registrations cannot race past the duplicate check:
//!
//! ```sql
//! CREATE TABLE accounts (
//!     account_id    UUID PRIMARY KEY,
//!     username      TEXT NOT NULL UNIQUE,
//!     email         TEXT NOT NULL UNIQUE,
//!     password_hash TEXT NOT NULL,
//!     created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//!
//! CREATE TABLE account_meta (
//!     account_id UUID NOT NULL REFERENCES accounts (account_id) ON DELETE CASCADE,
//!     meta_key   TEXT NOT NULL,
//!     meta_value TEXT NOT NULL,
//!     PRIMARY KEY (account_id, meta_key)
//! );
//! ```
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` (unique violation) | `DuplicateIdentity` | Concurrent or repeated create of the same username/email |
//! | `23503` (foreign key violation) | `UnknownAccount` | Metadata write against a missing account |
//! | Any other | `Backend` | Connectivity, pool, serialization failures |
//!
//! ## Thread Safety
//!
//! `PostgresDirectory` is `Send + Sync`; all operations go through the SQLx
//! connection pool.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use anteroom_accounts::{IdentityStore, MetadataStore, StoreError};
use anteroom_core::AccountId;

use super::password::{HashProfile, hash_password, verify_password};

/// Postgres-backed directory implementing both store seams.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    /// Create a new directory over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, password))]
    pub async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountId, StoreError> {
        let password_hash = hash_password(HashProfile::Interactive, password)?;
        let account_id = AccountId::new();

        sqlx::query(
            "INSERT INTO accounts (account_id, username, email, password_hash) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(account_id.as_uuid())
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(account_id)
    }

    #[instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccountId, StoreError> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT account_id, password_hash FROM accounts WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        // Unknown username and wrong password produce the same error.
        let Some((account_id, stored)) = row else {
            return Err(StoreError::InvalidCredentials);
        };
        if verify_password(password, &stored)? {
            Ok(AccountId::from_uuid(account_id))
        } else {
            Err(StoreError::InvalidCredentials)
        }
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE username = $1)")
            .bind(username)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE email = $1)")
            .bind(email)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)
    }

    #[instrument(skip(self))]
    pub async fn remove_account(&self, account_id: AccountId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE account_id = $1")
            .bind(account_id.as_uuid())
            .execute(self.pool.as_ref())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownAccount);
        }
        Ok(())
    }

    pub async fn set_meta(
        &self,
        account_id: AccountId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO account_meta (account_id, meta_key, meta_value) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (account_id, meta_key) \
             DO UPDATE SET meta_value = EXCLUDED.meta_value",
        )
        .bind(account_id.as_uuid())
        .bind(key)
        .bind(value)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    pub async fn get_meta(
        &self,
        account_id: AccountId,
        key: &str,
    ) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar(
            "SELECT meta_value FROM account_meta WHERE account_id = $1 AND meta_key = $2",
        )
        .bind(account_id.as_uuid())
        .bind(key)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(map_sqlx_error)
    }
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some("23505") => return StoreError::DuplicateIdentity,
            Some("23503") => return StoreError::UnknownAccount,
            _ => {}
        }
    }
    StoreError::Backend(e.to_string())
}

// The store traits are synchronous, but Postgres operations require async.
// We use tokio::runtime::Handle to run async code in a sync context.
fn run<T>(
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Backend(
            "PostgresDirectory requires an async runtime (tokio); \
             ensure you're calling from within a tokio runtime context"
                .to_string(),
        )
    })?;
    handle.block_on(fut)
}

impl IdentityStore for PostgresDirectory {
    fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AccountId, StoreError> {
        run(self.create_account(username, email, password))
    }

    fn verify_credentials(&self, username: &str, password: &str) -> Result<AccountId, StoreError> {
        run(self.verify_credentials(username, password))
    }

    fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        run(self.username_exists(username))
    }

    fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        run(self.email_exists(email))
    }

    fn remove_account(&self, account_id: AccountId) -> Result<(), StoreError> {
        run(self.remove_account(account_id))
    }
}

impl MetadataStore for PostgresDirectory {
    fn set_meta(&self, account_id: AccountId, key: &str, value: &str) -> Result<(), StoreError> {
        run(self.set_meta(account_id, key, value))
    }

    fn get_meta(&self, account_id: AccountId, key: &str) -> Result<Option<String>, StoreError> {
        run(self.get_meta(account_id, key))
    }
}
