//! `anteroom-infra` — backing-store implementations of the account store
//! seams.
//!
//! Ships two directories: [`InMemoryDirectory`] for tests/dev and
//! [`PostgresDirectory`] for production. Both implement the
//! `IdentityStore` + `MetadataStore` traits from `anteroom-accounts`.

pub mod directory;

pub use directory::{InMemoryDirectory, PostgresDirectory};

#[cfg(test)]
mod integration_tests;
