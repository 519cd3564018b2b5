//! Directory implementations of the identity/metadata store seams.

pub mod in_memory;
mod password;
pub mod postgres;

pub use in_memory::InMemoryDirectory;
pub use postgres::PostgresDirectory;
