//! `anteroom-accounts` — gated registration and account lifecycle core.
//!
//! New accounts are held in `pending` status until an administrator approves
//! or rejects them; login is blocked for anything not `approved`.
//!
//! This crate is intentionally decoupled from HTTP and storage: the web layer
//! calls the handler/gate directly, and the backing stores are injected
//! through the traits in [`store`].

pub mod account;
pub mod actor;
pub mod gate;
pub mod registration;
pub mod status;
pub mod store;

pub use account::Account;
pub use actor::{Actor, ActorId, AuthzError, Capability, authorize};
pub use gate::{AuthError, GateError, LifecycleGate};
pub use registration::{Candidate, RegistrationError, RegistrationHandler};
pub use status::AccountStatus;
pub use store::{IdentityStore, MetadataStore, PHONE_KEY, STATUS_KEY, StoreError};
