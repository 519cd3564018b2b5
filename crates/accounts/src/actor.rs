//! Actors and capability checks for admin-only operations.
//!
//! Status transitions require an explicit `actor` argument rather than any
//! ambient session state; the gate re-asserts the capability even when the
//! calling layer has already checked it.

use core::str::FromStr;
use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identity of an authenticated actor (human admin, service account, etc).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ActorId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for ActorId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<ActorId> for Uuid {
    fn from(value: ActorId) -> Self {
        value.0
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Capability identifier.
///
/// Capabilities are modeled as opaque strings (e.g. "accounts.manage").
/// A special wildcard capability `"*"` can be used by policy layers to
/// indicate "allow all" without hardcoding domain capabilities into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The admin capability governing account status transitions.
    pub fn manage_accounts() -> Self {
        Self::new("accounts.manage")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An actor together with the capabilities granted to it.
///
/// Construction is intentionally decoupled from storage and transport: the
/// calling layer derives capabilities from its own session/policy source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub actor_id: ActorId,
    pub capabilities: Vec<Capability>,
}

impl Actor {
    pub fn new(actor_id: ActorId, capabilities: Vec<Capability>) -> Self {
        Self {
            actor_id,
            capabilities,
        }
    }

    /// Convenience constructor for an account administrator.
    pub fn admin(actor_id: ActorId) -> Self {
        Self::new(actor_id, vec![Capability::manage_accounts()])
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing capability '{0}'")]
    Forbidden(String),
}

/// Authorize an actor for a required capability.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(actor: &Actor, required: &Capability) -> Result<(), AuthzError> {
    let allowed = actor
        .capabilities
        .iter()
        .any(|c| c.is_wildcard() || c.as_str() == required.as_str());

    if allowed {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}
