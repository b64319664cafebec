//! Roles, user profiles, and the observable session state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a role string does not name one of the three roles.
///
/// An unrecognized role is never defaulted: authorization fails closed, so
/// the parse boundary is where the failure must surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

/// A user's role. Closed set: adding a role is a compile-time-checked
/// change, enforced by exhaustive matches in the route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Agency,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Agency => "agency",
            Self::Admin => "admin",
        }
    }

    /// Parses a wire role string. Unrecognized strings are an error, not a
    /// default.
    pub fn parse(s: &str) -> Result<Self, UnknownRole> {
        match s {
            "client" => Ok(Self::Client),
            "agency" => Ok(Self::Agency),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unique identifier for a user (UUID assigned by the credential service).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Creates a new random user ID. Mostly useful in tests; real IDs come
    /// from the credential service.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A row from the `users` table: the identity a session is bound to.
///
/// Immutable after signup except `role`, which an admin may reassign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The observable state of the session store.
///
/// "Authenticated but role unknown" never reaches this type: profile
/// resolution failures collapse to `Unauthenticated` before a snapshot is
/// taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSnapshot {
    Unauthenticated,
    Authenticated(UserProfile),
}

impl SessionSnapshot {
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticated(profile) => Some(profile),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}
