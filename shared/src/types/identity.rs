use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// User role, stored as TEXT in the `users` table and embedded in session
/// credentials. The wire/storage spelling is upper-case (`"USER"` /
/// `"ADMIN"`); anything else fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parse the storage spelling. Unknown values are rejected rather than
    /// mapped to `User`, so a corrupted role column can never grant or mask
    /// privileges silently.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Self::User),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A fully resolved request identity.
///
/// Only the session resolver constructs these, and only after the embedded
/// role claim has been checked against the users table. Handlers can
/// therefore trust `role` to reflect the store at resolution time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
}

/// The single authorization predicate used by the router and every
/// protected handler: true iff an identity is present and it is an admin.
pub fn is_privileged(identity: Option<&Identity>) -> bool {
    matches!(identity, Some(id) if id.role == Role::Admin)
}
