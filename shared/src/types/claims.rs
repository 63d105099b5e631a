use serde::{Deserialize, Serialize};

use crate::types::identity::Role;

/// Claims embedded in every session credential issued by the server.
///
/// The HMAC signature binds all fields, so none of them can be altered
/// client-side without invalidating the credential. The `role` field is
/// deliberately **not** defaulted: a credential whose payload lacks a role
/// fails deserialization and is treated as invalid, never as a plain user.
///
/// Note that the embedded role is a snapshot taken at login time. The
/// session resolver re-checks it against the users table on every request,
/// so a promoted or demoted user's outstanding credential stops resolving
/// the moment the stored role changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Standard JWT subject — set to the user's email address.
    pub sub: String,

    /// Numeric user ID (matches `users.id`).
    pub user_id: i64,

    /// Display name, if the user set one at registration.
    pub name: Option<String>,

    /// Avatar image reference (URL or path), if any.
    pub image: Option<String>,

    /// Role snapshot at issue time. Required — no serde default.
    pub role: Role,

    /// Standard JWT expiry (Unix timestamp, seconds).
    pub exp: usize,

    /// Issued-at (Unix timestamp, seconds).
    pub iat: usize,
}
