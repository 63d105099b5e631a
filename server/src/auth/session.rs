use http::HeaderMap;
use shared::types::{Identity, Role};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::auth::token::{TokenCodec, TokenError};
use crate::database::users;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

// ---------------------------------------------------------------------------
// Credential sources
// ---------------------------------------------------------------------------

/// Where a request's credentials come from.
///
/// Handlers that receive the request resolve against its headers directly
/// ([`HeaderSource`]); code deeper in the call tree that has no request in
/// scope uses the task-local jar installed by the router ([`AmbientSource`]).
pub trait CredentialSource {
    /// Value of the cookie named `name`, if present.
    fn cookie(&self, name: &str) -> Option<String>;
}

fn cookie_from_raw(raw: &str, name: &str) -> Option<String> {
    raw.split(';')
        .map(str::trim)
        .find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Credential source backed by a request's header map.
pub struct HeaderSource<'a>(pub &'a HeaderMap);

impl CredentialSource for HeaderSource<'_> {
    fn cookie(&self, name: &str) -> Option<String> {
        let raw = self.0.get(http::header::COOKIE)?.to_str().ok()?;
        cookie_from_raw(raw, name)
    }
}

/// Snapshot of a request's `Cookie` header, installed per-task by the router.
#[derive(Clone, Default)]
pub struct CookieJar {
    raw: Option<String>,
}

impl CookieJar {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let raw = headers
            .get(http::header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self { raw }
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        cookie_from_raw(self.raw.as_deref()?, name)
    }
}

tokio::task_local! {
    /// Cookie jar for the request currently being served on this task.
    pub static REQUEST_COOKIES: CookieJar;
}

/// Credential source reading the task-local jar.
///
/// Outside of a request scope (no jar installed) every lookup is `None`,
/// which resolves to an anonymous session rather than a panic.
pub struct AmbientSource;

impl CredentialSource for AmbientSource {
    fn cookie(&self, name: &str) -> Option<String> {
        REQUEST_COOKIES
            .try_with(|jar| jar.cookie(name))
            .ok()
            .flatten()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the current session to an [`Identity`], or `None` for anonymous.
///
/// Fail-closed: a missing cookie, a token that fails verification, an
/// unknown user, or a role claim that disagrees with the stored role all
/// resolve to `None`. Only a store failure surfaces as `Err` so callers can
/// distinguish "not logged in" from "cannot tell right now".
pub async fn resolve_session<S: CredentialSource>(
    codec: &TokenCodec,
    db: &SqlitePool,
    source: &S,
) -> Result<Option<Identity>, sqlx::Error> {
    let Some(token) = source.cookie(SESSION_COOKIE) else {
        return Ok(None);
    };

    let claims = match codec.verify(&token) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => {
            debug!("Session cookie expired");
            return Ok(None);
        }
        Err(err) => {
            // Signature and structure failures are worth a louder line:
            // expired cookies are routine, forged ones are not.
            warn!("Rejecting session cookie: {}", err);
            return Ok(None);
        }
    };

    let Some(stored_role) = users::find_user_role(db, &claims.sub).await? else {
        debug!("Session subject no longer exists: {}", claims.sub);
        return Ok(None);
    };

    // The role inside the token is a snapshot from login time. If it no
    // longer matches the stored role (promotion or demotion since issue),
    // the session is stale and must re-authenticate.
    if stored_role != claims.role {
        warn!(
            "Stale role claim for {}: token says {}, store says {}",
            claims.sub, claims.role, stored_role
        );
        return Ok(None);
    }

    Ok(Some(Identity {
        user_id: claims.user_id,
        email: claims.sub,
        name: claims.name,
        image: claims.image,
        role: claims.role,
    }))
}

/// Convenience wrapper: resolve using whatever the ambient request scope
/// holds. Mirrors the no-argument "who is calling?" shape used by code that
/// never sees the request object.
pub async fn current_identity(
    codec: &TokenCodec,
    db: &SqlitePool,
) -> Result<Option<Identity>, sqlx::Error> {
    resolve_session(codec, db, &AmbientSource).await
}

/// True when the stored role grants admin privileges.
///
/// Thin re-export point so handlers can gate without importing shared types
/// directly; the logic itself lives next to [`Role`].
pub fn is_admin(identity: Option<&Identity>) -> bool {
    shared::types::is_privileged(identity)
}

#[allow(unused_imports)]
pub use shared::types::is_privileged;

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::COOKIE, value.parse().unwrap());
        headers
    }

    #[test]
    fn header_source_finds_named_cookie() {
        let headers = headers_with_cookie("theme=dark; session=tok123; lang=en");
        let source = HeaderSource(&headers);
        assert_eq!(source.cookie("session"), Some("tok123".to_string()));
        assert_eq!(source.cookie("theme"), Some("dark".to_string()));
        assert_eq!(source.cookie("missing"), None);
    }

    #[test]
    fn header_source_handles_absent_header() {
        let headers = HeaderMap::new();
        assert_eq!(HeaderSource(&headers).cookie("session"), None);
    }

    #[test]
    fn cookie_value_containing_equals_is_kept_whole() {
        // Token payloads may contain '='; only the first one separates.
        let headers = headers_with_cookie("session=abc=def");
        assert_eq!(
            HeaderSource(&headers).cookie("session"),
            Some("abc=def".to_string())
        );
    }

    #[test]
    fn jar_snapshot_matches_header_parse() {
        let headers = headers_with_cookie("session=tok456");
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(jar.cookie("session"), Some("tok456".to_string()));
    }

    #[tokio::test]
    async fn ambient_source_is_none_outside_request_scope() {
        assert_eq!(AmbientSource.cookie("session"), None);
    }

    #[tokio::test]
    async fn ambient_source_reads_installed_jar() {
        let headers = headers_with_cookie("session=ambient-tok");
        let jar = CookieJar::from_headers(&headers);
        let value = REQUEST_COOKIES
            .scope(jar, async { AmbientSource.cookie("session") })
            .await;
        assert_eq!(value, Some("ambient-tok".to_string()));
    }
}
