use anyhow::Result;
use http::HeaderValue;

use crate::auth::session::SESSION_COOKIE;

/// Build the `Set-Cookie` value that installs a session token.
///
/// Attributes follow the hardening baseline: `HttpOnly` keeps scripts out,
/// `SameSite=Strict` stops cross-site sends, and `Secure` is added only for
/// production deployments so local HTTP development keeps working.
pub fn issue_session_cookie(token: &str, max_age_secs: u64, secure: bool) -> Result<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly",
        SESSION_COOKIE, token, max_age_secs
    );

    if secure {
        cookie.push_str("; Secure");
    }

    cookie.push_str("; SameSite=Strict; Priority=High");

    Ok(HeaderValue::from_str(&cookie)?)
}

/// `Set-Cookie` value that clears the session on the client.
///
/// `Max-Age=0` with an empty value instructs the browser to drop the cookie
/// immediately. Logout never fails: the token itself stays valid until its
/// expiry instant, the client just forgets it.
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Max-Age=0; Path=/; HttpOnly; SameSite=Strict")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_cookie_carries_token_and_lifetime() {
        let value = issue_session_cookie("tok123", 86_400, false).unwrap();
        let s = value.to_str().unwrap();
        assert!(s.starts_with("session=tok123;"));
        assert!(s.contains("Max-Age=86400"));
        assert!(s.contains("Path=/"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Strict"));
        assert!(!s.contains("Secure"));
    }

    #[test]
    fn production_cookie_adds_secure() {
        let value = issue_session_cookie("tok123", 60, true).unwrap();
        assert!(value.to_str().unwrap().contains("; Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let s = clear_session_cookie();
        let s = s.to_str().unwrap();
        assert!(s.starts_with("session=;"));
        assert!(s.contains("Max-Age=0"));
        assert!(s.contains("HttpOnly"));
    }
}
