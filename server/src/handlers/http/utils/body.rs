use std::collections::HashMap;

use anyhow::{Context, Result};
use http_body_util::BodyExt;
use hyper::Request;
use serde_json::Value;

/// Read the whole request body and parse it as JSON.
///
/// A body that is not valid JSON parses to `Value::Null`, so the caller's
/// field lookups fall through to its own missing-field errors. Only an
/// unreadable body is an actual error.
pub async fn body_json(req: Request<hyper::body::Incoming>) -> Result<Value> {
    let bytes = req
        .collect()
        .await
        .context("Failed to read request body")?
        .to_bytes();

    Ok(serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// String field, trimmed. Absent, non-string, or blank values are `None`.
pub fn json_str(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// String field kept verbatim. Passwords and post bodies must not be
/// trimmed.
pub fn json_str_raw(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Boolean field, absent means `false`.
pub fn json_bool(body: &Value, field: &str) -> bool {
    body.get(field).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Decode the query string into a key/value map. Later duplicates win.
pub fn query_params(uri: &http::Uri) -> HashMap<String, String> {
    uri.query()
        .map(|q| {
            form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect::<HashMap<String, String>>()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_str_trims_and_rejects_blank() {
        let body = json!({ "email": "  bob@example.com  ", "name": "   " });
        assert_eq!(json_str(&body, "email").as_deref(), Some("bob@example.com"));
        assert_eq!(json_str(&body, "name"), None);
        assert_eq!(json_str(&body, "missing"), None);
    }

    #[test]
    fn json_str_rejects_non_string_values() {
        let body = json!({ "email": 42 });
        assert_eq!(json_str(&body, "email"), None);
    }

    #[test]
    fn json_str_raw_keeps_whitespace() {
        let body = json!({ "password": " pass with spaces " });
        assert_eq!(
            json_str_raw(&body, "password").as_deref(),
            Some(" pass with spaces ")
        );
    }

    #[test]
    fn json_bool_defaults_false() {
        let body = json!({ "published": true, "featured": "yes" });
        assert!(json_bool(&body, "published"));
        // Strings are not coerced.
        assert!(!json_bool(&body, "featured"));
        assert!(!json_bool(&body, "missing"));
    }

    #[test]
    fn lookups_on_null_body_are_all_none() {
        let body = Value::Null;
        assert_eq!(json_str(&body, "email"), None);
        assert!(!json_bool(&body, "published"));
    }

    #[test]
    fn query_params_decode_percent_escapes() {
        let uri: http::Uri = "/api/posts?page=2&category=rust%20lang".parse().unwrap();
        let params = query_params(&uri);
        assert_eq!(params.get("page").map(String::as_str), Some("2"));
        assert_eq!(params.get("category").map(String::as_str), Some("rust lang"));
    }

    #[test]
    fn query_params_empty_without_query() {
        let uri: http::Uri = "/api/posts".parse().unwrap();
        assert!(query_params(&uri).is_empty());
    }
}
