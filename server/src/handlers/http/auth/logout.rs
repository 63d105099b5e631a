use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use tracing::info;

use crate::AppState;
use crate::auth::cookie::clear_session_cookie;
use crate::handlers::http::utils::full;

/// Handle logout
pub async fn handle_logout(
    _req: Request<IncomingBody>,
    _state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("User logged out");

    // Tokens are stateless, so the one in the wild stays valid until its
    // expiry instant. Logout just makes the browser forget it.
    let response_json = serde_json::json!({
        "status": "success",
        "message": "Logged out successfully"
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .header("set-cookie", clear_session_cookie())
        .body(full(response_json.to_string()))
        .context("Failed to build logout response")?;

    Ok(response)
}
