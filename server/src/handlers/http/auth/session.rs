use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::error;

use crate::AppState;
use crate::auth::session::current_identity;
use crate::handlers::http::utils::{deliver_error_json, deliver_success_json};

/// GET /api/session — who is the caller?
///
/// The credentials come from the task-local request scope the router
/// installed, not from the request object, so this handler never touches
/// the headers itself.
pub async fn handle_session(
    _req: Request<IncomingBody>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    match current_identity(&state.codec, &state.db).await {
        Ok(Some(identity)) => deliver_success_json(Some(json!({
            "authenticated": true,
            "user": identity,
        }))),
        Ok(None) => deliver_success_json(Some(json!({
            "authenticated": false,
        }))),
        Err(e) => {
            error!("Session lookup failed: {}", e);
            deliver_error_json(
                "DATABASE_ERROR",
                "Database error occurred",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}
