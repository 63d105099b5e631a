use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use shared::types::Identity;
use tracing::{error, info, warn};

use crate::AppState;
use crate::database::users;
use crate::handlers::http::utils::{
    body_json, deliver_error_json, deliver_success_json, json_str,
};

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /admin/api/users
pub async fn handle_get_users(
    _req: Request<IncomingBody>,
    state: AppState,
    _admin: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Serving user list");

    match users::list_users(&state.db).await {
        Ok(list) => deliver_success_json(Some(json!({
            "total": list.len(),
            "users": list,
        }))),
        Err(e) => database_error(e),
    }
}

/// POST /admin/api/users/promote
pub async fn handle_promote_user(
    req: Request<IncomingBody>,
    state: AppState,
    admin: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(email) = target_email(req).await? else {
        return deliver_error_json(
            "MISSING_FIELD",
            "Missing required field: email",
            StatusCode::BAD_REQUEST,
        );
    };

    if email == admin.email {
        return deliver_error_json(
            "INVALID_TARGET",
            "You already hold the admin role",
            StatusCode::BAD_REQUEST,
        );
    }

    match users::promote_user(&state.db, &email).await {
        Ok(true) => {
            // The target's live sessions still carry the old role claim, so
            // resolution rejects them until the user logs in again.
            info!("Admin {} promoted {}", admin.email, email);
            deliver_success_json(Some(json!({ "email": email, "role": "ADMIN" })))
        }
        Ok(false) => no_rows_response(&state, &email, "User already holds the admin role").await,
        Err(e) => database_error(e),
    }
}

/// POST /admin/api/users/demote
pub async fn handle_demote_user(
    req: Request<IncomingBody>,
    state: AppState,
    admin: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(email) = target_email(req).await? else {
        return deliver_error_json(
            "MISSING_FIELD",
            "Missing required field: email",
            StatusCode::BAD_REQUEST,
        );
    };

    // Demoting yourself would lock the instance out of administration
    // entirely when you are the last admin.
    if email == admin.email {
        return deliver_error_json(
            "INVALID_TARGET",
            "You cannot demote yourself",
            StatusCode::BAD_REQUEST,
        );
    }

    match users::demote_user(&state.db, &email).await {
        Ok(true) => {
            info!("Admin {} demoted {}", admin.email, email);
            deliver_success_json(Some(json!({ "email": email, "role": "USER" })))
        }
        Ok(false) => no_rows_response(&state, &email, "User does not hold the admin role").await,
        Err(e) => database_error(e),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Pull the target email out of the JSON body.
async fn target_email(req: Request<IncomingBody>) -> Result<Option<String>> {
    let body = body_json(req).await?;
    Ok(json_str(&body, "email"))
}

/// A role update that matched zero rows either targets a missing account or
/// one already in the requested state. Disambiguate for the response.
async fn no_rows_response(
    state: &AppState,
    email: &str,
    conflict_message: &str,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    match users::email_exists(&state.db, email).await {
        Ok(false) => {
            warn!("Role change for unknown account: {}", email);
            deliver_error_json("USER_NOT_FOUND", "User not found", StatusCode::NOT_FOUND)
        }
        Ok(true) => deliver_error_json("INVALID_TARGET", conflict_message, StatusCode::CONFLICT),
        Err(e) => database_error(e),
    }
}

fn database_error(err: sqlx::Error) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    error!("Database error in admin handler: {}", err);
    deliver_error_json(
        "DATABASE_ERROR",
        "Database error occurred",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}
