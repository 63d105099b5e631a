use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use shared::types::{Identity, LoginData, LoginError, LoginResponse};
use tracing::{error, info, warn};

use crate::AppState;
use crate::auth::cookie::issue_session_cookie;
use crate::database::{passwords, users};
use crate::handlers::http::utils::{body_json, deliver_serialized_json, full, json_str, json_str_raw};

/// Main login handler
pub async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing login request");

    let login_data = match parse_login_data(req).await {
        Ok(data) => data,
        Err(login_error) => {
            warn!("Login parsing failed: {:?}", login_error.to_code());
            return deliver_serialized_json(&login_error.to_response(), StatusCode::BAD_REQUEST);
        }
    };

    let identity = match attempt_login(&login_data, &state).await {
        Ok(identity) => identity,
        Err(login_error) => {
            warn!("Login failed: {:?}", login_error.to_code());
            return deliver_serialized_json(&login_error.to_response(), error_status(&login_error));
        }
    };

    info!(
        "User logged in successfully: {} (ID: {})",
        identity.email, identity.user_id
    );

    let token = match state.codec.issue(&identity) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to sign session token: {}", err);
            return deliver_serialized_json(
                &LoginError::InternalError.to_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            );
        }
    };

    let expires_in = state.config.auth.token_expiry_secs();
    let cookie = issue_session_cookie(&token, expires_in, state.config.server.production)
        .context("Failed to build session cookie")?;

    let response_data = LoginResponse::Success {
        user_id: identity.user_id,
        email: identity.email,
        name: identity.name,
        role: identity.role,
        expires_in,
        message: "Login successful".to_string(),
    };

    let json = serde_json::to_string(&response_data).context("Failed to serialize response")?;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .header("set-cookie", cookie)
        .body(full(json))
        .context("Failed to build login response")?;

    Ok(response)
}

/// Parse login fields from the JSON body.
async fn parse_login_data(
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<LoginData, LoginError> {
    let body = body_json(req).await.map_err(|e| {
        error!("Failed to read login body: {}", e);
        LoginError::InternalError
    })?;

    let email = json_str(&body, "email").ok_or(LoginError::MissingField("email".to_string()))?;

    // Passwords are taken verbatim; leading or trailing spaces are part of
    // the credential.
    let password =
        json_str_raw(&body, "password").ok_or(LoginError::MissingField("password".to_string()))?;

    Ok(LoginData { email, password })
}

/// Check the credential against the store and build the session identity.
async fn attempt_login(
    data: &LoginData,
    state: &AppState,
) -> std::result::Result<Identity, LoginError> {
    info!("Attempting login for: {}", data.email);

    let user_auth = users::get_user_auth(&state.db, &data.email)
        .await
        .map_err(|e| {
            error!("Database error getting user auth: {}", e);
            LoginError::DatabaseError
        })?
        .ok_or_else(|| {
            warn!("Login attempt for unknown email: {}", data.email);
            LoginError::InvalidCredentials
        })?;

    if !passwords::verify_password(&data.password, &user_auth.password_hash) {
        warn!("Invalid password for: {}", data.email);
        return Err(LoginError::InvalidCredentials);
    }

    // Best effort: a failed timestamp write must not block the login.
    if let Err(e) = users::update_last_login(&state.db, user_auth.id).await {
        error!("Failed to update last login: {}", e);
    }

    Ok(Identity {
        user_id: user_auth.id,
        email: user_auth.email,
        name: user_auth.name,
        image: user_auth.image,
        role: user_auth.role,
    })
}

fn error_status(err: &LoginError) -> StatusCode {
    match err {
        LoginError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LoginError::MissingField(_) => StatusCode::BAD_REQUEST,
        LoginError::DatabaseError | LoginError::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
