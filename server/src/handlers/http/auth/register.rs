use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use shared::types::{RegistrationData, RegistrationError, RegistrationResponse};
use tracing::{error, info, warn};

use crate::AppState;
use crate::database::{is_unique_violation, passwords, users};
use crate::handlers::http::utils::{body_json, deliver_serialized_json, json_str, json_str_raw};

/// Main registration handler
pub async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing registration request");

    let registration_data = match parse_and_validate_registration(req).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Registration validation failed: {:?}", e.to_code());
            return deliver_serialized_json(&e.to_response(), StatusCode::BAD_REQUEST);
        }
    };

    let hashed_password = match passwords::hash_password(&registration_data.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to hash password: {}", e);
            return deliver_serialized_json(
                &RegistrationError::InternalError.to_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            );
        }
    };

    match attempt_registration(&registration_data, &hashed_password, &state).await {
        Ok((user_id, role)) => {
            info!(
                "User registered successfully: {} (ID: {}, role: {})",
                registration_data.email, user_id, role
            );

            // Registration does not log the account in. The client follows
            // up with POST /api/login to obtain a session cookie.
            let response = RegistrationResponse::Success {
                user_id,
                email: registration_data.email.clone(),
                role,
                message: "Registration successful".to_string(),
            };

            deliver_serialized_json(&response, StatusCode::CREATED)
        }
        Err(e) => {
            warn!("Registration failed: {:?}", e.to_code());
            deliver_serialized_json(&e.to_response(), error_status(&e))
        }
    }
}

/// Parse and validate registration fields from the JSON body.
async fn parse_and_validate_registration(
    req: Request<hyper::body::Incoming>,
) -> std::result::Result<RegistrationData, RegistrationError> {
    let body = body_json(req).await.map_err(|e| {
        error!("Failed to read registration body: {}", e);
        RegistrationError::InternalError
    })?;

    let email =
        json_str(&body, "email").ok_or(RegistrationError::MissingField("email".to_string()))?;

    let password = json_str_raw(&body, "password")
        .ok_or(RegistrationError::MissingField("password".to_string()))?;

    let name = json_str(&body, "name");
    let image = json_str(&body, "image");

    if !is_valid_email(&email) {
        return Err(RegistrationError::InvalidEmail);
    }

    validate_password(&password)?;

    Ok(RegistrationData {
        email,
        password,
        name,
        image,
    })
}

/// Validate password format
fn validate_password(password: &str) -> std::result::Result<(), RegistrationError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(RegistrationError::InvalidPassword);
    }
    if !password.chars().any(|c| c.is_numeric()) {
        return Err(RegistrationError::InvalidPassword);
    }
    if !password.chars().any(|c| c.is_alphabetic()) {
        return Err(RegistrationError::InvalidPassword);
    }
    Ok(())
}

/// Basic email validation
fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let domain_parts: Vec<&str> = parts[1].split('.').collect();
    if domain_parts.len() < 2 {
        return false;
    }
    !parts[0].is_empty() && !parts[1].is_empty() && domain_parts.iter().all(|p| !p.is_empty())
}

/// Attempt to register the user in the database
async fn attempt_registration(
    data: &RegistrationData,
    hashed_password: &str,
    state: &AppState,
) -> std::result::Result<(i64, shared::types::Role), RegistrationError> {
    info!("Attempting registration for: {}", data.email);

    let email_exists = users::email_exists(&state.db, &data.email).await.map_err(|e| {
        error!("Database error checking email: {}", e);
        RegistrationError::DatabaseError
    })?;

    if email_exists {
        warn!("Email already registered: {}", data.email);
        return Err(RegistrationError::EmailTaken);
    }

    let new_user = users::NewUser {
        email: &data.email,
        password_hash: hashed_password,
        name: data.name.as_deref(),
        image: data.image.as_deref(),
    };

    users::register_user(&state.db, &new_user).await.map_err(|e| {
        // The pre-check races with concurrent registrations; the UNIQUE
        // constraint is what actually decides.
        if is_unique_violation(&e) {
            warn!("Email registered concurrently: {}", data.email);
            RegistrationError::EmailTaken
        } else {
            error!("Database error creating user: {}", e);
            RegistrationError::DatabaseError
        }
    })
}

fn error_status(err: &RegistrationError) -> StatusCode {
    match err {
        RegistrationError::EmailTaken => StatusCode::CONFLICT,
        RegistrationError::DatabaseError | RegistrationError::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_normal_addresses() {
        assert!(is_valid_email("bob@example.com"));
        assert!(is_valid_email("a.b@sub.example.co"));
    }

    #[test]
    fn email_validation_rejects_malformed_addresses() {
        assert!(!is_valid_email("bob"));
        assert!(!is_valid_email("bob@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("bob@example"));
        assert!(!is_valid_email("bob@example..com"));
        assert!(!is_valid_email("bob@@example.com"));
    }

    #[test]
    fn password_needs_length_letter_and_number() {
        assert!(validate_password("abcdef12").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password(&"a1".repeat(65)).is_err());
    }
}
