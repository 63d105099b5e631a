use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, get_current_timestamp};
use shared::types::{Identity, SessionClaims};
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a credential failed verification.
///
/// The classes are deliberately coarse: callers log them but never leak the
/// distinction to the client, which only ever sees "unauthorized".
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    /// Not a structurally valid token at all.
    #[error("malformed token")]
    Malformed,

    /// Structure is fine but the signature does not match our secret.
    #[error("invalid signature")]
    Signature,

    /// Signature is valid but the expiry instant has passed.
    #[error("token expired")]
    Expired,

    /// A required claim is absent or has the wrong shape.
    #[error("missing or invalid claim")]
    MissingClaim,

    /// Signing failed while issuing. Does not occur during verification.
    #[error("token signing failed: {0}")]
    Signing(String),
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Issues and verifies signed session tokens.
///
/// The secret is injected once at construction. Key material never travels
/// through function arguments after startup, and rotating the secret means
/// constructing a new codec (a restart, in practice).
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact. The library defaults to 60s of leeway, which would
        // accept tokens for a minute past their advertised lifetime.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            validation,
        }
    }

    /// Credential lifetime this codec stamps into issued tokens.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a fresh token for `identity`, valid from now until now + ttl.
    pub fn issue(&self, identity: &Identity) -> Result<String, TokenError> {
        let now = get_current_timestamp() as usize;
        let claims = SessionClaims {
            sub: identity.email.clone(),
            user_id: identity.user_id,
            name: identity.name.clone(),
            image: identity.image.clone(),
            role: identity.role,
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its claims.
    ///
    /// Any failure maps to a [`TokenError`] class; the caller decides how
    /// loudly to log each one.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        match decode::<SessionClaims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => {
                let class = match err.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::Signature,
                    ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
                        TokenError::MissingClaim
                    }
                    _ => TokenError::Malformed,
                };
                debug!("Token verification failed: {}", class);
                Err(class)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
