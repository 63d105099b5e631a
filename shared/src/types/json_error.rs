use serde::{Deserialize, Serialize};

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            status: "error".to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// 401 body used by the router when a protected route has no identity.
    pub fn unauthorized() -> Self {
        Self::new("UNAUTHORIZED", "Authentication required")
    }

    /// 403 body used by the router when an identity lacks admin privileges.
    pub fn forbidden() -> Self {
        Self::new("FORBIDDEN", "Admin privileges required")
    }

    pub fn not_found() -> Self {
        Self::new("NOT_FOUND", "Resource not found")
    }
}
