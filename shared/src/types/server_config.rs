use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Marks the deployment as production. Controls the `Secure` attribute
    /// on session cookies, so local HTTP development still works.
    #[serde(default)]
    pub production: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_expiry")]
    pub token_expiry_minutes: u64,
    /// HMAC key used to sign and verify session credentials.
    ///
    /// Prefer loading this via the `SESSION_SECRET` environment variable.
    /// This config field is the fallback for deployments that cannot inject
    /// env vars at runtime (e.g. certain container setups).
    ///
    /// **Minimum length:** 32 characters.
    /// Rotating the secret immediately invalidates every active session, so
    /// a change requires a restart.
    pub session_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"0.0.0.0:1337"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl AuthConfig {
    /// Token expiry converted to seconds — convenience for cookie `Max-Age`.
    pub fn token_expiry_secs(&self) -> u64 {
        self.token_expiry_minutes * 60
    }

    /// Resolve the signing secret with the `SESSION_SECRET` env-var taking
    /// priority over the config file field.
    ///
    /// Returns `None` when neither source is set (the server startup code
    /// treats this as a hard error).
    pub fn resolved_session_secret(&self) -> Option<String> {
        std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.session_secret.clone())
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_port() -> u16 {
    1337
}

pub fn default_max_connections() -> usize {
    1000
}

pub fn default_database_path() -> String {
    "publishing.db".to_string()
}

/// 24 hours — the reference credential lifetime.
pub fn default_token_expiry() -> u64 {
    1440
}
