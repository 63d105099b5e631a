use std::sync::Arc;

use shared::types::server_config::AppConfig;
use sqlx::SqlitePool;

use crate::auth::token::TokenCodec;

pub mod auth;
pub mod database;
pub mod handlers;
pub mod slug;

/// Shared state handed to every request handler.
///
/// Cheap to clone: the pool is internally reference counted and the codec
/// and config sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub codec: Arc<TokenCodec>,
    pub config: Arc<AppConfig>,
}
