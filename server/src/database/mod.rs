pub mod passwords;
pub mod posts;
pub mod schema;
pub mod users;

/// True when `err` wraps a UNIQUE constraint violation.
///
/// Insert paths use this to turn a constraint race into a typed outcome
/// (slug taken, email taken) instead of a generic database error.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
