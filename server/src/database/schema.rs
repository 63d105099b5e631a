use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Version the running binary expects. Bump together with a new arm in
/// [`run_migrations`].
pub const SCHEMA_VERSION: i64 = 1;

/// Open (and create if missing) the SQLite database at `path`, then bring
/// the schema up to [`SCHEMA_VERSION`].
pub async fn open_database(path: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    info!("Opening database at: {}", path);

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;
    run_migrations(&pool).await?;

    info!("Database ready");
    Ok(pool)
}

/// Create all tables and indexes. Every statement is idempotent, so this is
/// safe to run on an existing database.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            email         TEXT NOT NULL UNIQUE,
            name          TEXT,
            image         TEXT,
            password_hash TEXT NOT NULL,
            role          TEXT NOT NULL DEFAULT 'USER',
            created_at    INTEGER NOT NULL,
            last_login    INTEGER
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS posts (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            slug         TEXT NOT NULL UNIQUE,
            title        TEXT NOT NULL,
            content      TEXT NOT NULL,
            excerpt      TEXT,
            cover_image  TEXT,
            category     TEXT,
            published    INTEGER NOT NULL DEFAULT 0,
            featured     INTEGER NOT NULL DEFAULT 0,
            reading_time INTEGER NOT NULL DEFAULT 1,
            author_id    INTEGER NOT NULL REFERENCES users(id),
            created_at   INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_published ON posts(published, created_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_category ON posts(category)")
        .execute(pool)
        .await?;

    debug!("Tables and indexes ensured");
    Ok(())
}

/// Step the schema forward one version at a time until it matches
/// [`SCHEMA_VERSION`].
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if version >= SCHEMA_VERSION {
        debug!("Schema already at version {}", version);
        return Ok(());
    }

    while version < SCHEMA_VERSION {
        let next = version + 1;
        info!("Migrating schema {} -> {}", version, next);

        match next {
            1 => {
                // Version 1 is the base schema created by `create_tables`.
            }
            // Add future migration arms here.
            _ => {}
        }

        // PRAGMA does not accept bound parameters.
        sqlx::query(&format!("PRAGMA user_version = {}", next))
            .execute(pool)
            .await?;
        version = next;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_tables_is_idempotent() {
        let pool = memory_pool().await;
        create_tables(&pool).await.unwrap();
        create_tables(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn migrations_stamp_current_version() {
        let pool = memory_pool().await;
        create_tables(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        // Running again is a no-op.
        run_migrations(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn open_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let pool = open_database(path.to_str().unwrap(), 1).await.unwrap();
        pool.close().await;
        assert!(path.exists());
    }
}
