use serde::Serialize;
use shared::types::Role;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::database::passwords::get_timestamp;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Insert payload for a new account. The password arrives already hashed.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: Option<&'a str>,
    pub image: Option<&'a str>,
}

/// Everything login needs to check a credential and build a session.
pub struct UserAuth {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Listing row for the admin user overview. Never carries the hash.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: i64,
    pub last_login: Option<i64>,
}

fn role_from_str(raw: &str) -> Result<Role, sqlx::Error> {
    Role::parse(raw).ok_or_else(|| sqlx::Error::Decode(format!("unknown role '{}'", raw).into()))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a new account and return its id and assigned role.
///
/// The very first account becomes the admin. The count and the insert share
/// one transaction so two racing first registrations cannot both see an
/// empty table.
pub async fn register_user(
    pool: &SqlitePool,
    user: &NewUser<'_>,
) -> Result<(i64, Role), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *tx)
        .await?;
    let role = if count == 0 { Role::Admin } else { Role::User };

    let result = sqlx::query(
        "INSERT INTO users (email, name, image, password_hash, role, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user.email)
    .bind(user.name)
    .bind(user.image)
    .bind(user.password_hash)
    .bind(role.as_str())
    .bind(get_timestamp())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Registered {} as {}", user.email, role);
    Ok((result.last_insert_rowid(), role))
}

/// Fetch the credential row for `email`, or `None` if no such account.
pub async fn get_user_auth(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<UserAuth>, sqlx::Error> {
    let row = sqlx::query(
        "SELECT id, email, name, image, password_hash, role FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.map(|row: SqliteRow| {
        let role: String = row.try_get("role")?;
        Ok(UserAuth {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            image: row.try_get("image")?,
            password_hash: row.try_get("password_hash")?,
            role: role_from_str(&role)?,
        })
    })
    .transpose()
}

/// Current stored role for `email`. `None` when the account does not exist.
pub async fn find_user_role(pool: &SqlitePool, email: &str) -> Result<Option<Role>, sqlx::Error> {
    let raw: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    raw.map(|r| role_from_str(&r)).transpose()
}

pub async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(pool)
        .await
}

/// Grant admin to `email`. Returns `false` when the account does not exist
/// or already holds the role.
pub async fn promote_user(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = 'ADMIN' WHERE email = ? AND role = 'USER'")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Revoke admin from `email`. Returns `false` when the account does not
/// exist or is not an admin.
pub async fn demote_user(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = 'USER' WHERE email = ? AND role = 'ADMIN'")
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_last_login(pool: &SqlitePool, user_id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(get_timestamp())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// All accounts, oldest first, for the admin overview.
pub async fn list_users(pool: &SqlitePool) -> Result<Vec<UserSummary>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, email, name, role, created_at, last_login
         FROM users ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row: SqliteRow| {
            let role: String = row.try_get("role")?;
            Ok(UserSummary {
                id: row.try_get("id")?,
                email: row.try_get("email")?,
                name: row.try_get("name")?,
                role: role_from_str(&role)?,
                created_at: row.try_get("created_at")?,
                last_login: row.try_get("last_login")?,
            })
        })
        .collect()
}
