//! End-to-end session resolution: issue a token, present it as a cookie,
//! resolve it against a live store.

use std::time::Duration;

use http::HeaderMap;
use jsonwebtoken::{EncodingKey, Header, encode};
use shared::types::{Identity, Role, SessionClaims};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use server::auth::session::{
    AmbientSource, CookieJar, HeaderSource, REQUEST_COOKIES, current_identity, resolve_session,
};
use server::auth::token::TokenCodec;
use server::database::{schema, users};

const SECRET: &str = "an-integration-test-secret-of-32b";

async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    schema::create_tables(&pool).await.unwrap();
    pool
}

fn codec() -> TokenCodec {
    TokenCodec::new(SECRET, Duration::from_secs(3600))
}

async fn register(pool: &SqlitePool, email: &str) -> (i64, Role) {
    users::register_user(
        pool,
        &users::NewUser {
            email,
            password_hash: "$argon2id$fake",
            name: None,
            image: None,
        },
    )
    .await
    .unwrap()
}

fn identity(user_id: i64, email: &str, role: Role) -> Identity {
    Identity {
        user_id,
        email: email.to_string(),
        name: None,
        image: None,
        role,
    }
}

fn headers_with_session(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::COOKIE,
        format!("session={}", token).parse().unwrap(),
    );
    headers
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn issued_token_resolves_to_identity() {
    let pool = test_pool().await;
    let codec = codec();
    let (id, role) = register(&pool, "alice@example.com").await;
    assert_eq!(role, Role::Admin);

    let token = codec.issue(&identity(id, "alice@example.com", role)).unwrap();
    let headers = headers_with_session(&token);

    let resolved = resolve_session(&codec, &pool, &HeaderSource(&headers))
        .await
        .unwrap()
        .expect("session should resolve");

    assert_eq!(resolved.user_id, id);
    assert_eq!(resolved.email, "alice@example.com");
    assert_eq!(resolved.role, Role::Admin);
}

#[tokio::test]
async fn missing_cookie_is_anonymous() {
    let pool = test_pool().await;
    let headers = HeaderMap::new();

    let resolved = resolve_session(&codec(), &pool, &HeaderSource(&headers))
        .await
        .unwrap();
    assert!(resolved.is_none());
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_token_is_anonymous() {
    let pool = test_pool().await;
    let codec = codec();
    let (id, role) = register(&pool, "alice@example.com").await;

    let token = codec.issue(&identity(id, "alice@example.com", role)).unwrap();
    let tampered = format!("{}x", token);
    let headers = headers_with_session(&tampered);

    let resolved = resolve_session(&codec, &pool, &HeaderSource(&headers))
        .await
        .unwrap();
    assert!(resolved.is_none());
}

#[tokio::test]
async fn token_signed_with_other_secret_is_anonymous() {
    let pool = test_pool().await;
    let (id, role) = register(&pool, "alice@example.com").await;

    let other = TokenCodec::new("a-completely-different-32b-secret", Duration::from_secs(3600));
    let token = other.issue(&identity(id, "alice@example.com", role)).unwrap();
    let headers = headers_with_session(&token);

    let resolved = resolve_session(&codec(), &pool, &HeaderSource(&headers))
        .await
        .unwrap();
    assert!(resolved.is_none());
}

#[tokio::test]
async fn expired_token_is_anonymous() {
    let pool = test_pool().await;
    let (id, role) = register(&pool, "alice@example.com").await;

    // Hand-craft a token whose lifetime already ended.
    let now = jsonwebtoken::get_current_timestamp() as usize;
    let claims = SessionClaims {
        sub: "alice@example.com".to_string(),
        user_id: id,
        name: None,
        image: None,
        role,
        iat: now - 7200,
        exp: now - 60,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    let headers = headers_with_session(&token);

    let resolved = resolve_session(&codec(), &pool, &HeaderSource(&headers))
        .await
        .unwrap();
    assert!(resolved.is_none());
}

#[tokio::test]
async fn token_for_deleted_account_is_anonymous() {
    let pool = test_pool().await;
    let codec = codec();

    // Valid signature, but the subject never existed in this store.
    let token = codec
        .issue(&identity(99, "ghost@example.com", Role::User))
        .unwrap();
    let headers = headers_with_session(&token);

    let resolved = resolve_session(&codec, &pool, &HeaderSource(&headers))
        .await
        .unwrap();
    assert!(resolved.is_none());
}

// ---------------------------------------------------------------------------
// Stale role claims
// ---------------------------------------------------------------------------

#[tokio::test]
async fn promotion_after_issue_invalidates_the_session() {
    let pool = test_pool().await;
    let codec = codec();
    register(&pool, "admin@example.com").await;
    let (bob_id, bob_role) = register(&pool, "bob@example.com").await;
    assert_eq!(bob_role, Role::User);

    let token = codec.issue(&identity(bob_id, "bob@example.com", Role::User)).unwrap();

    // Token resolves while the claim still matches the store.
    let headers = headers_with_session(&token);
    assert!(
        resolve_session(&codec, &pool, &HeaderSource(&headers))
            .await
            .unwrap()
            .is_some()
    );

    // After promotion the old claim is stale and the session dies. The user
    // must log in again to pick up the new role.
    assert!(users::promote_user(&pool, "bob@example.com").await.unwrap());
    assert!(
        resolve_session(&codec, &pool, &HeaderSource(&headers))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn demotion_after_issue_invalidates_the_session() {
    let pool = test_pool().await;
    let codec = codec();
    register(&pool, "admin@example.com").await;
    let (bob_id, _) = register(&pool, "bob@example.com").await;
    users::promote_user(&pool, "bob@example.com").await.unwrap();

    let token = codec
        .issue(&identity(bob_id, "bob@example.com", Role::Admin))
        .unwrap();
    let headers = headers_with_session(&token);
    assert!(
        resolve_session(&codec, &pool, &HeaderSource(&headers))
            .await
            .unwrap()
            .is_some()
    );

    // The admin token must not keep granting privileges after demotion.
    assert!(users::demote_user(&pool, "bob@example.com").await.unwrap());
    assert!(
        resolve_session(&codec, &pool, &HeaderSource(&headers))
            .await
            .unwrap()
            .is_none()
    );
}

// ---------------------------------------------------------------------------
// Ambient source
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ambient_resolution_matches_header_resolution() {
    let pool = test_pool().await;
    let codec = codec();
    let (id, role) = register(&pool, "alice@example.com").await;
    let token = codec.issue(&identity(id, "alice@example.com", role)).unwrap();
    let headers = headers_with_session(&token);

    let from_headers = resolve_session(&codec, &pool, &HeaderSource(&headers))
        .await
        .unwrap();

    let jar = CookieJar::from_headers(&headers);
    let from_ambient = REQUEST_COOKIES
        .scope(jar, current_identity(&codec, &pool))
        .await
        .unwrap();

    assert_eq!(from_headers, from_ambient);
    assert!(from_ambient.is_some());
}

#[tokio::test]
async fn ambient_resolution_outside_scope_is_anonymous() {
    let pool = test_pool().await;

    let resolved = resolve_session(&codec(), &pool, &AmbientSource).await.unwrap();
    assert!(resolved.is_none());
}
