//! Slug allocation against a live store, including the contended case the
//! UNIQUE constraint exists for.

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use server::database::posts::NewPost;
use server::database::{schema, users};
use server::slug::{SlugError, allocate_post};

async fn test_pool() -> (SqlitePool, i64) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    schema::create_tables(&pool).await.unwrap();

    let (author_id, _) = users::register_user(
        &pool,
        &users::NewUser {
            email: "author@example.com",
            password_hash: "$argon2id$fake",
            name: None,
            image: None,
        },
    )
    .await
    .unwrap();

    (pool, author_id)
}

fn post(title: &str, author_id: i64) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: "Body text goes here.".to_string(),
        excerpt: None,
        cover_image: None,
        category: None,
        published: true,
        featured: false,
        reading_time: 1,
        author_id,
    }
}

#[tokio::test]
async fn repeated_titles_get_numbered_suffixes() {
    let (pool, author_id) = test_pool().await;

    let first = allocate_post(&pool, &post("Hello World", author_id)).await.unwrap();
    let second = allocate_post(&pool, &post("Hello World", author_id)).await.unwrap();
    let third = allocate_post(&pool, &post("Hello World", author_id)).await.unwrap();

    assert_eq!(first.slug, "hello-world");
    assert_eq!(second.slug, "hello-world-1");
    assert_eq!(third.slug, "hello-world-2");
}

#[tokio::test]
async fn distinct_titles_do_not_collide() {
    let (pool, author_id) = test_pool().await;

    let a = allocate_post(&pool, &post("Hello World", author_id)).await.unwrap();
    let b = allocate_post(&pool, &post("Hello, World!", author_id)).await.unwrap();

    // Punctuation-only differences slugify identically, so the second
    // allocation picks up a suffix.
    assert_eq!(a.slug, "hello-world");
    assert_eq!(b.slug, "hello-world-1");

    let c = allocate_post(&pool, &post("Goodbye World", author_id)).await.unwrap();
    assert_eq!(c.slug, "goodbye-world");
}

#[tokio::test]
async fn unsluggable_title_is_rejected() {
    let (pool, author_id) = test_pool().await;

    let err = allocate_post(&pool, &post("!!!", author_id)).await.unwrap_err();
    assert!(matches!(err, SlugError::EmptyTitle));

    let err = allocate_post(&pool, &post("   ", author_id)).await.unwrap_err();
    assert!(matches!(err, SlugError::EmptyTitle));
}

#[tokio::test]
async fn concurrent_allocations_all_get_unique_slugs() {
    let (pool, author_id) = test_pool().await;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            allocate_post(&pool, &post("Launch Day", author_id)).await
        }));
    }

    let mut slugs = Vec::new();
    for handle in handles {
        let created = handle.await.unwrap().unwrap();
        slugs.push(created.slug);
    }

    slugs.sort();
    let before = slugs.len();
    slugs.dedup();
    assert_eq!(slugs.len(), before, "every allocation must be unique");

    assert!(slugs.contains(&"launch-day".to_string()));
    assert!(slugs.contains(&"launch-day-49".to_string()));
}
