use shared::types::Post;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;

use crate::database::is_unique_violation;
use crate::database::passwords::get_timestamp;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Insert payload for a post. The slug is allocated separately; reading time
/// is computed by the handler from the content.
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category: Option<String>,
    pub published: bool,
    pub featured: bool,
    pub reading_time: i64,
    pub author_id: i64,
}

#[derive(Error, Debug)]
pub enum InsertPostError {
    /// The slug column's UNIQUE constraint fired: another writer holds this
    /// slug. The allocator treats this as "try the next candidate".
    #[error("slug already taken")]
    SlugTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Listing filter. `include_unpublished` is only ever set for admins.
pub struct PostFilter {
    pub page: u32,
    pub limit: u32,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub include_unpublished: bool,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            category: None,
            featured: None,
            include_unpublished: false,
        }
    }
}

fn post_from_row(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        excerpt: row.try_get("excerpt")?,
        cover_image: row.try_get("cover_image")?,
        category: row.try_get("category")?,
        published: row.try_get("published")?,
        featured: row.try_get("featured")?,
        reading_time: row.try_get("reading_time")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
    })
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert `post` under `slug` and return the stored row.
///
/// A UNIQUE violation on the slug column maps to [`InsertPostError::SlugTaken`]
/// so the caller can retry with a different candidate.
pub async fn insert_post(
    pool: &SqlitePool,
    slug: &str,
    post: &NewPost,
) -> Result<Post, InsertPostError> {
    let created_at = get_timestamp();

    let result = sqlx::query(
        "INSERT INTO posts
            (slug, title, content, excerpt, cover_image, category,
             published, featured, reading_time, author_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(slug)
    .bind(&post.title)
    .bind(&post.content)
    .bind(&post.excerpt)
    .bind(&post.cover_image)
    .bind(&post.category)
    .bind(post.published)
    .bind(post.featured)
    .bind(post.reading_time)
    .bind(post.author_id)
    .bind(created_at)
    .execute(pool)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            InsertPostError::SlugTaken
        } else {
            InsertPostError::Database(err)
        }
    })?;

    Ok(Post {
        id: result.last_insert_rowid(),
        slug: slug.to_string(),
        title: post.title.clone(),
        content: post.content.clone(),
        excerpt: post.excerpt.clone(),
        cover_image: post.cover_image.clone(),
        category: post.category.clone(),
        published: post.published,
        featured: post.featured,
        reading_time: post.reading_time,
        author_id: post.author_id,
        created_at,
    })
}

/// Visibility probe used by slug allocation. Advisory only: the UNIQUE
/// constraint is what actually guarantees uniqueness.
pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE slug = ?)")
        .bind(slug)
        .fetch_one(pool)
        .await
}

pub async fn get_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Post>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM posts WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(post_from_row).transpose()
}

/// Page through posts matching `filter`, newest first. Returns the page of
/// rows together with the total match count for pagination.
pub async fn list_posts(
    pool: &SqlitePool,
    filter: &PostFilter,
) -> Result<(Vec<Post>, i64), sqlx::Error> {
    let mut clauses: Vec<&str> = Vec::new();
    if !filter.include_unpublished {
        clauses.push("published = 1");
    }
    if filter.category.is_some() {
        clauses.push("category = ?");
    }
    if filter.featured.is_some() {
        clauses.push("featured = ?");
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM posts{}", where_sql);
    let mut count_query = sqlx::query_scalar(&count_sql);
    if let Some(category) = &filter.category {
        count_query = count_query.bind(category);
    }
    if let Some(featured) = filter.featured {
        count_query = count_query.bind(featured);
    }
    let total: i64 = count_query.fetch_one(pool).await?;

    let offset = (filter.page.saturating_sub(1) as i64) * filter.limit as i64;
    let rows_sql = format!(
        "SELECT * FROM posts{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let mut rows_query = sqlx::query(&rows_sql);
    if let Some(category) = &filter.category {
        rows_query = rows_query.bind(category);
    }
    if let Some(featured) = filter.featured {
        rows_query = rows_query.bind(featured);
    }
    rows_query = rows_query.bind(filter.limit as i64).bind(offset);

    let rows = rows_query.fetch_all(pool).await?;
    let posts = rows.iter().map(post_from_row).collect::<Result<_, _>>()?;

    Ok((posts, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{schema, users};
    use sqlx::sqlite::SqlitePoolOptions;

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

    fn sample(title: &str, author_id: i64) -> NewPost {
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
    async fn insert_then_fetch_round_trips() {
        let (pool, author_id) = test_pool().await;
        let created = insert_post(&pool, "hello-world", &sample("Hello World", author_id))
            .await
            .unwrap();

        let fetched = get_by_slug(&pool, "hello-world").await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.published);
    }

    #[tokio::test]
    async fn duplicate_slug_maps_to_slug_taken() {
        let (pool, author_id) = test_pool().await;
        insert_post(&pool, "hello", &sample("Hello", author_id))
            .await
            .unwrap();

        let err = insert_post(&pool, "hello", &sample("Hello Again", author_id))
            .await
            .unwrap_err();
        assert!(matches!(err, InsertPostError::SlugTaken));
    }

    #[tokio::test]
    async fn slug_exists_probe() {
        let (pool, author_id) = test_pool().await;
        assert!(!slug_exists(&pool, "hello").await.unwrap());
        insert_post(&pool, "hello", &sample("Hello", author_id))
            .await
            .unwrap();
        assert!(slug_exists(&pool, "hello").await.unwrap());
    }

    #[tokio::test]
    async fn listing_hides_unpublished_by_default() {
        let (pool, author_id) = test_pool().await;
        insert_post(&pool, "public", &sample("Public", author_id))
            .await
            .unwrap();
        let mut draft = sample("Draft", author_id);
        draft.published = false;
        insert_post(&pool, "draft", &draft).await.unwrap();

        let (posts, total) = list_posts(&pool, &PostFilter::default()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "public");

        let admin_filter = PostFilter {
            include_unpublished: true,
            ..PostFilter::default()
        };
        let (_, total) = list_posts(&pool, &admin_filter).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn listing_filters_by_category_and_featured() {
        let (pool, author_id) = test_pool().await;

        let mut a = sample("Rust Post", author_id);
        a.category = Some("rust".to_string());
        a.featured = true;
        insert_post(&pool, "rust-post", &a).await.unwrap();

        let mut b = sample("Cooking Post", author_id);
        b.category = Some("cooking".to_string());
        insert_post(&pool, "cooking-post", &b).await.unwrap();

        let filter = PostFilter {
            category: Some("rust".to_string()),
            ..PostFilter::default()
        };
        let (posts, total) = list_posts(&pool, &filter).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(posts[0].slug, "rust-post");

        let filter = PostFilter {
            featured: Some(true),
            ..PostFilter::default()
        };
        let (posts, _) = list_posts(&pool, &filter).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "rust-post");

        let filter = PostFilter {
            featured: Some(false),
            ..PostFilter::default()
        };
        let (posts, _) = list_posts(&pool, &filter).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug, "cooking-post");
    }

    #[tokio::test]
    async fn pagination_slices_newest_first() {
        let (pool, author_id) = test_pool().await;
        for i in 0..5 {
            insert_post(&pool, &format!("post-{}", i), &sample("Post", author_id))
                .await
                .unwrap();
        }

        let filter = PostFilter {
            limit: 2,
            ..PostFilter::default()
        };
        let (page1, total) = list_posts(&pool, &filter).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        // Same created_at second, so the id tiebreak orders newest first.
        assert_eq!(page1[0].slug, "post-4");
        assert_eq!(page1[1].slug, "post-3");

        let filter = PostFilter {
            page: 3,
            limit: 2,
            ..PostFilter::default()
        };
        let (page3, _) = list_posts(&pool, &filter).await.unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].slug, "post-0");
    }

    #[tokio::test]
    async fn missing_slug_is_none() {
        let (pool, _) = test_pool().await;
        assert!(get_by_slug(&pool, "ghost").await.unwrap().is_none());
    }
}
