use shared::types::Post;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};

use crate::database::posts::{self, InsertPostError, NewPost};

/// Upper bound on suffix probing before allocation gives up.
///
/// Hitting this means 64 posts already share one base slug, which indicates
/// something pathological (an import loop, an abusive client) rather than
/// organic publishing.
pub const MAX_SLUG_ATTEMPTS: u32 = 64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SlugError {
    /// The title reduced to nothing after normalization.
    #[error("title produces an empty slug")]
    EmptyTitle,

    /// Every candidate up to the attempt bound was already taken.
    #[error("slug allocation exhausted after {MAX_SLUG_ATTEMPTS} attempts")]
    AttemptsExhausted,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Reduce a title to its URL-safe base slug.
///
/// Lowercases, drops everything except ASCII alphanumerics and whitespace,
/// then joins the remaining words with single hyphens. `"Hello, World!"`
/// becomes `"hello-world"`.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Insert `post` under a unique slug derived from its title.
///
/// Candidates are tried in order: `base`, `base-1`, `base-2`, and so on.
/// The existence probe skips slugs that are visibly taken, but the UNIQUE
/// constraint on the slug column is the source of truth: when two writers
/// race for the same candidate, the loser's insert fails cleanly and the
/// loop moves to the next suffix.
pub async fn allocate_post(db: &SqlitePool, post: &NewPost) -> Result<Post, SlugError> {
    let base = slugify(&post.title);
    if base.is_empty() {
        return Err(SlugError::EmptyTitle);
    }

    for attempt in 0..MAX_SLUG_ATTEMPTS {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, attempt)
        };

        // Cheap probe. A hit here saves a doomed insert, a miss proves
        // nothing because another writer may land first.
        if posts::slug_exists(db, &candidate).await? {
            continue;
        }

        match posts::insert_post(db, &candidate, post).await {
            Ok(created) => {
                if attempt > 0 {
                    debug!("Slug '{}' allocated after {} collisions", candidate, attempt);
                }
                return Ok(created);
            }
            Err(InsertPostError::SlugTaken) => {
                // Lost the race for this candidate. Try the next suffix.
                debug!("Slug '{}' taken concurrently, retrying", candidate);
                continue;
            }
            Err(InsertPostError::Database(err)) => return Err(SlugError::Database(err)),
        }
    }

    warn!("Slug space exhausted for base '{}'", base);
    Err(SlugError::AttemptsExhausted)
}
