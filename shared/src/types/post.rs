use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Post wire types
// ---------------------------------------------------------------------------

/// Body of `POST /api/posts`. The slug is never client-supplied; it is
/// allocated server-side from the title.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPostData {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub featured: bool,
}

/// A stored post, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category: Option<String>,
    pub published: bool,
    pub featured: bool,
    /// Estimated minutes to read, computed at creation time.
    pub reading_time: i64,
    pub author_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostResponse {
    Success {
        post: Post,
        message: String,
    },
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostListResponse {
    Success {
        posts: Vec<Post>,
        pagination: Pagination,
    },
    Error {
        code: String,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Post errors
// ---------------------------------------------------------------------------

pub enum PostError {
    Unauthorized,
    NotFound,
    InvalidTitle,
    MissingField(String),
    SlugExhausted,
    DatabaseError,
    InternalError,
}

impl PostError {
    pub fn to_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "POST_NOT_FOUND",
            Self::InvalidTitle => "INVALID_TITLE",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::SlugExhausted => "SLUG_EXHAUSTED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            Self::Unauthorized => "Admin privileges required".to_string(),
            Self::NotFound => "Post not found".to_string(),
            Self::InvalidTitle => {
                "Title must contain at least one letter or digit".to_string()
            }
            Self::MissingField(field) => format!("Missing required field: {}", field),
            Self::SlugExhausted => "Could not allocate a unique slug".to_string(),
            Self::DatabaseError => "Database error occurred".to_string(),
            Self::InternalError => "An internal error occurred".to_string(),
        }
    }

    pub fn to_response(&self) -> PostResponse {
        PostResponse::Error {
            code: self.to_code().to_string(),
            message: self.to_message(),
        }
    }

    pub fn to_list_response(&self) -> PostListResponse {
        PostListResponse::Error {
            code: self.to_code().to_string(),
            message: self.to_message(),
        }
    }
}
