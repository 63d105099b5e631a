use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Incoming as IncomingBody;
use hyper::{Request, Response, StatusCode};
use shared::types::{
    Identity, NewPostData, Pagination, PostError, PostListResponse, PostResponse, is_privileged,
};
use tracing::{error, info, warn};

use crate::AppState;
use crate::database::posts::{self, NewPost, PostFilter};
use crate::handlers::http::utils::{
    body_json, deliver_serialized_json, json_bool, json_str, json_str_raw, query_params,
};
use crate::slug::{self, SlugError};

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// GET /api/posts
///
/// Anonymous and regular callers see published posts only; admins see
/// drafts as well.
pub async fn handle_list_posts(
    req: Request<IncomingBody>,
    state: AppState,
    identity: Option<Identity>,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let params = query_params(req.uri());

    let page = params
        .get("page")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);

    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<u32>().ok())
        .map(|l| l.clamp(1, 100))
        .unwrap_or(10);

    let category = params.get("category").filter(|c| !c.is_empty()).cloned();
    let featured = params.get("featured").and_then(|v| parse_bool_param(v));

    let filter = PostFilter {
        page,
        limit,
        category,
        featured,
        include_unpublished: is_privileged(identity.as_ref()),
    };

    match posts::list_posts(&state.db, &filter).await {
        Ok((posts, total)) => {
            let total_pages = if total == 0 {
                0
            } else {
                (total + limit as i64 - 1) / limit as i64
            };

            let response = PostListResponse::Success {
                posts,
                pagination: Pagination {
                    page,
                    limit,
                    total,
                    total_pages,
                },
            };
            deliver_serialized_json(&response, StatusCode::OK)
        }
        Err(e) => {
            error!("Failed to list posts: {}", e);
            deliver_serialized_json(
                &PostError::DatabaseError.to_list_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

/// GET /api/posts/:slug
pub async fn handle_get_post(
    req: Request<IncomingBody>,
    state: AppState,
    identity: Option<Identity>,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let Some(slug) = slug_from_path(req.uri().path()) else {
        return deliver_serialized_json(&PostError::NotFound.to_response(), StatusCode::NOT_FOUND);
    };

    match posts::get_by_slug(&state.db, &slug).await {
        Ok(Some(post)) if post.published || is_privileged(identity.as_ref()) => {
            let response = PostResponse::Success {
                post,
                message: "Post found".to_string(),
            };
            deliver_serialized_json(&response, StatusCode::OK)
        }
        // Drafts look exactly like missing posts to non-admins, so the
        // endpoint cannot be used to probe for unpublished slugs.
        Ok(_) => {
            deliver_serialized_json(&PostError::NotFound.to_response(), StatusCode::NOT_FOUND)
        }
        Err(e) => {
            error!("Failed to fetch post {}: {}", slug, e);
            deliver_serialized_json(
                &PostError::DatabaseError.to_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

/// POST /api/posts — admin only; the router enforces the gate.
pub async fn handle_create_post(
    req: Request<IncomingBody>,
    state: AppState,
    author: Identity,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    info!("Processing create post request from {}", author.email);

    let data = match parse_post_data(req).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Post parsing failed: {:?}", e.to_code());
            return deliver_serialized_json(&e.to_response(), StatusCode::BAD_REQUEST);
        }
    };

    let new_post = NewPost {
        title: data.title,
        content: data.content.clone(),
        excerpt: data.excerpt,
        cover_image: data.cover_image,
        category: data.category,
        published: data.published,
        featured: data.featured,
        reading_time: estimate_reading_time(&data.content),
        author_id: author.user_id,
    };

    match slug::allocate_post(&state.db, &new_post).await {
        Ok(post) => {
            info!("Created post '{}' as /{}", post.title, post.slug);
            let response = PostResponse::Success {
                post,
                message: "Post created".to_string(),
            };
            deliver_serialized_json(&response, StatusCode::CREATED)
        }
        Err(SlugError::EmptyTitle) => {
            warn!("Post title slugifies to nothing");
            deliver_serialized_json(&PostError::InvalidTitle.to_response(), StatusCode::BAD_REQUEST)
        }
        Err(SlugError::AttemptsExhausted) => {
            error!("Slug allocation exhausted its attempt budget");
            deliver_serialized_json(&PostError::SlugExhausted.to_response(), StatusCode::CONFLICT)
        }
        Err(SlugError::Database(e)) => {
            error!("Failed to create post: {}", e);
            deliver_serialized_json(
                &PostError::DatabaseError.to_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

/// Parse post fields from the JSON body.
async fn parse_post_data(
    req: Request<IncomingBody>,
) -> std::result::Result<NewPostData, PostError> {
    let body = body_json(req).await.map_err(|e| {
        error!("Failed to read post body: {}", e);
        PostError::InternalError
    })?;

    let title = json_str(&body, "title").ok_or(PostError::MissingField("title".to_string()))?;

    // Content is kept verbatim; markdown is whitespace-sensitive.
    let content =
        json_str_raw(&body, "content").ok_or(PostError::MissingField("content".to_string()))?;

    Ok(NewPostData {
        title,
        content,
        excerpt: json_str(&body, "excerpt"),
        cover_image: json_str(&body, "cover_image"),
        category: json_str(&body, "category"),
        published: json_bool(&body, "published"),
        featured: json_bool(&body, "featured"),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Minutes to read at 200 words per minute, rounded up, never zero.
fn estimate_reading_time(content: &str) -> i64 {
    let words = content.split_whitespace().count() as i64;
    ((words + 199) / 200).max(1)
}

fn parse_bool_param(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Slug segment of `/api/posts/:slug`.
fn slug_from_path(path: &str) -> Option<String> {
    path.trim_end_matches('/')
        .split('/')
        .nth(3)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
