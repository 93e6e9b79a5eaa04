use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use agora_db::{Database, PostRow, UserRow};
use agora_types::api::{CreatePostRequest, WalletRequest};
use agora_types::models::Post;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::feed::load_posts;

pub const MAX_CONTENT_CHARS: usize = 280;

/// GET /posts — every post, newest first.
pub async fn list_posts(State(state): State<AppState>) -> ApiResult<Json<Vec<Post>>> {
    let posts = crate::blocking(&state, |db| {
        let rows = db.list_posts()?;
        Ok(load_posts(db, rows)?)
    })
    .await?;

    Ok(Json(posts))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Post>> {
    let id = parse_post_id(&id)?;

    let post = crate::blocking(&state, move |db| {
        let row = require_post(db, &id)?;
        single(load_posts(db, vec![row])?)
    })
    .await?;

    Ok(Json(post))
}

/// POST /posts — the author must already have a user row.
pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<impl IntoResponse> {
    require_wallet(&req.wallet_address)?;
    validate_content(&req.content)?;

    let post_id = Uuid::new_v4();
    let post = crate::blocking(&state, move |db| {
        require_user(db, &req.wallet_address)?;
        let row = db.insert_post(&post_id.to_string(), &req.wallet_address, &req.content)?;
        single(load_posts(db, vec![row])?)
    })
    .await?;

    info!("Post {} created by {}", post.id, post.wallet_address);
    Ok((StatusCode::CREATED, Json(post)))
}

/// DELETE /posts/{id} — only the author may delete; likes and comments
/// are removed with the post.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WalletRequest>,
) -> ApiResult<StatusCode> {
    let id = parse_post_id(&id)?;

    crate::blocking(&state, move |db| {
        let post = require_post(db, &id)?;
        if post.wallet_address != req.wallet_address {
            warn!("{} tried to delete post {} owned by {}", req.wallet_address, id, post.wallet_address);
            return Err(ApiError::Forbidden("Only the author can delete a post".to_string()));
        }
        db.delete_post(&post.id)?;
        Ok(())
    })
    .await?;

    info!("Post {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

// -- Shared request checks --

pub(crate) fn parse_post_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse::<Uuid>()
        .map_err(|_| ApiError::bad_request("Invalid post ID format"))
}

pub(crate) fn require_wallet(wallet_address: &str) -> ApiResult<()> {
    if wallet_address.trim().is_empty() {
        return Err(ApiError::bad_request("walletAddress is required"));
    }
    Ok(())
}

/// Content must be non-blank and at most 280 characters (not bytes).
pub(crate) fn validate_content(content: &str) -> ApiResult<()> {
    if content.trim().is_empty() {
        return Err(ApiError::bad_request("Content must not be empty"));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::bad_request(format!(
            "Content must be at most {} characters",
            MAX_CONTENT_CHARS
        )));
    }
    Ok(())
}

pub(crate) fn require_post(db: &Database, id: &Uuid) -> ApiResult<PostRow> {
    db.get_post(&id.to_string())?
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

pub(crate) fn require_user(db: &Database, wallet_address: &str) -> ApiResult<UserRow> {
    db.get_user(wallet_address)?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub(crate) fn single(mut posts: Vec<Post>) -> ApiResult<Post> {
    posts
        .pop()
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("post vanished while loading")))
}
