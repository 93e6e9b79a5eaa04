use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use agora_types::api::{CommentCreatedResponse, CreateCommentRequest};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::feed::{comment_from_row, load_posts};
use crate::posts::{parse_post_id, require_post, require_user, require_wallet, single, validate_content};

/// POST /posts/{id}/comment — append a comment, then answer with the post
/// re-read so every comment carries its author's profile.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let post_id = parse_post_id(&id)?;
    require_wallet(&req.wallet_address)?;
    validate_content(&req.content)?;

    let comment_id = Uuid::new_v4();
    let (comment, post) = crate::blocking(&state, move |db| {
        let post = require_post(db, &post_id)?;
        require_user(db, &req.wallet_address)?;

        let comment = db.insert_comment(
            &comment_id.to_string(),
            &post.id,
            &req.wallet_address,
            &req.content,
        )?;
        let post = single(load_posts(db, vec![post])?)?;
        Ok((comment_from_row(comment), post))
    })
    .await?;

    info!("{} commented on post {}", comment.wallet_address, post_id);
    Ok((
        StatusCode::CREATED,
        Json(CommentCreatedResponse {
            id: comment.id,
            wallet_address: comment.wallet_address,
            content: comment.content,
            timestamp: comment.timestamp,
            post,
        }),
    ))
}
