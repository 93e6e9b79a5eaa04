use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use uuid::Uuid;

use agora_db::LikeToggle;
use agora_types::api::WalletRequest;
use agora_types::models::Like;

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::feed::like_from_row;
use crate::posts::{parse_post_id, require_post, require_user, require_wallet};

/// POST /posts/{id}/like — toggle. Returns the new like, or `null` when the
/// call removed an existing one.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<WalletRequest>,
) -> ApiResult<Json<Option<Like>>> {
    let post_id = parse_post_id(&id)?;
    require_wallet(&req.wallet_address)?;

    let like_id = Uuid::new_v4();
    let wallet = req.wallet_address.clone();
    let outcome = crate::blocking(&state, move |db| {
        let post = require_post(db, &post_id)?;
        require_user(db, &wallet)?;
        Ok(db.toggle_like(&like_id.to_string(), &post.id, &wallet)?)
    })
    .await?;

    match outcome {
        LikeToggle::Liked(row) => {
            info!("{} liked post {}", req.wallet_address, post_id);
            Ok(Json(Some(like_from_row(row))))
        }
        LikeToggle::Unliked => {
            info!("{} unliked post {}", req.wallet_address, post_id);
            Ok(Json(None))
        }
    }
}
