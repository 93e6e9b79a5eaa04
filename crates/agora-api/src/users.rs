use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};

use agora_db::{DbError, ProfileUpdate};
use agora_types::api::{CreateUserRequest, UpdateProfileRequest};
use agora_types::models::UserProfile;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::feed::profile_from_row;
use crate::posts::{require_user, require_wallet};

/// GET /users/{wallet}
pub async fn get_user(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let user = crate::blocking(&state, move |db| require_user(db, &wallet)).await?;
    Ok(Json(profile_from_row(user)))
}

/// PATCH /users/{wallet} — overwrite whichever profile fields are present.
pub async fn update_user(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    let update = ProfileUpdate {
        username: req.username,
        bio: req.bio,
        profile_pic_url: req.profile_pic_url,
    };

    let user = crate::blocking(&state, move |db| {
        db.update_profile(&wallet, &update)?
            .ok_or_else(|| ApiError::not_found("User not found"))
    })
    .await?;

    info!("Profile updated for {}", user.wallet_address);
    Ok(Json(profile_from_row(user)))
}

/// POST /users — explicit registration. A wallet can only register once.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    require_wallet(&req.wallet_address)?;

    let user = crate::blocking(&state, move |db| {
        db.create_user(&req.wallet_address).map_err(|e| match e.downcast_ref::<DbError>() {
            Some(DbError::UserExists(wallet)) => {
                warn!("Duplicate registration for {}", wallet);
                ApiError::bad_request("User already exists")
            }
            None => ApiError::Internal(e),
        })
    })
    .await?;

    info!("User registered: {}", user.wallet_address);
    Ok((StatusCode::CREATED, Json(profile_from_row(user))))
}
