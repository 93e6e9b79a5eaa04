pub mod auth;
pub mod comments;
pub mod error;
pub mod feed;
pub mod likes;
pub mod posts;
pub mod users;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::error;

use agora_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};

/// All REST routes, without transport layers (CORS, tracing).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/verify", post(auth::verify_wallet))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post).delete(posts::delete_post))
        .route("/posts/{id}/like", post(likes::toggle_like))
        .route("/posts/{id}/comment", post(comments::create_comment))
        .route("/users", post(users::create_user))
        .route("/users/{wallet}", get(users::get_user).patch(users::update_user))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
}

#[cfg(test)]
mod tests;
