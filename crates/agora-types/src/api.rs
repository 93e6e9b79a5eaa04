use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Post, UserProfile};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerifyWalletRequest {
    pub message: String,
    pub signed_message: String,
    pub wallet_address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyWalletResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePostRequest {
    pub wallet_address: String,
    pub content: String,
}

/// Body of like toggles and post deletion: the acting wallet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WalletRequest {
    pub wallet_address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub wallet_address: String,
    pub content: String,
}

/// The freshly stored comment plus its post, re-read with every comment
/// joined to its author.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentCreatedResponse {
    pub id: Uuid,
    pub wallet_address: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub post: Post,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub wallet_address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
