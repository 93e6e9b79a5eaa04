use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public profile of a wallet owner. The wallet address is the identity;
/// every other field is optional display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub wallet_address: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: Uuid,
    pub wallet_address: String,
    pub post_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub wallet_address: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "commentedBy")]
    pub commented_by: Option<UserProfile>,
}

/// A post with its author, like set, and comments (oldest first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub wallet_address: String,
    pub timestamp: DateTime<Utc>,
    pub user: Option<UserProfile>,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
}
