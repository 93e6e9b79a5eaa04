//! Rows as SQLite stores them: ids and timestamps stay strings here and are
//! parsed at the API boundary.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub wallet_address: String,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: String,
    pub wallet_address: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeRow {
    pub id: String,
    pub wallet_address: String,
    pub post_id: String,
    pub created_at: String,
}

/// A comment joined to its author's profile. The author columns are `None`
/// only if the user row has gone missing.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub wallet_address: String,
    pub content: String,
    pub created_at: String,
    pub author: Option<UserRow>,
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeToggle {
    Liked(LikeRow),
    Unliked,
}

/// Profile fields to overwrite; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub profile_pic_url: Option<String>,
}
