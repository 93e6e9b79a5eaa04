//! Turns database rows into the nested post shape the feed endpoints return:
//! each post carries its author's profile, its likes, and its comments
//! (oldest first) with each commenter's profile.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use agora_db::{CommentRow, Database, LikeRow, PostRow, UserRow};
use agora_types::models::{Comment, Like, Post, UserProfile};

pub fn profile_from_row(row: UserRow) -> UserProfile {
    UserProfile {
        wallet_address: row.wallet_address,
        username: row.username,
        bio: row.bio,
        profile_pic_url: row.profile_pic_url,
    }
}

pub fn like_from_row(row: LikeRow) -> Like {
    Like {
        id: parse_id(&row.id, "like"),
        post_id: parse_id(&row.post_id, "like post"),
        wallet_address: row.wallet_address,
    }
}

pub fn comment_from_row(row: CommentRow) -> Comment {
    Comment {
        id: parse_id(&row.id, "comment"),
        timestamp: parse_timestamp(&row.created_at, &row.id),
        wallet_address: row.wallet_address,
        content: row.content,
        commented_by: row.author.map(profile_from_row),
    }
}

/// Load author profiles, likes, and comments for `posts` and nest them.
/// Input order is preserved.
pub fn load_posts(db: &Database, posts: Vec<PostRow>) -> anyhow::Result<Vec<Post>> {
    let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();

    let mut authors: Vec<String> = posts.iter().map(|p| p.wallet_address.clone()).collect();
    authors.sort();
    authors.dedup();

    let users: HashMap<String, UserRow> = db
        .get_users(&authors)?
        .into_iter()
        .map(|u| (u.wallet_address.clone(), u))
        .collect();

    let mut likes: HashMap<String, Vec<Like>> = HashMap::new();
    for row in db.get_likes_for_posts(&post_ids)? {
        likes.entry(row.post_id.clone()).or_default().push(like_from_row(row));
    }

    // Rows arrive oldest first, so pushing keeps each post's list ordered.
    let mut comments: HashMap<String, Vec<Comment>> = HashMap::new();
    for row in db.get_comments_for_posts(&post_ids)? {
        comments.entry(row.post_id.clone()).or_default().push(comment_from_row(row));
    }

    Ok(posts
        .into_iter()
        .map(|row| Post {
            id: parse_id(&row.id, "post"),
            timestamp: parse_timestamp(&row.created_at, &row.id),
            user: users.get(&row.wallet_address).cloned().map(profile_from_row),
            likes: likes.remove(&row.id).unwrap_or_default(),
            comments: comments.remove(&row.id).unwrap_or_default(),
            content: row.content,
            wallet_address: row.wallet_address,
        })
        .collect())
}

fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} id '{}': {}", what, raw, e);
        Uuid::default()
    })
}

fn parse_timestamp(raw: &str, owner: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on '{}': {}", raw, owner, e);
            DateTime::default()
        })
}
