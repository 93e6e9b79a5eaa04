use crate::models::{CommentRow, LikeRow, LikeToggle, PostRow, ProfileUpdate, UserRow};
use crate::{Database, DbError};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, Row};

/// Microsecond RFC 3339 in UTC, so string order is time order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn create_user(&self, wallet_address: &str) -> Result<UserRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_user(&tx, wallet_address)?.is_some() {
                return Err(DbError::UserExists(wallet_address.to_string()).into());
            }

            let created_at = now_timestamp();
            tx.execute(
                "INSERT INTO users (wallet_address, created_at) VALUES (?1, ?2)",
                (wallet_address, &created_at),
            )?;
            tx.commit()?;

            Ok(UserRow {
                wallet_address: wallet_address.to_string(),
                username: None,
                bio: None,
                profile_pic_url: None,
                created_at,
            })
        })
    }

    /// Fetch the user, inserting a bare profile first if none exists.
    pub fn find_or_create_user(&self, wallet_address: &str) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (wallet_address, created_at) VALUES (?1, ?2)",
                (wallet_address, now_timestamp()),
            )?;
            query_user(conn, wallet_address)?
                .ok_or_else(|| anyhow::anyhow!("User vanished after insert: {}", wallet_address))
        })
    }

    pub fn get_user(&self, wallet_address: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, wallet_address))
    }

    /// Batch-fetch users by wallet address. Unknown addresses are skipped.
    pub fn get_users(&self, wallet_addresses: &[String]) -> Result<Vec<UserRow>> {
        if wallet_addresses.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            in_batches(wallet_addresses, |batch| {
                let sql = format!(
                    "SELECT wallet_address, username, bio, profile_pic_url, created_at
                     FROM users WHERE wallet_address IN ({})",
                    placeholders(batch.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(batch), user_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }

    /// Overwrite the provided profile fields. Returns `None` if the user
    /// does not exist.
    pub fn update_profile(
        &self,
        wallet_address: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    username        = COALESCE(?2, username),
                    bio             = COALESCE(?3, bio),
                    profile_pic_url = COALESCE(?4, profile_pic_url)
                 WHERE wallet_address = ?1",
                rusqlite::params![
                    wallet_address,
                    update.username,
                    update.bio,
                    update.profile_pic_url
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, wallet_address)
        })
    }

    // -- Posts --

    pub fn insert_post(&self, id: &str, wallet_address: &str, content: &str) -> Result<PostRow> {
        self.with_conn(|conn| {
            let created_at = now_timestamp();
            conn.execute(
                "INSERT INTO posts (id, wallet_address, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, wallet_address, content, &created_at),
            )?;
            Ok(PostRow {
                id: id.to_string(),
                wallet_address: wallet_address.to_string(),
                content: content.to_string(),
                created_at,
            })
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, wallet_address, content, created_at FROM posts WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], post_from_row).optional()?;
            Ok(row)
        })
    }

    /// Every post, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, wallet_address, content, created_at
                 FROM posts
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a post; its likes and comments go with it via `ON DELETE CASCADE`.
    /// Returns whether a row was removed.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    // -- Likes --

    /// Toggle a like: removes it if present, inserts it if not. The lookup
    /// and the write share one transaction; the unique (wallet, post)
    /// constraint backs this up.
    pub fn toggle_like(&self, id: &str, post_id: &str, wallet_address: &str) -> Result<LikeToggle> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM likes WHERE post_id = ?1 AND wallet_address = ?2",
                    (post_id, wallet_address),
                    |row| row.get(0),
                )
                .optional()?;

            let outcome = if let Some(existing_id) = existing {
                tx.execute("DELETE FROM likes WHERE id = ?1", [&existing_id])?;
                LikeToggle::Unliked
            } else {
                let created_at = now_timestamp();
                tx.execute(
                    "INSERT INTO likes (id, wallet_address, post_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    (id, wallet_address, post_id, &created_at),
                )?;
                LikeToggle::Liked(LikeRow {
                    id: id.to_string(),
                    wallet_address: wallet_address.to_string(),
                    post_id: post_id.to_string(),
                    created_at,
                })
            };

            tx.commit()?;
            Ok(outcome)
        })
    }

    /// Batch-fetch likes for a set of post IDs, oldest first within each post.
    pub fn get_likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            in_batches(post_ids, |batch| {
                let sql = format!(
                    "SELECT id, wallet_address, post_id, created_at
                     FROM likes WHERE post_id IN ({})
                     ORDER BY created_at ASC, rowid ASC",
                    placeholders(batch.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(batch), |row| {
                        Ok(LikeRow {
                            id: row.get(0)?,
                            wallet_address: row.get(1)?,
                            post_id: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        wallet_address: &str,
        content: &str,
    ) -> Result<CommentRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, wallet_address, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, post_id, wallet_address, content, now_timestamp()),
            )?;

            let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
            let row = conn.query_row(&sql, [id], comment_from_row)?;
            Ok(row)
        })
    }

    pub fn get_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.get_comments_for_posts(&[post_id.to_string()])
    }

    /// Batch-fetch comments for a set of post IDs, oldest first within each
    /// post, each joined to its author's profile (eliminates N+1).
    pub fn get_comments_for_posts(&self, post_ids: &[String]) -> Result<Vec<CommentRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            in_batches(post_ids, |batch| {
                let sql = format!(
                    "{} WHERE c.post_id IN ({}) ORDER BY c.created_at ASC, c.rowid ASC",
                    COMMENT_SELECT,
                    placeholders(batch.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(batch), comment_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
        })
    }
}

const COMMENT_SELECT: &str = "
    SELECT c.id, c.post_id, c.wallet_address, c.content, c.created_at,
           u.wallet_address, u.username, u.bio, u.profile_pic_url, u.created_at
    FROM comments c
    LEFT JOIN users u ON c.wallet_address = u.wallet_address";

/// Upper bound on bound parameters per `IN (...)` list, well under
/// SQLite's variable limit.
const MAX_BATCH: usize = 500;

/// Run `query` over `keys` in slices of at most `MAX_BATCH` and concatenate
/// the results. Rows for one key always come from a single slice.
fn in_batches<T>(
    keys: &[String],
    mut query: impl FnMut(&[String]) -> Result<Vec<T>>,
) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for batch in keys.chunks(MAX_BATCH) {
        out.extend(query(batch)?);
    }
    Ok(out)
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

fn query_user(conn: &Connection, wallet_address: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT wallet_address, username, bio, profile_pic_url, created_at
         FROM users WHERE wallet_address = ?1",
    )?;
    let row = stmt.query_row([wallet_address], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        wallet_address: row.get(0)?,
        username: row.get(1)?,
        bio: row.get(2)?,
        profile_pic_url: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        wallet_address: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    let author = match row.get::<_, Option<String>>(5)? {
        Some(wallet_address) => Some(UserRow {
            wallet_address,
            username: row.get(6)?,
            bio: row.get(7)?,
            profile_pic_url: row.get(8)?,
            created_at: row.get(9)?,
        }),
        None => None,
    };

    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        wallet_address: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        author,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
