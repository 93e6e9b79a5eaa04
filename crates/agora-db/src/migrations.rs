use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                wallet_address   TEXT PRIMARY KEY,
                username         TEXT,
                bio              TEXT,
                profile_pic_url  TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE posts (
                id              TEXT PRIMARY KEY,
                wallet_address  TEXT NOT NULL REFERENCES users(wallet_address),
                content         TEXT NOT NULL CHECK (length(content) <= 280),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_posts_created
                ON posts(created_at);

            CREATE TABLE likes (
                id              TEXT PRIMARY KEY,
                wallet_address  TEXT NOT NULL REFERENCES users(wallet_address) ON DELETE CASCADE,
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL,
                UNIQUE(wallet_address, post_id)
            );

            CREATE INDEX idx_likes_post
                ON likes(post_id);

            CREATE TABLE comments (
                id              TEXT PRIMARY KEY,
                post_id         TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                wallet_address  TEXT NOT NULL REFERENCES users(wallet_address) ON DELETE CASCADE,
                content         TEXT NOT NULL CHECK (length(content) <= 280),
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_comments_post
                ON comments(post_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
