use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StoreError;

// ============================================================================
// Database
// ============================================================================

/// SQLite-backed persisted store: subscriptions, playback positions, played
/// episodes and user preferences.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database held on a single
    /// connection, so every query sees the same data.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InstanceLocked` if another process holds the
    /// database lock, `StoreError::Migration` if the schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        // busy_timeout=5000: wait up to 5 seconds for a competing writer
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StoreError::from_sqlx)?
            .pragma("busy_timeout", "5000");

        let pool_options = if in_memory {
            // Each in-memory connection is its own database; keep exactly one alive
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StoreError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| match StoreError::from_sqlx(e) {
            StoreError::Other(inner) => StoreError::Migration(inner.to_string()),
            locked => locked,
        })?;

        tracing::debug!(path = %path, "Opened state database");
        Ok(db)
    }

    /// Create all tables inside one transaction. Idempotent.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Insertion order of subscriptions is the display order
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT UNIQUE NOT NULL,
                added_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS playback_positions (
                episode_id TEXT PRIMARY KEY,
                position INTEGER NOT NULL CHECK (position >= 0),
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS played_episodes (
                episode_id TEXT PRIMARY KEY,
                played_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_creates_tables() {
        let db = Database::open(":memory:").await.unwrap();
        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&db.pool)
        .await
        .unwrap();
        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        assert_eq!(
            names,
            vec![
                "playback_positions",
                "played_episodes",
                "preferences",
                "subscriptions"
            ]
        );
    }

    #[tokio::test]
    async fn test_reopen_file_database_keeps_data() {
        let dir = std::env::temp_dir().join("podsync_schema_test_reopen");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.db");
        std::fs::remove_file(&path).ok();
        let path_str = path.to_str().unwrap();

        {
            let db = Database::open(path_str).await.unwrap();
            db.insert_subscription("https://example.com/feed.xml")
                .await
                .unwrap();
            db.pool.close().await;
        }

        let db = Database::open(path_str).await.unwrap();
        let subs = db.list_subscriptions().await.unwrap();
        assert_eq!(subs, vec!["https://example.com/feed.xml".to_string()]);

        db.pool.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }
}
