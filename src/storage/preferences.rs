use super::schema::Database;
use super::types::StoreError;

impl Database {
    // ========================================================================
    // User Preferences Operations
    // ========================================================================

    /// Get a single preference value by key.
    ///
    /// Keys use dotted convention: `player.speed`, `library.sort`, etc.
    ///
    /// # Returns
    ///
    /// The preference value if the key exists, or `None` if not set.
    pub async fn get_preference(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a preference value (UPSERT).
    pub async fn set_preference(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO preferences (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All preferences ordered by key.
    pub async fn list_preferences(&self) -> Result<Vec<(String, String)>, StoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM preferences ORDER BY key")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows)
    }
}
