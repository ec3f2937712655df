use super::schema::Database;
use super::types::StoreError;

impl Database {
    // ========================================================================
    // Subscription Operations
    // ========================================================================

    /// Subscribed feed URLs in the order they were added.
    pub async fn list_subscriptions(&self) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT url FROM subscriptions ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(url,)| url).collect())
    }

    /// Append a feed URL to the subscription list.
    ///
    /// Returns `false` if the URL was already subscribed; its position is kept.
    pub async fn insert_subscription(&self, url: &str) -> Result<bool, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (url, added_at)
            VALUES (?, ?)
            ON CONFLICT(url) DO NOTHING
        "#,
        )
        .bind(url)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a feed URL. Returns `false` if it was not subscribed.
    pub async fn delete_subscription(&self, url: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_list() {
        let db = test_db().await;
        assert!(db.list_subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_preserves_order() {
        let db = test_db().await;
        for url in ["https://b.example/feed", "https://a.example/feed", "https://c.example/feed"] {
            assert!(db.insert_subscription(url).await.unwrap());
        }

        assert_eq!(
            db.list_subscriptions().await.unwrap(),
            vec![
                "https://b.example/feed",
                "https://a.example/feed",
                "https://c.example/feed"
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_noop() {
        let db = test_db().await;
        assert!(db.insert_subscription("https://a.example/feed").await.unwrap());
        assert!(db.insert_subscription("https://b.example/feed").await.unwrap());
        assert!(!db.insert_subscription("https://a.example/feed").await.unwrap());

        assert_eq!(
            db.list_subscriptions().await.unwrap(),
            vec!["https://a.example/feed", "https://b.example/feed"]
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        db.insert_subscription("https://a.example/feed").await.unwrap();
        db.insert_subscription("https://b.example/feed").await.unwrap();

        assert!(db.delete_subscription("https://a.example/feed").await.unwrap());
        assert!(!db.delete_subscription("https://a.example/feed").await.unwrap());
        assert_eq!(
            db.list_subscriptions().await.unwrap(),
            vec!["https://b.example/feed"]
        );
    }
}
