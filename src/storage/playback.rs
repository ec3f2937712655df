use std::collections::{HashMap, HashSet};

use super::schema::Database;
use super::types::{from_seconds, to_seconds, StoreError};
use crate::playback::PlaybackSnapshot;

impl Database {
    // ========================================================================
    // Playback State Operations
    // ========================================================================

    /// Store the resume position for an episode, replacing any previous value.
    pub async fn upsert_position(&self, episode_id: &str, position: u64) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO playback_positions (episode_id, position, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(episode_id) DO UPDATE SET
                position = excluded.position,
                updated_at = excluded.updated_at
        "#,
        )
        .bind(episode_id)
        .bind(from_seconds(position))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stored resume position, or 0 when none has been saved.
    pub async fn get_position(&self, episode_id: &str) -> Result<u64, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT position FROM playback_positions WHERE episode_id = ?")
                .bind(episode_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(p,)| to_seconds(p)).unwrap_or(0))
    }

    /// Add an episode to the played set. Idempotent.
    pub async fn insert_played(&self, episode_id: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO played_episodes (episode_id, played_at)
            VALUES (?, ?)
            ON CONFLICT(episode_id) DO NOTHING
        "#,
        )
        .bind(episode_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn contains_played(&self, episode_id: &str) -> Result<bool, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM played_episodes WHERE episode_id = ?")
                .bind(episode_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.is_some())
    }

    /// Load every stored position and played flag in two queries.
    pub async fn load_playback(&self) -> Result<PlaybackSnapshot, StoreError> {
        let positions: Vec<(String, i64)> =
            sqlx::query_as("SELECT episode_id, position FROM playback_positions")
                .fetch_all(&self.pool)
                .await?;
        let played: Vec<(String,)> = sqlx::query_as("SELECT episode_id FROM played_episodes")
            .fetch_all(&self.pool)
            .await?;

        Ok(PlaybackSnapshot {
            positions: positions
                .into_iter()
                .map(|(id, p)| (id, to_seconds(p)))
                .collect::<HashMap<_, _>>(),
            played: played.into_iter().map(|(id,)| id).collect::<HashSet<_>>(),
        })
    }
}
