use async_trait::async_trait;

use super::schema::Database;
use super::types::StoreError;
use crate::playback::PlaybackSnapshot;

/// Persisted state the library reads and writes.
///
/// All methods take `&self`; implementations handle their own synchronisation.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Subscribed feed URLs in insertion order.
    async fn subscriptions(&self) -> Result<Vec<String>, StoreError>;

    /// Returns `true` if the URL was newly added.
    async fn add_subscription(&self, url: &str) -> Result<bool, StoreError>;

    /// Returns `true` if the URL was present.
    async fn remove_subscription(&self, url: &str) -> Result<bool, StoreError>;

    async fn playback_snapshot(&self) -> Result<PlaybackSnapshot, StoreError>;

    async fn save_position(&self, episode_id: &str, position: u64) -> Result<(), StoreError>;

    async fn position(&self, episode_id: &str) -> Result<u64, StoreError>;

    async fn mark_played(&self, episode_id: &str) -> Result<(), StoreError>;

    async fn is_played(&self, episode_id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl StateStore for Database {
    async fn subscriptions(&self) -> Result<Vec<String>, StoreError> {
        self.list_subscriptions().await
    }

    async fn add_subscription(&self, url: &str) -> Result<bool, StoreError> {
        self.insert_subscription(url).await
    }

    async fn remove_subscription(&self, url: &str) -> Result<bool, StoreError> {
        self.delete_subscription(url).await
    }

    async fn playback_snapshot(&self) -> Result<PlaybackSnapshot, StoreError> {
        self.load_playback().await
    }

    async fn save_position(&self, episode_id: &str, position: u64) -> Result<(), StoreError> {
        self.upsert_position(episode_id, position).await
    }

    async fn position(&self, episode_id: &str) -> Result<u64, StoreError> {
        self.get_position(episode_id).await
    }

    async fn mark_played(&self, episode_id: &str) -> Result<(), StoreError> {
        self.insert_played(episode_id).await
    }

    async fn is_played(&self, episode_id: &str) -> Result<bool, StoreError> {
        self.contains_played(episode_id).await
    }
}
