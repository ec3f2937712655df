//! Feed cache and fetch orchestration.
//!
//! The [`Library`] owns the in-memory cache of parsed podcasts, keyed by feed
//! URL. Each entry is an immutable `Arc<Podcast>`: a refresh or playback-state
//! write swaps in a new value, it never edits one in place.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::feed::{parse_podcast, HttpClient, MalformedDocumentError, TransportError};
use crate::model::{Episode, Podcast};
use crate::playback::{merge, PlaybackEvent};
use crate::storage::{StateStore, StoreError};
use crate::util::{validate_feed_url, UrlValidationError};

/// Why a single feed could not be produced.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Malformed(#[from] MalformedDocumentError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
}

/// Outcome of one feed within a batch fetch.
#[derive(Debug)]
pub struct FeedResult {
    pub feed_url: String,
    pub result: Result<Arc<Podcast>, FetchError>,
}

pub struct Library<C, S> {
    http: C,
    store: S,
    cache: RwLock<HashMap<String, Arc<Podcast>>>,
    /// One lock per feed URL so refreshes of the same feed never interleave.
    gates: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    concurrency: usize,
}

impl<C: HttpClient, S: StateStore> Library<C, S> {
    pub fn new(http: C, store: S) -> Self {
        Self {
            http,
            store,
            cache: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            concurrency: 1,
        }
    }

    /// Maximum number of feeds fetched at once by [`fetch_all_podcasts`](Self::fetch_all_podcasts).
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = limit.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The cached value for `feed_url`, without touching the network.
    pub async fn cached(&self, feed_url: &str) -> Option<Arc<Podcast>> {
        self.cache.read().await.get(feed_url).cloned()
    }

    /// Gates are only cloned while `gates` is locked, so a map entry whose
    /// strong count is 1 has no holder or waiter and can be dropped.
    async fn gate(&self, feed_url: &str) -> Arc<Mutex<()>> {
        let mut gates = self.gates.lock().await;
        Arc::clone(gates.entry(feed_url.to_string()).or_default())
    }

    async fn release_gate(&self, feed_url: &str, gate: Arc<Mutex<()>>) {
        drop(gate);
        let mut gates = self.gates.lock().await;
        if gates
            .get(feed_url)
            .is_some_and(|g| Arc::strong_count(g) == 1)
        {
            gates.remove(feed_url);
        }
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// Returns the podcast at `feed_url`, from cache unless `force_refresh`.
    ///
    /// On any failure the existing cache entry (if any) is left as it was.
    pub async fn fetch_podcast(
        &self,
        feed_url: &str,
        force_refresh: bool,
    ) -> Result<Arc<Podcast>, FetchError> {
        let gate = self.gate(feed_url).await;
        let result = {
            let _guard = gate.lock().await;
            self.fetch_gated(feed_url, force_refresh).await
        };
        self.release_gate(feed_url, gate).await;
        result
    }

    /// Body of [`fetch_podcast`](Self::fetch_podcast); caller holds the feed's gate.
    async fn fetch_gated(
        &self,
        feed_url: &str,
        force_refresh: bool,
    ) -> Result<Arc<Podcast>, FetchError> {
        if !force_refresh {
            if let Some(podcast) = self.cache.read().await.get(feed_url) {
                tracing::debug!(feed = %feed_url, "Cache hit");
                return Ok(Arc::clone(podcast));
            }
        }

        let response = self.http.get(feed_url).await?;
        if !response.is_success() {
            return Err(TransportError::Status(response.status).into());
        }
        if response.body.trim().is_empty() {
            return Err(TransportError::EmptyBody.into());
        }

        let parsed = parse_podcast(feed_url, &response.body)?;

        // Snapshot is read under the cache write lock so a concurrent
        // playback write cannot be overtaken by this insert.
        let mut cache = self.cache.write().await;
        let snapshot = self.store.playback_snapshot().await?;
        let podcast = Arc::new(merge(&parsed, &snapshot));
        cache.insert(feed_url.to_string(), Arc::clone(&podcast));

        tracing::info!(
            feed = %feed_url,
            episodes = podcast.episodes.len(),
            "Feed refreshed"
        );
        Ok(podcast)
    }

    /// Fetches every URL independently. Results come back in input order and
    /// one feed's failure never affects another's.
    pub async fn fetch_all_podcasts(&self, urls: &[String], force_refresh: bool) -> Vec<FeedResult> {
        stream::iter(urls.iter().cloned())
            .map(|feed_url| async move {
                let result = self.fetch_podcast(&feed_url, force_refresh).await;
                if let Err(e) = &result {
                    tracing::warn!(feed = %feed_url, error = %e, "Feed fetch failed");
                }
                FeedResult { feed_url, result }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// [`fetch_all_podcasts`](Self::fetch_all_podcasts) over the stored subscriptions.
    pub async fn fetch_subscribed(&self, force_refresh: bool) -> Result<Vec<FeedResult>, StoreError> {
        let urls = self.store.subscriptions().await?;
        Ok(self.fetch_all_podcasts(&urls, force_refresh).await)
    }

    /// Every episode of every subscribed feed that could be fetched, newest
    /// first. Episodes without a publish date sort last, in feed order.
    pub async fn get_all_episodes(
        &self,
        force_refresh: bool,
    ) -> Result<Vec<(Episode, Arc<Podcast>)>, StoreError> {
        let results = self.fetch_subscribed(force_refresh).await?;
        Ok(flatten_episodes(results))
    }

    /// Evicts the cache entry for `feed_url`. Other feeds are unaffected.
    pub async fn remove_feed(&self, feed_url: &str) {
        let gate = self.gate(feed_url).await;
        {
            let _guard = gate.lock().await;
            self.cache.write().await.remove(feed_url);
        }
        self.release_gate(feed_url, gate).await;
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Validates and fetches `feed_url`, recording the subscription only once
    /// the feed has been parsed successfully.
    pub async fn subscribe(&self, feed_url: &str) -> Result<Arc<Podcast>, FetchError> {
        let feed_url = feed_url.trim();
        validate_feed_url(feed_url)?;

        let podcast = self.fetch_podcast(feed_url, true).await?;
        if self.store.add_subscription(feed_url).await? {
            tracing::info!(feed = %feed_url, title = %podcast.title, "Subscribed");
        } else {
            tracing::debug!(feed = %feed_url, "Already subscribed");
        }
        Ok(podcast)
    }

    /// Removes the subscription and its cache entry. Returns `false` if the
    /// URL was not subscribed.
    pub async fn unsubscribe(&self, feed_url: &str) -> Result<bool, StoreError> {
        let feed_url = feed_url.trim();
        let removed = self.store.remove_subscription(feed_url).await?;
        self.remove_feed(feed_url).await;
        if removed {
            tracing::info!(feed = %feed_url, "Unsubscribed");
        }
        Ok(removed)
    }

    pub async fn subscriptions(&self) -> Result<Vec<String>, StoreError> {
        self.store.subscriptions().await
    }

    // ========================================================================
    // Playback state
    // ========================================================================

    pub async fn save_playback_position(
        &self,
        episode_id: &str,
        position: u64,
    ) -> Result<(), StoreError> {
        self.store.save_position(episode_id, position).await?;
        self.remerge_cached(episode_id).await
    }

    pub async fn mark_as_played(&self, episode_id: &str) -> Result<(), StoreError> {
        self.store.mark_played(episode_id).await?;
        self.remerge_cached(episode_id).await
    }

    /// Saved position to resume `episode_id` from, 0 when none.
    pub async fn resume_position(&self, episode_id: &str) -> Result<u64, StoreError> {
        self.store.position(episode_id).await
    }

    pub async fn handle_playback_event(&self, event: PlaybackEvent) -> Result<(), StoreError> {
        match event {
            PlaybackEvent::Progress {
                episode_id,
                position,
            } => {
                if position == 0 {
                    tracing::debug!(episode = %episode_id, "Ignoring zero progress");
                    return Ok(());
                }
                self.save_playback_position(&episode_id, position).await
            }
            PlaybackEvent::Completed { episode_id } => self.mark_as_played(&episode_id).await,
        }
    }

    /// Replaces every cached podcast containing `episode_id` with a copy
    /// merged against current store state.
    async fn remerge_cached(&self, episode_id: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.write().await;
        if !cache.values().any(|p| p.episode(episode_id).is_some()) {
            return Ok(());
        }

        let snapshot = self.store.playback_snapshot().await?;
        for podcast in cache.values_mut() {
            if podcast.episode(episode_id).is_some() {
                let merged = merge(podcast.as_ref(), &snapshot);
                *podcast = Arc::new(merged);
            }
        }
        Ok(())
    }
}

/// Pairs each episode with its podcast and sorts the lot newest first.
fn flatten_episodes(results: Vec<FeedResult>) -> Vec<(Episode, Arc<Podcast>)> {
    let mut entries: Vec<(Episode, Arc<Podcast>)> = results
        .into_iter()
        .filter_map(|r| r.result.ok())
        .flat_map(|podcast| {
            podcast
                .episodes
                .iter()
                .cloned()
                .map(|e| (e, Arc::clone(&podcast)))
                .collect::<Vec<_>>()
        })
        .collect();

    // None < Some, so Reverse puts unknown dates last; sort is stable
    entries.sort_by_key(|(episode, _)| Reverse(episode.published));
    entries
}
