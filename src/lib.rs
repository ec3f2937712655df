//! Podcast feed ingestion and playback-state synchronisation.
//!
//! Feeds are downloaded through an [`HttpClient`](feed::HttpClient), parsed
//! into [`Podcast`](model::Podcast) values, merged with persisted playback
//! state and cached by the [`Library`](library::Library).

pub mod config;
pub mod feed;
pub mod library;
pub mod model;
pub mod playback;
pub mod storage;
pub mod util;

pub use library::{FeedResult, FetchError, Library};
pub use model::{Episode, PlaybackState, Podcast};
