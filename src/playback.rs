//! Playback-state merge.
//!
//! Parsed episodes never carry playback facts; they are overlaid from the
//! persisted store whenever a [`Podcast`] is handed out of the library.

use std::collections::{HashMap, HashSet};

use crate::model::Podcast;

/// Read access to persisted playback facts, keyed by episode id.
pub trait PlaybackLookup {
    /// Saved position in seconds, 0 when none.
    fn position(&self, episode_id: &str) -> u64;
    fn played(&self, episode_id: &str) -> bool;
}

/// All stored positions and played flags, loaded at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub positions: HashMap<String, u64>,
    pub played: HashSet<String>,
}

impl PlaybackLookup for PlaybackSnapshot {
    fn position(&self, episode_id: &str) -> u64 {
        self.positions.get(episode_id).copied().unwrap_or(0)
    }

    fn played(&self, episode_id: &str) -> bool {
        self.played.contains(episode_id)
    }
}

/// Events reported by a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Periodic progress while playing. Zero positions are ignored.
    Progress { episode_id: String, position: u64 },
    /// The episode played to the end.
    Completed { episode_id: String },
}

impl PlaybackEvent {
    pub fn episode_id(&self) -> &str {
        match self {
            PlaybackEvent::Progress { episode_id, .. } => episode_id,
            PlaybackEvent::Completed { episode_id } => episode_id,
        }
    }
}

/// Returns a copy of `podcast` with every episode's position and played flag
/// taken from `lookup`. Episode order and all other fields are unchanged.
pub fn merge(podcast: &Podcast, lookup: &impl PlaybackLookup) -> Podcast {
    let mut merged = podcast.clone();
    for episode in &mut merged.episodes {
        episode.playback_position = lookup.position(&episode.guid);
        episode.is_played = lookup.played(&episode.guid);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Episode;
    use pretty_assertions::assert_eq;

    fn podcast() -> Podcast {
        let mut first = Episode::new("https://cdn.example/1.mp3".into(), Some("ep-1".into())).unwrap();
        first.title = "One".into();
        first.published = Some(2_000);
        let mut second = Episode::new("https://cdn.example/2.mp3".into(), None).unwrap();
        second.title = "Two".into();
        second.published = Some(1_000);

        Podcast {
            feed_url: "https://example.com/feed.xml".into(),
            title: "Show".into(),
            description: String::new(),
            image_url: None,
            author: None,
            link: None,
            language: None,
            last_updated: 0,
            episodes: vec![first, second],
        }
    }

    #[test]
    fn test_merge_applies_positions_and_played() {
        let mut snapshot = PlaybackSnapshot::default();
        snapshot.positions.insert("ep-1".into(), 120);
        snapshot.played.insert("https://cdn.example/2.mp3".into());

        let merged = merge(&podcast(), &snapshot);

        assert_eq!(merged.episodes[0].playback_position, 120);
        assert!(!merged.episodes[0].is_played);
        assert_eq!(merged.episodes[1].playback_position, 0);
        assert!(merged.episodes[1].is_played);
    }

    #[test]
    fn test_merge_preserves_everything_else() {
        let original = podcast();
        let merged = merge(&original, &PlaybackSnapshot::default());
        assert_eq!(merged, original);
    }

    #[test]
    fn test_merge_clears_stale_state() {
        let mut stale = podcast();
        stale.episodes[0].playback_position = 99;
        stale.episodes[0].is_played = true;

        let merged = merge(&stale, &PlaybackSnapshot::default());
        assert_eq!(merged.episodes[0].playback_position, 0);
        assert!(!merged.episodes[0].is_played);
    }

    #[test]
    fn test_event_episode_id() {
        let progress = PlaybackEvent::Progress {
            episode_id: "a".into(),
            position: 3,
        };
        let done = PlaybackEvent::Completed {
            episode_id: "b".into(),
        };
        assert_eq!(progress.episode_id(), "a");
        assert_eq!(done.episode_id(), "b");
    }
}
