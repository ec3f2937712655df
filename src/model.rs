//! Canonical podcast values produced by the feed parser and served by the library.
//!
//! [`Podcast`] and [`Episode`] are plain values: every refresh or playback-state
//! merge produces new copies instead of mutating cached ones.

use serde::Serialize;

use crate::feed::format_duration;

/// A podcast feed after parsing and playback-state merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Podcast {
    /// URL the feed was fetched from. Cache key.
    pub feed_url: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub link: Option<String>,
    pub language: Option<String>,
    /// Epoch seconds of the parse that produced this value.
    pub last_updated: i64,
    /// Newest first. Episodes with an unknown publish date keep feed order at the end.
    pub episodes: Vec<Episode>,
}

impl Podcast {
    /// Find an episode by its effective identifier.
    pub fn episode(&self, id: &str) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.guid == id)
    }
}

/// A single playable episode.
///
/// Only constructible with a non-empty audio URL; items without one are
/// dropped by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    /// Effective identifier: the source GUID, or the audio URL when the feed omits one.
    pub guid: String,
    pub title: String,
    pub description: String,
    pub audio_url: String,
    pub image_url: Option<String>,
    /// Duration in seconds, 0 when unknown.
    pub duration: u64,
    /// Duration text exactly as the feed wrote it.
    pub duration_text: Option<String>,
    /// Publish time in epoch seconds, `None` when missing or unparsable.
    pub published: Option<i64>,
    /// Display form of the publish date, empty when unknown.
    pub publish_date_text: String,
    /// Enclosure length in bytes, 0 when unknown.
    pub file_size: u64,
    pub is_played: bool,
    /// Saved playback position in seconds.
    pub playback_position: u64,
}

impl Episode {
    pub(crate) fn new(audio_url: String, guid: Option<String>) -> Option<Self> {
        let audio_url = audio_url.trim().to_string();
        if audio_url.is_empty() {
            return None;
        }
        let guid = guid
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| audio_url.clone());

        Some(Self {
            guid,
            title: String::new(),
            description: String::new(),
            audio_url,
            image_url: None,
            duration: 0,
            duration_text: None,
            published: None,
            publish_date_text: String::new(),
            file_size: 0,
            is_played: false,
            playback_position: 0,
        })
    }

    /// Key used for playback-state lookup and list diffing.
    pub fn id(&self) -> &str {
        &self.guid
    }

    /// Publish date with `0` standing in for "unknown".
    pub fn publish_date(&self) -> i64 {
        self.published.unwrap_or(0)
    }

    /// The feed's own duration text when present, otherwise `H:MM:SS` / `M:SS`.
    pub fn duration_label(&self) -> String {
        if let Some(text) = &self.duration_text {
            return text.clone();
        }
        if self.duration == 0 {
            return String::new();
        }
        format_duration(self.duration)
    }

    /// Human readable enclosure size, e.g. `"48.2 MB"` or `"512 KB"`.
    pub fn file_size_label(&self) -> String {
        if self.file_size == 0 {
            return String::new();
        }
        let kb = self.file_size as f64 / 1024.0;
        let mb = kb / 1024.0;
        if mb >= 1.0 {
            format!("{:.1} MB", mb)
        } else {
            format!("{:.0} KB", kb)
        }
    }

    /// Snapshot of the playback facts carried by this episode.
    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            position: self.playback_position,
            played: self.is_played,
            duration: self.duration,
        }
    }
}

/// Playback facts for one episode, derived from the persisted store at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub position: u64,
    pub played: bool,
    pub duration: u64,
}

impl PlaybackState {
    /// Fraction of the episode already heard, in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        if self.duration == 0 {
            return 0.0;
        }
        (self.position as f32 / self.duration as f32).min(1.0)
    }
}
