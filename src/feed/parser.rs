use std::cmp::Reverse;

use chrono::Utc;
use thiserror::Error;

use super::temporal::{format_display_date, parse_duration, parse_timestamp};
use super::xml::{parse_document, Element};
use crate::model::{Episode, Podcast};
use crate::util::clean_text;

/// The document could not be turned into a podcast at all.
///
/// Field-level problems (bad dates, items without audio) never produce this
/// error; they degrade to defaults or drop the item.
#[derive(Debug, Error)]
pub enum MalformedDocumentError {
    /// The document is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),
    /// The document parsed but has no `<channel>` element.
    #[error("No <channel> element in feed document")]
    MissingChannel,
}

/// Where a field value can come from, relative to the element being read.
#[derive(Debug, Clone, Copy)]
enum Source {
    /// Text content of a direct child.
    Text(&'static str),
    /// Attribute of a direct child.
    Attr(&'static str, &'static str),
    /// Text content of a child of a direct child, e.g. `image` / `url`.
    Nested(&'static str, &'static str),
}

impl Source {
    fn values<'a>(&self, element: &'a Element) -> Box<dyn Iterator<Item = String> + 'a> {
        match *self {
            Source::Text(name) => Box::new(named(element, name).map(Element::text)),
            Source::Attr(name, attr) => Box::new(
                named(element, name).filter_map(move |e| e.attr(attr).map(str::to_string)),
            ),
            Source::Nested(outer, inner) => Box::new(
                named(element, outer).flat_map(move |e| named(e, inner).map(Element::text)),
            ),
        }
    }
}

const CHANNEL_TITLE: &[Source] = &[Source::Text("title"), Source::Text("itunes:title")];
const CHANNEL_DESCRIPTION: &[Source] =
    &[Source::Text("description"), Source::Text("itunes:summary")];
const CHANNEL_AUTHOR: &[Source] = &[Source::Text("itunes:author"), Source::Text("author")];
const CHANNEL_IMAGE: &[Source] = &[
    Source::Attr("itunes:image", "href"),
    Source::Nested("image", "url"),
];

const ITEM_TITLE: &[Source] = &[Source::Text("title"), Source::Text("itunes:title")];
const ITEM_DESCRIPTION: &[Source] = &[
    Source::Text("description"),
    Source::Text("itunes:summary"),
    Source::Text("content:encoded"),
];
const ITEM_DATE: &[Source] = &[Source::Text("pubDate"), Source::Text("dc:date")];
const ITEM_IMAGE: &[Source] = &[Source::Attr("itunes:image", "href")];

/// Audio file extensions accepted when an item carries its media in `<link>`.
const AUDIO_LINK_EXTENSIONS: [&str; 2] = [".mp3", ".m4a"];

fn named<'a>(element: &'a Element, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
    element.elements().filter(move |e| e.name == name)
}

/// Evaluates the sources in order and returns the first non-empty trimmed value.
fn resolve(element: &Element, sources: &[Source]) -> Option<String> {
    sources
        .iter()
        .flat_map(|source| source.values(element))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Parses a podcast feed document into a [`Podcast`].
///
/// Parsing is tolerant: missing channel fields stay empty, unreadable dates and
/// durations become `0`, and items without a resolvable audio URL are dropped.
/// Episodes come back newest first; items with equal or unknown dates keep
/// their feed order, unknown dates last.
///
/// # Errors
///
/// Returns [`MalformedDocumentError`] only when the XML is not well-formed or
/// contains no `<channel>` element.
pub fn parse_podcast(feed_url: &str, document: &str) -> Result<Podcast, MalformedDocumentError> {
    let root = parse_document(document).map_err(MalformedDocumentError::Xml)?;
    let channel = root
        .find("channel")
        .ok_or(MalformedDocumentError::MissingChannel)?;

    let mut item_count = 0usize;
    let mut episodes: Vec<Episode> = named(channel, "item")
        .inspect(|_| item_count += 1)
        .filter_map(parse_episode)
        .collect();
    episodes.sort_by_key(|e| Reverse(e.published));

    let dropped = item_count - episodes.len();
    if dropped > 0 {
        tracing::debug!(
            feed = %feed_url,
            dropped = dropped,
            "Items without a resolvable audio URL skipped"
        );
    }

    Ok(Podcast {
        feed_url: feed_url.to_string(),
        title: resolve(channel, CHANNEL_TITLE).unwrap_or_default(),
        description: resolve(channel, CHANNEL_DESCRIPTION)
            .map(|d| clean_text(&d))
            .unwrap_or_default(),
        image_url: resolve(channel, CHANNEL_IMAGE),
        author: resolve(channel, CHANNEL_AUTHOR),
        link: resolve(channel, &[Source::Text("link")]),
        language: resolve(channel, &[Source::Text("language")]),
        last_updated: Utc::now().timestamp(),
        episodes,
    })
}

fn parse_episode(item: &Element) -> Option<Episode> {
    let (audio_url, file_size) = resolve_audio(item)?;
    let mut episode = Episode::new(audio_url, resolve(item, &[Source::Text("guid")]))?;

    episode.title = resolve(item, ITEM_TITLE).unwrap_or_default();
    episode.description = resolve(item, ITEM_DESCRIPTION)
        .map(|d| clean_text(&d))
        .unwrap_or_default();
    episode.image_url = resolve(item, ITEM_IMAGE);
    episode.file_size = file_size;

    if let Some(text) = resolve(item, &[Source::Text("itunes:duration")]) {
        episode.duration = parse_duration(&text);
        episode.duration_text = Some(text);
    }

    if let Some(text) = resolve(item, ITEM_DATE) {
        episode.published = parse_timestamp(&text);
        episode.publish_date_text = format_display_date(episode.publish_date());
    }

    Some(episode)
}

/// Audio URL and size in bytes for an item.
///
/// Prefers the first enclosure whose type is `audio/*` or absent, then falls
/// back to a `<link>` pointing at an audio file.
fn resolve_audio(item: &Element) -> Option<(String, u64)> {
    let from_enclosure = named(item, "enclosure").find_map(|enclosure| {
        let media_type = enclosure.attr("type").unwrap_or("").trim();
        let is_audio =
            media_type.is_empty() || media_type.to_ascii_lowercase().starts_with("audio/");
        if !is_audio {
            return None;
        }

        let url = enclosure.attr("url")?.trim();
        if url.is_empty() {
            return None;
        }
        let size = enclosure
            .attr("length")
            .and_then(|len| len.trim().parse::<u64>().ok())
            .unwrap_or(0);
        Some((url.to_string(), size))
    });

    from_enclosure.or_else(|| {
        named(item, "link")
            .map(|link| link.text().trim().to_string())
            .find(|href| is_audio_link(href))
            .map(|href| (href, 0))
    })
}

fn is_audio_link(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    AUDIO_LINK_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
