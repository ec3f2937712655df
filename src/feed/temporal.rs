//! Date and duration parsing for feed fields.
//!
//! Both parsers degrade silently: text that matches no known encoding yields
//! the `0` sentinel instead of an error, so one odd item never fails a feed.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

type DatePattern = fn(&str) -> Option<i64>;

/// Tried in order; the first pattern that consumes the whole input wins.
const DATE_PATTERNS: [(&str, DatePattern); 5] = [
    ("rfc822-numeric-zone", rfc822_numeric_zone),
    ("rfc822-named-zone", rfc822_named_zone),
    ("iso8601", iso8601),
    ("iso8601-millis", iso8601_millis),
    ("date-only", date_only),
];

/// Zone abbreviations seen in RFC-822 dates beyond the ones RFC 2822 itself lists.
const NAMED_ZONES: [(&str, i32); 16] = [
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
    ("BST", 1),
    ("CET", 1),
    ("CEST", 2),
    ("AEST", 10),
];

/// Parses a feed date into epoch seconds, returning `0` when it cannot be read.
///
/// Accepted encodings, in priority order:
/// - `Wed, 02 Oct 2002 13:00:00 +0000`
/// - `Wed, 02 Oct 2002 13:00:00 GMT`
/// - `2002-10-02T13:00:00+0000` (also `Z` and `+00:00`)
/// - `2002-10-02T13:00:00.000+0000`
/// - `2002-10-02` (midnight UTC)
pub fn parse_date(text: &str) -> i64 {
    parse_timestamp(text).unwrap_or(0)
}

/// Like [`parse_date`] but keeps "unknown" as `None`.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parsed = DATE_PATTERNS
        .iter()
        .find_map(|(name, pattern)| pattern(text).map(|ts| (*name, ts)));

    match parsed {
        Some((name, ts)) => {
            tracing::trace!(date = %text, pattern = name, "Parsed feed date");
            Some(ts)
        }
        None => {
            tracing::debug!(date = %text, "Unrecognised date format");
            None
        }
    }
}

fn rfc822_numeric_zone(text: &str) -> Option<i64> {
    DateTime::parse_from_str(text, "%a, %d %b %Y %H:%M:%S %z")
        .ok()
        .map(|dt| dt.timestamp())
}

fn rfc822_named_zone(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.timestamp());
    }

    let (local, zone) = text.rsplit_once(' ')?;
    let hours = NAMED_ZONES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(zone))
        .map(|(_, hours)| *hours)?;
    let offset = FixedOffset::east_opt(hours * 3600)?;
    let naive = NaiveDateTime::parse_from_str(local, "%a, %d %b %Y %H:%M:%S").ok()?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
}

fn iso8601(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp());
    }
    DateTime::parse_from_str(&zulu_to_offset(text), "%Y-%m-%dT%H:%M:%S%z")
        .ok()
        .map(|dt| dt.timestamp())
}

fn iso8601_millis(text: &str) -> Option<i64> {
    DateTime::parse_from_str(&zulu_to_offset(text), "%Y-%m-%dT%H:%M:%S%.3f%z")
        .ok()
        .map(|dt| dt.timestamp())
}

fn date_only(text: &str) -> Option<i64> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

fn zulu_to_offset(text: &str) -> String {
    match text.strip_suffix('Z') {
        Some(rest) => format!("{rest}+0000"),
        None => text.to_string(),
    }
}

/// Short display form of an epoch timestamp, e.g. `Oct 2, 2002`.
///
/// Returns an empty string for the `0` sentinel and for negative input.
pub fn format_display_date(epoch_secs: i64) -> String {
    if epoch_secs <= 0 {
        return String::new();
    }
    match Utc.timestamp_opt(epoch_secs, 0).single() {
        Some(dt) => dt.format("%b %-d, %Y").to_string(),
        None => String::new(),
    }
}

/// Parses a duration into seconds, returning `0` when it cannot be read.
///
/// Accepts a bare number of seconds, `H:MM:SS` or `M:SS`. A component that is
/// not an integer counts as zero rather than failing the whole value.
pub fn parse_duration(text: &str) -> u64 {
    let text = text.trim();
    if text.is_empty() {
        return 0;
    }
    if let Ok(seconds) = text.parse::<u64>() {
        return seconds;
    }

    let parts: Vec<u64> = text
        .split(':')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect();

    match parts.as_slice() {
        [hours, minutes, seconds] => hours
            .saturating_mul(3600)
            .saturating_add(minutes.saturating_mul(60))
            .saturating_add(*seconds),
        [minutes, seconds] => minutes.saturating_mul(60).saturating_add(*seconds),
        [seconds] => *seconds,
        _ => 0,
    }
}

/// Renders seconds as `H:MM:SS` when there is at least one hour, else `M:SS`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
