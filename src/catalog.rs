use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

pub(crate) const UNKNOWN_TITLE: &str = "Unknown Title";
pub(crate) const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub(crate) const NO_DESCRIPTION: &str = "No description available.";
pub(crate) const PLACEHOLDER_COVER: &str =
    "https://via.placeholder.com/400x225?text=No+Cover+Available";

/// One entry of the raw catalog document. Every field is optional; the
/// normalization step supplies a fallback for each, so building a `Book`
/// from a `RawRecord` can never fail.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawRecord {
    #[serde(default)]
    pub real_title: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub real_author: Option<String>,
    #[serde(default)]
    pub real_synopsis: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub real_genre: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub channel_url: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub upload_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub genre: String,
    pub cover_image: String,
    pub audio_url: String,
    pub duration_seconds: u64,
    pub url: String,
    pub channel: String,
    pub channel_url: String,
    pub video_id: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub upload_date: String,
}

impl Book {
    pub(crate) fn formatted_duration(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Pure and total: every missing field gets its documented fallback.
pub(crate) fn normalize_record(id: &str, raw: RawRecord) -> Book {
    let genre = non_empty(raw.real_genre).unwrap_or_default();
    let categories = if genre.is_empty() {
        raw.categories.unwrap_or_default()
    } else {
        vec![genre.clone()]
    };
    let url = raw.url.unwrap_or_default();

    Book {
        id: id.to_string(),
        title: non_empty(raw.real_title)
            .or(non_empty(raw.title))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        author: non_empty(raw.real_author).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        description: non_empty(raw.real_synopsis)
            .or(non_empty(raw.description))
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        genre,
        cover_image: non_empty(raw.thumbnail).unwrap_or_else(|| PLACEHOLDER_COVER.to_string()),
        audio_url: raw.audio_file.unwrap_or_default(),
        duration_seconds: raw.duration.unwrap_or(0.0).max(0.0) as u64,
        video_id: extract_video_id(&url),
        url,
        channel: raw.channel.unwrap_or_default(),
        channel_url: raw.channel_url.unwrap_or_default(),
        categories,
        tags: raw.tags.unwrap_or_default(),
        upload_date: raw.upload_date.unwrap_or_default(),
    }
}

/// A record enters the working catalog only with a real title and a
/// resolvable video id. Note that this drops audio-only entries that carry
/// a working `audio_file` but no video URL; see DESIGN.md.
fn is_eligible(book: &Book) -> bool {
    book.title != UNKNOWN_TITLE && book.video_id.is_some()
}

pub(crate) fn normalize(records: BTreeMap<String, RawRecord>) -> Vec<Book> {
    records
        .into_iter()
        .map(|(id, raw)| normalize_record(&id, raw))
        .filter(is_eligible)
        .collect()
}

pub(crate) fn parse_catalog(raw_json: &str) -> Result<Vec<Book>> {
    let records: BTreeMap<String, RawRecord> =
        serde_json::from_str(raw_json).context("catalog document is not valid JSON")?;
    Ok(normalize(records))
}

const VIDEO_ID_LEN: usize = 11;
const VIDEO_ID_MARKERS: [&str; 5] = ["watch?v=", "&v=", "youtu.be/", "embed/", "/v/"];

/// Pulls the 11-character video id out of the watch/short/embed URL shapes
/// the catalog uses. Returns `None` for anything that does not resolve.
pub(crate) fn extract_video_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }

    let rest = VIDEO_ID_MARKERS
        .iter()
        .find_map(|marker| url.find(marker).map(|idx| &url[idx + marker.len()..]))?;
    let candidate: String = rest
        .chars()
        .take_while(|c| !matches!(c, '#' | '&' | '?'))
        .collect();
    if candidate.len() == VIDEO_ID_LEN {
        Some(candidate)
    } else {
        None
    }
}

pub(crate) fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

pub(crate) fn format_time_display(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let minutes = total / 60;
    let secs = total % 60;
    format!("{minutes}:{secs:02}")
}

/// `YYYYMMDD` to a short human date; anything else comes back empty.
pub(crate) fn format_upload_date(raw: &str) -> String {
    if raw.len() != 8 {
        return String::new();
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(|date| date.format("%b %d, %Y").to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LibraryStats {
    pub total_books: usize,
    pub total_authors: usize,
    pub total_channels: usize,
    pub total_duration_seconds: u64,
}

impl LibraryStats {
    pub(crate) fn formatted_total_duration(&self) -> String {
        let days = self.total_duration_seconds / 86_400;
        let hours = (self.total_duration_seconds % 86_400) / 3_600;
        format!("{days} days, {hours} hours")
    }
}

pub(crate) fn library_stats(books: &[Book]) -> LibraryStats {
    let mut authors = HashSet::new();
    let mut channels = HashSet::new();
    let mut total_duration_seconds = 0;
    for book in books {
        if book.author != UNKNOWN_AUTHOR {
            authors.insert(book.author.as_str());
        }
        if !book.channel.is_empty() {
            channels.insert(book.channel.as_str());
        }
        total_duration_seconds += book.duration_seconds;
    }
    LibraryStats {
        total_books: books.len(),
        total_authors: authors.len(),
        total_channels: channels.len(),
        total_duration_seconds,
    }
}

/// Clock-seeded stand-in for a uniform random pick; pure so tests can pin
/// the seed.
pub(crate) fn pick_random_index(len: usize, seed: u64) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some((seed % len as u64) as usize)
}
