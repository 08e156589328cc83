use chrono::NaiveDate;
use serde::Deserialize;

use crate::http::{self, RequestPolicy};
use crate::loader::changelog_url;

/// Only the newest few entries are surfaced.
pub(crate) const MAX_ENTRIES: usize = 3;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub(crate) struct ChangelogEntry {
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub changes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ChangelogDoc {
    entries: Vec<ChangelogEntry>,
}

pub(crate) fn parse_entries(raw: &str) -> Result<Vec<ChangelogEntry>, String> {
    let doc: ChangelogDoc =
        serde_json::from_str(raw).map_err(|err| format!("invalid changelog format: {err}"))?;
    Ok(doc.entries.into_iter().take(MAX_ENTRIES).collect())
}

/// Fetches the changelog feed. Failures are scoped to the caller's panel
/// and never block the main view.
pub(crate) fn fetch(base_url: &str) -> Result<Vec<ChangelogEntry>, String> {
    let url = changelog_url(base_url);
    let body = http::get_text(&url, RequestPolicy::changelog())?;
    parse_entries(&body)
}

/// `YYYY-MM-DD` dates render as short human dates; anything else passes
/// through untouched.
pub(crate) fn format_entry_date(raw: &str) -> String {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.format("%b %d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
