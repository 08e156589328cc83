use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use crate::catalog::{Book, parse_catalog};
use crate::db::Store;
use crate::http::{self, RequestPolicy};

const CATALOG_DOCUMENT: &str = "augmented.json";
const CHANGELOG_DOCUMENT: &str = "changelog.json";

#[derive(Debug, Clone, Default)]
pub(crate) struct LoadOptions {
    pub base_url: Option<String>,
    pub no_cache: bool,
}

pub(crate) fn catalog_url(base: &str) -> String {
    format!("{}/{CATALOG_DOCUMENT}", base.trim_end_matches('/'))
}

pub(crate) fn changelog_url(base: &str) -> String {
    format!("{}/{CHANGELOG_DOCUMENT}", base.trim_end_matches('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoadSource {
    Cache,
    Network,
}

#[derive(Debug)]
pub(crate) struct LoadedCatalog {
    pub books: Vec<Book>,
    pub source: LoadSource,
}

/// Cache-first catalog load. A valid cache answers immediately and kicks
/// off a background refresh that only rewrites the cache; live state is
/// never touched by it. Without a valid cache the catalog is fetched,
/// cached and parsed.
pub(crate) fn load(store: &Store, opts: &LoadOptions) -> Result<LoadedCatalog> {
    let now_ms = Utc::now().timestamp_millis();

    if !opts.no_cache
        && let Some(body) = store.read_catalog_cache(now_ms)?
    {
        // A cached body that no longer parses is treated as a miss rather
        // than a load failure.
        if let Ok(books) = parse_catalog(&body) {
            if let (Some(path), Some(base)) = (store.path(), opts.base_url.as_deref()) {
                spawn_background_refresh(path.to_path_buf(), catalog_url(base));
            }
            return Ok(LoadedCatalog {
                books,
                source: LoadSource::Cache,
            });
        }
    }

    let base = opts.base_url.as_deref().ok_or_else(|| {
        anyhow!("no catalog source configured; pass --base-url or set AUDIOTECA_BASE_URL")
    })?;
    let url = catalog_url(base);
    let body = http::get_text(&url, RequestPolicy::catalog())
        .map_err(|err| anyhow!(err))
        .with_context(|| format!("failed to fetch catalog from {url}"))?;

    store
        .write_catalog_cache(&body, now_ms)
        .context("failed to cache the fetched catalog")?;

    let books = parse_catalog(&body)?;
    Ok(LoadedCatalog {
        books,
        source: LoadSource::Network,
    })
}

/// Fetches a fresh catalog and rewrites the cache. Used by the `refresh`
/// command; the TUI path goes through `load`.
pub(crate) fn refresh(store: &Store, opts: &LoadOptions) -> Result<usize> {
    let base = opts.base_url.as_deref().ok_or_else(|| {
        anyhow!("no catalog source configured; pass --base-url or set AUDIOTECA_BASE_URL")
    })?;
    let url = catalog_url(base);
    let body = http::get_text(&url, RequestPolicy::catalog())
        .map_err(|err| anyhow!(err))
        .with_context(|| format!("failed to fetch catalog from {url}"))?;
    let books = parse_catalog(&body)?;
    store
        .write_catalog_cache(&body, Utc::now().timestamp_millis())
        .context("failed to cache the fetched catalog")?;
    Ok(books.len())
}

fn spawn_background_refresh(store_path: PathBuf, url: String) {
    std::thread::spawn(move || {
        let Ok(body) = http::get_text(&url, RequestPolicy::catalog()) else {
            return;
        };
        // Do not poison the cache with an unparseable document.
        if parse_catalog(&body).is_err() {
            return;
        }
        if let Ok(store) = Store::open(&store_path)
            && store.migrate().is_ok()
        {
            let _ = store.write_catalog_cache(&body, Utc::now().timestamp_millis());
        }
    });
}
