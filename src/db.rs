use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

/// Schema tag written alongside the cached catalog body. Bumping it
/// invalidates every cache written by older builds.
pub(crate) const CACHE_VERSION: &str = "1.0";
/// Cached catalogs older than this are treated as missing.
pub(crate) const CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

const CACHE_BODY_KEY: &str = "catalog.body";
const CACHE_VERSION_KEY: &str = "catalog.version";
const CACHE_TIMESTAMP_KEY: &str = "catalog.written_at";

pub(crate) const PREF_DARK_MODE: &str = "prefers_dark_mode";
pub(crate) const PREF_CHANGELOG_COLLAPSED: &str = "changelog_collapsed";

pub(crate) struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create store directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        Ok(Self { conn, path: None })
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn cache_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn cache_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO cache_entries (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    pub(crate) fn write_catalog_cache(&self, raw_json: &str, now_ms: i64) -> Result<()> {
        self.cache_set(CACHE_BODY_KEY, raw_json)?;
        self.cache_set(CACHE_VERSION_KEY, CACHE_VERSION)?;
        self.cache_set(CACHE_TIMESTAMP_KEY, &now_ms.to_string())?;
        Ok(())
    }

    /// Returns the cached catalog body when the schema version matches and
    /// the entry is younger than the TTL; anything else reads as a miss.
    pub(crate) fn read_catalog_cache(&self, now_ms: i64) -> Result<Option<String>> {
        let Some(version) = self.cache_get(CACHE_VERSION_KEY)? else {
            return Ok(None);
        };
        if version != CACHE_VERSION {
            return Ok(None);
        }
        let Some(written_at) = self.cache_get(CACHE_TIMESTAMP_KEY)? else {
            return Ok(None);
        };
        let Ok(written_at_ms) = written_at.trim().parse::<i64>() else {
            return Ok(None);
        };
        if now_ms.saturating_sub(written_at_ms) >= CACHE_TTL_MS {
            return Ok(None);
        }
        self.cache_get(CACHE_BODY_KEY)
    }

    pub(crate) fn preference(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub(crate) fn set_preference(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO preferences (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    pub(crate) fn bool_preference(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.preference(key)?.map(|value| value == "true"))
    }

    pub(crate) fn set_bool_preference(&self, key: &str, value: bool) -> Result<()> {
        self.set_preference(key, if value { "true" } else { "false" })
    }
}
