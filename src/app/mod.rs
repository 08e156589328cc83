mod playback;
mod tui;
mod view;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};

use crate::catalog;
use crate::changelog;
use crate::cli::{Cli, Command};
use crate::db::Store;
use crate::loader::{self, LoadOptions};
use crate::paths::store_file_path;
use crate::search;

pub fn run(cli: Cli) -> Result<()> {
    let store = open_store()?;
    let opts = LoadOptions {
        base_url: cli.base_url,
        no_cache: cli.no_cache,
    };

    match cli.command {
        Some(Command::Search { term }) => run_search(&store, &opts, &term),
        Some(Command::Genres) => run_genres(&store, &opts),
        Some(Command::Stats) => run_stats(&store, &opts),
        Some(Command::Refresh) => run_refresh(&store, &opts),
        Some(Command::Changelog) => run_changelog(&opts),
        Some(Command::Tui) | None => tui::run_tui(&store, &opts),
    }
}

fn open_store() -> Result<Store> {
    let path = store_file_path()?;
    let store = Store::open(&path)?;
    store.migrate()?;
    Ok(store)
}

fn run_search(store: &Store, opts: &LoadOptions, term: &str) -> Result<()> {
    let term = term.trim();
    if term.is_empty() {
        println!("Enter a search term.");
        return Ok(());
    }

    let loaded = loader::load(store, opts).context("failed to load the catalog")?;
    let results = search::filter(&loaded.books, term);
    if results.is_empty() {
        println!("No audiobooks found for \"{term}\".");
        return Ok(());
    }

    println!("{:<44} {:<28} {:<18} {:<10}", "TITLE", "AUTHOR", "GENRE", "DURATION");
    for book in &results {
        println!(
            "{:<44} {:<28} {:<18} {:<10}",
            truncate(&book.title, 44),
            truncate(&book.author, 28),
            truncate(&book.genre, 18),
            book.formatted_duration()
        );
    }
    println!("\n{} audiobooks found for \"{term}\".", results.len());
    Ok(())
}

fn run_genres(store: &Store, opts: &LoadOptions) -> Result<()> {
    let loaded = loader::load(store, opts).context("failed to load the catalog")?;
    let pills = search::genre_pills(&loaded.books);
    if pills.is_empty() {
        println!("No genre has enough audiobooks to be surfaced.");
        return Ok(());
    }

    println!("{:<28} {:<8}", "GENRE", "BOOKS");
    for pill in &pills {
        println!("{:<28} {:<8}", truncate(&pill.genre, 28), pill.count);
    }
    Ok(())
}

fn run_stats(store: &Store, opts: &LoadOptions) -> Result<()> {
    let loaded = loader::load(store, opts).context("failed to load the catalog")?;
    let stats = catalog::library_stats(&loaded.books);
    println!("Audiobooks:     {}", stats.total_books);
    println!("Authors:        {}", stats.total_authors);
    println!("Channels:       {}", stats.total_channels);
    println!("Total duration: {}", stats.formatted_total_duration());
    Ok(())
}

fn run_refresh(store: &Store, opts: &LoadOptions) -> Result<()> {
    let count = loader::refresh(store, opts)?;
    println!("Catalog refreshed: {count} eligible audiobooks cached.");
    Ok(())
}

fn run_changelog(opts: &LoadOptions) -> Result<()> {
    let base = opts
        .base_url
        .as_deref()
        .ok_or_else(|| anyhow!("no changelog source configured; pass --base-url"))?;
    let entries = changelog::fetch(base).map_err(|err| anyhow!(err))?;
    if entries.is_empty() {
        println!("No updates available.");
        return Ok(());
    }

    for entry in &entries {
        println!("{}  {}", changelog::format_entry_date(&entry.date), entry.title);
        if let Some(description) = entry.description.as_deref() {
            println!("  {description}");
        }
        for change in entry.changes.as_deref().unwrap_or_default() {
            println!("  - {change}");
        }
        println!();
    }
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
