use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "audioteca",
    version,
    about = "Browse and play an audiobook library from the terminal"
)]
pub struct Cli {
    /// Base URL of the library site; the catalog and changelog JSON
    /// documents are fetched from under it.
    #[arg(long, env = "AUDIOTECA_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Skip the local cache and always fetch a fresh catalog.
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive browser (the default when no command is given).
    Tui,
    /// Search the catalog and print matching books.
    Search { term: String },
    /// Print the genres surfaced in the genre navigation.
    Genres,
    /// Print library statistics.
    Stats,
    /// Force-fetch the catalog and rewrite the local cache.
    Refresh,
    /// Print the latest changelog entries.
    Changelog,
}
