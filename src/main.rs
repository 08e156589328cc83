mod app;
mod catalog;
mod changelog;
mod cli;
mod db;
mod http;
mod loader;
mod paths;
mod player;
mod search;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    app::run(cli)
}
