//! SiteChat server and CLI.
//!
//! Answers visitor questions using text scraped from the site's own pages as
//! grounding for a hosted text-generation model.

mod commands;
mod routes;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
