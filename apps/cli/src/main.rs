//! boardshelf CLI: drive board game catalog entries through the content
//! pipeline.
//!
//! Runs single entries or whole families from rulebook parsing through
//! content generation, and inspects the catalog along the way.

mod commands;
mod output;

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
