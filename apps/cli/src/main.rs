//! chimei CLI: extract place names from Japanese literary texts.
//!
//! Reads works from UTF-8 files and prints the resolved places, with their
//! surrounding context, as JSON.

mod commands;

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
