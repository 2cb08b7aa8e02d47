//! bundlescout CLI — find the storefront bundles that include a game.
//!
//! Resolves a catalog app id into every commercial bundle that includes
//! it, riding out an unreliable storefront through proxy fallback.

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
