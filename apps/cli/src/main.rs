//! termgraph CLI: SNOMED CT exports → graph-load CSVs, and concept ID resolution
//! against a Snowstorm terminology server.

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
