//! fieldfill CLI: scan HTML forms and fill them with AI-generated values.
//!
//! Runs the page session and the background coordinator in one process,
//! connected by the same message bus the library uses.

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
