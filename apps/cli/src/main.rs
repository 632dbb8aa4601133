//! contentpipe CLI — three-stage content pipeline over a chat-completion API.
//!
//! Serves the pipeline over HTTP or runs it once from the terminal.

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
