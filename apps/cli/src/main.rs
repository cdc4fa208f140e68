//! PureLearn CLI — local-first course reader and progress tracker.
//!
//! Reads markdown courses from a content directory, resolves previous/next
//! navigation, and keeps completion and quiz results in a local database.

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
