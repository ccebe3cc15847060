//! pagewise CLI: outlines, sections, summaries and answers for extracted
//! document text.
//!
//! Reads UTF-8 text files whose pages are separated by form feeds, as emitted
//! by common PDF-to-text extractors.

mod backend;
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
