//! tokentree - LLM token counts across a directory tree
//!
//! tokentree provides:
//! - Two-phase directory scanning with text/binary classification
//! - Token counting with tiktoken encodings and a bytes/4 fallback
//! - Recursive per-directory and per-extension totals
//! - Tree, file list, extension and preview views (tree/json/jsonl/md)

use anyhow::Result;
use clap::Parser;

mod backends;
mod cli;
mod core;
mod flows;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbose, cli.quiet);
    cli::run(cli)
}
