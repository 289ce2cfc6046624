//! Book Minder - organizes audiobook files into a structured library.
//!
//! Reads the tags embedded in local audio files, fetches matching metadata
//! from the Audible catalog, lets the user confirm or edit the match, then
//! renames and relocates the files with sidecar metadata and cover art.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod matcher;
pub mod model;
pub mod organizer;
pub mod scanner;
pub mod sidecar;
pub mod skiplog;
pub mod tags;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging; -v and -q adjust the default directive
    let directive = if args.verbose {
        "book_minder=debug"
    } else if args.quiet {
        "book_minder=error"
    } else {
        "book_minder=info"
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive(directive.parse().unwrap()))
        .init();

    cli::run_command(&args)
}
