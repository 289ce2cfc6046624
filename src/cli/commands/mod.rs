//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `organize`: the batch pipeline over an input directory
//! - `lookup`: folder creation from explicit ASINs, catalog search, and
//!   tag inspection

mod lookup;
mod organize;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::{Builder, Runtime};

use crate::config;

pub use lookup::{cmd_lookup, cmd_search, cmd_tags};
pub use organize::cmd_organize;

/// Book Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable detailed DEBUG logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable all logging except ERROR messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Organize audiobook files into the library
    Organize {
        /// Input directory containing audiobook files
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory for the organized library (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Move files instead of copying (overrides config)
        #[arg(short, long = "move")]
        move_files: bool,
        /// Path to a .json or .csv file mapping filenames to ASINs
        #[arg(short, long)]
        asin_map: Option<PathBuf>,
        /// Simulate actions - nothing is moved or written
        #[arg(long)]
        dry_run: bool,
        /// Accept every match without prompting (headless mode)
        #[arg(short, long)]
        yes: bool,
    },
    /// Fetch metadata for ASINs and create book folders without audio
    Lookup {
        /// Comma-separated list of ASINs
        #[arg(long = "asin", value_delimiter = ',', required = true)]
        asins: Vec<String>,
        /// Output directory for the organized library (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Simulate actions - nothing is written
        #[arg(long)]
        dry_run: bool,
    },
    /// Search the catalog and print ranked candidates
    Search {
        /// Search keywords
        #[arg(required = true)]
        keywords: Vec<String>,
        /// Maximum number of results
        #[arg(short, long, default_value = "5")]
        num_results: usize,
    },
    /// Show the embedded tags of an audio file
    Tags {
        /// Path to the audio file
        path: PathBuf,
    },
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    // One file at a time, so the async HTTP client only needs a
    // current-thread runtime
    let rt: Runtime = Builder::new_current_thread().enable_all().build()?;

    let config = config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Organize {
            input,
            output,
            move_files,
            asin_map,
            dry_run,
            yes,
        } => cmd_organize(
            &rt,
            &config,
            input,
            output.as_deref(),
            *move_files,
            asin_map.as_deref(),
            *dry_run,
            *yes,
        ),
        Commands::Lookup {
            asins,
            output,
            dry_run,
        } => cmd_lookup(&rt, &config, asins, output.as_deref(), *dry_run),
        Commands::Search {
            keywords,
            num_results,
        } => cmd_search(&rt, &config, &keywords.join(" "), *num_results),
        Commands::Tags { path } => cmd_tags(path),
    }
}
