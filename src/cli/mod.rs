//! Command-line interface for book-minder.
//!
//! This module provides the commands for organizing, looking up, searching,
//! and inspecting audiobook files.

mod commands;

pub use commands::{Cli, Commands, run_command};
