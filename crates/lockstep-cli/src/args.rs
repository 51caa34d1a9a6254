//! Command-line argument definitions for the Lockstep CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments select the change log to apply, the files the
//! semantic and notation models are kept in, configuration file selection,
//! and logging verbosity.

use clap::Parser;

/// Command-line arguments for the Lockstep synchronizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the change-log document (TOML)
    #[arg(help = "Path to the change log")]
    pub input: String,

    /// Semantic model file, read when present and rewritten on every save
    #[arg(short, long, default_value = "model.toml")]
    pub model: String,

    /// Notation model file, read when present and rewritten on every save
    #[arg(short, long, default_value = "notation.toml")]
    pub notation: String,

    /// Write a journal of the applied changes to this file
    #[arg(short, long)]
    pub journal: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
