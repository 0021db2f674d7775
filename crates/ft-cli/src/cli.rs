//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Per-file editing time tracker.
///
/// Turns editor activity signals into per-file sessions and keeps running
/// totals per file and per project.
#[derive(Debug, Parser)]
#[command(name = "ft", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Track activity events read as JSON lines from stdin.
    ///
    /// Runs until stdin closes or Ctrl-C, then closes the open session and
    /// writes the final snapshot.
    Track {
        /// Additional workspace root (repeatable).
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
    },

    /// Show today's totals and any sessions still open.
    Status,

    /// List per-file totals, largest first.
    Files {
        /// Show at most this many files.
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List per-project totals, largest first.
    Projects {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show totals for one file.
    File {
        /// The file path, exactly as the editor reports it.
        path: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recorded sessions.
    Sessions {
        /// Only sessions starting at or after this time
        /// (ISO 8601, 'today', or e.g. '2 hours ago').
        #[arg(long, default_value = "today")]
        since: String,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Close sessions left open by an unclean shutdown.
    Recover,
}
