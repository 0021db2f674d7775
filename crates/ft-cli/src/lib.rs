//! Per-file editing time tracker CLI library.
//!
//! This crate provides the CLI interface for the tracker.

mod cli;
pub mod commands;
mod config;
pub mod context;
mod lock;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use context::TrackerContext;
pub use lock::WriterLock;
