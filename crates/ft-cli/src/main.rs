use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ft_core::SystemClock;
use tracing_subscriber::EnvFilter;

use ft_cli::commands::{recover, report, status, track, util};
use ft_cli::{Cli, Commands, Config};

/// Load config and open the store read-only.
///
/// Nothing opened here is ever snapshotted, so a running tracker's file is left alone.
fn open_store(config_path: Option<&Path>) -> Result<(ft_db::Store, Config)> {
    let config = load_config(config_path)?;
    let store = ft_db::Store::open(&config.database_path, Arc::new(SystemClock))
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((store, config))
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so stdout stays clean for JSON output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Track { roots }) => {
            let config = load_config(cli.config.as_deref())?;
            track::run(&config, roots)?;
        }
        Some(Commands::Status) => {
            let (store, config) = open_store(cli.config.as_deref())?;
            status::run(&mut stdout, &store, &config.database_path)?;
        }
        Some(Commands::Files { limit, json }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            report::files(&mut stdout, &store, *limit, *json)?;
        }
        Some(Commands::Projects { json }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            report::projects(&mut stdout, &store, *json)?;
        }
        Some(Commands::File { path, json }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            report::file(&mut stdout, &store, path, *json)?;
        }
        Some(Commands::Sessions { since, json }) => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            let since = util::parse_since(since, store.now_ms())?;
            report::sessions(&mut stdout, &store, since, *json)?;
        }
        Some(Commands::Recover) => {
            let config = load_config(cli.config.as_deref())?;
            recover::run(&mut stdout, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
