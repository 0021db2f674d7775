//! Runtime context owning the store and the tracker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ft_core::{Clock, SessionChange, SessionTracker, StaticRoots, WorkspaceRoots};
use ft_db::StoreHandle;

use crate::Config;

/// Everything a running tracker needs, constructed at startup and torn down at shutdown.
pub struct TrackerContext {
    store: StoreHandle,
    tracker: Arc<SessionTracker<StoreHandle>>,
    roots: Arc<StaticRoots>,
}

impl TrackerContext {
    /// Opens the store, closes sessions left open by a previous run and starts the heartbeat.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, extra_roots: &[PathBuf], clock: Arc<dyn Clock>) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create database directory")?;
        }
        let store = StoreHandle::open(&config.database_path, Arc::clone(&clock), config.save_delay())
            .with_context(|| format!("failed to open {}", config.database_path.display()))?;

        let recovered = store
            .recover_ongoing_sessions()
            .context("failed to close sessions from previous run")?;
        if !recovered.is_empty() {
            tracing::info!(count = recovered.len(), "recovered dangling sessions");
        }

        let roots = Arc::new(StaticRoots::new(
            config
                .workspace_roots
                .iter()
                .chain(extra_roots)
                .map(|root| root.to_string_lossy().into_owned()),
        ));
        let tracker = Arc::new(SessionTracker::new(
            store.clone(),
            clock,
            Arc::clone(&roots) as Arc<dyn WorkspaceRoots>,
            config.tracker_config(),
        ));
        tracker.start_heartbeat();
        tracker.subscribe(|change: &SessionChange| {
            tracing::debug!(?change, "session change");
        });

        Ok(Self {
            store,
            tracker,
            roots,
        })
    }

    pub fn tracker(&self) -> &SessionTracker<StoreHandle> {
        &self.tracker
    }

    pub const fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Workspace roots consulted on every session open; replace them as folders change.
    pub fn roots(&self) -> &StaticRoots {
        &self.roots
    }

    /// Stops the tracker and writes the final snapshot.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) -> Result<()> {
        self.tracker.stop();
        self.store.close().context("failed to write final snapshot")
    }
}
