//! Shared store access with debounced snapshot writes.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use ft_core::{
    Clock, FileAggregate, ProjectAggregate, Session, SessionId, SessionStore, TodayStats,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::{DbError, Store};

/// Quiet period after the last mutation before a snapshot is written.
pub const SAVE_DELAY: Duration = Duration::from_secs(1);

/// A cloneable handle to a [`Store`].
///
/// Every successful mutation (re)starts a single save timer; a burst of
/// mutations produces one snapshot write once the burst has been quiet for
/// the save delay. A failed write is logged and left for the next timer.
/// Outside a tokio runtime there is no timer and snapshots are written
/// immediately.
#[derive(Clone)]
pub struct StoreHandle {
    shared: Arc<Shared>,
}

struct Shared {
    store: Mutex<Store>,
    pending_save: Mutex<Option<JoinHandle<()>>>,
    save_delay: Duration,
}

impl StoreHandle {
    pub fn new(store: Store, save_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(store),
                pending_save: Mutex::new(None),
                save_delay,
            }),
        }
    }

    /// Opens the store at `path` with the given save delay.
    pub fn open(path: &Path, clock: Arc<dyn Clock>, save_delay: Duration) -> Result<Self, DbError> {
        Ok(Self::new(Store::open(path, clock)?, save_delay))
    }

    /// Runs a read-only closure against the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&Store) -> R) -> R {
        f(&lock(&self.shared.store))
    }

    /// Opens a session for `file_path` starting now.
    pub fn start_session(
        &self,
        file_path: &str,
        project_path: Option<&str>,
    ) -> Result<SessionId, DbError> {
        let id = lock(&self.shared.store).start_session(file_path, project_path)?;
        self.schedule_save();
        Ok(id)
    }

    /// Closes session `id` now. Unknown or closed ids are ignored.
    pub fn end_session(&self, id: SessionId) -> Result<(), DbError> {
        let changed = lock(&self.shared.store).end_session(id)?;
        if changed {
            self.schedule_save();
        }
        Ok(())
    }

    pub fn get_file_stats(&self, file_path: &str) -> Result<Option<FileAggregate>, DbError> {
        self.with_store(|store| store.get_file_stats(file_path))
    }

    pub fn get_all_file_stats(&self) -> Result<Vec<FileAggregate>, DbError> {
        self.with_store(Store::get_all_file_stats)
    }

    pub fn get_project_stats(&self) -> Result<Vec<ProjectAggregate>, DbError> {
        self.with_store(Store::get_project_stats)
    }

    pub fn get_today_stats(&self) -> Result<TodayStats, DbError> {
        self.with_store(Store::get_today_stats)
    }

    pub fn get_ongoing_sessions(&self) -> Result<Vec<Session>, DbError> {
        self.with_store(Store::get_ongoing_sessions)
    }

    /// Closes sessions left open by a previous run.
    pub fn recover_ongoing_sessions(&self) -> Result<Vec<Session>, DbError> {
        let recovered = lock(&self.shared.store).recover_ongoing_sessions()?;
        if !recovered.is_empty() {
            self.schedule_save();
        }
        Ok(recovered)
    }

    /// Cancels any pending save, closes open sessions and writes the final snapshot.
    ///
    /// Blocks until the write has completed. Safe to call more than once.
    pub fn close(&self) -> Result<(), DbError> {
        if let Some(task) = lock(&self.shared.pending_save).take() {
            task.abort();
        }
        let mut store = lock(&self.shared.store);
        let recovered = store.close()?;
        tracing::info!(
            closed_sessions = recovered.len(),
            snapshots = store.snapshots_written(),
            "store closed"
        );
        Ok(())
    }

    fn schedule_save(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            if let Err(err) = lock(&self.shared.store).snapshot() {
                tracing::warn!(error = %err, "snapshot write failed");
            }
            return;
        };

        let deadline = Instant::now() + self.shared.save_delay;
        let shared = Arc::downgrade(&self.shared);
        let task = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut store = lock(&shared.store);
            if store.is_closed() {
                return;
            }
            if let Err(err) = store.snapshot() {
                tracing::warn!(error = %err, "debounced snapshot write failed");
            }
        });
        if let Some(previous) = lock(&self.shared.pending_save).replace(task) {
            previous.abort();
        }
    }
}

impl SessionStore for StoreHandle {
    type Error = DbError;

    fn start_session_at(
        &self,
        file_path: &str,
        project_path: Option<&str>,
        start_time: i64,
    ) -> Result<SessionId, DbError> {
        let id = lock(&self.shared.store).start_session_at(file_path, project_path, start_time)?;
        self.schedule_save();
        Ok(id)
    }

    fn end_session_at(&self, id: SessionId, end_time: i64) -> Result<(), DbError> {
        let changed = lock(&self.shared.store).end_session_at(id, end_time)?;
        if changed {
            self.schedule_save();
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
