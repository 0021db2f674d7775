//! Session state machine.
//!
//! Turns a noisy stream of activity signals into non-overlapping
//! `(file, start, end)` sessions. At most one session is open at a time:
//! activity on a different file closes the open session and opens a new one,
//! and a periodic heartbeat closes the open session once no activity has been
//! seen for the idle timeout.
//!
//! # Thread Safety
//!
//! Every state transition (including the store calls it makes) runs under a
//! single mutex, so events, heartbeat ticks and `stop()` never interleave.
//! Observers are notified after the lock is released, in registration order.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::activity::ActivityEvent;
use crate::clock::Clock;
use crate::project::{WorkspaceRoots, resolve_project};
use crate::store::SessionStore;
use crate::types::{FilePath, SessionId};

/// Maximum gap since the last activity before the open session is closed.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// How often the idle timeout is evaluated.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(10);

/// Timing parameters for a [`SessionTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub idle_timeout: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: IDLE_TIMEOUT,
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }
}

impl TrackerConfig {
    fn idle_timeout_ms(&self) -> i64 {
        i64::try_from(self.idle_timeout.as_millis()).unwrap_or(i64::MAX)
    }
}

/// A session transition, as delivered to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Opened {
        file_path: String,
        project_path: Option<String>,
    },
    Closed {
        file_path: String,
    },
}

/// Receives session transitions synchronously.
pub trait SessionObserver: Send + Sync {
    fn on_session_change(&self, change: &SessionChange);
}

impl<F> SessionObserver for F
where
    F: Fn(&SessionChange) + Send + Sync,
{
    fn on_session_change(&self, change: &SessionChange) {
        self(change);
    }
}

#[derive(Debug)]
struct OpenSession {
    id: SessionId,
    file_path: String,
    opened_at: i64,
}

#[derive(Debug, Default)]
struct TrackerState {
    current: Option<OpenSession>,
    last_activity_at: i64,
    stopped: bool,
}

/// Maps activity signals to store sessions.
pub struct SessionTracker<S> {
    store: S,
    clock: Arc<dyn Clock>,
    roots: Arc<dyn WorkspaceRoots>,
    config: TrackerConfig,
    state: Mutex<TrackerState>,
    observers: Mutex<Vec<Arc<dyn SessionObserver>>>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl<S: SessionStore> SessionTracker<S> {
    pub fn new(
        store: S,
        clock: Arc<dyn Clock>,
        roots: Arc<dyn WorkspaceRoots>,
        config: TrackerConfig,
    ) -> Self {
        let last_activity_at = clock.now_ms();
        Self {
            store,
            clock,
            roots,
            config,
            state: Mutex::new(TrackerState {
                last_activity_at,
                ..TrackerState::default()
            }),
            observers: Mutex::new(Vec::new()),
            heartbeat: Mutex::new(None),
        }
    }

    /// Registers an observer for open/close transitions.
    pub fn subscribe(&self, observer: impl SessionObserver + 'static) {
        lock(&self.observers).push(Arc::new(observer));
    }

    /// Records activity on `file_path`, switching sessions if it differs from the open one.
    pub fn on_activity(&self, file_path: &str) {
        self.switch_to(file_path);
    }

    /// Records that the active editor changed to `file_path`.
    pub fn on_editor_focus_change(&self, file_path: &str) {
        self.switch_to(file_path);
    }

    /// Backdates the last activity by one idle timeout.
    ///
    /// The session stays open until the next heartbeat tick closes it, so a
    /// quick alt-tab followed by activity does not split the session.
    pub fn on_window_blur(&self) {
        let mut state = lock(&self.state);
        if state.stopped {
            return;
        }
        let now = self.clock.now_ms();
        state.last_activity_at = now.saturating_sub(self.config.idle_timeout_ms());
        tracing::debug!(tracking = state.current.is_some(), "window blurred");
    }

    /// Dispatches a raw editor event.
    pub fn handle_event(&self, event: &ActivityEvent) {
        tracing::trace!(kind = event.kind(), file = ?event.file_path(), "activity event");
        match event {
            ActivityEvent::TextChange { file_path } | ActivityEvent::SelectionChange { file_path } => {
                self.on_activity(file_path);
            }
            ActivityEvent::ActiveFileChange { file_path } => {
                self.on_editor_focus_change(file_path);
            }
            ActivityEvent::WindowFocusChange { focused: false, .. } => self.on_window_blur(),
            ActivityEvent::WindowFocusChange {
                focused: true,
                file_path,
            } => {
                if let Some(file_path) = file_path {
                    self.on_activity(file_path);
                }
            }
        }
    }

    /// Closes the open session if the idle timeout has elapsed.
    ///
    /// This is the only path that ends a session without new activity.
    pub fn check_idle(&self) {
        let change = {
            let mut state = lock(&self.state);
            if state.current.is_none() {
                return;
            }
            let now = self.clock.now_ms();
            let idle_for = now.saturating_sub(state.last_activity_at);
            if idle_for < self.config.idle_timeout_ms() {
                return;
            }
            tracing::debug!(idle_for_ms = idle_for, "idle timeout reached");
            self.close_current(&mut state, now)
        };
        self.notify(change.as_slice());
    }

    /// Stops tracking: cancels the heartbeat and closes the open session.
    ///
    /// Later calls and later events are ignored.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.heartbeat).take() {
            handle.abort();
        }
        let change = {
            let mut state = lock(&self.state);
            if state.stopped {
                return;
            }
            state.stopped = true;
            let now = self.clock.now_ms();
            self.close_current(&mut state, now)
        };
        self.notify(change.as_slice());
        tracing::debug!("tracker stopped");
    }

    pub fn is_tracking(&self) -> bool {
        lock(&self.state).current.is_some()
    }

    pub fn current_file_path(&self) -> Option<String> {
        lock(&self.state)
            .current
            .as_ref()
            .map(|open| open.file_path.clone())
    }

    /// Start time of the open session, if any.
    pub fn current_started_at(&self) -> Option<i64> {
        lock(&self.state).current.as_ref().map(|open| open.opened_at)
    }

    fn switch_to(&self, file_path: &str) {
        let file_path = match FilePath::new(file_path) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(%err, "ignoring activity");
                return;
            }
        };

        let changes = {
            let mut state = lock(&self.state);
            if state.stopped {
                return;
            }
            let now = self.clock.now_ms();
            state.last_activity_at = now;
            if state
                .current
                .as_ref()
                .is_some_and(|open| open.file_path == file_path.as_str())
            {
                return;
            }
            let mut changes = Vec::with_capacity(2);
            changes.extend(self.close_current(&mut state, now));
            changes.extend(self.open(&mut state, file_path.as_str(), now));
            changes
        };
        self.notify(&changes);
    }

    fn open(&self, state: &mut TrackerState, file_path: &str, now: i64) -> Option<SessionChange> {
        let project_path = resolve_project(file_path, &self.roots.roots());
        match self
            .store
            .start_session_at(file_path, project_path.as_deref(), now)
        {
            Ok(id) => {
                tracing::info!(session_id = %id, file = file_path, project = ?project_path, "session opened");
                state.current = Some(OpenSession {
                    id,
                    file_path: file_path.to_string(),
                    opened_at: now,
                });
                Some(SessionChange::Opened {
                    file_path: file_path.to_string(),
                    project_path,
                })
            }
            Err(err) => {
                tracing::warn!(file = file_path, error = %err, "failed to open session");
                None
            }
        }
    }

    /// Clears the open session; the in-memory state is cleared even if the store fails.
    fn close_current(&self, state: &mut TrackerState, now: i64) -> Option<SessionChange> {
        let open = state.current.take()?;
        match self.store.end_session_at(open.id, now) {
            Ok(()) => tracing::info!(
                session_id = %open.id,
                file = %open.file_path,
                duration_ms = now.saturating_sub(open.opened_at),
                "session closed"
            ),
            Err(err) => tracing::warn!(
                session_id = %open.id,
                error = %err,
                "failed to close session in store"
            ),
        }
        Some(SessionChange::Closed {
            file_path: open.file_path,
        })
    }

    fn notify(&self, changes: &[SessionChange]) {
        if changes.is_empty() {
            return;
        }
        let observers = lock(&self.observers).clone();
        for change in changes {
            for observer in &observers {
                observer.on_session_change(change);
            }
        }
    }
}

impl<S: SessionStore + 'static> SessionTracker<S> {
    /// Spawns the heartbeat task that calls [`check_idle`](Self::check_idle).
    ///
    /// Must be called from within a tokio runtime. The task holds a weak
    /// reference and ends on its own once the tracker is dropped. Does nothing
    /// once the tracker has been stopped.
    pub fn start_heartbeat(self: &Arc<Self>) {
        if lock(&self.state).stopped {
            return;
        }
        let period = self.config.heartbeat_interval.max(MIN_HEARTBEAT_INTERVAL);
        let tracker = Arc::downgrade(self);
        let first_tick = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(tracker) = tracker.upgrade() else {
                    break;
                };
                tracker.check_idle();
            }
        });
        if let Some(previous) = lock(&self.heartbeat).replace(handle) {
            previous.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
