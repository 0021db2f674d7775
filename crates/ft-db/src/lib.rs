//! Storage layer for per-file editing time.
//!
//! Provides persistence for sessions and per-file totals using `rusqlite`.
//!
//! # Working Copy and Snapshots
//!
//! The [`Store`] keeps its data in an in-memory SQLite connection. The durable
//! copy is a complete SQLite database file written with the online-backup API
//! into `<path>.tmp` and renamed over `<path>`, so a crash mid-write never
//! leaves a torn file behind. On open, an existing snapshot is restored into
//! the in-memory connection.
//!
//! [`StoreHandle`] wraps a `Store` for shared use and debounces snapshot writes.
//!
//! # Thread Safety
//!
//! `Store` wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! `StoreHandle` serializes all access through a mutex.
//!
//! # Schema
//!
//! Timestamps and durations are INTEGER milliseconds since the Unix epoch.
//! `file_stats` is only written when a session closes: its `total_time_ms`
//! always equals the sum of `duration_ms` over the file's closed sessions.

mod handle;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ft_core::{
    Clock, FileAggregate, ProjectAggregate, Session, SessionId, TodayStats, local_midnight_ms,
};
use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName, OptionalExtension, Row, params};
use thiserror::Error;

pub use handle::{SAVE_DELAY, StoreHandle};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Reading or writing the snapshot file failed.
    #[error("snapshot i/o failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A mutation was attempted after the store was closed.
    #[error("store is closed")]
    Closed,
}

/// Session and per-file aggregate storage.
///
/// See the [module documentation](self) for the persistence model.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    closed: bool,
    snapshots_written: u64,
}

impl Store {
    /// Opens a store backed by the snapshot at `path`, loading it if it exists.
    ///
    /// The schema is created if absent.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, DbError> {
        let mut conn = Connection::open_in_memory()?;
        if path.exists() {
            conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)?;
            tracing::debug!(path = %path.display(), "loaded snapshot");
        } else {
            tracing::debug!(path = %path.display(), "no snapshot, starting empty");
        }
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
            clock,
            closed: false,
            snapshots_written: 0,
        };
        store.init()?;
        Ok(store)
    }

    /// Opens a store with no durable copy.
    ///
    /// Useful for testing. Snapshots are no-ops.
    pub fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            path: None,
            clock,
            closed: false,
            snapshots_written: 0,
        };
        store.init()?;
        Ok(store)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- sessions: one row per interval of attention on a file
            -- end_time/duration_ms: NULL while the session is open
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path TEXT NOT NULL,
                project_path TEXT,
                start_time INTEGER NOT NULL,
                end_time INTEGER,
                duration_ms INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_file ON sessions(file_path);
            CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_time);

            CREATE TABLE IF NOT EXISTS file_stats (
                file_path TEXT PRIMARY KEY,
                project_path TEXT,
                total_time_ms INTEGER NOT NULL DEFAULT 0,
                last_active INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_file_stats_project ON file_stats(project_path);
            ",
        )?;
        Ok(())
    }

    /// Current time according to the store's clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Path of the durable snapshot, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of snapshots written since the store was opened.
    pub const fn snapshots_written(&self) -> u64 {
        self.snapshots_written
    }

    /// Opens a session for `file_path` starting now.
    pub fn start_session(
        &mut self,
        file_path: &str,
        project_path: Option<&str>,
    ) -> Result<SessionId, DbError> {
        let now = self.clock.now_ms();
        self.start_session_at(file_path, project_path, now)
    }

    /// Inserts an open session row. Aggregates are untouched until close.
    pub fn start_session_at(
        &mut self,
        file_path: &str,
        project_path: Option<&str>,
        start_time: i64,
    ) -> Result<SessionId, DbError> {
        if self.closed {
            return Err(DbError::Closed);
        }
        self.conn.execute(
            "INSERT INTO sessions (file_path, project_path, start_time) VALUES (?, ?, ?)",
            params![file_path, project_path, start_time],
        )?;
        Ok(SessionId::new(self.conn.last_insert_rowid()))
    }

    /// Closes session `id` now.
    pub fn end_session(&mut self, id: SessionId) -> Result<bool, DbError> {
        let now = self.clock.now_ms();
        self.end_session_at(id, now)
    }

    /// Closes session `id` at `end_time` and folds its duration into the file totals.
    ///
    /// Returns `false` without changing anything if the session is unknown or
    /// already closed.
    pub fn end_session_at(&mut self, id: SessionId, end_time: i64) -> Result<bool, DbError> {
        if self.closed {
            return Err(DbError::Closed);
        }
        self.finish_session(id, end_time)
    }

    fn finish_session(&mut self, id: SessionId, end_time: i64) -> Result<bool, DbError> {
        let tx = self.conn.transaction()?;
        let row = tx
            .query_row(
                "SELECT file_path, project_path, start_time, end_time FROM sessions WHERE id = ?",
                [id.get()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((file_path, project_path, start_time, existing_end)) = row else {
            tracing::debug!(session_id = %id, "end for unknown session ignored");
            return Ok(false);
        };
        if existing_end.is_some() {
            tracing::debug!(session_id = %id, "end for closed session ignored");
            return Ok(false);
        }

        // A clock stepping backwards must not shrink totals.
        let duration_ms = end_time.saturating_sub(start_time).max(0);
        tx.execute(
            "UPDATE sessions SET end_time = ?, duration_ms = ? WHERE id = ?",
            params![end_time, duration_ms, id.get()],
        )?;
        tx.execute(
            "
            INSERT INTO file_stats (file_path, project_path, total_time_ms, last_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(file_path) DO UPDATE SET
                project_path = excluded.project_path,
                total_time_ms = file_stats.total_time_ms + excluded.total_time_ms,
                last_active = excluded.last_active
            ",
            params![file_path, project_path, duration_ms, end_time],
        )?;
        tx.commit()?;
        Ok(true)
    }

    /// Returns the totals for one file, or `None` if it was never tracked.
    pub fn get_file_stats(&self, file_path: &str) -> Result<Option<FileAggregate>, DbError> {
        let stats = self
            .conn
            .query_row(
                "
                SELECT file_path, project_path, total_time_ms, last_active
                FROM file_stats
                WHERE file_path = ?
                ",
                [file_path],
                file_aggregate_from_row,
            )
            .optional()?;
        Ok(stats)
    }

    /// Lists all file totals, largest first.
    pub fn get_all_file_stats(&self) -> Result<Vec<FileAggregate>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT file_path, project_path, total_time_ms, last_active
            FROM file_stats
            ORDER BY total_time_ms DESC, file_path ASC
            ",
        )?;
        let rows = stmt.query_map([], file_aggregate_from_row)?;
        let mut stats = Vec::new();
        for row in rows {
            stats.push(row?);
        }
        Ok(stats)
    }

    /// Groups file totals by project, largest first. Files without a project are skipped.
    pub fn get_project_stats(&self) -> Result<Vec<ProjectAggregate>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT project_path, SUM(total_time_ms) AS total, COUNT(*), MAX(last_active)
            FROM file_stats
            WHERE project_path IS NOT NULL
            GROUP BY project_path
            ORDER BY total DESC, project_path ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProjectAggregate {
                project_path: row.get(0)?,
                total_time_ms: row.get(1)?,
                file_count: row.get(2)?,
                last_active: row.get(3)?,
            })
        })?;
        let mut projects = Vec::new();
        for row in rows {
            projects.push(row?);
        }
        Ok(projects)
    }

    /// Totals for closed sessions that started since local midnight.
    pub fn get_today_stats(&self) -> Result<TodayStats, DbError> {
        let midnight = local_midnight_ms(self.clock.now_ms());
        self.stats_since(midnight)
    }

    /// Totals for closed sessions whose start time is at or after `since`.
    pub fn stats_since(&self, since: i64) -> Result<TodayStats, DbError> {
        let stats = self.conn.query_row(
            "
            SELECT COALESCE(SUM(duration_ms), 0), COUNT(DISTINCT file_path)
            FROM sessions
            WHERE start_time >= ? AND duration_ms IS NOT NULL
            ",
            [since],
            |row| {
                Ok(TodayStats {
                    total_time_ms: row.get(0)?,
                    file_count: row.get(1)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Lists sessions that have not been closed, oldest first.
    pub fn get_ongoing_sessions(&self) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, file_path, project_path, start_time, end_time, duration_ms
            FROM sessions
            WHERE end_time IS NULL
            ORDER BY start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], session_from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Lists sessions starting within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn list_sessions_in_range(&self, start: i64, end: i64) -> Result<Vec<Session>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, file_path, project_path, start_time, end_time, duration_ms
            FROM sessions
            WHERE start_time >= ? AND start_time < ?
            ORDER BY start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([start, end], session_from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    /// Closes every session left open, e.g. by an unclean shutdown, at the current time.
    ///
    /// Returns the sessions that were closed, as they were before closing.
    pub fn recover_ongoing_sessions(&mut self) -> Result<Vec<Session>, DbError> {
        if self.closed {
            return Err(DbError::Closed);
        }
        self.close_ongoing()
    }

    fn close_ongoing(&mut self) -> Result<Vec<Session>, DbError> {
        let ongoing = self.get_ongoing_sessions()?;
        let now = self.clock.now_ms();
        for session in &ongoing {
            self.finish_session(session.id, now)?;
            tracing::info!(
                session_id = %session.id,
                file = %session.file_path,
                duration_ms = now.saturating_sub(session.start_time).max(0),
                "closed dangling session"
            );
        }
        Ok(ongoing)
    }

    /// Writes the full current state to the snapshot path, replacing the previous copy.
    pub fn snapshot(&mut self) -> Result<(), DbError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DbError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = tmp_path(path);
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(DbError::Io { path: tmp, source }),
        }
        self.conn.backup(DatabaseName::Main, &tmp, None)?;
        fs::rename(&tmp, path).map_err(|source| DbError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        self.snapshots_written += 1;
        tracing::debug!(path = %path.display(), "snapshot written");
        Ok(())
    }

    /// Closes any open sessions and writes a final snapshot.
    ///
    /// Safe to call repeatedly: later calls find nothing open and rewrite the
    /// same state. Mutations other than `close` are rejected afterwards.
    pub fn close(&mut self) -> Result<Vec<Session>, DbError> {
        let recovered = self.close_ongoing()?;
        self.snapshot()?;
        self.closed = true;
        Ok(recovered)
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn file_aggregate_from_row(row: &Row<'_>) -> rusqlite::Result<FileAggregate> {
    Ok(FileAggregate {
        file_path: row.get(0)?,
        project_path: row.get(1)?,
        total_time_ms: row.get(2)?,
        last_active: row.get(3)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: SessionId::new(row.get(0)?),
        file_path: row.get(1)?,
        project_path: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        duration_ms: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use ft_core::ManualClock;

    fn memory_store() -> (Store, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let store = Store::open_in_memory(Arc::new(clock.clone())).expect("open in-memory store");
        (store, clock)
    }

    fn closed_session(
        store: &mut Store,
        clock: &ManualClock,
        file: &str,
        project: Option<&str>,
        duration_ms: i64,
    ) -> SessionId {
        let id = store.start_session(file, project).expect("start session");
        clock.advance(duration_ms);
        assert!(store.end_session(id).expect("end session"));
        id
    }

    #[test]
    fn open_in_memory_store() {
        let clock = ManualClock::new(0);
        assert!(Store::open_in_memory(Arc::new(clock)).is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let (store, _clock) = memory_store();

        assert_eq!(
            table_columns(&store.conn, "sessions"),
            vec![
                "id",
                "file_path",
                "project_path",
                "start_time",
                "end_time",
                "duration_ms",
            ]
        );
        assert_eq!(
            table_columns(&store.conn, "file_stats"),
            vec!["file_path", "project_path", "total_time_ms", "last_active"]
        );

        let session_indexes = index_names(&store.conn, "sessions");
        assert!(session_indexes.contains("idx_sessions_file"));
        assert!(session_indexes.contains("idx_sessions_start"));
        assert!(index_names(&store.conn, "file_stats").contains("idx_file_stats_project"));
    }

    #[test]
    fn init_is_idempotent() {
        let (store, _clock) = memory_store();
        store.init().expect("second init");
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    #[test]
    fn start_session_does_not_touch_aggregates() {
        let (mut store, _clock) = memory_store();
        let id = store.start_session("/ws/a/main.rs", Some("/ws/a")).unwrap();

        assert_eq!(store.get_file_stats("/ws/a/main.rs").unwrap(), None);
        let ongoing = store.get_ongoing_sessions().unwrap();
        assert_eq!(ongoing.len(), 1);
        assert_eq!(ongoing[0].id, id);
        assert_eq!(ongoing[0].start_time, 1_000_000);
        assert!(ongoing[0].is_open());
    }

    #[test]
    fn session_ids_are_unique() {
        let (mut store, _clock) = memory_store();
        let a = store.start_session("/a.rs", None).unwrap();
        let b = store.start_session("/b.rs", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn end_session_sets_duration_and_aggregate() {
        let (mut store, clock) = memory_store();
        let id = closed_session(&mut store, &clock, "/ws/a/main.rs", Some("/ws/a"), 4_500);

        let sessions = store.list_sessions_in_range(0, i64::MAX).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, id);
        assert_eq!(sessions[0].end_time, Some(1_004_500));
        assert_eq!(sessions[0].duration_ms, Some(4_500));

        let stats = store.get_file_stats("/ws/a/main.rs").unwrap().unwrap();
        assert_eq!(
            stats,
            FileAggregate {
                file_path: "/ws/a/main.rs".to_string(),
                project_path: Some("/ws/a".to_string()),
                total_time_ms: 4_500,
                last_active: 1_004_500,
            }
        );
    }

    #[test]
    fn totals_equal_sum_of_closed_durations() {
        let (mut store, clock) = memory_store();
        let mut before = 0;
        for duration in [100, 2_500, 0, 61_000] {
            closed_session(&mut store, &clock, "/x.rs", None, duration);
            let after = store.get_file_stats("/x.rs").unwrap().unwrap().total_time_ms;
            assert_eq!(after, before + duration);
            before = after;
        }

        let summed: i64 = store
            .list_sessions_in_range(0, i64::MAX)
            .unwrap()
            .iter()
            .filter_map(|s| s.duration_ms)
            .sum();
        assert_eq!(summed, before);
    }

    #[test]
    fn end_session_twice_is_noop() {
        let (mut store, clock) = memory_store();
        let id = closed_session(&mut store, &clock, "/x.rs", None, 1_000);
        clock.advance(50_000);

        assert!(!store.end_session(id).unwrap());
        let stats = store.get_file_stats("/x.rs").unwrap().unwrap();
        assert_eq!(stats.total_time_ms, 1_000);
        assert_eq!(stats.last_active, 1_001_000);
        let sessions = store.list_sessions_in_range(0, i64::MAX).unwrap();
        assert_eq!(sessions[0].duration_ms, Some(1_000));
    }

    #[test]
    fn end_unknown_session_is_noop() {
        let (mut store, _clock) = memory_store();
        assert!(!store.end_session(SessionId::new(999)).unwrap());
        assert!(store.get_all_file_stats().unwrap().is_empty());
    }

    #[test]
    fn backwards_clock_never_shrinks_totals() {
        let (mut store, clock) = memory_store();
        let id = store.start_session("/x.rs", None).unwrap();
        clock.advance(-5_000);
        store.end_session(id).unwrap();
        let stats = store.get_file_stats("/x.rs").unwrap().unwrap();
        assert_eq!(stats.total_time_ms, 0);
    }

    #[test]
    fn project_path_is_last_write_wins() {
        let (mut store, clock) = memory_store();
        closed_session(&mut store, &clock, "/ws/a/x.rs", Some("/ws"), 10);
        closed_session(&mut store, &clock, "/ws/a/x.rs", Some("/ws/a"), 10);
        let stats = store.get_file_stats("/ws/a/x.rs").unwrap().unwrap();
        assert_eq!(stats.project_path.as_deref(), Some("/ws/a"));
        assert_eq!(stats.total_time_ms, 20);
    }

    #[test]
    fn all_file_stats_sorted_by_total_descending() {
        let (mut store, clock) = memory_store();
        closed_session(&mut store, &clock, "/small.rs", None, 10);
        closed_session(&mut store, &clock, "/big.rs", None, 1_000);
        closed_session(&mut store, &clock, "/mid.rs", None, 100);

        let files: Vec<String> = store
            .get_all_file_stats()
            .unwrap()
            .into_iter()
            .map(|f| f.file_path)
            .collect();
        assert_eq!(files, vec!["/big.rs", "/mid.rs", "/small.rs"]);
    }

    #[test]
    fn project_stats_group_by_project() {
        let (mut store, clock) = memory_store();
        closed_session(&mut store, &clock, "/ws/a/one.rs", Some("/ws/a"), 100);
        closed_session(&mut store, &clock, "/ws/a/two.rs", Some("/ws/a"), 200);
        closed_session(&mut store, &clock, "/ws/b/three.rs", Some("/ws/b"), 50);
        closed_session(&mut store, &clock, "/tmp/loose.rs", None, 10_000);
        let last = clock.now_ms();

        let projects = store.get_project_stats().unwrap();
        assert_eq!(
            projects,
            vec![
                ProjectAggregate {
                    project_path: "/ws/a".to_string(),
                    total_time_ms: 300,
                    file_count: 2,
                    last_active: last - 10_000 - 50,
                },
                ProjectAggregate {
                    project_path: "/ws/b".to_string(),
                    total_time_ms: 50,
                    file_count: 1,
                    last_active: last - 10_000,
                },
            ]
        );
    }

    #[test]
    fn stats_since_counts_closed_sessions_after_cutoff() {
        let (mut store, clock) = memory_store();
        closed_session(&mut store, &clock, "/old.rs", None, 500);
        let cutoff = clock.now_ms();
        closed_session(&mut store, &clock, "/a.rs", None, 100);
        closed_session(&mut store, &clock, "/a.rs", None, 200);
        closed_session(&mut store, &clock, "/b.rs", None, 300);
        store.start_session("/open.rs", None).unwrap();

        let stats = store.stats_since(cutoff).unwrap();
        assert_eq!(
            stats,
            TodayStats {
                total_time_ms: 600,
                file_count: 2,
            }
        );
    }

    #[test]
    fn today_stats_uses_local_midnight() {
        let clock = ManualClock::new(ft_core::SystemClock.now_ms());
        let mut store = Store::open_in_memory(Arc::new(clock.clone())).unwrap();
        let midnight = local_midnight_ms(clock.now_ms());

        let yesterday = store.start_session_at("/y.rs", None, midnight - 1_000).unwrap();
        store.end_session_at(yesterday, midnight - 500).unwrap();
        let today = store.start_session_at("/t.rs", None, midnight).unwrap();
        store.end_session_at(today, midnight + 700).unwrap();

        let stats = store.get_today_stats().unwrap();
        assert_eq!(stats.total_time_ms, 700);
        assert_eq!(stats.file_count, 1);
    }

    #[test]
    fn list_sessions_in_range_is_half_open() {
        let (mut store, _clock) = memory_store();
        store.start_session_at("/a.rs", None, 100).unwrap();
        store.start_session_at("/b.rs", None, 200).unwrap();
        store.start_session_at("/c.rs", None, 300).unwrap();

        let files: Vec<String> = store
            .list_sessions_in_range(100, 300)
            .unwrap()
            .into_iter()
            .map(|s| s.file_path)
            .collect();
        assert_eq!(files, vec!["/a.rs", "/b.rs"]);
        assert!(store.list_sessions_in_range(300, 100).unwrap().is_empty());
    }

    #[test]
    fn recover_closes_all_ongoing_sessions() {
        let (mut store, clock) = memory_store();
        store.start_session("/a.rs", None).unwrap();
        clock.advance(1_000);
        store.start_session("/b.rs", None).unwrap();
        clock.advance(2_000);

        let recovered = store.recover_ongoing_sessions().unwrap();
        assert_eq!(recovered.len(), 2);
        assert!(store.get_ongoing_sessions().unwrap().is_empty());
        assert_eq!(
            store.get_file_stats("/a.rs").unwrap().unwrap().total_time_ms,
            3_000
        );
        assert_eq!(
            store.get_file_stats("/b.rs").unwrap().unwrap().total_time_ms,
            2_000
        );
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("ft.db");
        let clock = ManualClock::new(0);

        {
            let mut store = Store::open(&path, Arc::new(clock.clone())).unwrap();
            closed_session(&mut store, &clock, "/ws/a/x.rs", Some("/ws/a"), 1_234);
            store.snapshot().unwrap();
            assert_eq!(store.snapshots_written(), 1);
        }
        assert!(path.exists());
        assert!(!tmp_path(&path).exists());

        let store = Store::open(&path, Arc::new(clock)).unwrap();
        let stats = store.get_file_stats("/ws/a/x.rs").unwrap().unwrap();
        assert_eq!(stats.total_time_ms, 1_234);
    }

    #[test]
    fn dangling_session_is_left_for_caller_on_load() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ft.db");
        let clock = ManualClock::new(0);

        {
            let mut store = Store::open(&path, Arc::new(clock.clone())).unwrap();
            store.start_session("/crashed.rs", None).unwrap();
            store.snapshot().unwrap();
            // dropped without close: simulates an unclean exit
        }

        clock.advance(60_000);
        let mut store = Store::open(&path, Arc::new(clock.clone())).unwrap();
        let ongoing = store.get_ongoing_sessions().unwrap();
        assert_eq!(ongoing.len(), 1);
        assert_eq!(ongoing[0].file_path, "/crashed.rs");

        store.close().unwrap();
        let stats = store.get_file_stats("/crashed.rs").unwrap().unwrap();
        assert_eq!(stats.total_time_ms, 60_000);
    }

    #[test]
    fn close_twice_yields_identical_state() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ft.db");
        let clock = ManualClock::new(0);

        let mut store = Store::open(&path, Arc::new(clock.clone())).unwrap();
        store.start_session("/a.rs", Some("/")).unwrap();
        clock.advance(5_000);

        let first = store.close().unwrap();
        assert_eq!(first.len(), 1);
        let after_first = store.get_all_file_stats().unwrap();

        clock.advance(5_000);
        let second = store.close().unwrap();
        assert!(second.is_empty());
        assert_eq!(store.get_all_file_stats().unwrap(), after_first);

        let reopened = Store::open(&path, Arc::new(clock)).unwrap();
        assert_eq!(reopened.get_all_file_stats().unwrap(), after_first);
        assert_eq!(after_first[0].total_time_ms, 5_000);
    }

    #[test]
    fn mutations_after_close_are_rejected() {
        let (mut store, _clock) = memory_store();
        store.close().unwrap();
        assert!(store.is_closed());
        assert!(matches!(
            store.start_session("/a.rs", None),
            Err(DbError::Closed)
        ));
        assert!(matches!(
            store.end_session(SessionId::new(1)),
            Err(DbError::Closed)
        ));
    }

    #[test]
    fn corrupt_snapshot_fails_to_open() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ft.db");
        fs::write(&path, b"definitely not sqlite").unwrap();

        let result = Store::open(&path, Arc::new(ManualClock::new(0)));
        assert!(result.is_err());
    }
}
