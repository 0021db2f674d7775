//! Recover command: closes sessions left open by an unclean shutdown.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use ft_core::SystemClock;
use ft_db::Store;

use super::util::format_duration;
use crate::Config;
use crate::lock::WriterLock;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let _lock = WriterLock::acquire(&config.database_path)?;
    let mut store = Store::open(&config.database_path, Arc::new(SystemClock))
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    recover(writer, &mut store)
}

/// Closes every open session at the store's current time and writes a snapshot.
pub fn recover<W: Write>(writer: &mut W, store: &mut Store) -> Result<()> {
    let recovered = store.close().context("failed to recover sessions")?;

    if recovered.is_empty() {
        writeln!(writer, "No open sessions.")?;
        return Ok(());
    }

    let now = store.now_ms();
    writeln!(writer, "Closed {} open session(s):", recovered.len())?;
    for session in &recovered {
        writeln!(
            writer,
            "- {} ({})",
            session.file_path,
            format_duration(now - session.start_time)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ft_core::ManualClock;
    use insta::assert_snapshot;

    const NOW: i64 = 1_760_000_000_000;

    #[test]
    fn recover_closes_dangling_sessions_and_persists() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ft.db");
        let clock = ManualClock::new(NOW);

        {
            let mut store = Store::open(&path, Arc::new(clock.clone())).unwrap();
            store.start_session_at("/ws/a/main.rs", Some("/ws/a"), NOW).unwrap();
            store
                .start_session_at("/ws/a/lib.rs", Some("/ws/a"), NOW + 60_000)
                .unwrap();
            store.snapshot().unwrap();
        }

        clock.set(NOW + 150_000);
        let mut store = Store::open(&path, Arc::new(clock.clone())).unwrap();
        let mut output = Vec::new();
        recover(&mut output, &mut store).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Closed 2 open session(s):
        - /ws/a/main.rs (2m 30s)
        - /ws/a/lib.rs (1m 30s)
        ");

        let reopened = Store::open(&path, Arc::new(clock)).unwrap();
        assert!(reopened.get_ongoing_sessions().unwrap().is_empty());
        let project = &reopened.get_project_stats().unwrap()[0];
        assert_eq!(project.total_time_ms, 240_000);
        assert_eq!(project.file_count, 2);
    }

    #[test]
    fn recover_with_nothing_open() {
        let mut store = Store::open_in_memory(Arc::new(ManualClock::new(NOW))).unwrap();
        let mut output = Vec::new();
        recover(&mut output, &mut store).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @"No open sessions.");
    }
}
