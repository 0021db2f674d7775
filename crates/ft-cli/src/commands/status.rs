//! Status command for today's totals and sessions still open.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use ft_db::Store;

use super::util::{format_duration, format_timestamp};

pub fn run<W: Write>(writer: &mut W, store: &Store, database_path: &Path) -> Result<()> {
    let today = store.get_today_stats()?;
    let ongoing = store.get_ongoing_sessions()?;

    writeln!(writer, "File time tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(
        writer,
        "Today: {} across {} {}",
        format_duration(today.total_time_ms),
        today.file_count,
        if today.file_count == 1 { "file" } else { "files" }
    )?;

    if ongoing.is_empty() {
        writeln!(writer, "No open sessions.")?;
        return Ok(());
    }

    writeln!(writer, "Open sessions:")?;
    for session in ongoing {
        write!(writer, "- {}", session.file_path)?;
        if let Some(project) = &session.project_path {
            write!(writer, " ({project})")?;
        }
        writeln!(writer, " since {}", format_timestamp(session.start_time))?;
    }
    if store.path().is_some() {
        writeln!(writer, "Run `ft recover` if no tracker is running.")?;
    }

    Ok(())
}
