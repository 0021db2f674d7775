//! Report commands for per-file, per-project and per-session totals.
//!
//! Implements `ft files`, `ft projects`, `ft file` and `ft sessions`, each with
//! human-readable and JSON output.

use std::fmt::Write as _;
use std::io;

use anyhow::Result;
use ft_core::{FileAggregate, ProjectAggregate, Session};
use ft_db::Store;

use super::util::{format_duration, format_timestamp};

/// Renders a ten-cell bar of `value` relative to `max`.
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 || value <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 {
        1 // Minimum 1 for visibility: anything under 5% still gets a single block
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Text Formatting ==========

pub fn format_files(stats: &[FileAggregate], limit: Option<usize>) -> Result<String> {
    let mut output = String::new();
    writeln!(output, "FILES")?;
    writeln!(output, "─────")?;

    if stats.is_empty() {
        writeln!(output, "No files tracked yet.")?;
        return Ok(output);
    }

    let max = stats.first().map_or(0, |s| s.total_time_ms);
    let shown = limit.unwrap_or(stats.len()).min(stats.len());
    for file in &stats[..shown] {
        write!(
            output,
            "{} {:>8}  {}",
            progress_bar(file.total_time_ms, max),
            format_duration(file.total_time_ms),
            file.file_path
        )?;
        if let Some(project) = &file.project_path {
            write!(output, " ({project})")?;
        }
        writeln!(output)?;
    }
    if stats.len() > shown {
        writeln!(output, "... and {} more", stats.len() - shown)?;
    }

    Ok(output)
}

pub fn format_projects(projects: &[ProjectAggregate]) -> Result<String> {
    let mut output = String::new();
    writeln!(output, "PROJECTS")?;
    writeln!(output, "────────")?;

    if projects.is_empty() {
        writeln!(output, "No project time recorded yet.")?;
        return Ok(output);
    }

    let max = projects.first().map_or(0, |p| p.total_time_ms);
    for project in projects {
        writeln!(
            output,
            "{} {:>8}  {}  ({} {})",
            progress_bar(project.total_time_ms, max),
            format_duration(project.total_time_ms),
            project.project_path,
            project.file_count,
            if project.file_count == 1 { "file" } else { "files" }
        )?;
    }

    Ok(output)
}

pub fn format_file(file_path: &str, stats: Option<&FileAggregate>) -> Result<String> {
    let mut output = String::new();
    let Some(stats) = stats else {
        writeln!(output, "No time recorded for {file_path}.")?;
        return Ok(output);
    };

    writeln!(output, "{}", stats.file_path)?;
    writeln!(
        output,
        "  Project:     {}",
        stats.project_path.as_deref().unwrap_or("(none)")
    )?;
    writeln!(output, "  Total:       {}", format_duration(stats.total_time_ms))?;
    writeln!(output, "  Last active: {}", format_timestamp(stats.last_active))?;
    Ok(output)
}

pub fn format_sessions(sessions: &[Session], since: i64) -> Result<String> {
    let mut output = String::new();
    writeln!(output, "SESSIONS SINCE {}", format_timestamp(since))?;

    if sessions.is_empty() {
        writeln!(output, "No sessions.")?;
        return Ok(output);
    }

    let mut total = 0;
    for session in sessions {
        let duration = session
            .duration_ms
            .map_or_else(|| "open".to_string(), format_duration);
        writeln!(
            output,
            "{}  {duration:<8}  {}",
            format_timestamp(session.start_time),
            session.file_path
        )?;
        total += session.duration_ms.unwrap_or(0);
    }
    writeln!(output)?;
    writeln!(
        output,
        "{} {} totalling {}",
        sessions.len(),
        if sessions.len() == 1 { "session" } else { "sessions" },
        format_duration(total)
    )?;

    Ok(output)
}

// ========== Public Interface ==========

fn emit<W: io::Write>(writer: &mut W, text: &str) -> Result<()> {
    write!(writer, "{text}")?;
    Ok(())
}

fn emit_json<W: io::Write, T: serde::Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Runs `ft files`.
pub fn files<W: io::Write>(
    writer: &mut W,
    store: &Store,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let stats = store.get_all_file_stats()?;
    if json {
        let shown = limit.unwrap_or(stats.len()).min(stats.len());
        emit_json(writer, &stats[..shown])
    } else {
        emit(writer, &format_files(&stats, limit)?)
    }
}

/// Runs `ft projects`.
pub fn projects<W: io::Write>(writer: &mut W, store: &Store, json: bool) -> Result<()> {
    let projects = store.get_project_stats()?;
    if json {
        emit_json(writer, &projects)
    } else {
        emit(writer, &format_projects(&projects)?)
    }
}

/// Runs `ft file`.
pub fn file<W: io::Write>(writer: &mut W, store: &Store, file_path: &str, json: bool) -> Result<()> {
    let stats = store.get_file_stats(file_path)?;
    if json {
        emit_json(writer, &stats)
    } else {
        emit(writer, &format_file(file_path, stats.as_ref())?)
    }
}

/// Runs `ft sessions`, listing sessions that started at or after `since`.
pub fn sessions<W: io::Write>(writer: &mut W, store: &Store, since: i64, json: bool) -> Result<()> {
    let sessions = store.list_sessions_in_range(since, i64::MAX)?;
    if json {
        emit_json(writer, &sessions)
    } else {
        emit(writer, &format_sessions(&sessions, since)?)
    }
}
