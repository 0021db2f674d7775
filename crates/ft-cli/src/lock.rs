//! Exclusive lock guarding the snapshot against concurrent writers.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

/// Held for as long as a process may write the snapshot. Released on drop.
#[derive(Debug)]
pub struct WriterLock {
    file: File,
    path: PathBuf,
}

impl WriterLock {
    /// Acquires the lock next to `database_path`, failing fast if another process holds it.
    pub fn acquire(database_path: &Path) -> Result<Self> {
        let path = lock_path(database_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("failed to create database directory")?;
        }
        let file = File::create(&path)
            .with_context(|| format!("failed to create lock file {}", path.display()))?;
        file.try_lock_exclusive().with_context(|| {
            format!(
                "another ft process is writing {} (lock: {})",
                database_path.display(),
                path.display()
            )
        })?;
        tracing::debug!(lock = %path.display(), "acquired writer lock");
        Ok(Self { file, path })
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.path.display(), error = %err, "failed to release writer lock");
        }
    }
}

fn lock_path(database_path: &Path) -> PathBuf {
    let mut name = database_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_writer_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let db = temp.path().join("ft.db");

        let first = WriterLock::acquire(&db).unwrap();
        let err = WriterLock::acquire(&db).unwrap_err();
        assert!(err.to_string().contains("another ft process"));

        drop(first);
        assert!(WriterLock::acquire(&db).is_ok());
    }
}
