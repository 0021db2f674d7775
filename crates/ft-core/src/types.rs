//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
}

/// Store-assigned identifier of a recorded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SessionId> for i64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// A validated file path as supplied by the editor.
///
/// The path is an opaque identifier: it is not canonicalized, only checked
/// to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FilePath(String);

impl FilePath {
    pub fn new(path: impl Into<String>) -> Result<Self, ValidationError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ValidationError::Empty { field: "file path" });
        }
        Ok(Self(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FilePath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FilePath> for String {
    fn from(path: FilePath) -> Self {
        path.0
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FilePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A recorded (or in-progress) interval of attention on one file.
///
/// `end_time` and `duration_ms` are `None` while the session is open.
/// All timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub file_path: String,
    pub project_path: Option<String>,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub duration_ms: Option<i64>,
}

impl Session {
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Running totals for one file, derived from its closed sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAggregate {
    pub file_path: String,
    /// Project of the most recently closed session for this file.
    pub project_path: Option<String>,
    pub total_time_ms: i64,
    /// End time of the most recently closed session for this file.
    pub last_active: i64,
}

/// File aggregates grouped by project. Computed on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAggregate {
    pub project_path: String,
    pub total_time_ms: i64,
    pub file_count: i64,
    pub last_active: i64,
}

/// Totals for sessions started since local midnight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayStats {
    pub total_time_ms: i64,
    pub file_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_path_rejects_empty() {
        assert!(FilePath::new("").is_err());
        assert!(FilePath::new("/ws/a/main.rs").is_ok());
    }

    #[test]
    fn file_path_serde_rejects_empty() {
        let result: Result<FilePath, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn file_path_is_not_normalized() {
        let path = FilePath::new("/ws/a/../b/lib.rs").unwrap();
        assert_eq!(path.as_str(), "/ws/a/../b/lib.rs");
    }

    #[test]
    fn session_id_serializes_as_integer() {
        let json = serde_json::to_string(&SessionId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn open_session_has_no_end() {
        let session = Session {
            id: SessionId::new(1),
            file_path: "/ws/a/main.rs".to_string(),
            project_path: None,
            start_time: 0,
            end_time: None,
            duration_ms: None,
        };
        assert!(session.is_open());
    }
}
