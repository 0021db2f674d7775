//! The interface the tracker uses to record session transitions.

use std::sync::Arc;

use crate::types::SessionId;

/// Durable recorder of session open/close transitions.
///
/// Implementations own all aggregate bookkeeping: closing a session is the
/// single point at which per-file totals change.
pub trait SessionStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Records a new open session starting at `start_time` and returns its id.
    fn start_session_at(
        &self,
        file_path: &str,
        project_path: Option<&str>,
        start_time: i64,
    ) -> Result<SessionId, Self::Error>;

    /// Closes the session at `end_time`.
    ///
    /// Unknown or already-closed ids must be accepted silently.
    fn end_session_at(&self, id: SessionId, end_time: i64) -> Result<(), Self::Error>;
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    type Error = T::Error;

    fn start_session_at(
        &self,
        file_path: &str,
        project_path: Option<&str>,
        start_time: i64,
    ) -> Result<SessionId, Self::Error> {
        (**self).start_session_at(file_path, project_path, start_time)
    }

    fn end_session_at(&self, id: SessionId, end_time: i64) -> Result<(), Self::Error> {
        (**self).end_session_at(id, end_time)
    }
}
