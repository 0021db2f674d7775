//! Core domain logic for per-file editing time tracking.
//!
//! This crate contains:
//! - Domain types: sessions and the per-file/per-project aggregates
//! - The session tracker state machine and its observer interface
//! - The [`SessionStore`] seam the tracker records transitions through
//! - Project resolution against open workspace roots

pub mod activity;
pub mod clock;
pub mod project;
mod store;
pub mod tracker;
pub mod types;

pub use activity::ActivityEvent;
pub use clock::{Clock, ManualClock, SystemClock, local_midnight_ms};
pub use project::{StaticRoots, WorkspaceRoots, resolve_project};
pub use store::SessionStore;
pub use tracker::{SessionChange, SessionObserver, SessionTracker, TrackerConfig};
pub use types::{
    FileAggregate, FilePath, ProjectAggregate, Session, SessionId, TodayStats, ValidationError,
};
