//! Activity signals supplied by the host editor.

use serde::{Deserialize, Serialize};

/// A raw activity signal from the editor.
///
/// Serialized as a JSON object tagged by `type`, e.g.
/// `{"type":"text_change","file_path":"/ws/a/main.rs"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// A document was edited.
    TextChange { file_path: String },
    /// The active editor changed.
    ActiveFileChange { file_path: String },
    /// The cursor or selection moved.
    SelectionChange { file_path: String },
    /// The editor window gained or lost focus.
    WindowFocusChange {
        focused: bool,
        /// File in the active editor when focus was gained, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_path: Option<String>,
    },
}

impl ActivityEvent {
    /// Returns the file this event refers to, if any.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::TextChange { file_path }
            | Self::ActiveFileChange { file_path }
            | Self::SelectionChange { file_path } => Some(file_path),
            Self::WindowFocusChange { file_path, .. } => file_path.as_deref(),
        }
    }

    /// Short name used in log lines.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TextChange { .. } => "text_change",
            Self::ActiveFileChange { .. } => "active_file_change",
            Self::SelectionChange { .. } => "selection_change",
            Self::WindowFocusChange { .. } => "window_focus_change",
        }
    }
}
