//! Project identity from open workspace roots.

use std::sync::RwLock;

/// Supplies the currently open workspace roots, queried on every session open.
pub trait WorkspaceRoots: Send + Sync {
    fn roots(&self) -> Vec<String>;
}

/// A fixed, replaceable set of workspace roots.
#[derive(Debug, Default)]
pub struct StaticRoots {
    roots: RwLock<Vec<String>>,
}

impl StaticRoots {
    pub fn new<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: RwLock::new(roots.into_iter().map(Into::into).collect()),
        }
    }

    /// Replaces the root set, e.g. when the host opens or closes a folder.
    pub fn replace(&self, roots: Vec<String>) {
        let mut guard = self
            .roots
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = roots;
    }
}

impl WorkspaceRoots for StaticRoots {
    fn roots(&self) -> Vec<String> {
        self.roots
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

/// Picks the longest workspace root that contains `file_path`.
///
/// A root contains a path when the path equals the root or continues it
/// after a separator, so `/ws/a` does not claim `/ws/ab/x.rs`. Equal-length
/// matches keep the first root in `roots` order; roots are normally
/// disjoint, so this tie-break is an accepted edge case.
pub fn resolve_project<S: AsRef<str>>(file_path: &str, roots: &[S]) -> Option<String> {
    let mut best: Option<&str> = None;
    for root in roots {
        let root = root.as_ref();
        if root.is_empty() {
            continue;
        }
        let trimmed = root.trim_end_matches(['/', '\\']);
        if !contains(trimmed, root, file_path) {
            continue;
        }
        if best.is_none_or(|current| root.len() > current.len()) {
            best = Some(root);
        }
    }
    best.map(str::to_string)
}

fn contains(trimmed_root: &str, root: &str, file_path: &str) -> bool {
    // A filesystem root such as "/" trims to "" and contains every absolute path.
    if trimmed_root.is_empty() {
        return file_path.starts_with(root);
    }
    let Some(rest) = file_path.strip_prefix(trimmed_root) else {
        return false;
    };
    rest.is_empty() || rest.starts_with(['/', '\\'])
}
