use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Cached metadata for a window the application tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedWindow {
    pub id: u32,
    pub title: String,
    pub application_name: String,
    #[serde(default)]
    pub bundle_id: String,
}

impl TrackedWindow {
    pub fn new(
        id: u32,
        title: impl Into<String>,
        application_name: impl Into<String>,
        bundle_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            application_name: application_name.into(),
            bundle_id: bundle_id.into(),
        }
    }
}

/// Maps OS window numbers to tracked windows
pub trait WindowRegistry: Send + Sync {
    fn lookup(&self, window_id: u32) -> Option<TrackedWindow>;
}

/// In-memory registry for tests and trace replay
#[derive(Debug, Default)]
pub struct InMemoryWindowRegistry {
    windows: RwLock<HashMap<u32, TrackedWindow>>,
}

impl InMemoryWindowRegistry {
    pub fn new_with(windows: Vec<TrackedWindow>) -> Self {
        let registry = Self::default();
        for window in windows {
            registry.track(window);
        }
        registry
    }

    pub fn track(&self, window: TrackedWindow) {
        debug!(window_id = window.id, title = %window.title, "Tracking window");
        self.windows
            .write()
            .expect("poisoned lock")
            .insert(window.id, window);
    }

    pub fn untrack(&self, window_id: u32) -> Option<TrackedWindow> {
        self.windows
            .write()
            .expect("poisoned lock")
            .remove(&window_id)
    }

    pub fn len(&self) -> usize {
        self.windows.read().expect("poisoned lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WindowRegistry for InMemoryWindowRegistry {
    fn lookup(&self, window_id: u32) -> Option<TrackedWindow> {
        self.windows
            .read()
            .expect("poisoned lock")
            .get(&window_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_tracked_windows_only() {
        let registry = InMemoryWindowRegistry::new_with(vec![TrackedWindow::new(
            7,
            "Editor",
            "Code",
            "com.example.code",
        )]);

        assert_eq!(registry.lookup(7).unwrap().title, "Editor");
        assert!(registry.lookup(8).is_none());
    }

    #[test]
    fn untrack_removes_window() {
        let registry = InMemoryWindowRegistry::default();
        registry.track(TrackedWindow::new(1, "A", "App", ""));
        assert_eq!(registry.len(), 1);

        assert!(registry.untrack(1).is_some());
        assert!(registry.is_empty());
        assert!(registry.lookup(1).is_none());
    }
}
