use crate::macos::accessibility::{AccessibilityProvider, Point, Rect, Size};
use crate::macos::core_graphics::{DisplayProvider, Screen};
use crate::models::placement::PlacementAction;
use crate::services::window_registry::TrackedWindow;
use crate::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

/// Performs a placement action on a window
pub trait PlacementExecutor: Send + Sync {
    fn perform(
        &self,
        window: &TrackedWindow,
        action: PlacementAction,
        screen: &Screen,
    ) -> Result<()>;
}

/// Telemetry for placement operations
#[derive(Debug, Default, Clone)]
pub struct PlacementMetrics {
    pub placements: u64,
    pub restores: u64,
    pub skipped_restores: u64,
}

/// Executor that computes target frames from the screen's visible area and
/// applies them through the accessibility provider.
///
/// The frame a window had before its first placement is remembered so a later
/// `Restore` can put it back.
pub struct AccessibilityPlacementExecutor {
    accessibility: Arc<dyn AccessibilityProvider>,
    displays: Arc<dyn DisplayProvider>,
    saved_frames: Mutex<HashMap<u32, Rect>>,
    metrics: RwLock<PlacementMetrics>,
}

impl AccessibilityPlacementExecutor {
    pub fn new(
        accessibility: Arc<dyn AccessibilityProvider>,
        displays: Arc<dyn DisplayProvider>,
    ) -> Self {
        Self {
            accessibility,
            displays,
            saved_frames: Mutex::new(HashMap::new()),
            metrics: RwLock::new(PlacementMetrics::default()),
        }
    }

    pub fn saved_frame(&self, window_id: u32) -> Option<Rect> {
        self.saved_frames
            .lock()
            .expect("poisoned lock")
            .get(&window_id)
            .copied()
    }

    pub fn metrics(&self) -> PlacementMetrics {
        self.metrics.read().expect("poisoned lock").clone()
    }

    fn place(&self, window: &TrackedWindow, frame: Rect) -> Result<()> {
        let current = self.accessibility.snapshot(window.id)?.frame();
        self.saved_frames
            .lock()
            .expect("poisoned lock")
            .entry(window.id)
            .or_insert(current);

        self.accessibility.set_window_frame(window.id, frame)?;
        self.metrics.write().expect("poisoned lock").placements += 1;
        Ok(())
    }

    fn restore(&self, window: &TrackedWindow) -> Result<()> {
        let saved = self
            .saved_frames
            .lock()
            .expect("poisoned lock")
            .remove(&window.id);

        match saved {
            Some(frame) => {
                self.accessibility.set_window_frame(window.id, frame)?;
                self.metrics.write().expect("poisoned lock").restores += 1;
            }
            None => {
                debug!(window_id = window.id, "No saved frame to restore");
                self.metrics.write().expect("poisoned lock").skipped_restores += 1;
            }
        }
        Ok(())
    }
}

impl PlacementExecutor for AccessibilityPlacementExecutor {
    fn perform(
        &self,
        window: &TrackedWindow,
        action: PlacementAction,
        screen: &Screen,
    ) -> Result<()> {
        let area = self.displays.visible_frame_top_left(screen)?;
        info!(
            window_id = window.id,
            %action,
            screen_id = screen.id,
            "Applying window placement"
        );

        match action {
            PlacementAction::None => Ok(()),
            PlacementAction::Restore => self.restore(window),
            other => match target_frame(other, area) {
                Some(frame) => self.place(window, frame),
                None => Ok(()),
            },
        }
    }
}

/// A dispatched placement as seen by [`RecordingPlacementExecutor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementRecord {
    pub window_id: u32,
    pub action: PlacementAction,
    pub screen_id: u32,
}

/// Records every dispatch and optionally forwards it to another executor
#[derive(Default)]
pub struct RecordingPlacementExecutor {
    inner: Option<Arc<dyn PlacementExecutor>>,
    records: Mutex<Vec<PlacementRecord>>,
}

impl RecordingPlacementExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrapping(inner: Arc<dyn PlacementExecutor>) -> Self {
        Self {
            inner: Some(inner),
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<PlacementRecord> {
        self.records.lock().expect("poisoned lock").clone()
    }
}

impl PlacementExecutor for RecordingPlacementExecutor {
    fn perform(
        &self,
        window: &TrackedWindow,
        action: PlacementAction,
        screen: &Screen,
    ) -> Result<()> {
        self.records
            .lock()
            .expect("poisoned lock")
            .push(PlacementRecord {
                window_id: window.id,
                action,
                screen_id: screen.id,
            });

        match &self.inner {
            Some(inner) => inner.perform(window, action, screen),
            None => Ok(()),
        }
    }
}

/// Target frame for a sizing action within `area` (top-left origin)
pub fn target_frame(action: PlacementAction, area: Rect) -> Option<Rect> {
    let Point { x, y } = area.origin;
    let Size { width, height } = area.size;
    let half_width = width / 2.0;
    let half_height = height / 2.0;

    let frame = match action {
        PlacementAction::Maximize => area,
        PlacementAction::HalfLeft => Rect::from_xywh(x, y, half_width, height),
        PlacementAction::HalfRight => Rect::from_xywh(x + half_width, y, half_width, height),
        PlacementAction::HalfTop => Rect::from_xywh(x, y, width, half_height),
        PlacementAction::HalfBottom => Rect::from_xywh(x, y + half_height, width, half_height),
        PlacementAction::None | PlacementAction::Restore => return None,
    };
    Some(frame)
}
