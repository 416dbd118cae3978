//! Offline replay of recorded scroll gestures.
//!
//! A trace describes the screens and windows present when the events were
//! captured. Replaying seeds the in-memory collaborators, posts every event
//! through a [`LocalEventMonitor`] to a live [`GestureClassifier`], and reports
//! what would have been dispatched and where each window ended up.

use crate::config::preferences::Preferences;
use crate::macos::accessibility::{InMemoryAccessibilityProvider, Rect};
use crate::macos::core_graphics::{InMemoryDisplayProvider, Screen};
use crate::macos::event_monitor::LocalEventMonitor;
use crate::models::scroll_event::InputEvent;
use crate::services::gesture_classifier::{
    GestureClassifier, GestureClassifierMetrics, GestureServices,
};
use crate::services::placement_executor::{
    AccessibilityPlacementExecutor, PlacementRecord, RecordingPlacementExecutor,
};
use crate::services::window_registry::{InMemoryWindowRegistry, TrackedWindow};
use crate::{Result, TitleSwipeError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Window present in a trace, with its frame in top-left-origin coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceWindow {
    #[serde(flatten)]
    pub window: TrackedWindow,
    pub frame: Rect,
}

/// Recorded session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureTrace {
    pub screens: Vec<Screen>,
    #[serde(default)]
    pub windows: Vec<TraceWindow>,
    #[serde(default)]
    pub preferences: Preferences,
    pub events: Vec<InputEvent>,
}

impl GestureTrace {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| {
            TitleSwipeError::ConfigurationError(format!("Invalid gesture trace: {err}")).into()
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Final frame of a window after replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowFrame {
    pub window_id: u32,
    pub frame: Rect,
}

/// What a replay produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub dispatched: Vec<PlacementRecord>,
    pub final_frames: Vec<WindowFrame>,
    pub metrics: GestureClassifierMetrics,
}

pub fn replay_trace(trace: &GestureTrace) -> Result<ReplayReport> {
    if trace.screens.is_empty() {
        return Err(TitleSwipeError::NoScreens.into());
    }

    let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(
        trace
            .windows
            .iter()
            .map(|entry| (entry.window.id, entry.frame)),
    ));
    let displays = Arc::new(InMemoryDisplayProvider::new_with(trace.screens.clone()));
    let registry = Arc::new(InMemoryWindowRegistry::new_with(
        trace
            .windows
            .iter()
            .map(|entry| entry.window.clone())
            .collect(),
    ));
    let recorder = Arc::new(RecordingPlacementExecutor::wrapping(Arc::new(
        AccessibilityPlacementExecutor::new(accessibility.clone(), displays.clone()),
    )));

    let monitor = Arc::new(LocalEventMonitor::new());
    let classifier = GestureClassifier::new(
        monitor.clone(),
        GestureServices {
            registry,
            accessibility: accessibility.clone(),
            displays,
            executor: recorder.clone(),
            preferences: Arc::new(trace.preferences.clone()),
        },
    )?;

    info!(events = trace.events.len(), "Replaying gesture trace");
    for event in &trace.events {
        let delivered = monitor.post(event);
        debug!(kind = %event.kind(), delivered, "Replayed event");
    }

    let metrics = classifier.metrics();
    classifier.close()?;

    let final_frames = trace
        .windows
        .iter()
        .filter_map(|entry| {
            accessibility.frame(entry.window.id).map(|frame| WindowFrame {
                window_id: entry.window.id,
                frame,
            })
        })
        .collect();

    Ok(ReplayReport {
        dispatched: recorder.records(),
        final_frames,
        metrics,
    })
}
