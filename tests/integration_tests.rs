//! Integration tests for TitleSwipe
//!
//! Drive whole gestures through the public API: events are posted to a local
//! monitor, classified, and applied to in-memory windows by the accessibility
//! placement executor.

use std::sync::Arc;
use titleswipe::{
    config::preferences::{
        PreferenceSource, PreferenceStore, Preferences, ENABLE_TITLE_SWIPES_ENV,
    },
    macos::{
        accessibility::{InMemoryAccessibilityProvider, Point, Rect},
        core_graphics::{InMemoryDisplayProvider, Screen},
        event_monitor::LocalEventMonitor,
    },
    models::{
        flick::FlickDirection,
        placement::PlacementAction,
        scroll_event::{InputEvent, ModifierKey, MomentumPhase, ScrollEvent, ScrollPhase},
    },
    services::{
        AccessibilityPlacementExecutor, GestureClassifier, GestureOutcome, GestureServices,
        InMemoryWindowRegistry, PlacementExecutor, TrackedWindow,
    },
};

const PRIMARY_HEIGHT: f64 = 1080.0;
const EDITOR: u32 = 7;
const TERMINAL: u32 = 12;

/// Bottom-left-origin point for a top-left-origin one
fn cocoa(x: f64, y_from_top: f64) -> Point {
    Point::new(x, PRIMARY_HEIGHT - y_from_top)
}

fn screens() -> Vec<Screen> {
    vec![
        Screen::primary(1, Rect::from_xywh(0.0, 0.0, 1920.0, PRIMARY_HEIGHT))
            .with_visible_frame(Rect::from_xywh(0.0, 0.0, 1920.0, 1055.0)),
        Screen {
            id: 2,
            name: "Studio Display".to_string(),
            frame: Rect::from_xywh(1920.0, 0.0, 1280.0, 800.0),
            visible_frame: Rect::from_xywh(1920.0, 0.0, 1280.0, 775.0),
            is_primary: false,
        },
    ]
}

struct Desktop {
    monitor: Arc<LocalEventMonitor>,
    windows: Arc<InMemoryAccessibilityProvider>,
    classifier: GestureClassifier,
}

impl Desktop {
    fn new(preferences: Arc<dyn PreferenceSource>) -> Self {
        let windows = Arc::new(InMemoryAccessibilityProvider::new_with([
            (EDITOR, Rect::from_xywh(100.0, 200.0, 800.0, 600.0)),
            (TERMINAL, Rect::from_xywh(2000.0, 285.0, 600.0, 400.0)),
        ]));
        let displays = Arc::new(InMemoryDisplayProvider::new_with(screens()));
        let registry = Arc::new(InMemoryWindowRegistry::new_with(vec![
            TrackedWindow::new(EDITOR, "main.rs", "Code", "com.example.code"),
            TrackedWindow::new(TERMINAL, "zsh", "Terminal", "com.apple.Terminal"),
        ]));
        let executor: Arc<dyn PlacementExecutor> = Arc::new(
            AccessibilityPlacementExecutor::new(windows.clone(), displays.clone()),
        );

        let monitor = Arc::new(LocalEventMonitor::new());
        let classifier = GestureClassifier::new(
            monitor.clone(),
            GestureServices {
                registry,
                accessibility: windows.clone(),
                displays,
                executor,
                preferences,
            },
        )
        .unwrap();

        Self {
            monitor,
            windows,
            classifier,
        }
    }

    fn with_defaults() -> Self {
        Self::new(Arc::new(Preferences::default()))
    }

    fn flick(&self, window_id: u32, at: Point, deltas: &[(f64, f64)], modifiers: Vec<ModifierKey>) {
        for (index, (dx, dy)) in deltas.iter().enumerate() {
            let phase = if index == 0 {
                ScrollPhase::Began
            } else {
                ScrollPhase::Changed
            };
            let event = ScrollEvent::trackpad(*dx, *dy, phase, window_id, at)
                .with_modifiers(modifiers.clone());
            self.monitor.post(&event.into());
        }
    }

    fn frame(&self, window_id: u32) -> Rect {
        self.windows.frame(window_id).unwrap()
    }
}

mod gesture_flow {
    use super::*;

    #[test]
    fn maximize_then_restore_returns_to_original_frame() {
        let desktop = Desktop::with_defaults();
        let title = cocoa(150.0, 215.0);

        desktop.flick(EDITOR, title, &[(0.0, -8.0), (0.0, -8.0), (0.0, -8.0)], vec![]);
        assert_eq!(desktop.frame(EDITOR), Rect::from_xywh(0.0, 25.0, 1920.0, 1055.0));

        // the title bar moved with the window
        let title = cocoa(150.0, 40.0);
        desktop.flick(EDITOR, title, &[(0.0, 30.0)], vec![]);
        assert_eq!(desktop.frame(EDITOR), Rect::from_xywh(100.0, 200.0, 800.0, 600.0));

        let metrics = desktop.classifier.metrics();
        assert_eq!(metrics.actions_dispatched, 2);
        assert_eq!(metrics.gestures_started, 2);
    }

    #[test]
    fn option_flicks_tile_on_the_secondary_screen() {
        let desktop = Desktop::with_defaults();
        let title = cocoa(2100.0, 295.0);

        desktop.flick(TERMINAL, title, &[(25.0, 0.0)], vec![ModifierKey::Option]);
        assert_eq!(
            desktop.frame(TERMINAL),
            Rect::from_xywh(2560.0, 305.0, 640.0, 775.0)
        );
        assert_eq!(
            desktop.classifier.last_outcome(),
            Some(GestureOutcome::Dispatched {
                window_id: TERMINAL,
                action: PlacementAction::HalfRight,
                screen_id: 2,
            })
        );
    }

    #[test]
    fn body_flicks_and_momentum_leave_windows_alone() {
        let desktop = Desktop::with_defaults();

        desktop.flick(EDITOR, cocoa(150.0, 400.0), &[(0.0, -40.0)], vec![]);
        assert_eq!(
            desktop.classifier.last_outcome(),
            Some(GestureOutcome::OutsideTitleBar { window_id: EDITOR })
        );

        let momentum =
            ScrollEvent::trackpad(0.0, -80.0, ScrollPhase::None, EDITOR, cocoa(150.0, 215.0))
                .with_momentum(MomentumPhase::Began);
        desktop.monitor.post(&momentum.into());

        assert_eq!(desktop.frame(EDITOR), Rect::from_xywh(100.0, 200.0, 800.0, 600.0));
        assert_eq!(desktop.classifier.metrics().momentum_ignored, 1);
    }

    #[test]
    fn plain_sideways_flick_is_unmapped() {
        let desktop = Desktop::with_defaults();
        desktop.flick(EDITOR, cocoa(150.0, 215.0), &[(-30.0, 0.0)], vec![]);

        assert_eq!(
            desktop.classifier.last_outcome(),
            Some(GestureOutcome::Unmapped {
                window_id: EDITOR,
                direction: FlickDirection::Left,
            })
        );
        assert_eq!(desktop.frame(EDITOR), Rect::from_xywh(100.0, 200.0, 800.0, 600.0));
    }

    #[test]
    fn mouse_wheel_tick_on_title_bar_maximizes() {
        let desktop = Desktop::with_defaults();
        let tick = ScrollEvent::wheel(0.0, -1.0, EDITOR, cocoa(150.0, 215.0));
        desktop.monitor.post(&tick.into());

        assert_eq!(desktop.frame(EDITOR), Rect::from_xywh(0.0, 25.0, 1920.0, 1055.0));
    }

    #[test]
    fn non_scroll_events_are_not_delivered() {
        let desktop = Desktop::with_defaults();
        let delivered = desktop.monitor.post(&InputEvent::MouseMoved {
            location: cocoa(150.0, 215.0),
        });

        assert_eq!(delivered, 0);
        assert_eq!(desktop.classifier.metrics().events_seen, 0);
    }
}

mod preferences {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reloaded_preferences_take_effect_on_the_next_flick() {
        // an override in the environment pins the flag
        if std::env::var(ENABLE_TITLE_SWIPES_ENV).is_ok() {
            return;
        }

        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "enable_title_swipes = false\n").unwrap();

        let store = Arc::new(PreferenceStore::open(&path).unwrap());
        let desktop = Desktop::new(store.clone());
        let title = cocoa(150.0, 215.0);

        desktop.flick(EDITOR, title, &[(0.0, -30.0)], vec![]);
        assert_eq!(
            desktop.classifier.last_outcome(),
            Some(GestureOutcome::TitleSwipesDisabled { window_id: EDITOR })
        );

        fs::write(&path, "enable_title_swipes = true\n").unwrap();
        store.reload().unwrap();

        desktop.flick(EDITOR, title, &[(0.0, -30.0)], vec![]);
        assert_eq!(desktop.frame(EDITOR), Rect::from_xywh(0.0, 25.0, 1920.0, 1055.0));
    }
}

mod replay {
    use std::fs;
    use tempfile::tempdir;
    use titleswipe::models::placement::PlacementAction;
    use titleswipe::replay::{replay_trace, GestureTrace};

    #[test]
    fn trace_file_replays_end_to_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trace.json");
        let trace = serde_json::json!({
            "screens": [{
                "id": 1,
                "name": "Built-in",
                "frame": {
                    "origin": { "x": 0.0, "y": 0.0 },
                    "size": { "width": 1440.0, "height": 900.0 }
                },
                "visible_frame": {
                    "origin": { "x": 0.0, "y": 0.0 },
                    "size": { "width": 1440.0, "height": 875.0 }
                },
                "is_primary": true
            }],
            "windows": [{
                "id": 3,
                "title": "Notes",
                "application_name": "Notes",
                "frame": {
                    "origin": { "x": 200.0, "y": 100.0 },
                    "size": { "width": 600.0, "height": 500.0 }
                }
            }],
            "events": [
                {
                    "type": "scroll_wheel",
                    "delta_x": 0.0,
                    "delta_y": 12.0,
                    "phase": "began",
                    "has_precise_deltas": true,
                    "window_id": 3,
                    "location": { "x": 300.0, "y": 790.0 },
                    "modifiers": ["option"]
                },
                {
                    "type": "scroll_wheel",
                    "delta_x": 1.0,
                    "delta_y": 12.0,
                    "phase": "changed",
                    "has_precise_deltas": true,
                    "window_id": 3,
                    "location": { "x": 300.0, "y": 790.0 },
                    "modifiers": ["option"]
                }
            ]
        });
        fs::write(&path, serde_json::to_string_pretty(&trace).unwrap()).unwrap();

        let report = replay_trace(&GestureTrace::load(&path).unwrap()).unwrap();
        assert_eq!(report.dispatched.len(), 1);
        assert_eq!(report.dispatched[0].action, PlacementAction::HalfBottom);
        assert_eq!(report.final_frames[0].window_id, 3);
        assert_eq!(report.final_frames[0].frame.origin.y, 25.0 + 875.0 / 2.0);
        assert_eq!(report.metrics.flicks_triggered, 1);
    }
}
