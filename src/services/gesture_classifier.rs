//! Turns global scroll events into title-bar placement actions.
//!
//! One accumulator is live at a time. A new trackpad gesture (phase `Began`) or
//! any physical wheel tick replaces it; momentum events are dropped before they
//! can start or feed one. When an accumulator resolves, the gesture's start
//! point is hit-tested against the title bar of the window it started over and
//! the flick is mapped to a [`PlacementAction`].

use crate::config::preferences::{PreferenceKey, PreferenceSource};
use crate::macos::accessibility::{AccessibilityProvider, Point, Rect, Size};
use crate::macos::core_graphics::DisplayProvider;
use crate::macos::event_monitor::{EventMonitor, MonitorSubscription};
use crate::models::flick::{FlickAccumulator, FlickDirection};
use crate::models::placement::PlacementAction;
use crate::models::scroll_event::{EventMask, InputEvent, ScrollEvent};
use crate::services::placement_executor::PlacementExecutor;
use crate::services::window_registry::WindowRegistry;
use crate::Result;
use serde::Serialize;
use std::sync::{Arc, Mutex, RwLock, Weak};
use tracing::{debug, info, trace, warn};

/// Height of the strip at the top of a window that counts as its title bar
pub const TITLE_BAR_HEIGHT: f64 = 30.0;

/// Whether `point`, relative to the window's top-left corner, lies on the
/// title bar of a window of `window_size`
pub fn hits_title_bar(window_size: Size, point: Point) -> bool {
    Rect::from_xywh(0.0, 0.0, window_size.width, TITLE_BAR_HEIGHT).contains(point)
}

/// Collaborators the classifier calls into
#[derive(Clone)]
pub struct GestureServices {
    pub registry: Arc<dyn WindowRegistry>,
    pub accessibility: Arc<dyn AccessibilityProvider>,
    pub displays: Arc<dyn DisplayProvider>,
    pub executor: Arc<dyn PlacementExecutor>,
    pub preferences: Arc<dyn PreferenceSource>,
}

/// Result of resolving one triggered flick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GestureOutcome {
    /// The window under the gesture is not tracked (desktop, Dock, ...)
    NoWindow { window_id: u32 },
    GeometryUnavailable { window_id: u32 },
    NoScreen { window_id: u32 },
    OutsideTitleBar { window_id: u32 },
    TitleSwipesDisabled { window_id: u32 },
    Unmapped { window_id: u32, direction: FlickDirection },
    Dispatched {
        window_id: u32,
        action: PlacementAction,
        screen_id: u32,
    },
    DispatchFailed { window_id: u32, action: PlacementAction },
}

/// Counters for classifier activity
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct GestureClassifierMetrics {
    pub events_seen: u64,
    pub momentum_ignored: u64,
    pub gestures_started: u64,
    pub flicks_triggered: u64,
    pub lookup_misses: u64,
    pub geometry_failures: u64,
    pub title_bar_hits: u64,
    pub actions_dispatched: u64,
    pub dispatch_failures: u64,
}

struct ClassifierCore {
    services: GestureServices,
    accumulator: Mutex<Option<FlickAccumulator>>,
    metrics: RwLock<GestureClassifierMetrics>,
    last_outcome: Mutex<Option<GestureOutcome>>,
}

impl ClassifierCore {
    fn handle_event(&self, event: &InputEvent) {
        if let InputEvent::ScrollWheel(scroll) = event {
            self.handle_scroll(scroll);
        }
    }

    fn handle_scroll(&self, event: &ScrollEvent) {
        self.update_metrics(|m| m.events_seen += 1);

        if event.momentum_phase.is_momentum() {
            trace!(phase = ?event.momentum_phase, "Ignoring momentum scroll");
            self.update_metrics(|m| m.momentum_ignored += 1);
            return;
        }

        // Snapshot the resolved accumulator so resolution runs without the lock
        let triggered = {
            let mut slot = self.accumulator.lock().expect("poisoned lock");
            if event.phase.is_began() || event.is_physical_wheel() {
                *slot = Some(FlickAccumulator::new(event.clone()));
                self.update_metrics(|m| m.gestures_started += 1);
            }

            match slot.as_mut() {
                Some(accumulator) => accumulator.accumulate(event).then(|| accumulator.clone()),
                None => None,
            }
        };

        if let Some(flick) = triggered {
            debug!(
                window_id = flick.window_id(),
                direction = ?flick.direction(),
                "Flick triggered"
            );
            self.update_metrics(|m| m.flicks_triggered += 1);
            let outcome = self.resolve(&flick);
            *self.last_outcome.lock().expect("poisoned lock") = Some(outcome);
        }
    }

    fn resolve(&self, flick: &FlickAccumulator) -> GestureOutcome {
        let services = &self.services;
        let window_id = flick.window_id();

        let Some(window) = services.registry.lookup(window_id) else {
            // Desktop and Dock flicks end up here
            debug!(window_id, "Flick over an untracked window");
            self.update_metrics(|m| m.lookup_misses += 1);
            return GestureOutcome::NoWindow { window_id };
        };

        let geometry = services
            .accessibility
            .position(window_id)
            .and_then(|position| Ok((position, services.accessibility.size(window_id)?)));
        let (window_top_left, window_size) = match geometry {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!(window_id, "Swiped window had no position or size: {}", err);
                self.update_metrics(|m| m.geometry_failures += 1);
                return GestureOutcome::GeometryUnavailable { window_id };
            }
        };

        let start = flick.start_location();
        let located = services.displays.screen_containing(start).and_then(|screen| {
            let converted = services.displays.to_top_left(start, &screen)?;
            Ok((screen, converted))
        });
        let (screen, start_top_left) = match located {
            Ok(located) => located,
            Err(err) => {
                warn!(window_id, "Could not place gesture on a screen: {}", err);
                return GestureOutcome::NoScreen { window_id };
            }
        };

        let location_in_window = start_top_left.relative_to(window_top_left);
        if !hits_title_bar(window_size, location_in_window) {
            trace!(
                window_id,
                x = location_in_window.x,
                y = location_in_window.y,
                "Flick outside title bar"
            );
            return GestureOutcome::OutsideTitleBar { window_id };
        }
        self.update_metrics(|m| m.title_bar_hits += 1);

        if !services.preferences.read_flag(PreferenceKey::EnableTitleSwipes) {
            debug!(window_id, "Title swipes disabled");
            return GestureOutcome::TitleSwipesDisabled { window_id };
        }

        let direction = flick.direction();
        let action = PlacementAction::for_title_flick(flick.has_option_modifier(), direction);
        if action.is_none() {
            debug!(window_id, ?direction, "No action bound to title-bar flick");
            return GestureOutcome::Unmapped {
                window_id,
                direction,
            };
        }

        match services.executor.perform(&window, action, &screen) {
            Ok(()) => {
                info!(window_id, %action, screen_id = screen.id, "Dispatched title-bar flick");
                self.update_metrics(|m| m.actions_dispatched += 1);
                GestureOutcome::Dispatched {
                    window_id,
                    action,
                    screen_id: screen.id,
                }
            }
            Err(err) => {
                warn!(window_id, %action, "Placement failed: {}", err);
                self.update_metrics(|m| m.dispatch_failures += 1);
                GestureOutcome::DispatchFailed { window_id, action }
            }
        }
    }

    fn update_metrics(&self, update: impl FnOnce(&mut GestureClassifierMetrics)) {
        update(&mut self.metrics.write().expect("poisoned lock"));
    }
}

/// Owns the global scroll monitor and classifies the gestures it delivers
pub struct GestureClassifier {
    subscription: Option<MonitorSubscription>,
    core: Arc<ClassifierCore>,
}

impl GestureClassifier {
    /// Create a classifier and register its scroll-wheel monitor
    pub fn new(monitor: Arc<dyn EventMonitor>, services: GestureServices) -> Result<Self> {
        let core = Arc::new(ClassifierCore {
            services,
            accumulator: Mutex::new(None),
            metrics: RwLock::new(GestureClassifierMetrics::default()),
            last_outcome: Mutex::new(None),
        });

        // The monitor must not keep the classifier alive
        let weak: Weak<ClassifierCore> = Arc::downgrade(&core);
        let subscription = MonitorSubscription::register(
            monitor,
            EventMask::scroll_wheel(),
            Box::new(move |event| {
                if let Some(core) = weak.upgrade() {
                    core.handle_event(event);
                }
            }),
        )?;

        Ok(Self {
            subscription: Some(subscription),
            core,
        })
    }

    /// Feed an event directly, bypassing the monitor
    pub fn handle_event(&self, event: &InputEvent) {
        self.core.handle_event(event);
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(MonitorSubscription::is_active)
    }

    /// Direction of the current gesture, `None` while undecided or idle
    pub fn current_direction(&self) -> FlickDirection {
        self.core
            .accumulator
            .lock()
            .expect("poisoned lock")
            .as_ref()
            .map_or(FlickDirection::None, FlickAccumulator::direction)
    }

    pub fn last_outcome(&self) -> Option<GestureOutcome> {
        self.core.last_outcome.lock().expect("poisoned lock").clone()
    }

    pub fn metrics(&self) -> GestureClassifierMetrics {
        self.core.metrics.read().expect("poisoned lock").clone()
    }

    /// Unregister the monitor now and report failures
    pub fn close(mut self) -> Result<()> {
        match self.subscription.take() {
            Some(subscription) => subscription.close(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::preferences::Preferences;
    use crate::macos::accessibility::InMemoryAccessibilityProvider;
    use crate::macos::core_graphics::{InMemoryDisplayProvider, Screen};
    use crate::macos::event_monitor::LocalEventMonitor;
    use crate::models::scroll_event::{ModifierKey, MomentumPhase, ScrollPhase};
    use crate::services::placement_executor::{PlacementRecord, RecordingPlacementExecutor};
    use crate::services::window_registry::{InMemoryWindowRegistry, TrackedWindow};
    use mockall::mock;
    use mockall::predicate::*;

    mock! {
        pub Executor {}

        impl PlacementExecutor for Executor {
            fn perform(
                &self,
                window: &TrackedWindow,
                action: PlacementAction,
                screen: &Screen,
            ) -> Result<()>;
        }
    }

    const SCREEN_HEIGHT: f64 = 1080.0;
    const WINDOW_ID: u32 = 7;

    /// Bottom-left-origin point for a top-left-origin one on the primary screen
    fn cocoa(x: f64, y_from_top: f64) -> Point {
        Point::new(x, SCREEN_HEIGHT - y_from_top)
    }

    struct Harness {
        monitor: Arc<LocalEventMonitor>,
        accessibility: Arc<InMemoryAccessibilityProvider>,
        recorder: Arc<RecordingPlacementExecutor>,
        classifier: GestureClassifier,
    }

    fn services_with(
        executor: Arc<dyn PlacementExecutor>,
        preferences: Preferences,
    ) -> (GestureServices, Arc<InMemoryAccessibilityProvider>) {
        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with([(
            WINDOW_ID,
            Rect::from_xywh(100.0, 200.0, 800.0, 600.0),
        )]));
        let services = GestureServices {
            registry: Arc::new(InMemoryWindowRegistry::new_with(vec![TrackedWindow::new(
                WINDOW_ID,
                "Editor",
                "Code",
                "com.example.code",
            )])),
            accessibility: accessibility.clone(),
            displays: Arc::new(InMemoryDisplayProvider::new_with(vec![Screen::primary(
                1,
                Rect::from_xywh(0.0, 0.0, 1920.0, SCREEN_HEIGHT),
            )])),
            executor,
            preferences: Arc::new(preferences),
        };
        (services, accessibility)
    }

    fn harness_with(preferences: Preferences) -> Harness {
        let monitor = Arc::new(LocalEventMonitor::new());
        let recorder = Arc::new(RecordingPlacementExecutor::new());
        let (services, accessibility) = services_with(recorder.clone(), preferences);
        let classifier = GestureClassifier::new(monitor.clone(), services).unwrap();
        Harness {
            monitor,
            accessibility,
            recorder,
            classifier,
        }
    }

    fn harness() -> Harness {
        harness_with(Preferences::default())
    }

    fn began(dx: f64, dy: f64, at: Point) -> ScrollEvent {
        ScrollEvent::trackpad(dx, dy, ScrollPhase::Began, WINDOW_ID, at)
    }

    fn changed(dx: f64, dy: f64, at: Point) -> ScrollEvent {
        ScrollEvent::trackpad(dx, dy, ScrollPhase::Changed, WINDOW_ID, at)
    }

    impl Harness {
        fn post(&self, event: ScrollEvent) {
            self.monitor.post(&event.into());
        }
    }

    #[test]
    fn title_bar_hit_test() {
        let size = Size::new(800.0, 600.0).unwrap();
        assert!(hits_title_bar(size, Point::new(100.0, 10.0)));
        assert!(!hits_title_bar(size, Point::new(100.0, 40.0)));
        assert!(!hits_title_bar(size, Point::new(-1.0, 10.0)));
        assert!(!hits_title_bar(size, Point::new(100.0, -1.0)));
    }

    #[test]
    fn registers_exactly_one_monitor_and_releases_it() {
        let h = harness();
        assert_eq!(h.monitor.monitor_count(), 1);
        assert!(h.classifier.is_subscribed());

        h.classifier.close().unwrap();
        assert_eq!(h.monitor.monitor_count(), 0);
    }

    #[test]
    fn dropping_the_classifier_unregisters() {
        let h = harness();
        let monitor = h.monitor.clone();
        drop(h);
        assert_eq!(monitor.monitor_count(), 0);
        assert_eq!(monitor.post(&began(0.0, -30.0, cocoa(150.0, 215.0)).into()), 0);
    }

    #[test]
    fn upward_title_flick_maximizes() {
        let h = harness();
        h.post(began(0.0, -22.0, cocoa(150.0, 215.0)));

        assert_eq!(
            h.recorder.records(),
            vec![PlacementRecord {
                window_id: WINDOW_ID,
                action: PlacementAction::Maximize,
                screen_id: 1,
            }]
        );
        assert_eq!(h.classifier.current_direction(), FlickDirection::Up);
        assert_eq!(h.classifier.metrics().actions_dispatched, 1);
    }

    #[test]
    fn accumulates_across_changed_events() {
        let h = harness();
        let at = cocoa(150.0, 215.0);
        h.post(began(0.0, 5.0, at));
        h.post(changed(0.0, 5.0, at));
        assert!(h.recorder.records().is_empty());
        assert_eq!(h.classifier.current_direction(), FlickDirection::None);

        h.post(changed(0.0, 12.0, at));
        let records = h.recorder.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, PlacementAction::Restore);
    }

    #[test]
    fn resolved_gesture_absorbs_remaining_events() {
        let h = harness();
        let at = cocoa(150.0, 215.0);
        h.post(began(0.0, -25.0, at));
        for _ in 0..10 {
            h.post(changed(0.0, -25.0, at));
        }

        assert_eq!(h.recorder.records().len(), 1);
        let metrics = h.classifier.metrics();
        assert_eq!(metrics.events_seen, 11);
        assert_eq!(metrics.gestures_started, 1);
        assert_eq!(metrics.flicks_triggered, 1);
    }

    #[test]
    fn option_flicks_snap_to_halves() {
        let h = harness();
        let at = cocoa(150.0, 215.0);
        h.post(began(-25.0, 0.0, at).with_modifiers(vec![ModifierKey::Option]));
        h.post(began(0.0, -25.0, at).with_modifiers(vec![ModifierKey::Option]));

        let actions: Vec<PlacementAction> =
            h.recorder.records().iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![PlacementAction::HalfLeft, PlacementAction::HalfTop]);
    }

    #[test]
    fn plain_horizontal_flick_is_unmapped() {
        let h = harness();
        h.post(began(-25.0, 0.0, cocoa(150.0, 215.0)));

        assert!(h.recorder.records().is_empty());
        assert_eq!(
            h.classifier.last_outcome(),
            Some(GestureOutcome::Unmapped {
                window_id: WINDOW_ID,
                direction: FlickDirection::Left,
            })
        );
    }

    #[test]
    fn momentum_events_never_start_or_feed_gestures() {
        let h = harness();
        let at = cocoa(150.0, 215.0);
        h.post(began(0.0, -5.0, at));
        h.post(changed(0.0, -30.0, at).with_momentum(MomentumPhase::Changed));
        h.post(ScrollEvent::wheel(0.0, -3.0, WINDOW_ID, at).with_momentum(MomentumPhase::Began));

        assert!(h.recorder.records().is_empty());
        let metrics = h.classifier.metrics();
        assert_eq!(metrics.momentum_ignored, 2);
        assert_eq!(metrics.gestures_started, 1);
        assert_eq!(metrics.flicks_triggered, 0);
    }

    #[test]
    fn new_gesture_abandons_the_previous_one() {
        let h = harness();
        let at = cocoa(150.0, 215.0);
        h.post(began(0.0, -15.0, at));
        // a fresh gesture restarts the totals, so -15 + -15 never triggers
        h.post(began(0.0, -15.0, at));

        assert!(h.recorder.records().is_empty());
        assert_eq!(h.classifier.metrics().gestures_started, 2);
        assert_eq!(h.classifier.metrics().flicks_triggered, 0);
    }

    #[test]
    fn each_wheel_tick_is_its_own_gesture() {
        let h = harness();
        let at = cocoa(150.0, 215.0);
        h.post(ScrollEvent::wheel(0.0, -1.0, WINDOW_ID, at));
        h.post(ScrollEvent::wheel(0.0, 1.0, WINDOW_ID, at));

        let actions: Vec<PlacementAction> =
            h.recorder.records().iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![PlacementAction::Maximize, PlacementAction::Restore]);
    }

    #[test]
    fn wheel_tick_interrupts_an_open_trackpad_gesture() {
        let h = harness();
        let at = cocoa(150.0, 215.0);
        h.post(began(0.0, 8.0, at));
        h.post(changed(0.0, 8.0, at));
        h.post(ScrollEvent::wheel(0.0, -1.0, WINDOW_ID, at));

        let actions: Vec<PlacementAction> =
            h.recorder.records().iter().map(|r| r.action).collect();
        assert_eq!(actions, vec![PlacementAction::Maximize]);
        assert_eq!(h.classifier.metrics().gestures_started, 2);
    }

    #[test]
    fn momentum_with_began_phase_starts_nothing() {
        let h = harness();
        h.post(began(0.0, -40.0, cocoa(150.0, 215.0)).with_momentum(MomentumPhase::Began));

        assert!(h.recorder.records().is_empty());
        assert_eq!(h.classifier.current_direction(), FlickDirection::None);
        let metrics = h.classifier.metrics();
        assert_eq!(metrics.gestures_started, 0);
        assert_eq!(metrics.momentum_ignored, 1);
    }

    #[test]
    fn zero_sized_window_has_no_title_bar() {
        let h = harness();
        h.accessibility
            .set_window_frame(WINDOW_ID, Rect::from_xywh(100.0, 200.0, 0.0, 0.0))
            .unwrap();
        h.post(began(0.0, -25.0, cocoa(100.0, 200.0)));

        assert!(h.recorder.records().is_empty());
        assert_eq!(
            h.classifier.last_outcome(),
            Some(GestureOutcome::OutsideTitleBar {
                window_id: WINDOW_ID
            })
        );
    }

    #[test]
    fn events_before_any_gesture_start_are_dropped() {
        let h = harness();
        h.post(changed(0.0, -50.0, cocoa(150.0, 215.0)));

        assert!(h.recorder.records().is_empty());
        assert_eq!(h.classifier.metrics().gestures_started, 0);
    }

    #[test]
    fn flick_on_window_body_does_nothing() {
        let h = harness();
        h.post(began(0.0, -25.0, cocoa(150.0, 240.0)));

        assert!(h.recorder.records().is_empty());
        assert_eq!(
            h.classifier.last_outcome(),
            Some(GestureOutcome::OutsideTitleBar {
                window_id: WINDOW_ID
            })
        );
    }

    #[test]
    fn untracked_window_is_a_lookup_miss() {
        let h = harness();
        h.post(ScrollEvent::trackpad(
            0.0,
            -25.0,
            ScrollPhase::Began,
            99,
            cocoa(150.0, 215.0),
        ));

        assert!(h.recorder.records().is_empty());
        assert_eq!(h.classifier.metrics().lookup_misses, 1);
        assert_eq!(
            h.classifier.last_outcome(),
            Some(GestureOutcome::NoWindow { window_id: 99 })
        );
    }

    #[test]
    fn missing_geometry_aborts_quietly() {
        let h = harness();
        h.accessibility.remove_window(WINDOW_ID);
        h.post(began(0.0, -25.0, cocoa(150.0, 215.0)));

        assert!(h.recorder.records().is_empty());
        assert_eq!(h.classifier.metrics().geometry_failures, 1);
    }

    #[test]
    fn disabled_preference_blocks_dispatch() {
        let h = harness_with(Preferences {
            enable_title_swipes: false,
        });
        h.post(began(0.0, -25.0, cocoa(150.0, 215.0)));

        assert!(h.recorder.records().is_empty());
        assert_eq!(h.classifier.metrics().title_bar_hits, 1);
        assert_eq!(
            h.classifier.last_outcome(),
            Some(GestureOutcome::TitleSwipesDisabled {
                window_id: WINDOW_ID
            })
        );
    }

    #[test]
    fn executor_receives_window_action_and_screen() {
        let mut executor = MockExecutor::new();
        executor
            .expect_perform()
            .withf(|window, action, screen| {
                window.id == WINDOW_ID && *action == PlacementAction::HalfBottom && screen.id == 1
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let monitor = Arc::new(LocalEventMonitor::new());
        let (services, _) = services_with(Arc::new(executor), Preferences::default());
        let classifier = GestureClassifier::new(monitor.clone(), services).unwrap();

        monitor.post(
            &began(0.0, 25.0, cocoa(150.0, 215.0))
                .with_modifiers(vec![ModifierKey::Option])
                .into(),
        );
        assert_eq!(classifier.metrics().actions_dispatched, 1);
    }

    #[test]
    fn executor_failure_is_contained() {
        let mut executor = MockExecutor::new();
        executor
            .expect_perform()
            .with(always(), eq(PlacementAction::Maximize), always())
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("window refused to move")));

        let monitor = Arc::new(LocalEventMonitor::new());
        let (services, _) = services_with(Arc::new(executor), Preferences::default());
        let classifier = GestureClassifier::new(monitor.clone(), services).unwrap();

        monitor.post(&began(0.0, -25.0, cocoa(150.0, 215.0)).into());
        assert_eq!(classifier.metrics().dispatch_failures, 1);
        assert_eq!(
            classifier.last_outcome(),
            Some(GestureOutcome::DispatchFailed {
                window_id: WINDOW_ID,
                action: PlacementAction::Maximize,
            })
        );
    }

    #[test]
    fn direct_events_bypass_the_monitor() {
        let h = harness();
        h.classifier.handle_event(&InputEvent::MouseMoved {
            location: cocoa(1.0, 1.0),
        });
        h.classifier.handle_event(&began(0.0, -25.0, cocoa(150.0, 215.0)).into());

        assert_eq!(h.recorder.records().len(), 1);
        assert_eq!(h.classifier.metrics().events_seen, 1);
    }
}
