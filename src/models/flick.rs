use crate::macos::accessibility::Point;
use crate::models::scroll_event::{ModifierKey, ScrollEvent};
use serde::{Deserialize, Serialize};

/// Accumulated distance, in device-independent scroll units, after which a
/// precise (trackpad) gesture counts as a flick
pub const MIN_FLICK_DISTANCE: f64 = 20.0;

/// Dominant direction of a completed flick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum FlickDirection {
    #[default]
    None,
    Left,
    Right,
    Up,
    Down,
}

/// Collects the scroll deltas of one physical gesture and resolves its
/// direction exactly once.
///
/// Physical wheel ticks carry no continuous momentum and resolve on their first
/// event regardless of magnitude.
#[derive(Debug, Clone)]
pub struct FlickAccumulator {
    original_event: ScrollEvent,
    total_dx: f64,
    total_dy: f64,
    direction: FlickDirection,
}

impl FlickAccumulator {
    pub fn new(original_event: ScrollEvent) -> Self {
        Self {
            original_event,
            total_dx: 0.0,
            total_dy: 0.0,
            direction: FlickDirection::None,
        }
    }

    /// Feed one event of the gesture. Returns `true` only for the event that
    /// resolves the direction.
    pub fn accumulate(&mut self, event: &ScrollEvent) -> bool {
        if self.is_resolved() {
            return false;
        }

        let is_physical_wheel = event.is_physical_wheel();

        self.total_dx += event.delta_x;
        self.total_dy += event.delta_y;

        let triggered = self.total_dx.abs() >= MIN_FLICK_DISTANCE
            || self.total_dy.abs() >= MIN_FLICK_DISTANCE
            || is_physical_wheel;
        if !triggered {
            return false;
        }

        self.direction = if self.total_dx.abs() > self.total_dy.abs() {
            if self.total_dx > 0.0 {
                FlickDirection::Right
            } else {
                FlickDirection::Left
            }
        } else if self.total_dy > 0.0 {
            FlickDirection::Down
        } else {
            FlickDirection::Up
        };

        true
    }

    pub fn direction(&self) -> FlickDirection {
        self.direction
    }

    pub fn is_resolved(&self) -> bool {
        self.direction != FlickDirection::None
    }

    /// Running `(dx, dy)` totals
    pub fn totals(&self) -> (f64, f64) {
        (self.total_dx, self.total_dy)
    }

    pub fn window_id(&self) -> u32 {
        self.original_event.window_id
    }

    /// Where the gesture started, in bottom-left-origin global coordinates
    pub fn start_location(&self) -> Point {
        self.original_event.location
    }

    pub fn modifiers(&self) -> &[ModifierKey] {
        &self.original_event.modifiers
    }

    pub fn has_option_modifier(&self) -> bool {
        self.original_event.has_option_modifier()
    }

    pub fn original_event(&self) -> &ScrollEvent {
        &self.original_event
    }
}
