use crate::macos::accessibility::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Modifier keys held while an event was generated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKey {
    /// Command key (⌘)
    Command,
    /// Option/Alt key (⌥)
    Option,
    /// Control key (⌃)
    Control,
    /// Shift key (⇧)
    Shift,
    /// Function key (fn)
    Function,
}

/// Touch phase of a scroll event, as reported for trackpad gestures
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPhase {
    /// Physical wheels never report a phase
    #[default]
    None,
    MayBegin,
    Began,
    Changed,
    Stationary,
    Ended,
    Cancelled,
}

impl ScrollPhase {
    pub fn is_began(self) -> bool {
        matches!(self, ScrollPhase::Began)
    }
}

/// Inertial phase of a scroll event. Anything other than `None` is
/// system-generated momentum after the fingers left the trackpad.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MomentumPhase {
    #[default]
    None,
    Began,
    Changed,
    Ended,
}

impl MomentumPhase {
    pub fn is_momentum(self) -> bool {
        !matches!(self, MomentumPhase::None)
    }
}

/// A single scroll-wheel callback from the OS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollEvent {
    /// Horizontal delta, positive to the right
    pub delta_x: f64,
    /// Vertical delta, positive downward on screen
    pub delta_y: f64,
    #[serde(default)]
    pub phase: ScrollPhase,
    #[serde(default)]
    pub momentum_phase: MomentumPhase,
    /// Trackpads report precise deltas, physical wheels coarse ticks
    pub has_precise_deltas: bool,
    /// OS window number under the pointer
    pub window_id: u32,
    /// Pointer location in bottom-left-origin global coordinates
    pub location: Point,
    #[serde(default)]
    pub modifiers: Vec<ModifierKey>,
}

impl ScrollEvent {
    /// Trackpad event with precise deltas
    pub fn trackpad(
        delta_x: f64,
        delta_y: f64,
        phase: ScrollPhase,
        window_id: u32,
        location: Point,
    ) -> Self {
        Self {
            delta_x,
            delta_y,
            phase,
            momentum_phase: MomentumPhase::None,
            has_precise_deltas: true,
            window_id,
            location,
            modifiers: Vec::new(),
        }
    }

    /// Physical mouse-wheel tick
    pub fn wheel(delta_x: f64, delta_y: f64, window_id: u32, location: Point) -> Self {
        Self {
            delta_x,
            delta_y,
            phase: ScrollPhase::None,
            momentum_phase: MomentumPhase::None,
            has_precise_deltas: false,
            window_id,
            location,
            modifiers: Vec::new(),
        }
    }

    pub fn with_momentum(mut self, momentum_phase: MomentumPhase) -> Self {
        self.momentum_phase = momentum_phase;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Vec<ModifierKey>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn is_physical_wheel(&self) -> bool {
        !self.has_precise_deltas
    }

    pub fn has_option_modifier(&self) -> bool {
        self.modifiers.contains(&ModifierKey::Option)
    }
}

/// Kinds of global input events a monitor can be registered for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ScrollWheel,
    MouseMoved,
    FlagsChanged,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::ScrollWheel => "scroll_wheel",
            EventKind::MouseMoved => "mouse_moved",
            EventKind::FlagsChanged => "flags_changed",
        };
        f.write_str(name)
    }
}

/// Set of event kinds a monitor is interested in
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventMask {
    kinds: Vec<EventKind>,
}

impl EventMask {
    pub fn new(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        let mut kinds: Vec<EventKind> = kinds.into_iter().collect();
        kinds.sort_by_key(|kind| *kind as u8);
        kinds.dedup();
        Self { kinds }
    }

    pub fn scroll_wheel() -> Self {
        Self::new([EventKind::ScrollWheel])
    }

    pub fn matches(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn kinds(&self) -> &[EventKind] {
        &self.kinds
    }
}

/// Global input event delivered to monitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    ScrollWheel(ScrollEvent),
    MouseMoved { location: Point },
    FlagsChanged { modifiers: Vec<ModifierKey> },
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::ScrollWheel(_) => EventKind::ScrollWheel,
            InputEvent::MouseMoved { .. } => EventKind::MouseMoved,
            InputEvent::FlagsChanged { .. } => EventKind::FlagsChanged,
        }
    }
}

impl From<ScrollEvent> for InputEvent {
    fn from(event: ScrollEvent) -> Self {
        InputEvent::ScrollWheel(event)
    }
}
