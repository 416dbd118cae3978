//! Data models for scroll gestures and placement actions

pub mod flick;
pub mod placement;
pub mod scroll_event;

pub use flick::*;
pub use placement::*;
pub use scroll_event::*;
