//! Gesture recognition and window placement services

pub mod gesture_classifier;
pub mod placement_executor;
pub mod window_registry;

pub use gesture_classifier::*;
pub use placement_executor::*;
pub use window_registry::*;
