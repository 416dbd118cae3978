//! TitleSwipe - Two-finger title-bar flicks for macOS
//!
//! TitleSwipe watches global scroll events and recognizes quick two-finger
//! flicks that start on a window's title bar. Each recognized flick is mapped to
//! a placement action (maximize, restore or one of the screen halves) and
//! handed to a placement executor.

pub mod cli;
pub mod config;
pub mod logging;
pub mod macos;
pub mod models;
pub mod replay;
pub mod services;

pub use models::*;
pub use services::*;

/// Result type alias for TitleSwipe operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to TitleSwipe operations
#[derive(thiserror::Error, Debug)]
pub enum TitleSwipeError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Window not found: {0}")]
    WindowNotFound(u32),

    #[error("Window geometry unavailable: {0}")]
    GeometryUnavailable(String),

    #[error("No screens available")]
    NoScreens,

    #[error("Event monitor not registered: {0}")]
    MonitorNotRegistered(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("macOS API error: {0}")]
    MacOSAPIError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
