//! macOS integration layer for TitleSwipe
//!
//! These modules provide safe, testable abstractions over the Accessibility
//! window attributes, Core Graphics displays, the Quartz window list and
//! global event monitoring. The concrete implementations talk to the platform
//! while tests and trace replay rely on the in-memory variants.

pub mod accessibility;
pub mod core_graphics;
pub mod event_monitor;
#[cfg(target_os = "macos")]
pub mod event_tap;
pub mod permissions;
#[cfg(target_os = "macos")]
pub mod window_list;

pub use self::accessibility::*;
pub use self::core_graphics::*;
pub use self::event_monitor::*;
#[cfg(target_os = "macos")]
pub use self::event_tap::*;
pub use self::permissions::*;
#[cfg(target_os = "macos")]
pub use self::window_list::*;
