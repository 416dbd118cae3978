//! On-screen window list from `CGWindowListCopyWindowInfo`.
//!
//! Quartz reports window bounds in top-left-origin global coordinates, the same
//! space the Accessibility attributes use, so the list doubles as a read-only
//! geometry source. Moving a window needs an accessibility element, which this
//! provider does not hold.

use crate::macos::accessibility::{AccessibilityProvider, Point, Rect, Size};
use crate::services::window_registry::{TrackedWindow, WindowRegistry};
use crate::{Result, TitleSwipeError};
use core_foundation::base::{CFType, TCFType};
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_foundation_sys::dictionary::CFDictionaryRef;
use core_foundation_sys::string::CFStringRef;
use ::core_graphics::geometry::CGRect;
use ::core_graphics::window::{
    copy_window_info, kCGNullWindowID, kCGWindowBounds, kCGWindowLayer,
    kCGWindowListExcludeDesktopElements, kCGWindowListOptionOnScreenOnly, kCGWindowName,
    kCGWindowNumber, kCGWindowOwnerName,
};
use tracing::{trace, warn};

// Menus, the Dock and status items live above the normal layer
const NORMAL_WINDOW_LAYER: i64 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowListEntry {
    pub window: TrackedWindow,
    pub layer: i64,
    pub bounds: Rect,
}

/// Window registry and geometry source backed by the Quartz window list
#[derive(Debug, Default)]
pub struct WindowListProvider;

impl WindowListProvider {
    pub fn new() -> Self {
        Self
    }

    /// Window list bounds are a snapshot; frames cannot be written back
    pub fn can_move_windows(&self) -> bool {
        false
    }

    /// On-screen windows, front to back
    pub fn entries(&self) -> Result<Vec<WindowListEntry>> {
        let info = copy_window_info(
            kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements,
            kCGNullWindowID,
        )
        .ok_or_else(|| {
            TitleSwipeError::MacOSAPIError("CGWindowListCopyWindowInfo returned null".into())
        })?;

        let entries: Vec<WindowListEntry> = info
            .iter()
            .filter_map(|item| {
                let dict: CFDictionary<CFString, CFType> =
                    unsafe { CFDictionary::wrap_under_get_rule(*item as CFDictionaryRef) };
                parse_entry(&dict)
            })
            .collect();

        trace!(count = entries.len(), "Read window list");
        Ok(entries)
    }

    pub fn entry(&self, window_id: u32) -> Result<Option<WindowListEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .find(|entry| entry.window.id == window_id))
    }

    fn bounds(&self, window_id: u32) -> Result<Rect> {
        self.entry(window_id)?
            .map(|entry| entry.bounds)
            .ok_or_else(|| TitleSwipeError::WindowNotFound(window_id).into())
    }
}

impl WindowRegistry for WindowListProvider {
    fn lookup(&self, window_id: u32) -> Option<TrackedWindow> {
        match self.entry(window_id) {
            Ok(Some(entry)) if entry.layer == NORMAL_WINDOW_LAYER => Some(entry.window),
            Ok(_) => None,
            Err(err) => {
                warn!(window_id, "Window list unavailable: {err}");
                None
            }
        }
    }
}

impl AccessibilityProvider for WindowListProvider {
    fn position(&self, window_id: u32) -> Result<Point> {
        Ok(self.bounds(window_id)?.origin)
    }

    fn size(&self, window_id: u32) -> Result<Size> {
        let bounds = self.bounds(window_id)?;
        Size::new(bounds.size.width, bounds.size.height)
    }

    fn set_window_frame(&self, window_id: u32, _frame: Rect) -> Result<()> {
        Err(TitleSwipeError::MacOSAPIError(format!(
            "window {window_id}: the window list is read-only"
        ))
        .into())
    }
}

fn key(name: CFStringRef) -> CFString {
    unsafe { CFString::wrap_under_get_rule(name) }
}

fn number_field(dict: &CFDictionary<CFString, CFType>, name: CFStringRef) -> Option<i64> {
    dict.find(&key(name))?.downcast::<CFNumber>()?.to_i64()
}

fn string_field(dict: &CFDictionary<CFString, CFType>, name: CFStringRef) -> Option<String> {
    dict.find(&key(name))?
        .downcast::<CFString>()
        .map(|value| value.to_string())
}

fn parse_entry(dict: &CFDictionary<CFString, CFType>) -> Option<WindowListEntry> {
    let (number_key, layer_key, bounds_key, owner_key, name_key) = unsafe {
        (
            kCGWindowNumber,
            kCGWindowLayer,
            kCGWindowBounds,
            kCGWindowOwnerName,
            kCGWindowName,
        )
    };

    let id = u32::try_from(number_field(dict, number_key)?).ok()?;
    let layer = number_field(dict, layer_key).unwrap_or(NORMAL_WINDOW_LAYER);

    let bounds_value = dict.find(&key(bounds_key))?;
    let bounds_dict: CFDictionary = unsafe {
        CFDictionary::wrap_under_get_rule(bounds_value.as_CFTypeRef() as CFDictionaryRef)
    };
    let bounds = CGRect::from_dict_representation(&bounds_dict)?;

    let window = TrackedWindow::new(
        id,
        string_field(dict, name_key).unwrap_or_default(),
        string_field(dict, owner_key).unwrap_or_default(),
        "",
    );

    Some(WindowListEntry {
        window,
        layer,
        bounds: Rect::from_xywh(
            bounds.origin.x,
            bounds.origin.y,
            bounds.size.width,
            bounds.size.height,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_list_is_readable() {
        let provider = WindowListProvider::new();
        let entries = provider.entries().unwrap();
        assert!(entries.iter().all(|entry| entry.bounds.size.width >= 0.0));
    }

    #[test]
    fn moving_windows_is_rejected() {
        let provider = WindowListProvider::new();
        assert!(!provider.can_move_windows());
        let result = provider.set_window_frame(1, Rect::from_xywh(0.0, 0.0, 10.0, 10.0));
        assert!(result.is_err());
    }
}
