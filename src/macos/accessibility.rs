use crate::{Result, TitleSwipeError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Two-dimensional point in display points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset of `self` from `origin`
    pub fn relative_to(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Window size in display points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if width <= 0.0 || height <= 0.0 {
            return Err(TitleSwipeError::ValidationError(
                "Window dimensions must be positive".to_string(),
            )
            .into());
        }

        Ok(Self { width, height })
    }
}

/// Axis-aligned rectangle. Whether `origin` is the top-left or bottom-left
/// corner depends on the coordinate space the rectangle lives in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size { width, height },
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    /// Half-open containment: the maximum edges are outside
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }
}

/// Position and size of a window in top-left-origin global coordinates,
/// read fresh from the accessibility API
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSnapshot {
    pub position: Point,
    pub size: Size,
}

impl WindowSnapshot {
    pub fn frame(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

/// Abstraction over the macOS Accessibility window attributes.
///
/// All geometry is in top-left-origin global coordinates.
pub trait AccessibilityProvider: Send + Sync {
    /// Current top-left corner of the window
    fn position(&self, window_id: u32) -> Result<Point>;

    /// Current size of the window
    fn size(&self, window_id: u32) -> Result<Size>;

    /// Move / resize a window to the requested frame
    fn set_window_frame(&self, window_id: u32, frame: Rect) -> Result<()>;

    /// Position and size together
    fn snapshot(&self, window_id: u32) -> Result<WindowSnapshot> {
        Ok(WindowSnapshot {
            position: self.position(window_id)?,
            size: self.size(window_id)?,
        })
    }
}

/// Simple in-memory provider used for tests and trace replay
#[derive(Debug, Default)]
pub struct InMemoryAccessibilityProvider {
    frames: RwLock<HashMap<u32, Rect>>,
}

impl InMemoryAccessibilityProvider {
    pub fn new_with(frames: impl IntoIterator<Item = (u32, Rect)>) -> Self {
        Self {
            frames: RwLock::new(frames.into_iter().collect()),
        }
    }

    /// Simulate a window disappearing from the accessibility tree
    pub fn remove_window(&self, window_id: u32) -> bool {
        self.frames
            .write()
            .expect("poisoned lock")
            .remove(&window_id)
            .is_some()
    }

    pub fn frame(&self, window_id: u32) -> Option<Rect> {
        self.frames
            .read()
            .expect("poisoned lock")
            .get(&window_id)
            .copied()
    }

    fn require_frame(&self, window_id: u32) -> Result<Rect> {
        self.frame(window_id).ok_or_else(|| {
            TitleSwipeError::GeometryUnavailable(format!(
                "window {window_id} has no accessibility element"
            ))
            .into()
        })
    }
}

impl AccessibilityProvider for InMemoryAccessibilityProvider {
    fn position(&self, window_id: u32) -> Result<Point> {
        Ok(self.require_frame(window_id)?.origin)
    }

    fn size(&self, window_id: u32) -> Result<Size> {
        Ok(self.require_frame(window_id)?.size)
    }

    fn set_window_frame(&self, window_id: u32, frame: Rect) -> Result<()> {
        let mut frames = self.frames.write().expect("poisoned lock");
        match frames.get_mut(&window_id) {
            Some(existing) => {
                *existing = frame;
                Ok(())
            }
            None => Err(TitleSwipeError::WindowNotFound(window_id).into()),
        }
    }
}
