use crate::macos::accessibility::{Point, Rect};
use crate::{Result, TitleSwipeError};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// A physical display.
///
/// `frame` and `visible_frame` use the Cocoa convention: bottom-left origin at
/// the primary screen's bottom-left corner, y growing upward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub id: u32,
    pub name: String,
    pub frame: Rect,
    /// Frame minus menu bar and Dock. [`SystemDisplayProvider`] cannot see
    /// either and reports the full frame here.
    pub visible_frame: Rect,
    #[serde(default)]
    pub is_primary: bool,
}

impl Screen {
    pub fn primary(id: u32, frame: Rect) -> Self {
        Self {
            id,
            name: "Primary".to_string(),
            frame,
            visible_frame: frame,
            is_primary: true,
        }
    }

    pub fn with_visible_frame(mut self, visible_frame: Rect) -> Self {
        self.visible_frame = visible_frame;
        self
    }

    /// Whether a bottom-left-origin event location falls on this screen.
    ///
    /// Flipped Quartz locations put the top pixel row at `frame.max_y()` and
    /// never reach `frame.min_y()`, so the vertical range is `(min_y, max_y]`.
    pub fn contains_location(&self, point: Point) -> bool {
        let frame = self.frame;
        point.x >= frame.min_x()
            && point.x < frame.max_x()
            && point.y > frame.min_y()
            && point.y <= frame.max_y()
    }
}

/// Abstraction over display enumeration and the two global coordinate spaces.
pub trait DisplayProvider: Send + Sync {
    /// Snapshot all screens currently attached
    fn list_screens(&self) -> Result<Vec<Screen>>;

    /// Screen containing a bottom-left-origin point. Points outside every
    /// screen resolve to the primary screen.
    fn screen_containing(&self, point: Point) -> Result<Screen> {
        let screens = self.list_screens()?;
        screens
            .iter()
            .find(|screen| screen.contains_location(point))
            .or_else(|| primary_of(&screens))
            .cloned()
            .ok_or_else(|| TitleSwipeError::NoScreens.into())
    }

    /// Convert a bottom-left-origin point on `screen` into the top-left-origin
    /// space used by accessibility geometry.
    fn to_top_left(&self, point: Point, screen: &Screen) -> Result<Point> {
        let screens = self.list_screens()?;
        let primary = primary_of(&screens).ok_or(TitleSwipeError::NoScreens)?;
        let screen_top = primary.frame.size.height - screen.frame.max_y();
        Ok(Point::new(point.x, screen_top + (screen.frame.max_y() - point.y)))
    }

    /// Visible frame of `screen` in top-left-origin space
    fn visible_frame_top_left(&self, screen: &Screen) -> Result<Rect> {
        let screens = self.list_screens()?;
        let primary = primary_of(&screens).ok_or(TitleSwipeError::NoScreens)?;
        let visible = screen.visible_frame;
        Ok(Rect::new(
            Point::new(
                visible.min_x(),
                primary.frame.size.height - visible.max_y(),
            ),
            visible.size,
        ))
    }
}

fn primary_of(screens: &[Screen]) -> Option<&Screen> {
    screens
        .iter()
        .find(|screen| screen.is_primary)
        .or_else(|| screens.first())
}

/// In-memory display provider for tests and trace replay
#[derive(Debug, Default)]
pub struct InMemoryDisplayProvider {
    screens: RwLock<Vec<Screen>>,
}

impl InMemoryDisplayProvider {
    pub fn new_with(screens: Vec<Screen>) -> Self {
        let mut screens = screens;
        screens.sort_by_key(|screen| screen.id);
        Self {
            screens: RwLock::new(screens),
        }
    }
}

impl DisplayProvider for InMemoryDisplayProvider {
    fn list_screens(&self) -> Result<Vec<Screen>> {
        Ok(self.screens.read().expect("poisoned lock").clone())
    }
}

/// Core Graphics backed display provider
#[cfg(target_os = "macos")]
#[derive(Debug, Default)]
pub struct SystemDisplayProvider;

#[cfg(target_os = "macos")]
impl SystemDisplayProvider {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "macos")]
impl DisplayProvider for SystemDisplayProvider {
    fn list_screens(&self) -> Result<Vec<Screen>> {
        use ::core_graphics::display::CGDisplay;

        let ids = CGDisplay::active_displays().map_err(|code| {
            TitleSwipeError::MacOSAPIError(format!("CGGetActiveDisplayList failed: {code}"))
        })?;

        // Quartz bounds are top-left origin; flip them against the main display
        let main_height = CGDisplay::main().bounds().size.height;
        let mut screens: Vec<Screen> = ids
            .into_iter()
            .map(|id| {
                let display = CGDisplay::new(id);
                let bounds = display.bounds();
                let frame = Rect::from_xywh(
                    bounds.origin.x,
                    main_height - (bounds.origin.y + bounds.size.height),
                    bounds.size.width,
                    bounds.size.height,
                );
                Screen {
                    id,
                    name: format!("Display {id}"),
                    frame,
                    visible_frame: frame,
                    is_primary: display.is_main(),
                }
            })
            .collect();
        screens.sort_by_key(|screen| screen.id);
        Ok(screens)
    }
}
