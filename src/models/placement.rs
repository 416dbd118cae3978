use crate::models::flick::FlickDirection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Window layout command produced by a title-bar flick
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlacementAction {
    #[default]
    None,
    Maximize,
    Restore,
    HalfLeft,
    HalfRight,
    HalfTop,
    HalfBottom,
}

impl PlacementAction {
    /// Map a flick on a title bar to an action.
    ///
    /// With Option held every direction snaps to a half of the screen. Without it
    /// only up/down are bound; left/right are left free for space switching.
    pub fn for_title_flick(has_option: bool, direction: FlickDirection) -> Self {
        match (has_option, direction) {
            (_, FlickDirection::None) => PlacementAction::None,
            (true, FlickDirection::Left) => PlacementAction::HalfLeft,
            (true, FlickDirection::Right) => PlacementAction::HalfRight,
            (true, FlickDirection::Up) => PlacementAction::HalfTop,
            (true, FlickDirection::Down) => PlacementAction::HalfBottom,
            (false, FlickDirection::Up) => PlacementAction::Maximize,
            (false, FlickDirection::Down) => PlacementAction::Restore,
            (false, FlickDirection::Left | FlickDirection::Right) => PlacementAction::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == PlacementAction::None
    }
}

impl fmt::Display for PlacementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlacementAction::None => "none",
            PlacementAction::Maximize => "maximize",
            PlacementAction::Restore => "restore",
            PlacementAction::HalfLeft => "half_left",
            PlacementAction::HalfRight => "half_right",
            PlacementAction::HalfTop => "half_top",
            PlacementAction::HalfBottom => "half_bottom",
        };
        f.write_str(name)
    }
}
