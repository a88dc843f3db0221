//! Color palette section.

use serde::{Deserialize, Serialize};

use super::defaults;
use crate::core::{Color, ROOM_SLOTS};

/// Base colors and the room palette, RGBA.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColorSection {
    /// Image background
    #[serde(default = "defaults::color_background")]
    pub background: Color,

    /// Walls
    #[serde(default = "defaults::color_wall")]
    pub wall: Color,

    /// Floor outside any room
    #[serde(default = "defaults::color_floor")]
    pub floor: Color,

    /// Driven path
    #[serde(default = "defaults::color_move")]
    pub path: Color,

    /// Robot body
    #[serde(default = "defaults::color_robot")]
    pub robot: Color,

    /// Dock
    #[serde(default = "defaults::color_charger")]
    pub charger: Color,

    /// Go-to flag
    #[serde(default = "defaults::color_go_to")]
    pub go_to: Color,

    /// No-go areas and virtual walls
    #[serde(default = "defaults::color_no_go")]
    pub no_go: Color,

    /// Zones being cleaned
    #[serde(default = "defaults::color_zone_clean")]
    pub zone_clean: Color,

    /// Obstacle markers
    #[serde(default = "defaults::color_obstacle")]
    pub obstacle: Color,

    /// Predicted path to the go-to target
    #[serde(default = "defaults::color_predicted_path")]
    pub predicted_path: Color,

    /// Room palette, indexed by room slot
    #[serde(default = "defaults::color_rooms")]
    pub rooms: Vec<Color>,
}

impl ColorSection {
    /// Color of a room slot. Slots beyond the palette wrap around.
    pub fn room(&self, slot: usize) -> Color {
        if self.rooms.is_empty() {
            return self.floor;
        }
        self.rooms[slot % self.rooms.len().min(ROOM_SLOTS)]
    }

    /// Room color blended towards the zone-clean color, used for rooms in
    /// the running clean job.
    pub fn active_room(&self, slot: usize) -> Color {
        let base = self.room(slot);
        let zone = self.zone_clean;
        let mut out = [0u8; 4];
        for i in 0..3 {
            out[i] = ((2 * base[i] as u16 + zone[i] as u16) / 3) as u8;
        }
        out[3] = base[3];
        out
    }
}

impl Default for ColorSection {
    fn default() -> Self {
        Self {
            background: defaults::color_background(),
            wall: defaults::color_wall(),
            floor: defaults::color_floor(),
            path: defaults::color_move(),
            robot: defaults::color_robot(),
            charger: defaults::color_charger(),
            go_to: defaults::color_go_to(),
            no_go: defaults::color_no_go(),
            zone_clean: defaults::color_zone_clean(),
            obstacle: defaults::color_obstacle(),
            predicted_path: defaults::color_predicted_path(),
            rooms: defaults::color_rooms(),
        }
    }
}
