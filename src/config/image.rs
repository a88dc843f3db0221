//! Image layout section: crop margins, rotation, aspect ratio and offsets.

use serde::{Deserialize, Serialize};

use super::defaults;

/// Image layout settings section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageSection {
    /// Margin kept around the trimmed map (pixels)
    #[serde(default = "defaults::margin")]
    pub margin: u32,

    /// Counter-clockwise rotation in degrees: 0, 90, 180 or 270
    #[serde(default)]
    pub rotation: u32,

    /// Requested aspect ratio as `"w,h"`, or `"None"`
    #[serde(default = "defaults::aspect_ratio")]
    pub aspect_ratio: String,

    /// Zoom to the robot's room while cleaning
    #[serde(default)]
    pub auto_zoom: bool,

    /// Keep the requested aspect ratio while zoomed
    #[serde(default = "defaults::enabled")]
    pub zoom_lock_ratio: bool,

    /// Extra trim from the top edge (pixels)
    #[serde(default)]
    pub offset_top: i64,

    /// Extra trim from the bottom edge (pixels)
    #[serde(default)]
    pub offset_down: i64,

    /// Extra trim from the left edge (pixels)
    #[serde(default)]
    pub offset_left: i64,

    /// Extra trim from the right edge (pixels)
    #[serde(default)]
    pub offset_right: i64,

    /// Consecutive frames without image data before reporting "no data"
    #[serde(default = "defaults::max_empty_frames")]
    pub max_empty_frames: u32,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            margin: defaults::margin(),
            rotation: 0,
            aspect_ratio: defaults::aspect_ratio(),
            auto_zoom: false,
            zoom_lock_ratio: true,
            offset_top: 0,
            offset_down: 0,
            offset_left: 0,
            offset_right: 0,
            max_empty_frames: defaults::max_empty_frames(),
        }
    }
}
