//! Per-frame render settings.

use crate::config::{ChitraConfig, ColorSection};
use crate::core::VacuumState;
use crate::crop::CropOffsets;
use crate::error::Result;
use crate::resize::AspectRatio;

/// Everything one frame needs from configuration and vacuum state.
///
/// Built once from [`ChitraConfig`] and updated with the vacuum state as
/// it changes; passed by reference to the renderer and crop engine.
#[derive(Clone, Debug)]
pub struct RenderContext {
    /// Palette
    pub colors: ColorSection,
    /// Margin around the trimmed map
    pub margin: u32,
    /// Counter-clockwise rotation: 0, 90, 180 or 270
    pub rotation: u32,
    /// User trims applied on top of the auto-crop box
    pub offsets: CropOffsets,
    /// Zoom to the robot's room while cleaning
    pub auto_zoom: bool,
    /// Letterbox zoomed frames to the requested ratio
    pub zoom_lock_ratio: bool,
    /// Requested output aspect ratio
    pub aspect_ratio: Option<AspectRatio>,
    /// Current vacuum state
    pub vacuum_state: VacuumState,
    /// Segment ids in the running clean job
    pub active_segments: Vec<u32>,
}

impl RenderContext {
    /// Build a context from configuration, vacuum state unknown
    pub fn from_config(config: &ChitraConfig) -> Result<Self> {
        let image = &config.image;
        Ok(Self {
            colors: config.colors.clone(),
            margin: image.margin,
            rotation: image.rotation,
            offsets: CropOffsets {
                top: image.offset_top,
                down: image.offset_down,
                left: image.offset_left,
                right: image.offset_right,
            },
            auto_zoom: image.auto_zoom,
            zoom_lock_ratio: image.zoom_lock_ratio,
            aspect_ratio: config.aspect_ratio()?,
            vacuum_state: VacuumState::Unknown,
            active_segments: Vec::new(),
        })
    }

    /// Set the vacuum state
    pub fn with_state(mut self, state: VacuumState) -> Self {
        self.vacuum_state = state;
        self
    }

    /// Set the segments of the running clean job
    pub fn with_active_segments(mut self, ids: Vec<u32>) -> Self {
        self.active_segments = ids;
        self
    }

    /// Vacuum is on its dock
    pub fn is_docked(&self) -> bool {
        self.vacuum_state == VacuumState::Docked
    }

    /// Vacuum is cleaning
    pub fn is_cleaning(&self) -> bool {
        self.vacuum_state == VacuumState::Cleaning
    }

    /// Room zoom applies to this frame
    pub fn wants_zoom(&self) -> bool {
        self.auto_zoom && self.is_cleaning()
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            colors: ColorSection::default(),
            margin: ChitraConfig::default().image.margin,
            rotation: 0,
            offsets: CropOffsets::default(),
            auto_zoom: false,
            zoom_lock_ratio: true,
            aspect_ratio: None,
            vacuum_state: VacuumState::Unknown,
            active_segments: Vec::new(),
        }
    }
}
