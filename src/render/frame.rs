//! Output of one render pass.

use crate::core::{CalibrationPoint, ImageSize, RoomProperty};
use crate::draw::RasterBuffer;
use crate::error::Result;

/// A finished frame with the metadata consumers need to map taps on the
/// image back to vacuum coordinates.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    /// Final RGBA image
    pub image: RasterBuffer,
    /// Image corners in vacuum coordinates
    pub calibration: [CalibrationPoint; 4],
    /// Rooms found in the map, in document units
    pub rooms: Vec<RoomProperty>,
    /// Frames since the base layer was last drawn
    pub frame_number: u32,
    /// Image size used for calibration
    pub crop_img_size: ImageSize,
}

impl RenderedFrame {
    /// Encode the image as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.image.to_png()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
