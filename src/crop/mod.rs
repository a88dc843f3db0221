//! Crop engine: auto-trim, room zoom, rotation, persisted crop box and
//! calibration points.

mod auto_crop;
mod calibration;
mod store;

pub use auto_crop::{AutoCropZoom, CropOffsets, room_box};
pub use calibration::calibration_points;
pub use store::CropStore;
