//! Core data model: document, primitives and identifiers.

mod document;
mod types;

pub use document::{
    DIMENSION_MM, DIMENSION_PIXELS, LayerKind, MapDocument, MapLayer, ROOM_SLOTS, RoomProperty,
};
pub use types::{
    CalibrationPoint, Color, CompressedRun, CropBox, DeviceId, FormatTag, ImageSize, Obstacle,
    Point, PoolKey, PoolKind, Polygon, RobotPosition, Segment, VacuumState,
};
