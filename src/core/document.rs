//! Format-agnostic map document produced by both parsers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::types::{
    CompressedRun, FormatTag, ImageSize, Obstacle, Point, Polygon, RobotPosition, Segment,
};
use crate::error::{Error, Result};

/// Binary map grid dimension (cells per side).
pub const DIMENSION_PIXELS: i32 = 1024;

/// Binary map extent in millimetres (50 mm per cell).
pub const DIMENSION_MM: i32 = 50 * DIMENSION_PIXELS;

/// Number of room color slots; room buckets wrap around after this.
pub const ROOM_SLOTS: usize = 16;

/// Semantic kind of a pixel layer.
///
/// Ordering is draw order: floor first, then rooms, walls on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Floor not assigned to any room
    Floor,
    /// Room segment
    Segment,
    /// Walls
    Wall,
}

impl LayerKind {
    /// Parse the `type` field of a JSON `MapLayer`
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "floor" => Some(LayerKind::Floor),
            "segment" => Some(LayerKind::Segment),
            "wall" => Some(LayerKind::Wall),
            _ => None,
        }
    }
}

/// One layer of run-length pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapLayer {
    /// Layer kind
    pub kind: LayerKind,
    /// Filled runs in grid units
    pub runs: Vec<CompressedRun>,
    /// Firmware segment id (segment layers)
    pub segment_id: Option<u32>,
    /// Room name, when the firmware provides one
    pub name: Option<String>,
    /// Room is part of the running clean job
    pub active: bool,
    /// Room color slot in `0..ROOM_SLOTS`
    pub room_slot: Option<usize>,
}

impl MapLayer {
    /// Create a layer without room metadata
    pub fn new(kind: LayerKind, runs: Vec<CompressedRun>) -> Self {
        Self {
            kind,
            runs,
            segment_id: None,
            name: None,
            active: false,
            room_slot: None,
        }
    }

    /// Total number of filled cells
    pub fn pixel_count(&self) -> u64 {
        self.runs.iter().map(|r| r.length as u64).sum()
    }
}

#[inline]
fn midpoint(a: i32, b: i32) -> i32 {
    ((a as i64 + b as i64) / 2) as i32
}

/// Room bounding data used for zoom and room pickers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomProperty {
    /// Firmware segment id
    pub id: u32,
    /// Room name
    pub name: Option<String>,
    /// Bounding box corners, clockwise from top-left
    pub outline: [Point; 4],
    /// Bounding box midpoint
    pub centroid: Point,
}

impl RoomProperty {
    /// Build a room from its bounding box
    pub fn from_bounds(id: u32, name: Option<String>, min: Point, max: Point) -> Self {
        Self {
            id,
            name,
            outline: [
                Point::new(min.x, min.y),
                Point::new(max.x, min.y),
                Point::new(max.x, max.y),
                Point::new(min.x, max.y),
            ],
            centroid: Point::new(midpoint(min.x, max.x), midpoint(min.y, max.y)),
        }
    }

    /// Top-left corner
    pub fn min(&self) -> Point {
        self.outline[0]
    }

    /// Bottom-right corner
    pub fn max(&self) -> Point {
        self.outline[2]
    }

    /// True when `p` lies inside the bounding box (edges inclusive)
    pub fn contains(&self, p: Point) -> bool {
        let (min, max) = (self.min(), self.max());
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }
}

/// Parsed map, independent of the wire format.
///
/// Entity coordinates (robot, paths, zones...) are in document units;
/// divide by [`coord_divisor`](Self::coord_divisor) to get image pixels.
/// Layer runs are in grid units; multiply by [`pixel_size`](Self::pixel_size).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    /// Source format
    pub format: FormatTag,
    /// Raster size in pixels
    pub image_size: ImageSize,
    /// Pixels per grid cell
    pub pixel_size: u32,
    /// Document units per image pixel (1 for JSON, 10 for binary)
    pub coord_divisor: i32,
    /// Pixel layers by kind
    pub layers: BTreeMap<LayerKind, Vec<MapLayer>>,
    /// Robot pose
    pub robot_position: Option<RobotPosition>,
    /// Dock position
    pub charger_position: Option<Point>,
    /// Driven paths
    pub paths: Vec<Vec<Point>>,
    /// Planned path to the go-to target
    pub predicted_path: Vec<Point>,
    /// Go-to target
    pub goto_target: Option<Point>,
    /// Zones in the running clean job
    pub zones: Vec<Polygon>,
    /// No-go areas
    pub forbidden_zones: Vec<Polygon>,
    /// No-mop areas
    pub forbidden_mop_zones: Vec<Polygon>,
    /// Virtual walls
    pub virtual_walls: Vec<Segment>,
    /// Camera-detected obstacles
    pub obstacles: Vec<Obstacle>,
    /// Room segment ids present in the map
    pub segment_ids: Vec<u32>,
    /// Firmware map identity (JSON nonce, or binary `index/sequence`)
    pub map_id: Option<String>,
}

impl MapDocument {
    /// Create an empty document
    pub fn new(format: FormatTag, image_size: ImageSize, pixel_size: u32) -> Self {
        Self {
            format,
            image_size,
            pixel_size,
            coord_divisor: if format.is_binary() { 10 } else { 1 },
            layers: BTreeMap::new(),
            robot_position: None,
            charger_position: None,
            paths: Vec::new(),
            predicted_path: Vec::new(),
            goto_target: None,
            zones: Vec::new(),
            forbidden_zones: Vec::new(),
            forbidden_mop_zones: Vec::new(),
            virtual_walls: Vec::new(),
            obstacles: Vec::new(),
            segment_ids: Vec::new(),
            map_id: None,
        }
    }

    /// Append a layer under its kind
    pub fn push_layer(&mut self, layer: MapLayer) {
        self.layers.entry(layer.kind).or_default().push(layer);
    }

    /// Layers of one kind (empty slice when absent)
    pub fn layers_of(&self, kind: LayerKind) -> &[MapLayer] {
        self.layers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the document has no pixel layers
    pub fn has_layers(&self) -> bool {
        self.layers.values().any(|l| !l.is_empty())
    }

    /// Total filled cells across all wall layers
    pub fn wall_pixel_count(&self) -> u64 {
        self.layers_of(LayerKind::Wall)
            .iter()
            .map(MapLayer::pixel_count)
            .sum()
    }

    /// Active flags of the segment layers, in layer order
    pub fn active_flags(&self) -> Vec<bool> {
        self.layers_of(LayerKind::Segment)
            .iter()
            .map(|l| l.active)
            .collect()
    }

    /// Mark segment layers active when their id is in `ids`.
    pub fn set_active_segments(&mut self, ids: &[u32]) {
        if let Some(segments) = self.layers.get_mut(&LayerKind::Segment) {
            for layer in segments {
                layer.active = layer.segment_id.is_some_and(|id| ids.contains(&id));
            }
        }
    }

    /// Convert a document point to image pixels
    pub fn to_pixel(&self, p: Point) -> Point {
        if self.coord_divisor <= 1 {
            return p;
        }
        let d = self.coord_divisor as f64;
        Point::new(
            (p.x as f64 / d).round() as i32,
            (p.y as f64 / d).round() as i32,
        )
    }

    /// Robot heading in the rasterizer convention, in degrees.
    ///
    /// JSON angles are used as reported. Binary angles are rotated a quarter
    /// turn, `(raw + 450) % 360`, to account for the flipped Y axis.
    pub fn robot_heading(&self) -> Option<f64> {
        let robot = self.robot_position?;
        Some(match self.format {
            FormatTag::Hypfer => robot.angle,
            FormatTag::Rand256 => (robot.angle + 450.0).rem_euclid(360.0),
        })
    }

    /// Check the structural invariants of the document.
    pub fn validate(&self) -> Result<()> {
        if self.pixel_size == 0 {
            return Err(Error::Decode("pixel size must be positive".into()));
        }
        if self.has_layers() && self.image_size.is_empty() {
            return Err(Error::Decode(format!(
                "layers present but image size is {}x{}",
                self.image_size.width, self.image_size.height
            )));
        }
        Ok(())
    }
}
