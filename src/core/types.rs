//! Primitive types shared by parsers, rasterizer and crop engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// RGBA color.
pub type Color = [u8; 4];

/// Wire format of a map payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatTag {
    /// zlib-compressed JSON document (Valetudo)
    Hypfer,
    /// gzip-compressed binary TLV stream (Valetudo RE)
    Rand256,
}

impl FormatTag {
    /// True for the binary TLV format.
    pub fn is_binary(self) -> bool {
        matches!(self, FormatTag::Rand256)
    }

    /// Parse a format name as used in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hypfer" | "json" | "valetudo" => Some(FormatTag::Hypfer),
            "rand256" | "binary" | "valetudo_re" => Some(FormatTag::Rand256),
            _ => None,
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTag::Hypfer => write!(f, "Hypfer"),
            FormatTag::Rand256 => write!(f, "Rand256"),
        }
    }
}

/// Identity of one vacuum.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the device id from an MQTT topic.
    ///
    /// Valetudo topics look like `valetudo/<robot>/MapData/map-data`, so the
    /// first two segments identify the vacuum. Topics with a single segment
    /// are used whole.
    pub fn from_topic(topic: &str) -> Self {
        let mut parts = topic.trim_matches('/').splitn(3, '/');
        match (parts.next(), parts.next()) {
            (Some(a), Some(b)) => Self(format!("{a}/{b}")),
            (Some(a), None) => Self(a.to_string()),
            _ => Self(topic.to_string()),
        }
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-system safe form of the id (`/` and spaces replaced).
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of worker pool owned by a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolKind {
    /// Payload decompression and parsing
    Decompression,
    /// Obstacle image downloads
    Download,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Decompression => write!(f, "decompression"),
            PoolKind::Download => write!(f, "download"),
        }
    }
}

/// Composite key of a worker pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    /// Owning device
    pub device: DeviceId,
    /// Pool purpose
    pub kind: PoolKind,
}

impl PoolKey {
    /// Create a new pool key
    pub fn new(device: DeviceId, kind: PoolKind) -> Self {
        Self { device, kind }
    }

    /// Thread name prefix for workers of this pool
    pub fn thread_name(&self, index: usize) -> String {
        format!("{}-{}-{}", self.device.file_stem(), self.kind, index)
    }
}

/// A point in document coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// `(x, y, run_length)` triple: `length` filled grid cells starting at `(x, y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedRun {
    /// Grid column of the first cell
    pub x: u32,
    /// Grid row
    pub y: u32,
    /// Number of consecutive cells along X
    pub length: u32,
}

impl CompressedRun {
    /// Create a new run
    pub const fn new(x: u32, y: u32, length: u32) -> Self {
        Self { x, y, length }
    }
}

/// Robot pose as reported by the firmware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotPosition {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Heading in degrees, firmware convention
    pub angle: f64,
}

/// Closed polygon (zones, forbidden areas).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    /// Vertices in order
    pub points: Vec<Point>,
}

impl Polygon {
    /// Create a polygon from its vertices
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build a polygon from a flat `[x0, y0, x1, y1, ...]` list.
    pub fn from_flat(coords: &[i32]) -> Self {
        Self {
            points: coords
                .chunks_exact(2)
                .map(|c| Point::new(c[0], c[1]))
                .collect(),
        }
    }

    /// Axis-aligned rectangle spanned by two opposite corners.
    pub fn rectangle(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            points: vec![
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ],
        }
    }

    /// Bounding box as `(min, max)`, `None` for an empty polygon.
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some((min, max))
    }
}

/// Straight line segment (virtual walls).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint
    pub start: Point,
    /// Second endpoint
    pub end: Point,
}

impl Segment {
    /// Create a segment between two points
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// Obstacle reported by the vacuum's camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Detected object class
    pub label: Option<String>,
    /// Relative URL of the obstacle photo
    pub link: Option<String>,
}

/// Raster dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageSize {
    /// Create a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Persisted crop box, in pre-rotation pixel coordinates.
///
/// Field names match the on-disk JSON format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    /// Left edge (inclusive)
    pub trim_left: i64,
    /// Top edge (inclusive)
    pub trim_up: i64,
    /// Right edge (exclusive)
    pub trim_right: i64,
    /// Bottom edge (exclusive)
    pub trim_down: i64,
}

impl CropBox {
    /// Create a crop box from its edges
    pub const fn new(left: i64, up: i64, right: i64, down: i64) -> Self {
        Self {
            trim_left: left,
            trim_up: up,
            trim_right: right,
            trim_down: down,
        }
    }

    /// Width of the box
    pub fn width(&self) -> i64 {
        self.trim_right - self.trim_left
    }

    /// Height of the box
    pub fn height(&self) -> i64 {
        self.trim_down - self.trim_up
    }

    /// Edges as `[left, up, right, down]`
    pub fn as_array(&self) -> [i64; 4] {
        [self.trim_left, self.trim_up, self.trim_right, self.trim_down]
    }

    /// Clamp the box to an image of the given size.
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let w = width as i64;
        let h = height as i64;
        let left = self.trim_left.clamp(0, w);
        let up = self.trim_up.clamp(0, h);
        Self {
            trim_left: left,
            trim_up: up,
            trim_right: self.trim_right.clamp(left, w),
            trim_down: self.trim_down.clamp(up, h),
        }
    }
}

/// Corner mapping between vacuum and image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    /// Vacuum coordinate
    pub vacuum: Point,
    /// Image pixel coordinate
    pub map: Point,
}

/// Operating state of the vacuum, as far as rendering cares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VacuumState {
    /// On the dock
    Docked,
    /// Actively cleaning
    Cleaning,
    /// Driving back to the dock
    Returning,
    /// Paused mid-run
    Paused,
    /// Idle away from the dock
    Idle,
    /// Error state
    Error,
    /// Not yet reported
    #[default]
    Unknown,
}

impl VacuumState {
    /// Parse a Valetudo status string
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "docked" | "charging" => VacuumState::Docked,
            "cleaning" => VacuumState::Cleaning,
            "returning" => VacuumState::Returning,
            "paused" => VacuumState::Paused,
            "idle" => VacuumState::Idle,
            "error" => VacuumState::Error,
            _ => VacuumState::Unknown,
        }
    }
}
