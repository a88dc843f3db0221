//! Valetudo RE (Rand256) binary map parser.
//!
//! Map format: `[HEADER 0x14 bytes] [BLOCK] [BLOCK] ...`
//!
//! Header:
//! - `0x00` magic `"rr"`
//! - `0x02` header length (u16)
//! - `0x04` data length (u32)
//! - `0x08` version major (u16), `0x0A` minor (u16)
//! - `0x0C` map index (u32), `0x10` map sequence (u32)
//!
//! Block: `[TYPE u16] [HEADER_LEN u16] [LEN u32] [...header...] [payload]`,
//! the next block starts at `offset + HEADER_LEN + LEN`.
//!
//! All integers are little-endian. The Y axis points up in the firmware
//! frame; every Y coordinate is flipped (`DIMENSION_MM - y`) before it
//! reaches the [`MapDocument`].

use std::collections::HashMap;

use crate::core::{
    CompressedRun, DIMENSION_MM, DIMENSION_PIXELS, FormatTag, ImageSize, LayerKind, MapDocument,
    MapLayer, Point, Polygon, ROOM_SLOTS, RobotPosition, Segment,
};
use crate::error::{Error, Result};

/// Magic bytes
pub const MAGIC: [u8; 2] = *b"rr";

/// Fixed header size
pub const HEADER_SIZE: usize = 0x14;

/// Pixels per grid cell in the rendered image
pub const PIXEL_SIZE: u32 = 5;

// ===== Header Byte Offsets =====

/// Header length (u16)
pub const OFFSET_HEADER_LENGTH: usize = 0x02;
/// Data length (u32)
pub const OFFSET_DATA_LENGTH: usize = 0x04;
/// Version major (u16)
pub const OFFSET_VERSION_MAJOR: usize = 0x08;
/// Version minor (u16)
pub const OFFSET_VERSION_MINOR: usize = 0x0A;
/// Map index (u32), zero until the first full map is available
pub const OFFSET_MAP_INDEX: usize = 0x0C;
/// Map sequence (u32)
pub const OFFSET_MAP_SEQUENCE: usize = 0x10;

// ===== Block Layout =====

/// Size of the common block header (type, header length, length)
const BLOCK_HEADER_SIZE: usize = 0x08;
/// Image blocks with a header longer than this carry a segment count
const IMAGE_PLAIN_HEADER_LENGTH: u16 = 24;

/// Pixel class in the low 3 bits of an image byte
const PIXEL_TYPE_MASK: u8 = 0x07;
const PIXEL_TYPE_NONE: u8 = 0;
const PIXEL_TYPE_WALL: u8 = 1;
/// Segment id in the high 5 bits
const SEGMENT_MASK: u8 = 0xF8;

/// Block type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BlockType {
    /// Dock position
    ChargerLocation = 1,
    /// Floor / wall / segment bitmap
    Image = 2,
    /// Driven path
    Path = 3,
    /// Path of the current go-to job
    GotoPath = 4,
    /// Planned path to the go-to target
    GotoPredictedPath = 5,
    /// Zones of the running zoned clean
    CurrentlyCleanedZones = 6,
    /// Go-to target
    GotoTarget = 7,
    /// Robot pose
    RobotPosition = 8,
    /// No-go zones
    ForbiddenZones = 9,
    /// Virtual walls
    VirtualWalls = 10,
    /// Segments of the running segment clean
    CurrentlyCleanedBlocks = 11,
    /// No-mop zones
    ForbiddenMopZones = 12,
    /// Payload digest
    Digest = 1024,
}

impl BlockType {
    /// Map a raw tag to a known block type
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            1 => BlockType::ChargerLocation,
            2 => BlockType::Image,
            3 => BlockType::Path,
            4 => BlockType::GotoPath,
            5 => BlockType::GotoPredictedPath,
            6 => BlockType::CurrentlyCleanedZones,
            7 => BlockType::GotoTarget,
            8 => BlockType::RobotPosition,
            9 => BlockType::ForbiddenZones,
            10 => BlockType::VirtualWalls,
            11 => BlockType::CurrentlyCleanedBlocks,
            12 => BlockType::ForbiddenMopZones,
            1024 => BlockType::Digest,
            _ => return None,
        })
    }
}

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapHeader {
    /// Header length in bytes
    pub header_length: u16,
    /// Payload length in bytes
    pub data_length: u32,
    /// Format version (major, minor)
    pub version: (u16, u16),
    /// Map index; zero means no full map yet
    pub map_index: u32,
    /// Map sequence number
    pub map_sequence: u32,
}

/// Bounds-checked little-endian reads.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.buf.get(offset..end))
            .ok_or(Error::OutOfBounds {
                offset,
                len,
                size: self.buf.len(),
            })
    }

    fn u16(&self, offset: usize) -> Result<u16> {
        let b = self.bytes(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&self, offset: usize) -> Result<u32> {
        let b = self.bytes(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&self, offset: usize) -> Result<i32> {
        let b = self.bytes(offset, 4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

/// Image block contents before conversion to layers.
#[derive(Debug, Default)]
struct ImageBlock {
    top: i32,
    left: i32,
    height: i32,
    width: i32,
    segment_count: i32,
    floor: Vec<CompressedRun>,
    walls: Vec<CompressedRun>,
    /// Segment id → runs, in order of first appearance
    segments: Vec<(u32, Vec<CompressedRun>)>,
}

/// Path block: points plus the firmware's heading field.
#[derive(Debug, Default)]
struct PathBlock {
    current_angle: u32,
    points: Vec<Point>,
}

/// Raw blocks, coordinates still in the firmware frame.
#[derive(Debug, Default)]
struct Blocks {
    image: Option<ImageBlock>,
    robot: Option<(Point, Option<i32>)>,
    charger: Option<Point>,
    path: Option<PathBlock>,
    predicted_path: Option<PathBlock>,
    goto_target: Option<Point>,
    cleaned_zones: Vec<[i32; 4]>,
    forbidden_zones: Vec<[i32; 8]>,
    forbidden_mop_zones: Vec<[i32; 8]>,
    virtual_walls: Vec<[i32; 4]>,
}

/// Appends pixels to runs, merging horizontally adjacent cells.
fn push_pixel(runs: &mut Vec<CompressedRun>, x: u32, y: u32) {
    if let Some(last) = runs.last_mut()
        && last.y == y
        && last.x.checked_add(last.length) == Some(x)
    {
        last.length += 1;
        return;
    }
    runs.push(CompressedRun::new(x, y, 1));
}

#[inline]
fn flip_y(y: i32) -> i32 {
    DIMENSION_MM - y
}

/// Parser for the binary map format.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryMapParser;

impl BinaryMapParser {
    /// Decode the fixed header.
    pub fn parse_header(buf: &[u8]) -> Result<MapHeader> {
        let r = Reader::new(buf);
        let magic = r.bytes(0, 2)?;
        if magic != MAGIC {
            return Err(Error::InvalidHeader(format!(
                "bad map magic {:02x} {:02x}",
                magic[0], magic[1]
            )));
        }
        Ok(MapHeader {
            header_length: r.u16(OFFSET_HEADER_LENGTH)?,
            data_length: r.u32(OFFSET_DATA_LENGTH)?,
            version: (r.u16(OFFSET_VERSION_MAJOR)?, r.u16(OFFSET_VERSION_MINOR)?),
            map_index: r.u32(OFFSET_MAP_INDEX)?,
            map_sequence: r.u32(OFFSET_MAP_SEQUENCE)?,
        })
    }

    /// Parse a decompressed map.
    ///
    /// Returns `Ok(None)` while the vacuum has not produced a full map yet
    /// (`map_index == 0`). With `pixels == false` the image block only
    /// yields dimensions and segment ids, which is much cheaper.
    pub fn parse(buf: &[u8], pixels: bool) -> Result<Option<MapDocument>> {
        let header = Self::parse_header(buf)?;
        if header.map_index == 0 {
            log::debug!("Binary map not ready (map_index 0)");
            return Ok(None);
        }

        let start = (header.header_length as usize).max(HEADER_SIZE);
        let blocks = Self::parse_blocks(buf, start, pixels)?;
        let doc = Self::build_document(&header, blocks)?;
        log::debug!(
            "Parsed binary map v{}.{} index {} seq {}: {} segments",
            header.version.0,
            header.version.1,
            header.map_index,
            header.map_sequence,
            doc.segment_ids.len()
        );
        Ok(Some(doc))
    }

    fn parse_blocks(buf: &[u8], start: usize, pixels: bool) -> Result<Blocks> {
        let r = Reader::new(buf);
        let mut blocks = Blocks::default();
        let mut offset = start;

        while offset < buf.len() {
            let type_id = r.u16(offset)?;
            let hlength = r.u16(offset + 0x02)?;
            let length = r.u32(offset + 0x04)? as usize;

            match BlockType::from_u16(type_id) {
                Some(BlockType::RobotPosition) => {
                    blocks.robot = Some(Self::parse_position(&r, offset, length)?);
                }
                Some(BlockType::ChargerLocation) => {
                    blocks.charger = Some(Self::parse_position(&r, offset, length)?.0);
                }
                Some(BlockType::Image) => {
                    blocks.image = Some(Self::parse_image(&r, offset, hlength, length, pixels)?);
                }
                Some(BlockType::Path) => {
                    blocks.path = Some(Self::parse_path(&r, offset, length)?);
                }
                Some(BlockType::GotoPredictedPath) => {
                    blocks.predicted_path = Some(Self::parse_path(&r, offset, length)?);
                }
                Some(BlockType::GotoTarget) => {
                    blocks.goto_target = Some(Point::new(
                        r.u16(offset + 0x08)? as i32,
                        r.u16(offset + 0x0A)? as i32,
                    ));
                }
                Some(BlockType::CurrentlyCleanedZones) => {
                    blocks.cleaned_zones = Self::parse_records::<4>(&r, offset, length, 8)?;
                }
                Some(BlockType::ForbiddenZones) => {
                    blocks.forbidden_zones = Self::parse_records::<8>(&r, offset, length, 16)?;
                }
                Some(BlockType::ForbiddenMopZones) => {
                    blocks.forbidden_mop_zones = Self::parse_records::<8>(&r, offset, length, 16)?;
                }
                Some(BlockType::VirtualWalls) => {
                    blocks.virtual_walls = Self::parse_records::<4>(&r, offset, length, 8)?;
                }
                Some(BlockType::GotoPath)
                | Some(BlockType::CurrentlyCleanedBlocks)
                | Some(BlockType::Digest) => {}
                None => log::trace!("Skipping unknown block type {type_id} at {offset:#x}"),
            }

            let advance = hlength as usize + length;
            if advance == 0 {
                return Err(Error::Decode(format!(
                    "zero-length block type {type_id} at {offset:#x}"
                )));
            }
            offset += advance;
        }
        Ok(blocks)
    }

    /// Robot / charger block: `x @+8`, `y @+12`, optional `angle i32 @+16`.
    fn parse_position(r: &Reader, offset: usize, length: usize) -> Result<(Point, Option<i32>)> {
        let x = r.u16(offset + 0x08)? as i32;
        let y = r.u16(offset + 0x0C)? as i32;
        let angle = if length >= 12 {
            Some(r.i32(offset + 0x10)?)
        } else {
            None
        };
        Ok((Point::new(x, y), angle))
    }

    fn parse_image(
        r: &Reader,
        offset: usize,
        hlength: u16,
        length: usize,
        pixels: bool,
    ) -> Result<ImageBlock> {
        let g3 = if hlength > IMAGE_PLAIN_HEADER_LENGTH { 4 } else { 0 };
        let segment_count = if g3 > 0 { r.i32(offset + 0x08)? } else { 0 };
        let raw_top = r.i32(offset + 0x08 + g3)?;
        let left = r.i32(offset + 0x0C + g3)?;
        let height = r.i32(offset + 0x10 + g3)?;
        let width = r.i32(offset + 0x14 + g3)?;
        let top = DIMENSION_PIXELS
            .checked_sub(raw_top)
            .and_then(|t| t.checked_sub(height))
            .ok_or_else(|| {
                Error::Decode(format!("image block top {raw_top} height {height} out of range"))
            })?;

        let mut image = ImageBlock {
            top,
            left,
            height,
            width,
            segment_count,
            ..Default::default()
        };
        if height <= 0 || width <= 0 {
            return Ok(image);
        }

        let data = r.bytes(offset + 0x18 + g3, length)?;
        let mut segment_index: HashMap<u32, usize> = HashMap::new();

        for (i, &byte) in data.iter().enumerate() {
            let kind = byte & PIXEL_TYPE_MASK;
            if kind == PIXEL_TYPE_NONE {
                continue;
            }
            let segment = ((byte & SEGMENT_MASK) >> 3) as u32;
            if kind != PIXEL_TYPE_WALL && segment != 0 && !segment_index.contains_key(&segment) {
                segment_index.insert(segment, image.segments.len());
                image.segments.push((segment, Vec::new()));
            }
            if !pixels {
                continue;
            }

            let i = i as i64;
            let x = i % width as i64 + left as i64;
            let y = (height as i64 - 1 - i / width as i64) + top as i64;
            let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                continue;
            };

            if kind == PIXEL_TYPE_WALL {
                push_pixel(&mut image.walls, x, y);
            } else if segment == 0 {
                push_pixel(&mut image.floor, x, y);
            } else if let Some(&idx) = segment_index.get(&segment) {
                push_pixel(&mut image.segments[idx].1, x, y);
            }
        }
        Ok(image)
    }

    /// Path block: `current_angle u32 @+16`, `(u16, u16)` points from `+20`.
    fn parse_path(r: &Reader, offset: usize, length: usize) -> Result<PathBlock> {
        let current_angle = r.u32(offset + 0x10)?;
        let mut points = Vec::with_capacity(length / 4);
        for i in (0..length).step_by(4) {
            points.push(Point::new(
                r.u16(offset + 0x14 + i)? as i32,
                r.u16(offset + 0x16 + i)? as i32,
            ));
        }
        Ok(PathBlock {
            current_angle,
            points,
        })
    }

    /// Count-prefixed records of `N` u16 values, `stride` bytes apart,
    /// starting at `+12`.
    fn parse_records<const N: usize>(
        r: &Reader,
        offset: usize,
        length: usize,
        stride: usize,
    ) -> Result<Vec<[i32; N]>> {
        let count = r.u32(offset + 0x08)? as usize;
        let mut records = Vec::with_capacity(count.min(length / stride.max(1)));
        for i in (0..length).step_by(stride).take(count) {
            let mut record = [0i32; N];
            for (k, value) in record.iter_mut().enumerate() {
                *value = r.u16(offset + 0x0C + i + 2 * k)? as i32;
            }
            records.push(record);
        }
        Ok(records)
    }

    fn build_document(header: &MapHeader, blocks: Blocks) -> Result<MapDocument> {
        let image = blocks
            .image
            .ok_or_else(|| Error::Decode("binary map has no image block".into()))?;

        let side = DIMENSION_PIXELS as u32 * PIXEL_SIZE;
        let mut doc = MapDocument::new(FormatTag::Rand256, ImageSize::new(side, side), PIXEL_SIZE);
        doc.map_id = Some(format!("{}/{}", header.map_index, header.map_sequence));
        log::trace!(
            "Image block {}x{} at ({}, {}), {} segments declared",
            image.width,
            image.height,
            image.left,
            image.top,
            image.segment_count
        );

        if !image.floor.is_empty() {
            doc.push_layer(MapLayer::new(LayerKind::Floor, image.floor));
        }
        for (slot, (id, runs)) in image.segments.into_iter().enumerate() {
            doc.segment_ids.push(id);
            if runs.is_empty() {
                continue;
            }
            let mut layer = MapLayer::new(LayerKind::Segment, runs);
            layer.segment_id = Some(id);
            layer.room_slot = Some(slot % ROOM_SLOTS);
            doc.push_layer(layer);
        }
        if !image.walls.is_empty() {
            doc.push_layer(MapLayer::new(LayerKind::Wall, image.walls));
        }

        let flip = |p: Point| Point::new(p.x, flip_y(p.y));

        if let Some(path) = blocks.path {
            let points: Vec<Point> = path.points.into_iter().map(flip).collect();
            let heading = path_heading(&points).unwrap_or(path.current_angle as f64);
            if let Some((pos, angle)) = blocks.robot {
                doc.robot_position = Some(RobotPosition {
                    x: pos.x,
                    y: flip_y(pos.y),
                    angle: angle.map(f64::from).unwrap_or(heading),
                });
            }
            if !points.is_empty() {
                doc.paths.push(points);
            }
        } else if let Some((pos, angle)) = blocks.robot {
            doc.robot_position = Some(RobotPosition {
                x: pos.x,
                y: flip_y(pos.y),
                angle: angle.unwrap_or(0) as f64,
            });
        }

        if let Some(predicted) = blocks.predicted_path {
            doc.predicted_path = predicted.points.into_iter().map(flip).collect();
        }
        doc.charger_position = blocks.charger.map(flip);
        doc.goto_target = blocks.goto_target.map(flip);

        doc.zones = blocks
            .cleaned_zones
            .iter()
            .map(|z| Polygon::rectangle(z[0], flip_y(z[1]), z[2], flip_y(z[3])))
            .collect();

        let quad = |z: &[i32; 8]| {
            Polygon::new(vec![
                Point::new(z[0], flip_y(z[1])),
                Point::new(z[2], flip_y(z[3])),
                Point::new(z[4], flip_y(z[5])),
                Point::new(z[6], flip_y(z[7])),
            ])
        };
        doc.forbidden_zones = blocks.forbidden_zones.iter().map(quad).collect();
        doc.forbidden_mop_zones = blocks.forbidden_mop_zones.iter().map(quad).collect();

        doc.virtual_walls = blocks
            .virtual_walls
            .iter()
            .map(|w| {
                Segment::new(
                    Point::new(w[0], flip_y(w[1])),
                    Point::new(w[2], flip_y(w[3])),
                )
            })
            .collect();

        doc.validate()?;
        Ok(doc)
    }
}

/// Heading in degrees of the last path segment.
fn path_heading(points: &[Point]) -> Option<f64> {
    let [.., a, b] = points else {
        return None;
    };
    Some(((b.y - a.y) as f64).atan2((b.x - a.x) as f64).to_degrees())
}
