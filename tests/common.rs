//! Test utilities for ChitraMap integration tests.
//!
//! Helpers to compress payloads and assemble Hypfer JSON and Rand256
//! binary maps.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use serde_json::{Value, json};

/// Route `log` output to the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// zlib-compress bytes (Hypfer payloads)
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// gzip-compress bytes (Rand256 payloads)
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Hypfer map document with one floor rectangle and the given entities.
pub fn hypfer_map(width: u32, height: u32, floor: [u32; 4], entities: Vec<Value>) -> Value {
    let [x0, y0, w, h] = floor;
    let pixels: Vec<u32> = (y0..y0 + h).flat_map(|y| [x0, y, w]).collect();
    json!({
        "__class": "ValetudoMap",
        "size": { "x": width, "y": height },
        "pixelSize": 5,
        "metaData": { "nonce": "test-map" },
        "layers": [
            { "__class": "MapLayer", "type": "floor", "compressedPixels": pixels }
        ],
        "entities": entities
    })
}

/// Hypfer robot entity
pub fn robot_entity(x: i32, y: i32, angle: f64) -> Value {
    json!({
        "__class": "PointMapEntity",
        "type": "robot_position",
        "points": [x, y],
        "metaData": { "angle": angle }
    })
}

/// Compressed Hypfer payload
pub fn hypfer_payload(map: &Value) -> Vec<u8> {
    zlib(map.to_string().as_bytes())
}

/// Pixel byte of a floor cell in a Rand256 image block
pub const RAND_FLOOR: u8 = 0x07;
/// Pixel byte of a wall cell
pub const RAND_WALL: u8 = 0x01;

/// Assembles Rand256 binary maps block by block.
pub struct RandMap {
    map_index: u32,
    blocks: Vec<u8>,
}

impl RandMap {
    pub fn new(map_index: u32) -> Self {
        Self {
            map_index,
            blocks: Vec::new(),
        }
    }

    fn block(mut self, type_id: u16, header: &[u8], payload: &[u8]) -> Self {
        let hlength = (8 + header.len()) as u16;
        self.blocks.extend_from_slice(&type_id.to_le_bytes());
        self.blocks.extend_from_slice(&hlength.to_le_bytes());
        self.blocks
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.blocks.extend_from_slice(header);
        self.blocks.extend_from_slice(payload);
        self
    }

    /// Image block with every cell set to `cell`
    pub fn image(self, top: i32, left: i32, height: i32, width: i32, cell: u8) -> Self {
        let mut header = Vec::new();
        header.extend_from_slice(&0i32.to_le_bytes()); // segment count
        for v in [top, left, height, width] {
            header.extend_from_slice(&v.to_le_bytes());
        }
        let pixels = vec![cell; (height * width) as usize];
        self.block(2, &header, &pixels)
    }

    /// Charger (1) or robot (8) position in millimetres
    pub fn position(self, type_id: u16, x: u32, y: u32, angle: i32) -> Self {
        let mut payload = Vec::new();
        payload.extend_from_slice(&x.to_le_bytes());
        payload.extend_from_slice(&y.to_le_bytes());
        payload.extend_from_slice(&angle.to_le_bytes());
        self.block(type_id, &[], &payload)
    }

    /// Raw (uncompressed) map bytes
    pub fn build(self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(0x14 + self.blocks.len());
        buf.extend_from_slice(b"rr");
        buf.extend_from_slice(&0x14u16.to_le_bytes());
        buf.extend_from_slice(&(self.blocks.len() as u32).to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&self.map_index.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&self.blocks);
        buf
    }

    /// Compressed map payload
    pub fn payload(self) -> Vec<u8> {
        gzip(&self.build())
    }
}
