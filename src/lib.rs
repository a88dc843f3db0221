//! # ChitraMap
//!
//! Robot vacuum map decoder and rasterizer.
//!
//! ## Overview
//!
//! ChitraMap turns the map telemetry published by Valetudo firmwares into
//! RGBA images with calibration metadata:
//!
//! - **Hypfer** - zlib-compressed JSON documents (Valetudo)
//! - **Rand256** - gzip-compressed binary block streams (Valetudo RE)
//!
//! Both formats decode into one format-agnostic [`MapDocument`], so drawing,
//! cropping and resizing never look at the wire format again.
//!
//! ## Pipeline
//!
//! ```text
//! (topic, payload, format)
//!         │
//!         ▼
//! DecompressionManager ── cache / priority worker pools
//!         │
//!         ├── Hypfer ──► JsonMapExtractor ─┐
//!         └── Rand256 ─► BinaryMapParser ──┤
//!                                          ▼
//!                                     MapDocument
//!                                          │
//!                     base layer (cached) + dynamic layer
//!                                          │
//!                           AutoCropZoom ─► OffsetResizer
//!                                          │
//!                                          ▼
//!                       RenderedFrame { image, calibration, rooms }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chitra_map::{ChitraConfig, DeviceRegistry, FormatTag, RenderContext};
//!
//! let config = ChitraConfig::load_default()?;
//! let ctx = RenderContext::from_config(&config)?;
//! let registry = DeviceRegistry::new(config);
//!
//! if let Some(frame) = registry.handle_payload(topic, &payload, FormatTag::Hypfer, &ctx)? {
//!     std::fs::write("map.png", frame.to_png()?)?;
//! }
//! ```
//!
//! ## Coordinates
//!
//! Entity coordinates stay in document units: image pixels for Hypfer maps,
//! millimetres for Rand256 maps (Y already flipped to grow downwards).
//! [`MapDocument::to_pixel`] converts either to image pixels.

// Unified configuration
pub mod config;

// Data model
pub mod core;

// Crop engine and calibration
pub mod crop;

// Payload decompression and caching
pub mod decompress;

// Rasterizer
pub mod draw;

pub mod error;

// Obstacle photo view
pub mod obstacle;

// Wire format parsers
pub mod parser;

// Device registry
pub mod registry;

// Frame rendering
pub mod render;

// Aspect-ratio padding
pub mod resize;

// Re-export commonly used types
pub use config::ChitraConfig;
pub use core::{
    CalibrationPoint, CropBox, DeviceId, FormatTag, ImageSize, MapDocument, Point, RoomProperty,
    VacuumState,
};
pub use crop::{AutoCropZoom, CropStore};
pub use decompress::{Decoded, DecompressStats, DecompressionManager};
pub use draw::RasterBuffer;
pub use error::{Error, Result};
pub use obstacle::{CameraMode, ImageFetcher, ObstacleView};
pub use parser::{BinaryMapParser, DestinationIndex, JsonMapExtractor};
pub use registry::{DeviceHandle, DeviceRegistry};
pub use render::{RenderContext, RenderPipeline, RenderedFrame};
pub use resize::{AspectRatio, OffsetResizer};
