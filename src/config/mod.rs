//! Unified configuration loading for ChitraMap.
//!
//! Loads all configuration from a single TOML file with sensible defaults.
//!
//! ## Configuration Sections
//!
//! | Section | Description |
//! |---------|-------------|
//! | [`ColorSection`] | Base colors and the 16-slot room palette |
//! | [`ImageSection`] | Margins, rotation, aspect ratio, offsets, zoom |
//! | [`DecompressSection`] | Sync thresholds, cache, worker pools |
//! | [`PersistenceSection`] | Crop box storage directory |
//! | [`ObstacleSection`] | Obstacle image download timeouts |
//!
//! ## Example TOML
//!
//! ```toml
//! [colors]
//! background = [0, 125, 255, 255]
//! wall = [255, 255, 0, 255]
//!
//! [image]
//! margin = 100
//! rotation = 90           # 0, 90, 180, 270
//! aspect_ratio = "16,9"   # or "None"
//! auto_zoom = true
//!
//! [decompress]
//! max_concurrent = 4
//! cache_ttl_secs = 600
//!
//! [persistence]
//! storage_dir = "/data/chitra"
//! ```

mod chitra;
mod colors;
mod decompress;
mod defaults;
mod image;
mod persistence;

pub use chitra::ChitraConfig;
pub use colors::ColorSection;
pub use decompress::DecompressSection;
pub use image::ImageSection;
pub use persistence::{ObstacleSection, PersistenceSection};
