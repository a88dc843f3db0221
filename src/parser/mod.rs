//! Map parsers for both firmware families.
//!
//! | Format | Parser | Input |
//! |--------|--------|-------|
//! | Rand256 | [`BinaryMapParser`] | decompressed TLV bytes |
//! | Hypfer | [`JsonMapExtractor`] | parsed JSON value |
//!
//! Both produce a [`MapDocument`](crate::core::MapDocument) so everything
//! downstream is format independent.

pub mod hypfer;
pub mod rand256;
mod rooms;

pub use hypfer::{Entity, JsonMapExtractor};
pub use rand256::{BinaryMapParser, BlockType, MapHeader};
pub use rooms::{DestinationIndex, room_at, room_properties};
