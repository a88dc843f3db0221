//! Error types for ChitraMap

use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ChitraMap error types
///
/// Every variant is recoverable at the frame boundary: a failing payload is
/// dropped and the previously rendered image stays current.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// PNG encoding or image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Payload is empty or its magic bytes / header checksum are wrong
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Corrupt TLV block or JSON document
    #[error("Decode error: {0}")]
    Decode(String),

    /// Read past the end of a binary buffer
    #[error("Out of bounds read: {len} bytes at offset {offset:#06x}, buffer is {size} bytes")]
    OutOfBounds {
        /// Offset of the read
        offset: usize,
        /// Bytes requested
        len: usize,
        /// Buffer size
        size: usize,
    },

    /// Auto-crop produced a box no larger than the margin
    #[error("Trim degenerate: {width}x{height} is within margin {margin}")]
    TrimDegenerate {
        /// Trimmed width
        width: i64,
        /// Trimmed height
        height: i64,
        /// Configured margin
        margin: u32,
    },

    /// Obstacle image download exceeded its deadline
    #[error("Download timed out after {0:?}")]
    DownloadTimeout(Duration),

    /// Obstacle image download failed
    #[error("Download failed: {0}")]
    Download(String),

    /// Aspect-ratio request with unusable dimensions
    #[error("Invalid resize parameter: {0}")]
    ResizeParameter(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device is still rendering the previous frame
    #[error("Device busy: {0}")]
    Busy(String),

    /// Worker pool has been shut down
    #[error("Worker pool closed")]
    PoolClosed,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that only invalidate the current frame.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidHeader(_)
                | Error::Decode(_)
                | Error::OutOfBounds { .. }
                | Error::Json(_)
                | Error::TrimDegenerate { .. }
                | Error::ResizeParameter(_)
                | Error::Busy(_)
        )
    }
}
