//! Payload validation, inflation and parsing.
//!
//! | Format | Compression | Header check |
//! |--------|-------------|--------------|
//! | Hypfer | zlib | CMF `0x78`, `(CMF·256 + FLG) % 31 == 0` |
//! | Rand256 | gzip | magic `0x1f 0x8b` |

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};
use serde_json::Value;

use crate::core::{FormatTag, MapDocument};
use crate::error::{Error, Result};
use crate::parser::{BinaryMapParser, JsonMapExtractor};

/// zlib CMF byte: deflate, 32 KiB window
pub const ZLIB_CMF: u8 = 0x78;

/// gzip magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Output of a successful decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Parsed JSON map, not yet extracted
    Json(Value),
    /// Parsed binary map; `None` while the vacuum has no full map
    Binary(Option<MapDocument>),
}

impl Decoded {
    /// Convert to a [`MapDocument`], extracting JSON maps.
    pub fn to_document(&self) -> Result<Option<MapDocument>> {
        match self {
            Decoded::Json(value) => JsonMapExtractor::extract(value).map(Some),
            Decoded::Binary(doc) => Ok(doc.clone()),
        }
    }
}

/// Turns raw payload bytes into [`Decoded`] values.
///
/// The manager calls this exactly once per cache miss.
pub trait PayloadDecoder: Send + Sync {
    /// Decode a validated payload
    fn decode(&self, payload: &[u8], format: FormatTag) -> Result<Decoded>;
}

/// Default decoder: inflate, then parse.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapDecoder;

impl PayloadDecoder for MapDecoder {
    fn decode(&self, payload: &[u8], format: FormatTag) -> Result<Decoded> {
        let raw = inflate(payload, format)?;
        match format {
            FormatTag::Hypfer => Ok(Decoded::Json(serde_json::from_slice(&raw)?)),
            FormatTag::Rand256 => Ok(Decoded::Binary(BinaryMapParser::parse(&raw, true)?)),
        }
    }
}

/// Reject empty payloads and wrong compression headers.
pub fn validate_header(payload: &[u8], format: FormatTag) -> Result<()> {
    let [b0, b1, ..] = payload else {
        return Err(Error::InvalidHeader(format!(
            "{format} payload too short ({} bytes)",
            payload.len()
        )));
    };
    match format {
        FormatTag::Hypfer => {
            let check = (*b0 as u16) * 256 + *b1 as u16;
            if *b0 != ZLIB_CMF || check % 31 != 0 {
                return Err(Error::InvalidHeader(format!(
                    "not a zlib stream: {b0:#04x} {b1:#04x}"
                )));
            }
        }
        FormatTag::Rand256 => {
            if [*b0, *b1] != GZIP_MAGIC {
                return Err(Error::InvalidHeader(format!(
                    "not a gzip stream: {b0:#04x} {b1:#04x}"
                )));
            }
        }
    }
    Ok(())
}

/// Decompress a payload.
pub fn inflate(payload: &[u8], format: FormatTag) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len() * 4);
    let read = match format {
        FormatTag::Hypfer => ZlibDecoder::new(payload).read_to_end(&mut out),
        FormatTag::Rand256 => GzDecoder::new(payload).read_to_end(&mut out),
    };
    read.map_err(|e| Error::Decode(format!("{format} inflate failed: {e}")))?;
    Ok(out)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use std::io::Write;

    pub(crate) fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_zlib_header_checksum() {
        assert!(validate_header(&[0x78, 0x9c, 0], FormatTag::Hypfer).is_ok());
        assert!(validate_header(&[0x78, 0xda, 0], FormatTag::Hypfer).is_ok());
        assert!(matches!(
            validate_header(&[0x78, 0x9d, 0], FormatTag::Hypfer),
            Err(Error::InvalidHeader(_))
        ));
        assert!(validate_header(&[0x1f, 0x8b], FormatTag::Hypfer).is_err());
    }

    #[test]
    fn test_gzip_magic() {
        assert!(validate_header(&[0x1f, 0x8b, 8], FormatTag::Rand256).is_ok());
        assert!(validate_header(&[0x78, 0x9c], FormatTag::Rand256).is_err());
    }

    #[test]
    fn test_empty_payload() {
        assert!(matches!(
            validate_header(&[], FormatTag::Rand256),
            Err(Error::InvalidHeader(_))
        ));
        assert!(validate_header(&[0x78], FormatTag::Hypfer).is_err());
    }

    #[test]
    fn test_decode_json() {
        let payload = zlib(br#"{"size":{"x":10,"y":10},"pixelSize":5}"#);
        validate_header(&payload, FormatTag::Hypfer).unwrap();
        let decoded = MapDecoder.decode(&payload, FormatTag::Hypfer).unwrap();
        let doc = decoded.to_document().unwrap().unwrap();
        assert_eq!(doc.image_size.width, 10);
    }

    #[test]
    fn test_decode_binary_not_ready() {
        let raw = crate::parser::rand256::tests::MapBuilder::new(0).build();
        let decoded = MapDecoder.decode(&gzip(&raw), FormatTag::Rand256).unwrap();
        assert_eq!(decoded, Decoded::Binary(None));
    }

    #[test]
    fn test_truncated_stream_is_decode_error() {
        let mut payload = zlib(&[b'x'; 4096]);
        payload.truncate(payload.len() / 2);
        assert!(matches!(
            MapDecoder.decode(&payload, FormatTag::Hypfer),
            Err(Error::Decode(_))
        ));
    }
}
