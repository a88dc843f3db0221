//! Aspect-ratio letterboxing and calibration offsets.
//!
//! The cropped map is fitted into the requested aspect ratio without
//! stretching: it is scaled down to fit and padded with transparent pixels,
//! centered. The coordinate offsets computed alongside keep calibration
//! points aligned with the padded image.

use std::fmt;

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::core::{FormatTag, ImageSize};
use crate::draw::RasterBuffer;
use crate::error::{Error, Result};

/// Padding color (transparent)
const PAD_COLOR: [u8; 4] = [0, 0, 0, 0];

/// Requested output aspect ratio, `width:height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    /// Width factor
    pub width: u32,
    /// Height factor
    pub height: u32,
}

impl AspectRatio {
    /// Create a ratio, rejecting zero factors
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::ResizeParameter(format!(
                "aspect ratio factors must be positive, got {width}:{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Parse `"w,h"`. `"None"` or an empty string disables resizing.
    pub fn parse(s: &str) -> Result<Option<Self>> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        let bad = || Error::ResizeParameter(format!("aspect ratio must be \"w,h\", got {s:?}"));
        let (w, h) = s.split_once(',').ok_or_else(bad)?;
        let w: i64 = w.trim().parse().map_err(|_| bad())?;
        let h: i64 = h.trim().parse().map_err(|_| bad())?;
        if w <= 0 || h <= 0 {
            return Err(Error::ResizeParameter(format!(
                "aspect ratio factors must be positive, got {w}:{h}"
            )));
        }
        let w = u32::try_from(w).map_err(|_| bad())?;
        let h = u32::try_from(h).map_err(|_| bad())?;
        Self::new(w, h).map(Some)
    }

    /// Ratio as a float
    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.width, self.height)
    }
}

/// Result of [`OffsetResizer::pad_to_aspect`].
#[derive(Clone, Debug, PartialEq)]
pub struct Resized {
    /// Letterboxed image
    pub image: RasterBuffer,
    /// Size of the letterboxed image, the new `crop_img_size`
    pub crop_img_size: ImageSize,
    /// Calibration X correction
    pub offset_x: i64,
    /// Calibration Y correction
    pub offset_y: i64,
}

#[inline]
fn floor_div(a: i64, b: i64) -> i64 {
    a.div_euclid(b)
}

/// Calibration offsets for a padded image.
///
/// `size` is the padded size, `crop` the size before padding. Rotations of
/// 0/180 and 90/270 use different formulas, and the binary format uses its
/// own table. Unlisted ratios give `(0, 0)`.
pub fn aspect_offsets(
    ratio: AspectRatio,
    rotation: u32,
    format: FormatTag,
    size: ImageSize,
    crop: ImageSize,
) -> (i64, i64) {
    let (w, h) = (size.width as i64, size.height as i64);
    let (cw, ch) = (crop.width as i64, crop.height as i64);
    let upright = matches!(rotation % 360, 0 | 180);

    // (offset_x, offset_y)
    match (ratio.width, ratio.height, format) {
        (1, 1, FormatTag::Hypfer) if upright => (floor_div(h - ch, 2), cw - w),
        (1, 1, FormatTag::Hypfer) => (floor_div(ch - h, 2), w - cw),
        (1, 1, FormatTag::Rand256) if upright => (ch - h, floor_div(w - cw, 2)),
        (1, 1, FormatTag::Rand256) => (ch - h, floor_div(cw - w, 2)),

        (3, 2, FormatTag::Hypfer) if upright => (floor_div(h - ch, 2) - floor_div(ch, 10), w - cw),
        (3, 2, FormatTag::Hypfer) => (
            (ch - h) + floor_div(floor_div(h, 10), 2),
            floor_div(cw - w, 2),
        ),
        (3, 2, FormatTag::Rand256) if upright => (floor_div(w - cw, 2), h - ch),
        (3, 2, FormatTag::Rand256) => (ch - h, floor_div(cw - w, 2)),

        (5, 4, FormatTag::Hypfer) if upright => (
            floor_div(w - cw, 2) - floor_div(cw, 2),
            (ch - h) - floor_div(ch, 2),
        ),
        (5, 4, FormatTag::Hypfer) => ((ch - h) + floor_div(h, 10), floor_div(cw - w, 2) - 10),
        (5, 4, FormatTag::Rand256) if upright => (ch - h, floor_div(w - cw, 2)),
        (5, 4, FormatTag::Rand256) => (ch - h, floor_div(cw - w, 2)),

        (9, 16, FormatTag::Hypfer) if !upright => ((w - cw) + floor_div(h, 10), h - ch),

        (2, 1, _) | (9, 16, _) | (16, 9, _) if upright => (h - ch, w - cw),
        (2, 1, _) | (9, 16, _) | (16, 9, _) => (w - cw, h - ch),

        _ => (0, 0),
    }
}

/// Letterboxes rendered maps to a requested aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct OffsetResizer {
    rotation: u32,
    format: FormatTag,
}

impl OffsetResizer {
    /// Create a resizer for one rotation and source format
    pub fn new(rotation: u32, format: FormatTag) -> Self {
        Self { rotation, format }
    }

    /// Fit `buffer` into `ratio`, keeping its aspect.
    ///
    /// `reference` is the pre-resize `crop_img_size` used for the offset
    /// formulas. With `ratio == None` the buffer is returned unchanged with
    /// zero offsets.
    pub fn pad_to_aspect(
        &self,
        buffer: &RasterBuffer,
        reference: ImageSize,
        ratio: Option<AspectRatio>,
    ) -> Result<Resized> {
        let Some(ratio) = ratio else {
            return Ok(Resized {
                image: buffer.clone(),
                crop_img_size: buffer.size(),
                offset_x: 0,
                offset_y: 0,
            });
        };
        if buffer.size().is_empty() || reference.is_empty() {
            return Err(Error::ResizeParameter(format!(
                "cannot resize {}x{} (reference {}x{})",
                buffer.width(),
                buffer.height(),
                reference.width,
                reference.height
            )));
        }

        let (w, h) = (buffer.width() as u64, buffer.height() as u64);
        let (rw, rh) = (ratio.width as u64, ratio.height as u64);
        // compare w/h against rw/rh without floating point
        let (new_w, new_h) = if w * rh > h * rw {
            ((h * rw / rh).max(1) as u32, h as u32)
        } else {
            (w as u32, (w * rh / rw).max(1) as u32)
        };

        let image = fit_and_pad(buffer, new_w, new_h);
        let size = ImageSize::new(new_w, new_h);
        let (offset_x, offset_y) = aspect_offsets(ratio, self.rotation, self.format, size, reference);
        log::debug!(
            "Aspect {ratio}: {w}x{h} -> {new_w}x{new_h}, offsets ({offset_x}, {offset_y})"
        );

        Ok(Resized {
            image,
            crop_img_size: size,
            offset_x,
            offset_y,
        })
    }
}

/// Scale `buffer` to fit inside `width × height` and pad the rest.
fn fit_and_pad(buffer: &RasterBuffer, width: u32, height: u32) -> RasterBuffer {
    let (w, h) = (buffer.width() as f64, buffer.height() as f64);
    let scale = (width as f64 / w).min(height as f64 / h);
    let fit_w = ((w * scale).round() as u32).clamp(1, width);
    let fit_h = ((h * scale).round() as u32).clamp(1, height);

    let fitted = if (fit_w, fit_h) == (buffer.width(), buffer.height()) {
        buffer.clone()
    } else {
        RasterBuffer::from_image(imageops::resize(
            buffer.as_image(),
            fit_w,
            fit_h,
            FilterType::CatmullRom,
        ))
    };
    fitted.padded(width, height, PAD_COLOR).0
}

#[cfg(test)]
mod tests {
    use super::*;

    const FG: [u8; 4] = [200, 10, 10, 255];

    #[test]
    fn test_parse_aspect_ratio() {
        assert_eq!(AspectRatio::parse("None").unwrap(), None);
        assert_eq!(AspectRatio::parse("").unwrap(), None);
        let r = AspectRatio::parse(" 16, 9 ").unwrap().unwrap();
        assert_eq!((r.width, r.height), (16, 9));
        assert_eq!(r.to_string(), "16,9");
        assert!(matches!(
            AspectRatio::parse("-4,3"),
            Err(Error::ResizeParameter(_))
        ));
        assert!(AspectRatio::parse("0,1").is_err());
        assert!(AspectRatio::parse("wide").is_err());
    }

    #[test]
    fn test_no_ratio_is_identity() {
        let buf = RasterBuffer::new(30, 20, FG);
        let out = OffsetResizer::new(0, FormatTag::Hypfer)
            .pad_to_aspect(&buf, buf.size(), None)
            .unwrap();
        assert_eq!(out.image, buf);
        assert_eq!((out.offset_x, out.offset_y), (0, 0));
    }

    #[test]
    fn test_wide_ratio_on_four_three() {
        let buf = RasterBuffer::new(800, 600, FG);
        let ratio = AspectRatio::parse("16,9").unwrap();
        let out = OffsetResizer::new(0, FormatTag::Hypfer)
            .pad_to_aspect(&buf, ImageSize::new(800, 600), ratio)
            .unwrap();

        assert_eq!(out.crop_img_size, ImageSize::new(800, 450));
        assert_eq!(out.image.size(), ImageSize::new(800, 450));
        // 600x450 fitted content, centered, transparent bars left and right
        assert_eq!(out.image.get(0, 200), Some(PAD_COLOR));
        assert_eq!(out.image.get(99, 200), Some(PAD_COLOR));
        assert!(out.image.get(400, 200).is_some_and(|px| px[3] > 250));
        assert_eq!(out.image.get(799, 200), Some(PAD_COLOR));
        assert_eq!((out.offset_x, out.offset_y), (-150, 0));
    }

    #[test]
    fn test_tall_ratio_reduces_width() {
        let buf = RasterBuffer::new(400, 100, FG);
        let ratio = AspectRatio::new(1, 1).ok();
        let out = OffsetResizer::new(0, FormatTag::Rand256)
            .pad_to_aspect(&buf, buf.size(), ratio)
            .unwrap();
        assert_eq!(out.crop_img_size, ImageSize::new(100, 100));
        // binary 1:1 upright: x = ch - h, y = floor((w - cw) / 2)
        assert_eq!((out.offset_x, out.offset_y), (0, -150));
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let buf = RasterBuffer::new(0, 10, FG);
        let err = OffsetResizer::new(0, FormatTag::Hypfer)
            .pad_to_aspect(&buf, ImageSize::new(0, 10), AspectRatio::new(1, 1).ok())
            .unwrap_err();
        assert!(matches!(err, Error::ResizeParameter(_)));
    }

    #[test]
    fn test_offsets_branch_on_rotation_and_format() {
        let size = ImageSize::new(120, 100);
        let crop = ImageSize::new(100, 90);
        let r = |w, h| AspectRatio::new(w, h).unwrap();

        assert_eq!(aspect_offsets(r(16, 9), 0, FormatTag::Hypfer, size, crop), (10, 20));
        assert_eq!(aspect_offsets(r(16, 9), 90, FormatTag::Hypfer, size, crop), (20, 10));
        assert_eq!(aspect_offsets(r(9, 16), 270, FormatTag::Hypfer, size, crop), (30, 10));
        assert_eq!(aspect_offsets(r(9, 16), 270, FormatTag::Rand256, size, crop), (20, 10));
        assert_eq!(aspect_offsets(r(1, 1), 0, FormatTag::Hypfer, size, crop), (5, -20));
        assert_eq!(aspect_offsets(r(3, 2), 180, FormatTag::Hypfer, size, crop), (-4, 20));
        assert_eq!(aspect_offsets(r(5, 4), 90, FormatTag::Rand256, size, crop), (-10, -10));
        assert_eq!(aspect_offsets(r(4, 3), 0, FormatTag::Hypfer, size, crop), (0, 0));
    }
}
