//! RGBA raster buffer backed by `image::RgbaImage`.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage, imageops};

use crate::core::{Color, CropBox, ImageSize};
use crate::error::Result;

/// Mutable `height × width × 4` RGBA buffer, row-major.
///
/// One buffer belongs to one render pass; the base-layer cache hands out
/// clones, never shared references.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    /// Create a buffer filled with `color`
    pub fn new(width: u32, height: u32, color: Color) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(color)),
        }
    }

    /// Wrap an existing image
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Decode PNG/JPEG bytes into a buffer
    pub fn from_encoded(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self { image })
    }

    /// Borrow the underlying image
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Take the underlying image
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Dimensions
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    /// Raw RGBA bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Read a pixel, `None` outside the buffer
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Option<Color> {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return None;
        }
        Some(self.image.get_pixel(x as u32, y as u32).0)
    }

    /// Write a pixel; writes outside the buffer are dropped
    #[inline]
    pub fn put(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        self.image.put_pixel(x as u32, y as u32, Rgba(color));
    }

    /// Fill the half-open rectangle `[x0, x1) × [y0, y1)`, clipped to the buffer
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        let x0 = x0.clamp(0, self.width() as i64) as u32;
        let x1 = x1.clamp(0, self.width() as i64) as u32;
        let y0 = y0.clamp(0, self.height() as i64) as u32;
        let y1 = y1.clamp(0, self.height() as i64) as u32;
        let px = Rgba(color);
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.put_pixel(x, y, px);
            }
        }
    }

    /// Copy out a sub-rectangle, clamped to the buffer
    pub fn crop(&self, crop: &CropBox) -> RasterBuffer {
        let c = crop.clamped(self.width(), self.height());
        let view = imageops::crop_imm(
            &self.image,
            c.trim_left as u32,
            c.trim_up as u32,
            c.width() as u32,
            c.height() as u32,
        );
        RasterBuffer {
            image: view.to_image(),
        }
    }

    /// Rotate counter-clockwise by a multiple of 90 degrees.
    pub fn rotated(&self, degrees: u32) -> RasterBuffer {
        let image = match degrees % 360 {
            90 => imageops::rotate270(&self.image),
            180 => imageops::rotate180(&self.image),
            270 => imageops::rotate90(&self.image),
            _ => self.image.clone(),
        };
        RasterBuffer { image }
    }

    /// Paste `other` with its top-left corner at `(left, top)`, copying only
    /// pixels whose alpha is non-zero. Parts outside this buffer are clipped.
    pub fn overlay(&mut self, other: &RasterBuffer, left: i64, top: i64) {
        for (x, y, px) in other.image.enumerate_pixels() {
            if px.0[3] != 0 {
                self.put(left + x as i64, top + y as i64, px.0);
            }
        }
    }

    /// Letterbox into a `width × height` canvas of `fill`, centered.
    ///
    /// Returns the padded buffer and the top-left offset of the original.
    pub fn padded(&self, width: u32, height: u32, fill: Color) -> (RasterBuffer, (i64, i64)) {
        let left = (width as i64 - self.width() as i64) / 2;
        let top = (height as i64 - self.height() as i64) / 2;
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba(fill));
        imageops::replace(&mut canvas, &self.image, left, top);
        (RasterBuffer { image: canvas }, (left, top))
    }

    /// Bounding box of pixels that differ from `background`, as
    /// `(min_x, min_y, max_x, max_y)`; `None` when every pixel matches.
    pub fn content_bounds(&self, background: Color) -> Option<(i64, i64, i64, i64)> {
        let mut bounds: Option<(i64, i64, i64, i64)> = None;
        for (x, y, px) in self.image.enumerate_pixels() {
            if px.0 == background {
                continue;
            }
            let (x, y) = (x as i64, y as i64);
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }

    /// Encode as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}
