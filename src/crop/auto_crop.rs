//! Automatic trim, room zoom and rotation of rendered maps.

use serde::{Deserialize, Serialize};

use super::store::CropStore;
use crate::core::{Color, CropBox, ImageSize, RoomProperty};
use crate::draw::RasterBuffer;
use crate::error::{Error, Result};
use crate::render::RenderContext;

/// User trims applied on top of the computed crop box (pixels).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropOffsets {
    /// Trim from the top edge
    pub top: i64,
    /// Trim from the bottom edge
    pub down: i64,
    /// Trim from the left edge
    pub left: i64,
    /// Trim from the right edge
    pub right: i64,
}

impl CropOffsets {
    /// Shrink `crop` by the offsets
    pub fn apply(&self, crop: &CropBox) -> CropBox {
        CropBox::new(
            crop.trim_left + self.left,
            crop.trim_up + self.top,
            crop.trim_right - self.right,
            crop.trim_down - self.down,
        )
    }
}

/// Crop box around a room, in image pixels, before the margin is added.
///
/// Room boxes are in document units; `coord_divisor` converts them to
/// pixels (1 for JSON maps, 10 for binary maps).
pub fn room_box(room: &RoomProperty, coord_divisor: i32) -> CropBox {
    let d = coord_divisor.max(1) as f64;
    let px = |v: i32| (v as f64 / d).round() as i64;
    let (min, max) = (room.min(), room.max());
    CropBox::new(px(min.x), px(min.y), px(max.x), px(max.y))
}

/// Computes, persists and applies the crop box of one device.
///
/// The first frame with content defines the crop box; later frames reuse
/// it, so the output does not drift while the robot moves. Zooming to a
/// room overrides the box for one frame without replacing it.
#[derive(Debug)]
pub struct AutoCropZoom {
    store: CropStore,
    /// Computed or loaded crop box, before user offsets
    trims: Option<CropBox>,
    /// Box applied to frames: `trims` shrunk by the user offsets
    auto_crop: Option<CropBox>,
    /// Store already consulted
    loaded: bool,
    crop_area: CropBox,
    crop_img_size: ImageSize,
    zooming: bool,
}

impl AutoCropZoom {
    /// Create a crop engine backed by `store`
    pub fn new(store: CropStore) -> Self {
        Self {
            store,
            trims: None,
            auto_crop: None,
            loaded: false,
            crop_area: CropBox::default(),
            crop_img_size: ImageSize::default(),
            zooming: false,
        }
    }

    /// Crop box before user offsets
    pub fn trims(&self) -> Option<CropBox> {
        self.trims
    }

    /// Crop box edges for calibration, after the last frame.
    ///
    /// For 0° and 180° this is the applied box (with offsets), for 90° and
    /// 270° the raw trims.
    pub fn crop_area(&self) -> CropBox {
        self.crop_area
    }

    /// Size of the last output image
    pub fn crop_img_size(&self) -> ImageSize {
        self.crop_img_size
    }

    /// Last frame was zoomed to a room
    pub fn is_zooming(&self) -> bool {
        self.zooming
    }

    /// Backing store
    pub fn store(&self) -> &CropStore {
        &self.store
    }

    /// Bounding box of non-background pixels, grown by `margin`.
    ///
    /// Fails with [`Error::TrimDegenerate`] when the box, after `offsets`,
    /// is no larger than the margin in either direction. A buffer with no
    /// content at all always fails.
    pub fn compute_trims(
        buffer: &RasterBuffer,
        background: Color,
        margin: u32,
        offsets: &CropOffsets,
    ) -> Result<CropBox> {
        let m = margin as i64;
        let Some((x0, y0, x1, y1)) = buffer.content_bounds(background) else {
            return Err(Error::TrimDegenerate {
                width: 0,
                height: 0,
                margin,
            });
        };
        let trims = CropBox::new(x0 - m, y0 - m, x1 + 1 + m, y1 + 1 + m);

        let shrunk = offsets.apply(&trims);
        let width = shrunk.width().max(0);
        let height = shrunk.height().max(0);
        if width <= m || height <= m {
            return Err(Error::TrimDegenerate {
                width,
                height,
                margin,
            });
        }
        Ok(trims)
    }

    fn init(&mut self, offsets: &CropOffsets) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        match self.store.load() {
            Ok(Some(trims)) => {
                log::debug!("Loaded crop box {:?}", trims.as_array());
                self.trims = Some(trims);
                self.auto_crop = Some(offsets.apply(&trims));
            }
            Ok(None) => {}
            Err(e) => log::debug!("Ignoring stored crop box: {e}"),
        }
    }

    /// Crop, optionally zoom, and rotate one frame.
    ///
    /// `zoom_room` is the robot's room in pixels (see [`room_box`]); it is
    /// used only when the context asks for zoom. On
    /// [`Error::TrimDegenerate`] the crop bookkeeping is set to the full
    /// image and the caller should use the uncropped frame.
    pub fn trim_and_zoom(
        &mut self,
        buffer: &RasterBuffer,
        ctx: &RenderContext,
        zoom_room: Option<CropBox>,
    ) -> Result<RasterBuffer> {
        self.init(&ctx.offsets);

        let auto_crop = match self.auto_crop {
            Some(crop) => crop,
            None => {
                let trims =
                    match Self::compute_trims(buffer, ctx.colors.background, ctx.margin, &ctx.offsets) {
                        Ok(trims) => trims,
                        Err(e) => {
                            let (w, h) = (buffer.width() as i64, buffer.height() as i64);
                            self.crop_area = CropBox::new(0, 0, w, h);
                            self.crop_img_size = buffer.size();
                            return Err(e);
                        }
                    };
                log::debug!("Computed crop box {:?}", trims.as_array());
                if ctx.is_docked()
                    && let Err(e) = self.store.save_if_absent(&trims)
                {
                    log::warn!("Failed to save crop box: {e}");
                }
                let crop = ctx.offsets.apply(&trims);
                self.trims = Some(trims);
                self.auto_crop = Some(crop);
                crop
            }
        };

        let zoom = zoom_room.filter(|_| ctx.wants_zoom());
        self.zooming = zoom.is_some();
        let trimmed = match zoom {
            Some(room) => {
                let m = ctx.margin as i64;
                let (l, r) = sorted(room.trim_left - m, room.trim_right + m);
                let (u, d) = sorted(room.trim_up - m, room.trim_down + m);
                log::debug!("Zooming to room box ({l}, {u}, {r}, {d})");
                buffer.crop(&CropBox::new(l, u, r, d))
            }
            None => buffer.crop(&auto_crop),
        };

        let rotated = trimmed.rotated(ctx.rotation);
        self.crop_area = match ctx.rotation % 360 {
            90 | 270 => self.trims.unwrap_or(auto_crop),
            _ => auto_crop,
        };
        self.crop_img_size = rotated.size();
        Ok(rotated)
    }

    /// [`trim_and_zoom`](Self::trim_and_zoom), falling back to the full
    /// uncropped frame when trimming is degenerate.
    pub fn trim_or_full(
        &mut self,
        buffer: &RasterBuffer,
        ctx: &RenderContext,
        zoom_room: Option<CropBox>,
    ) -> Result<RasterBuffer> {
        match self.trim_and_zoom(buffer, ctx, zoom_room) {
            Err(e @ Error::TrimDegenerate { .. }) => {
                log::warn!("{e}; using the uncropped frame");
                Ok(buffer.clone())
            }
            other => other,
        }
    }

    /// Forget the crop box and delete the stored copy.
    pub fn reset(&mut self) -> Result<()> {
        self.trims = None;
        self.auto_crop = None;
        self.loaded = true;
        self.store.reset()?;
        Ok(())
    }
}

fn sorted(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}
