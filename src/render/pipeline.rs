//! Per-device render pipeline: document → base + dynamic layers → crop →
//! aspect padding → calibrated frame.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::frame::RenderedFrame;
use super::layers::{BaseLayerCache, draw_dynamic};
use super::RenderContext;
use crate::core::{DeviceId, FormatTag, MapDocument, Point};
use crate::crop::{AutoCropZoom, CropStore, calibration_points, room_box};
use crate::decompress::DecompressionManager;
use crate::error::{Error, Result};
use crate::parser::{DestinationIndex, room_at, room_properties};
use crate::resize::{OffsetResizer, Resized};

struct FrameState {
    base: BaseLayerCache,
    crop: AutoCropZoom,
}

/// Renders the frames of one device, one at a time.
///
/// A frame that arrives while the previous one is still rendering is
/// rejected with [`Error::Busy`]; the last finished frame stays current.
pub struct RenderPipeline {
    device: DeviceId,
    state: Mutex<FrameState>,
    destinations: Mutex<DestinationIndex>,
    last_frame: Mutex<Option<Arc<RenderedFrame>>>,
    empty_frames: AtomicU32,
    max_empty_frames: u32,
}

impl RenderPipeline {
    /// Pipeline persisting its crop box under `storage_dir`
    pub fn new(device: DeviceId, storage_dir: impl AsRef<Path>, max_empty_frames: u32) -> Self {
        let store = CropStore::new(storage_dir, &device);
        Self {
            state: Mutex::new(FrameState {
                base: BaseLayerCache::new(),
                crop: AutoCropZoom::new(store),
            }),
            destinations: Mutex::new(DestinationIndex::default()),
            last_frame: Mutex::new(None),
            empty_frames: AtomicU32::new(0),
            max_empty_frames: max_empty_frames.max(1),
            device,
        }
    }

    /// Device this pipeline renders for
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Room names for binary maps
    pub fn set_destinations(&self, destinations: DestinationIndex) {
        log::info!("{}: {} named rooms", self.device, destinations.len());
        *self.destinations.lock() = destinations;
    }

    /// Most recent finished frame
    pub fn last_frame(&self) -> Option<Arc<RenderedFrame>> {
        self.last_frame.lock().clone()
    }

    /// False after too many consecutive frames without image data.
    pub fn has_data(&self) -> bool {
        self.empty_frames.load(Ordering::Relaxed) < self.max_empty_frames
    }

    /// Forget the crop box (and its stored copy) and the cached base layer.
    pub fn reset_crop(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.base.invalidate();
        state.crop.reset()
    }

    /// Decode a payload and render it.
    ///
    /// Returns `Ok(None)` when the payload holds no drawable map yet.
    pub fn process(
        &self,
        manager: &DecompressionManager,
        topic: &str,
        payload: &[u8],
        format: FormatTag,
        ctx: &RenderContext,
    ) -> Result<Option<Arc<RenderedFrame>>> {
        let decoded = manager.decompress(topic, payload, format)?;
        match decoded.to_document()? {
            Some(doc) => self.render(doc, ctx),
            None => {
                self.note_empty();
                Ok(None)
            }
        }
    }

    /// Render one document.
    pub fn render(
        &self,
        mut doc: MapDocument,
        ctx: &RenderContext,
    ) -> Result<Option<Arc<RenderedFrame>>> {
        let Some(mut state) = self.state.try_lock() else {
            log::debug!("{}: frame skipped, previous frame still rendering", self.device);
            return Err(Error::Busy(self.device.to_string()));
        };

        if doc.image_size.is_empty() {
            self.note_empty();
            return Ok(None);
        }
        self.empty_frames.store(0, Ordering::Relaxed);

        if !ctx.active_segments.is_empty() {
            doc.set_active_segments(&ctx.active_segments);
        }
        let mut rooms = room_properties(&doc);
        self.destinations.lock().apply(&mut rooms);

        let (mut image, frame_number) = state.base.frame(&doc, &ctx.colors);
        draw_dynamic(&mut image, &doc, ctx);

        let zoom_room = doc
            .robot_position
            .and_then(|r| room_at(&rooms, Point::new(r.x, r.y)))
            .map(|room| room_box(room, doc.coord_divisor));
        let cropped = state.crop.trim_or_full(&image, ctx, zoom_room)?;
        let reference = state.crop.crop_img_size();

        let resizer = OffsetResizer::new(ctx.rotation, doc.format);
        let resized = match resizer.pad_to_aspect(&cropped, reference, ctx.aspect_ratio) {
            Ok(resized) => resized,
            Err(e @ Error::ResizeParameter(_)) => {
                log::warn!("{}: {e}; keeping the unresized frame", self.device);
                Resized {
                    crop_img_size: cropped.size(),
                    image: cropped,
                    offset_x: 0,
                    offset_y: 0,
                }
            }
            Err(e) => return Err(e),
        };

        let calibration = calibration_points(
            &state.crop.crop_area(),
            resized.offset_x,
            resized.offset_y,
            ctx.rotation,
            resized.crop_img_size,
            doc.coord_divisor,
        );
        drop(state);

        let frame = Arc::new(RenderedFrame {
            image: resized.image,
            calibration,
            rooms,
            frame_number,
            crop_img_size: resized.crop_img_size,
        });
        log::debug!(
            "{}: frame {frame_number} rendered at {}x{}",
            self.device,
            frame.width(),
            frame.height()
        );
        *self.last_frame.lock() = Some(Arc::clone(&frame));
        Ok(Some(frame))
    }

    fn note_empty(&self) {
        let n = self.empty_frames.fetch_add(1, Ordering::Relaxed) + 1;
        if n == self.max_empty_frames {
            log::warn!("{}: no image data in {n} consecutive frames", self.device);
        }
    }
}
