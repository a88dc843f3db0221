//! Base and dynamic layer drawing, with the base layer cached across frames.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::ColorSection;
use crate::core::{LayerKind, MapDocument, Point, Polygon};
use crate::draw::{self, RasterBuffer};

use super::RenderContext;

/// Frames drawn from one base layer before it is redrawn
pub const MAX_FRAMES: u32 = 1024;

/// Width of the driven path
const PATH_WIDTH: u32 = 5;
/// Width of the predicted path
const PREDICTED_PATH_WIDTH: u32 = 2;

/// Hash of the content that makes up the base layer.
///
/// Wall pixel count stands in for the map geometry; the active flags
/// change the room colors.
pub fn layer_hash(doc: &MapDocument) -> u64 {
    let mut hasher = DefaultHasher::new();
    doc.image_size.width.hash(&mut hasher);
    doc.image_size.height.hash(&mut hasher);
    doc.wall_pixel_count().hash(&mut hasher);
    doc.active_flags().hash(&mut hasher);
    hasher.finish()
}

/// Cached static layer and the frame counter.
#[derive(Default)]
pub struct BaseLayerCache {
    hash: Option<u64>,
    frame_number: u32,
    base: Option<RasterBuffer>,
}

impl BaseLayerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame number the next call will report
    pub fn frame_number(&self) -> u32 {
        self.frame_number
    }

    /// Forget the cached layer; the next frame redraws it.
    pub fn invalidate(&mut self) {
        self.base = None;
        self.hash = None;
        self.frame_number = 0;
    }

    /// Copy of the base layer for `doc` and the number of this frame.
    ///
    /// The layer is redrawn when the content hash changes and every
    /// [`MAX_FRAMES`] frames.
    pub fn frame(&mut self, doc: &MapDocument, colors: &ColorSection) -> (RasterBuffer, u32) {
        let hash = layer_hash(doc);
        if self.hash != Some(hash) {
            self.frame_number = 0;
        }
        let base = match self.base.as_ref() {
            Some(base) if self.frame_number != 0 => base.clone(),
            _ => {
                let base = draw_base(doc, colors);
                log::debug!(
                    "Drew base layer {}x{} (hash {hash:#018x})",
                    base.width(),
                    base.height()
                );
                self.hash = Some(hash);
                self.base = Some(base.clone());
                base
            }
        };
        let current = self.frame_number;
        self.frame_number = (self.frame_number + 1) % MAX_FRAMES;
        (base, current)
    }
}

fn pixels(doc: &MapDocument, points: &[Point]) -> Vec<Point> {
    points.iter().map(|p| doc.to_pixel(*p)).collect()
}

fn polygons(doc: &MapDocument, zones: &[Polygon]) -> Vec<Polygon> {
    zones
        .iter()
        .map(|z| Polygon::new(pixels(doc, &z.points)))
        .collect()
}

/// Static layer: floor, rooms, walls, charger, virtual walls, no-go areas.
pub fn draw_base(doc: &MapDocument, colors: &ColorSection) -> RasterBuffer {
    let size = doc.image_size;
    let mut buf = draw::fill_background(size.width, size.height, colors.background);

    for (kind, layers) in &doc.layers {
        for layer in layers {
            let color = match kind {
                LayerKind::Floor => colors.floor,
                LayerKind::Wall => colors.wall,
                LayerKind::Segment => {
                    let slot = layer.room_slot.unwrap_or(0);
                    if layer.active {
                        colors.active_room(slot)
                    } else {
                        colors.room(slot)
                    }
                }
            };
            draw::blit_runs(&mut buf, &layer.runs, doc.pixel_size, color);
        }
    }

    if let Some(charger) = doc.charger_position {
        let p = doc.to_pixel(charger);
        draw::battery_charger(&mut buf, p.x as i64, p.y as i64, colors.charger);
    }

    let walls: Vec<_> = doc
        .virtual_walls
        .iter()
        .map(|w| crate::core::Segment::new(doc.to_pixel(w.start), doc.to_pixel(w.end)))
        .collect();
    draw::virtual_walls(&mut buf, &walls, colors.no_go);

    draw::zones(&mut buf, &polygons(doc, &doc.forbidden_zones), colors.no_go);
    draw::zones(&mut buf, &polygons(doc, &doc.forbidden_mop_zones), colors.no_go);
    buf
}

/// Robot heading used for drawing, in degrees.
///
/// A docked robot faces away from the dock, so its heading is turned by
/// 180°.
pub fn robot_draw_angle(doc: &MapDocument, ctx: &RenderContext) -> Option<f64> {
    let heading = doc.robot_heading()?;
    Some(if ctx.is_docked() {
        heading - 180.0
    } else {
        heading
    })
}

/// Per-frame elements: zones, go-to flag, paths, obstacles, robot.
pub fn draw_dynamic(buf: &mut RasterBuffer, doc: &MapDocument, ctx: &RenderContext) {
    let colors = &ctx.colors;

    draw::zones(buf, &polygons(doc, &doc.zones), colors.zone_clean);

    if let Some(target) = doc.goto_target {
        draw::go_to_flag(buf, doc.to_pixel(target), ctx.rotation, colors.go_to);
    }

    if !doc.predicted_path.is_empty() {
        draw::lines(
            buf,
            &pixels(doc, &doc.predicted_path),
            colors.predicted_path,
            PREDICTED_PATH_WIDTH,
        );
    }
    for path in &doc.paths {
        draw::lines(buf, &pixels(doc, path), colors.path, PATH_WIDTH);
    }

    let obstacles: Vec<_> = doc
        .obstacles
        .iter()
        .map(|o| doc.to_pixel(Point::new(o.x, o.y)))
        .collect();
    draw::obstacles(buf, &obstacles, colors.obstacle);

    if let (Some(robot), Some(angle)) = (doc.robot_position, robot_draw_angle(doc, ctx)) {
        let p = doc.to_pixel(Point::new(robot.x, robot.y));
        draw::robot(buf, p.x as i64, p.y as i64, angle, colors.robot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        CompressedRun, FormatTag, ImageSize, MapLayer, RobotPosition, VacuumState,
    };
    use approx::assert_relative_eq;

    fn doc() -> MapDocument {
        let mut doc = MapDocument::new(FormatTag::Hypfer, ImageSize::new(60, 40), 5);
        doc.push_layer(MapLayer::new(
            LayerKind::Floor,
            vec![CompressedRun::new(1, 1, 4)],
        ));
        doc.push_layer(MapLayer::new(
            LayerKind::Wall,
            vec![CompressedRun::new(0, 0, 6)],
        ));
        let mut room = MapLayer::new(LayerKind::Segment, vec![CompressedRun::new(1, 3, 2)]);
        room.segment_id = Some(4);
        room.room_slot = Some(2);
        doc.push_layer(room);
        doc
    }

    #[test]
    fn test_base_layer_colors() {
        let colors = ColorSection::default();
        let base = draw_base(&doc(), &colors);
        assert_eq!(base.get(2, 2), Some(colors.wall));
        assert_eq!(base.get(7, 7), Some(colors.floor));
        assert_eq!(base.get(7, 17), Some(colors.room(2)));
        assert_eq!(base.get(50, 35), Some(colors.background));
    }

    #[test]
    fn test_frame_counter_and_cache() {
        let colors = ColorSection::default();
        let mut cache = BaseLayerCache::new();
        let d = doc();

        assert_eq!(cache.frame(&d, &colors).1, 0);
        assert_eq!(cache.frame(&d, &colors).1, 1);
        assert_eq!(cache.frame(&d, &colors).1, 2);

        // Activating a room changes the hash
        let mut active = d.clone();
        active.set_active_segments(&[4]);
        let (img, n) = cache.frame(&active, &colors);
        assert_eq!(n, 0);
        assert_eq!(img.get(7, 17), Some(colors.active_room(2)));
        assert_eq!(cache.frame(&active, &colors).1, 1);
    }

    #[test]
    fn test_frame_counter_wraps() {
        let colors = ColorSection::default();
        let mut cache = BaseLayerCache::new();
        let d = doc();
        for _ in 0..MAX_FRAMES {
            cache.frame(&d, &colors);
        }
        assert_eq!(cache.frame_number(), 0);
        assert_eq!(cache.frame(&d, &colors).1, 0);
    }

    #[test]
    fn test_cached_base_is_a_copy() {
        let colors = ColorSection::default();
        let mut cache = BaseLayerCache::new();
        let d = doc();
        let (mut first, _) = cache.frame(&d, &colors);
        first.put(50, 35, [1, 2, 3, 255]);
        let (second, _) = cache.frame(&d, &colors);
        assert_eq!(second.get(50, 35), Some(colors.background));
    }

    #[test]
    fn test_docked_robot_angle() {
        let mut d = doc();
        d.robot_position = Some(RobotPosition {
            x: 30,
            y: 20,
            angle: 45.0,
        });
        let ctx = RenderContext::default().with_state(VacuumState::Docked);
        assert_relative_eq!(robot_draw_angle(&d, &ctx).unwrap(), -135.0);

        let ctx = ctx.with_state(VacuumState::Cleaning);
        assert_relative_eq!(robot_draw_angle(&d, &ctx).unwrap(), 45.0);
    }

    #[test]
    fn test_dynamic_layer_draws_path_and_robot() {
        let mut d = doc();
        d.paths.push(vec![Point::new(5, 38), Point::new(50, 38)]);
        d.robot_position = Some(RobotPosition {
            x: 30,
            y: 20,
            angle: 0.0,
        });
        let ctx = RenderContext::default();
        let mut buf = draw_base(&d, &ctx.colors);
        draw_dynamic(&mut buf, &d, &ctx);
        assert_eq!(buf.get(5, 38), Some(ctx.colors.path));
        assert_ne!(buf.get(30, 20), Some(ctx.colors.background));
    }
}
