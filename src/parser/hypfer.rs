//! Valetudo (Hypfer) JSON map extractor.
//!
//! The document is a tree of objects tagged with a `__class` field. Layers
//! and entities can sit at any depth, so the tree is walked once with an
//! explicit stack; each tagged node is decoded into an [`Entity`] and then
//! bucketed into the [`MapDocument`].
//!
//! ```json
//! {
//!   "__class": "ValetudoMap",
//!   "size": { "x": 5120, "y": 5120 },
//!   "pixelSize": 5,
//!   "metaData": { "nonce": "..." },
//!   "layers":   [{ "__class": "MapLayer", "type": "segment",
//!                  "compressedPixels": [x, y, n, ...],
//!                  "metaData": { "segmentId": "1", "name": "Kitchen", "active": false } }],
//!   "entities": [{ "__class": "PointMapEntity", "type": "robot_position",
//!                  "points": [x, y], "metaData": { "angle": 90 } }]
//! }
//! ```

use serde_json::{Map, Value};

use crate::core::{
    CompressedRun, FormatTag, ImageSize, LayerKind, MapDocument, MapLayer, Obstacle, Point,
    Polygon, ROOM_SLOTS, RobotPosition, Segment,
};
use crate::error::{Error, Result};

/// Grid size used when a document omits `pixelSize`
const DEFAULT_PIXEL_SIZE: u32 = 5;

/// Semantic type of a point entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Robot pose, angle in `metaData.angle`
    Robot,
    /// Dock
    Charger,
    /// Go-to target
    GotoTarget,
    /// Camera-detected obstacle
    Obstacle,
}

/// Semantic type of a path entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Driven path
    Path,
    /// Planned path
    Predicted,
}

/// Semantic type of a polygon entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// Zone of the running clean job
    Active,
    /// No-go area
    NoGo,
    /// No-mop area
    NoMop,
}

/// One decoded `__class` node.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// `MapLayer`
    Layer(MapLayer),
    /// `PointMapEntity`
    Point {
        /// Point type
        kind: PointKind,
        /// Position
        point: Point,
        /// Heading (robot only)
        angle: f64,
        /// Object class (obstacles only)
        label: Option<String>,
        /// Photo link (obstacles only)
        link: Option<String>,
    },
    /// `PathMapEntity`
    Path {
        /// Path type
        kind: PathKind,
        /// Vertices
        points: Vec<Point>,
    },
    /// `PolygonMapEntity`
    Zone {
        /// Zone type
        kind: ZoneKind,
        /// Outline
        polygon: Polygon,
    },
    /// `LineMapEntity` of type `virtual_wall`
    Wall(Segment),
}

impl Entity {
    /// Decode a tagged node.
    ///
    /// Returns `None` for nodes without a known `__class`, or with a known
    /// class but an entity type this crate does not draw.
    pub fn decode(node: &Map<String, Value>) -> Option<Entity> {
        let class = node.get("__class")?.as_str()?;
        let kind = node.get("type").and_then(Value::as_str).unwrap_or_default();
        let meta = node.get("metaData").and_then(Value::as_object);

        match class {
            "MapLayer" => {
                let kind = LayerKind::from_name(kind)?;
                let runs = layer_runs(node);
                let mut layer = MapLayer::new(kind, runs);
                if let Some(meta) = meta {
                    layer.segment_id = meta.get("segmentId").and_then(as_id);
                    layer.name = meta.get("name").and_then(Value::as_str).map(String::from);
                    layer.active = meta.get("active").and_then(Value::as_bool).unwrap_or(false);
                }
                Some(Entity::Layer(layer))
            }
            "PointMapEntity" => {
                let kind = match kind {
                    "robot_position" => PointKind::Robot,
                    "charger_location" => PointKind::Charger,
                    "go_to_target" => PointKind::GotoTarget,
                    "obstacle" => PointKind::Obstacle,
                    _ => return None,
                };
                let point = *points(node).first()?;
                let text = |key: &str| {
                    meta.and_then(|m| m.get(key))
                        .and_then(Value::as_str)
                        .map(String::from)
                };
                Some(Entity::Point {
                    kind,
                    point,
                    angle: meta
                        .and_then(|m| m.get("angle"))
                        .and_then(Value::as_f64)
                        .unwrap_or(0.0),
                    label: text("label"),
                    link: text("image"),
                })
            }
            "PathMapEntity" => {
                let kind = match kind {
                    "path" => PathKind::Path,
                    "predicted_path" => PathKind::Predicted,
                    _ => return None,
                };
                Some(Entity::Path {
                    kind,
                    points: points(node),
                })
            }
            "PolygonMapEntity" => {
                let kind = match kind {
                    "active_zone" => ZoneKind::Active,
                    "no_go_area" => ZoneKind::NoGo,
                    "no_mop_area" => ZoneKind::NoMop,
                    _ => return None,
                };
                Some(Entity::Zone {
                    kind,
                    polygon: Polygon::new(points(node)),
                })
            }
            "LineMapEntity" if kind == "virtual_wall" => {
                let pts = points(node);
                match pts.as_slice() {
                    [a, b, ..] => Some(Entity::Wall(Segment::new(*a, *b))),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Integer values of a JSON array, skipping non-numbers.
fn ints(value: Option<&Value>) -> Vec<i64> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
                .collect()
        })
        .unwrap_or_default()
}

/// Flat `[x0, y0, x1, y1, ...]` list as points.
///
/// Pairs with a coordinate outside `i32` are dropped.
fn points(node: &Map<String, Value>) -> Vec<Point> {
    ints(node.get("points"))
        .chunks_exact(2)
        .filter_map(|c| Some(Point::new(i32::try_from(c[0]).ok()?, i32::try_from(c[1]).ok()?)))
        .collect()
}

/// Segment ids arrive as strings in current firmware and as numbers in old ones.
fn as_id(value: &Value) -> Option<u32> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    }
}

/// Layer pixels: `compressedPixels` triples, or the legacy flat `pixels`
/// pairs merged into runs.
///
/// Entries with a value outside `u32` (negative included) are skipped.
fn layer_runs(node: &Map<String, Value>) -> Vec<CompressedRun> {
    let cell = |v: i64| u32::try_from(v).ok();

    let compressed = ints(node.get("compressedPixels"));
    if !compressed.is_empty() {
        return compressed
            .chunks_exact(3)
            .filter_map(|c| Some(CompressedRun::new(cell(c[0])?, cell(c[1])?, cell(c[2])?)))
            .filter(|run| run.length > 0)
            .collect();
    }

    let mut runs: Vec<CompressedRun> = Vec::new();
    for c in ints(node.get("pixels")).chunks_exact(2) {
        let (Some(x), Some(y)) = (cell(c[0]), cell(c[1])) else {
            continue;
        };
        match runs.last_mut() {
            Some(last) if last.y == y && last.x.checked_add(last.length) == Some(x) => {
                last.length += 1
            }
            _ => runs.push(CompressedRun::new(x, y, 1)),
        }
    }
    runs
}

/// Extractor for the JSON map format.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMapExtractor;

impl JsonMapExtractor {
    /// Decode every tagged node of `json` in document order.
    pub fn entities(json: &Value) -> Vec<Entity> {
        let mut found = Vec::new();
        let mut stack: Vec<&Value> = vec![json];

        while let Some(value) = stack.pop() {
            match value {
                Value::Object(map) => {
                    if let Some(entity) = Entity::decode(map) {
                        found.push(entity);
                        continue;
                    }
                    stack.extend(map.values().rev());
                }
                Value::Array(items) => stack.extend(items.iter().rev()),
                _ => {}
            }
        }
        found
    }

    /// Build a [`MapDocument`] from a parsed JSON map.
    ///
    /// Missing entity kinds produce empty lists. Fails only when the root is
    /// not an object or the result breaks a document invariant.
    pub fn extract(json: &Value) -> Result<MapDocument> {
        let root = json
            .as_object()
            .ok_or_else(|| Error::Decode("JSON map root is not an object".into()))?;

        let size = root.get("size");
        let dim = |axis: &str| {
            size.and_then(|s| s.get(axis))
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0)
        };
        let pixel_size = root
            .get("pixelSize")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(DEFAULT_PIXEL_SIZE);

        let mut doc = MapDocument::new(
            FormatTag::Hypfer,
            ImageSize::new(dim("x"), dim("y")),
            pixel_size,
        );
        doc.map_id = root
            .get("metaData")
            .and_then(|m| m.get("nonce"))
            .and_then(Value::as_str)
            .map(String::from);

        let mut segment_count = 0usize;
        for entity in Self::entities(json) {
            match entity {
                Entity::Layer(mut layer) => {
                    if layer.kind == LayerKind::Segment {
                        layer.room_slot = Some(segment_count % ROOM_SLOTS);
                        segment_count += 1;
                        if let Some(id) = layer.segment_id {
                            doc.segment_ids.push(id);
                        }
                    }
                    doc.push_layer(layer);
                }
                Entity::Point {
                    kind,
                    point,
                    angle,
                    label,
                    link,
                } => match kind {
                    PointKind::Robot => {
                        doc.robot_position = Some(RobotPosition {
                            x: point.x,
                            y: point.y,
                            angle,
                        })
                    }
                    PointKind::Charger => doc.charger_position = Some(point),
                    PointKind::GotoTarget => doc.goto_target = Some(point),
                    PointKind::Obstacle => doc.obstacles.push(Obstacle {
                        x: point.x,
                        y: point.y,
                        label,
                        link,
                    }),
                },
                Entity::Path { kind, points } => match kind {
                    PathKind::Path => doc.paths.push(points),
                    PathKind::Predicted => doc.predicted_path = points,
                },
                Entity::Zone { kind, polygon } => match kind {
                    ZoneKind::Active => doc.zones.push(polygon),
                    ZoneKind::NoGo => doc.forbidden_zones.push(polygon),
                    ZoneKind::NoMop => doc.forbidden_mop_zones.push(polygon),
                },
                Entity::Wall(wall) => doc.virtual_walls.push(wall),
            }
        }

        doc.validate()?;
        log::debug!(
            "Extracted JSON map {}x{}: {} segments, {} obstacles",
            doc.image_size.width,
            doc.image_size.height,
            segment_count,
            doc.obstacles.len()
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segment(id: u32) -> Value {
        json!({
            "__class": "MapLayer",
            "type": "segment",
            "compressedPixels": [id, 10, 3],
            "metaData": { "segmentId": id.to_string(), "name": format!("Room {id}"), "active": id == 2 }
        })
    }

    fn sample_map() -> Value {
        json!({
            "__class": "ValetudoMap",
            "size": { "x": 800, "y": 600 },
            "pixelSize": 5,
            "metaData": { "nonce": "abc-123" },
            "layers": [
                { "__class": "MapLayer", "type": "floor", "compressedPixels": [1, 2, 4, 1, 3, 4] },
                { "__class": "MapLayer", "type": "wall", "compressedPixels": [0, 0, 10] },
                segment(1),
                segment(2)
            ],
            "entities": [
                { "__class": "PointMapEntity", "type": "robot_position",
                  "points": [100, 200], "metaData": { "angle": 45.0 } },
                { "__class": "PointMapEntity", "type": "charger_location", "points": [120, 210] },
                { "__class": "PointMapEntity", "type": "obstacle", "points": [300, 310],
                  "metaData": { "label": "sock", "image": "/api/obstacles/img/1" } },
                { "__class": "PathMapEntity", "type": "path", "points": [1, 2, 3, 4, 5, 6] },
                { "__class": "PathMapEntity", "type": "predicted_path", "points": [7, 8] },
                { "__class": "PolygonMapEntity", "type": "no_go_area",
                  "points": [0, 0, 10, 0, 10, 10, 0, 10] },
                { "__class": "LineMapEntity", "type": "virtual_wall", "points": [5, 5, 50, 5] }
            ]
        })
    }

    #[test]
    fn test_extract_sample() {
        let doc = JsonMapExtractor::extract(&sample_map()).unwrap();

        assert_eq!(doc.image_size, ImageSize::new(800, 600));
        assert_eq!(doc.pixel_size, 5);
        assert_eq!(doc.coord_divisor, 1);
        assert_eq!(doc.map_id.as_deref(), Some("abc-123"));

        assert_eq!(
            doc.layers_of(LayerKind::Floor)[0].runs,
            vec![CompressedRun::new(1, 2, 4), CompressedRun::new(1, 3, 4)]
        );
        assert_eq!(doc.wall_pixel_count(), 10);
        assert_eq!(doc.segment_ids, vec![1, 2]);
        assert_eq!(doc.active_flags(), vec![false, true]);

        let robot = doc.robot_position.unwrap();
        assert_eq!((robot.x, robot.y), (100, 200));
        assert_eq!(robot.angle, 45.0);
        assert_eq!(doc.charger_position, Some(Point::new(120, 210)));

        assert_eq!(doc.obstacles.len(), 1);
        assert_eq!(doc.obstacles[0].label.as_deref(), Some("sock"));
        assert_eq!(doc.obstacles[0].link.as_deref(), Some("/api/obstacles/img/1"));

        assert_eq!(doc.paths, vec![vec![
            Point::new(1, 2),
            Point::new(3, 4),
            Point::new(5, 6)
        ]]);
        assert_eq!(doc.predicted_path, vec![Point::new(7, 8)]);
        assert_eq!(doc.forbidden_zones.len(), 1);
        assert_eq!(
            doc.virtual_walls,
            vec![Segment::new(Point::new(5, 5), Point::new(50, 5))]
        );
    }

    #[test]
    fn test_room_slots_wrap_at_sixteen() {
        let layers: Vec<Value> = (1..=18).map(segment).collect();
        let map = json!({ "size": { "x": 100, "y": 100 }, "pixelSize": 5, "layers": layers });
        let doc = JsonMapExtractor::extract(&map).unwrap();

        let slots: Vec<usize> = doc
            .layers_of(LayerKind::Segment)
            .iter()
            .filter_map(|l| l.room_slot)
            .collect();
        assert_eq!(slots.len(), 18);
        assert!(slots.iter().all(|&s| s < ROOM_SLOTS));
        assert_eq!(&slots[14..], &[14, 15, 0, 1]);
    }

    #[test]
    fn test_missing_entities_are_empty() {
        let map = json!({ "size": { "x": 10, "y": 10 }, "pixelSize": 5, "layers": [] });
        let doc = JsonMapExtractor::extract(&map).unwrap();
        assert!(doc.robot_position.is_none());
        assert!(doc.zones.is_empty());
        assert!(doc.obstacles.is_empty());
        assert!(doc.virtual_walls.is_empty());
        assert!(!doc.has_layers());
    }

    #[test]
    fn test_deeply_nested_entities_found() {
        let mut node = json!({ "__class": "PointMapEntity", "type": "go_to_target", "points": [9, 9] });
        for _ in 0..2000 {
            node = json!({ "child": [node] });
        }
        let map = json!({ "size": { "x": 10, "y": 10 }, "wrapper": node });
        let doc = JsonMapExtractor::extract(&map).unwrap();
        assert_eq!(doc.goto_target, Some(Point::new(9, 9)));
    }

    #[test]
    fn test_legacy_pixels_merged() {
        let map = json!({
            "size": { "x": 100, "y": 100 },
            "layers": [{ "__class": "MapLayer", "type": "wall", "pixels": [1, 1, 2, 1, 3, 1, 7, 1] }]
        });
        let doc = JsonMapExtractor::extract(&map).unwrap();
        assert_eq!(
            doc.layers_of(LayerKind::Wall)[0].runs,
            vec![CompressedRun::new(1, 1, 3), CompressedRun::new(7, 1, 1)]
        );
    }

    #[test]
    fn test_out_of_range_pixels_skipped() {
        let map = json!({
            "size": { "x": 100, "y": 100 },
            "layers": [
                { "__class": "MapLayer", "type": "wall",
                  "pixels": [4294967295u64, 0, 0, 0, 1, 0, 4294967296u64, 0, -3, 2] },
                { "__class": "MapLayer", "type": "floor",
                  "compressedPixels": [1, 1, 4, 4294967296u64, 2, 1, 2, -1, 5, 3, 3, 0] }
            ]
        });
        let doc = JsonMapExtractor::extract(&map).unwrap();
        assert_eq!(
            doc.layers_of(LayerKind::Wall)[0].runs,
            vec![CompressedRun::new(u32::MAX, 0, 1), CompressedRun::new(0, 0, 2)]
        );
        assert_eq!(
            doc.layers_of(LayerKind::Floor)[0].runs,
            vec![CompressedRun::new(1, 1, 4)]
        );
    }

    #[test]
    fn test_out_of_range_points_dropped() {
        let map = json!({
            "size": { "x": 100, "y": 100 },
            "entities": [
                { "__class": "PathMapEntity", "type": "path",
                  "points": [10, 10, 3000000000u64, 5, 20, -4000000000i64, 30, 30] },
                { "__class": "PointMapEntity", "type": "charger_location",
                  "points": [2147483648u64, 1] }
            ]
        });
        let doc = JsonMapExtractor::extract(&map).unwrap();
        assert_eq!(doc.paths, vec![vec![Point::new(10, 10), Point::new(30, 30)]]);
        assert!(doc.charger_position.is_none());
    }

    #[test]
    fn test_layers_without_size_rejected() {
        let map = json!({ "layers": [segment(1)] });
        assert!(matches!(
            JsonMapExtractor::extract(&map),
            Err(Error::Decode(_))
        ));
        assert!(JsonMapExtractor::extract(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_unknown_types_ignored() {
        let map = json!({
            "size": { "x": 10, "y": 10 },
            "entities": [
                { "__class": "PointMapEntity", "type": "something_new", "points": [1, 1] },
                { "__class": "FutureEntity", "points": [1, 1] }
            ]
        });
        let entities = JsonMapExtractor::entities(&map);
        assert!(entities.is_empty());
    }
}
