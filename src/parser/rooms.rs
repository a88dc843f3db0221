//! Room properties derived from segment layers.
//!
//! Room boxes are reported in document units so they compare directly with
//! the robot position: JSON maps use image pixels, binary maps use
//! millimetres (grid cell × pixel size × 10).

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::core::{LayerKind, MapDocument, Point, RoomProperty};
use crate::error::Result;

/// Bounding box of every segment layer that carries an id, in layer order.
///
/// X extends to the end of each run, Y to the bottom of each grid row.
pub fn room_properties(doc: &MapDocument) -> Vec<RoomProperty> {
    let scale = doc.pixel_size as i64 * doc.coord_divisor as i64;
    let mut rooms = Vec::new();

    for layer in doc.layers_of(LayerKind::Segment) {
        let Some(id) = layer.segment_id else {
            continue;
        };
        let mut bounds: Option<(i64, i64, i64, i64)> = None;
        for run in &layer.runs {
            let (x0, y0) = (run.x as i64, run.y as i64);
            let (x1, y1) = (x0 + run.length as i64, y0 + 1);
            bounds = Some(match bounds {
                None => (x0, y0, x1, y1),
                Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
            });
        }
        let Some((x0, y0, x1, y1)) = bounds else {
            continue;
        };
        let unit = |v: i64| (v * scale).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        let min = Point::new(unit(x0), unit(y0));
        let max = Point::new(unit(x1), unit(y1));
        rooms.push(RoomProperty::from_bounds(id, layer.name.clone(), min, max));
    }

    log::trace!("Computed {} room boxes", rooms.len());
    rooms
}

/// Room containing `point`, first match in layer order.
pub fn room_at(rooms: &[RoomProperty], point: Point) -> Option<&RoomProperty> {
    rooms.iter().find(|r| r.contains(point))
}

#[derive(Debug, Deserialize)]
struct DestinationRoom {
    id: u32,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Destinations {
    #[serde(default)]
    rooms: Vec<DestinationRoom>,
}

/// Room names from the Valetudo RE `destinations` message.
///
/// Binary maps carry only segment ids; names arrive separately as
/// `{"rooms": [{"id": 16, "name": "Kitchen"}, ...], "zones": [...], "spots": [...]}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestinationIndex {
    names: HashMap<u32, String>,
}

impl DestinationIndex {
    /// Parse a destinations document
    pub fn from_json(value: &Value) -> Result<Self> {
        let dest = Destinations::deserialize(value)?;
        let names = dest
            .rooms
            .into_iter()
            .filter_map(|r| r.name.map(|n| (r.id, n)))
            .collect();
        Ok(Self { names })
    }

    /// Name of a room id
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of named rooms
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when no room has a name
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Fill in names for rooms that have none.
    pub fn apply(&self, rooms: &mut [RoomProperty]) {
        for room in rooms.iter_mut().filter(|r| r.name.is_none()) {
            room.name = self.name(room.id).map(String::from);
        }
    }
}
