//! Composite icons: robot, dock, go-to flag and obstacle markers.

use super::primitives::{filled_circle, line, polygon};
use super::raster::RasterBuffer;
use crate::core::{Color, Point, Segment};

/// Side of the robot scratch buffer
const ROBOT_CANVAS: u32 = 52;
/// Robot body radius
const ROBOT_RADIUS: u32 = 25;
/// Distance of the LIDAR turret from the body center
const LIDAR_OFFSET: f64 = 15.0;
/// Distance of the button from the body center, opposite the LIDAR
const BUTTON_OFFSET: f64 = 20.0;

/// Dock rectangle size
const CHARGER_WIDTH: i64 = 10;
const CHARGER_HEIGHT: i64 = 20;

/// Go-to flag geometry
const FLAG_SIZE: i64 = 50;
const POLE_WIDTH: i64 = 6;
const POLE_COLOR: Color = [0, 0, 255, 255];

/// Obstacle marker radius
const OBSTACLE_RADIUS: u32 = 6;

/// Virtual wall line width
const VIRTUAL_WALL_WIDTH: u32 = 6;

/// Draw the robot centered on `(x, y)` with heading `angle` in degrees.
///
/// The icon is composed in a small transparent scratch buffer and then
/// overlaid, so the cost does not depend on the map resolution.
pub fn robot(buf: &mut RasterBuffer, x: i64, y: i64, angle: f64, fill: Color) {
    let mut canvas = RasterBuffer::new(ROBOT_CANVAS, ROBOT_CANVAS, [0, 0, 0, 0]);
    let c = (ROBOT_CANVAS / 2) as i64;
    let center = Point::new(c as i32, c as i32);

    let r_scaled = (ROBOT_RADIUS / 11) as f64;
    let r_cover = r_scaled * 12.0;
    let r_lidar = (r_scaled * 3.0) as u32;
    let r_button = r_scaled as u32;
    let outline: Color = [fill[0] / 2, fill[1] / 2, fill[2] / 2, fill[3]];

    filled_circle(&mut canvas, center, ROBOT_RADIUS, fill, Some((outline, 1)));

    // bin cover: chord spanning angle ± 80°
    let a1 = (angle - 80.0).to_radians();
    let a2 = (angle + 80.0).to_radians();
    let x1 = (c as f64 - r_cover * a1.sin()) as i64;
    let y1 = (c as f64 + r_cover * a1.cos()) as i64;
    let x2 = (c as f64 - r_cover * a2.sin()) as i64;
    let y2 = (c as f64 + r_cover * a2.cos()) as i64;
    line(&mut canvas, x1, y1, x2, y2, outline, 1);

    let lidar_angle = (angle + 90.0).to_radians();
    let lidar = Point::new(
        (c as f64 + LIDAR_OFFSET * lidar_angle.cos()) as i32,
        (c as f64 + LIDAR_OFFSET * lidar_angle.sin()) as i32,
    );
    filled_circle(&mut canvas, lidar, r_lidar, outline, None);

    let button = Point::new(
        (c as f64 - BUTTON_OFFSET * lidar_angle.cos()) as i32,
        (c as f64 - BUTTON_OFFSET * lidar_angle.sin()) as i32,
    );
    filled_circle(&mut canvas, button, r_button, outline, None);

    buf.overlay(&canvas, x - c, y - c);
}

/// Draw the dock as a 10×20 rectangle centered on `(x, y)`.
pub fn battery_charger(buf: &mut RasterBuffer, x: i64, y: i64, color: Color) {
    let top = y - CHARGER_HEIGHT / 2;
    let left = x - CHARGER_WIDTH / 2;
    buf.fill_rect(left, top, left + CHARGER_WIDTH, top + CHARGER_HEIGHT, color);
}

/// Draw the go-to flag planted at `center`, oriented so it reads upright
/// after the image is rotated by `rotation` degrees.
pub fn go_to_flag(buf: &mut RasterBuffer, center: Point, rotation: u32, flag_color: Color) {
    let (cx, cy) = (center.x as i64, center.y as i64);
    let (fs, pw) = (FLAG_SIZE, POLE_WIDTH);

    let (triangle, pole) = match rotation % 360 {
        90 => {
            let (x1, y1) = (cx + fs, cy - pw / 2);
            (
                [(x1, y1), (x1 - fs / 4, y1 + fs / 2), (cx + fs / 2, cy - pw / 2)],
                (cx, cy - pw / 2, cx + fs, cy - pw / 2),
            )
        }
        180 => {
            let (x1, y1) = (cx, cy - fs / 2);
            (
                [(x1, y1), (cx - fs / 2, y1 + fs / 4), (cx, cy)],
                (cx + pw / 2, cy - fs, cx + pw / 2, cy),
            )
        }
        270 => {
            let (x1, y1) = (cx - fs, cy + pw / 2);
            (
                [(x1, y1), (x1 + fs / 4, y1 - fs / 2), (cx - fs / 2, cy + pw / 2)],
                (cx - fs, cy + pw / 2, cx, cy + pw / 2),
            )
        }
        _ => (
            [(cx, cy), (cx + fs / 2, cy + fs / 4), (cx, cy + fs / 2)],
            (cx - pw / 2, cy, cx - pw / 2, cy + fs),
        ),
    };

    let points: Vec<Point> = triangle
        .iter()
        .map(|&(x, y)| Point::new(x as i32, y as i32))
        .collect();
    polygon(buf, &points, 1, flag_color, Some(flag_color));
    line(buf, pole.0, pole.1, pole.2, pole.3, POLE_COLOR, POLE_WIDTH as u32);
}

/// Draw a filled dot for every obstacle position.
pub fn obstacles(buf: &mut RasterBuffer, positions: &[Point], color: Color) {
    for p in positions {
        filled_circle(buf, *p, OBSTACLE_RADIUS, color, None);
    }
}

/// Draw virtual walls as thick lines.
pub fn virtual_walls(buf: &mut RasterBuffer, walls: &[Segment], color: Color) {
    for wall in walls {
        line(
            buf,
            wall.start.x as i64,
            wall.start.y as i64,
            wall.end.x as i64,
            wall.end.y as i64,
            color,
            VIRTUAL_WALL_WIDTH,
        );
    }
}
