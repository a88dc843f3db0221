//! Pixel primitives: run blitting, Bresenham lines, circles and polygons.
//!
//! All functions take image pixel coordinates and clip silently at the
//! buffer edges.

use super::raster::RasterBuffer;
use crate::core::{Color, CompressedRun, Point, Polygon};

/// Dot radius of the zone fill pattern
const ZONE_DOT_RADIUS: i64 = 1;
/// Spacing between zone dots
const ZONE_DOT_SPACING: usize = 4;

/// Create a `width × height` buffer filled with `color`.
pub fn fill_background(width: u32, height: u32, color: Color) -> RasterBuffer {
    RasterBuffer::new(width, height, color)
}

/// Paint run-length encoded grid cells.
///
/// Each run covers a `pixel_size × (length · pixel_size)` rectangle whose
/// top-left corner is `(x · pixel_size, y · pixel_size)`.
pub fn blit_runs(buf: &mut RasterBuffer, runs: &[CompressedRun], pixel_size: u32, color: Color) {
    let ps = pixel_size as i64;
    for run in runs {
        let col = run.x as i64 * ps;
        let row = run.y as i64 * ps;
        buf.fill_rect(col, row, col + run.length as i64 * ps, row + ps, color);
    }
}

/// Stamp a `width × width` square centered on `(x, y)`.
#[inline]
fn stamp(buf: &mut RasterBuffer, x: i64, y: i64, width: i64, color: Color) {
    let lo = -(width / 2);
    let hi = (width + 1) / 2;
    buf.fill_rect(x + lo, y + lo, x + hi, y + hi, color);
}

/// Liang-Barsky clip of a segment to `[lo_x, hi_x] × [lo_y, hi_y]`.
///
/// Segments already inside come back unchanged; `None` when nothing of the
/// segment lies inside.
fn clip_segment(
    (x0, y0, x1, y1): (i64, i64, i64, i64),
    (lo_x, lo_y, hi_x, hi_y): (i64, i64, i64, i64),
) -> Option<(i64, i64, i64, i64)> {
    let inside = |x: i64, y: i64| x >= lo_x && x <= hi_x && y >= lo_y && y <= hi_y;
    if inside(x0, y0) && inside(x1, y1) {
        return Some((x0, y0, x1, y1));
    }

    let (fx0, fy0) = (x0 as f64, y0 as f64);
    let (dx, dy) = ((x1 - x0) as f64, (y1 - y0) as f64);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for (p, q) in [
        (-dx, fx0 - lo_x as f64),
        (dx, hi_x as f64 - fx0),
        (-dy, fy0 - lo_y as f64),
        (dy, hi_y as f64 - fy0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| ((fx0 + t * dx).round() as i64, (fy0 + t * dy).round() as i64);
    let (cx0, cy0) = if t0 > 0.0 { at(t0) } else { (x0, y0) };
    let (cx1, cy1) = if t1 < 1.0 { at(t1) } else { (x1, y1) };
    Some((cx0, cy0, cx1, cy1))
}

/// Draw a line from `(x0, y0)` to `(x1, y1)` with Bresenham stepping,
/// stamping a `width × width` square at every step.
///
/// The segment is clipped to the buffer plus one stamp width first, so
/// far-off endpoints cost no more than the visible part.
pub fn line(
    buf: &mut RasterBuffer,
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
    color: Color,
    width: u32,
) {
    let width = width.max(1) as i64;
    let bounds = (
        -width,
        -width,
        buf.width() as i64 + width,
        buf.height() as i64 + width,
    );
    let Some((x0, y0, x1, y1)) = clip_segment((x0, y0, x1, y1), bounds) else {
        return;
    };
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        stamp(buf, x, y, width, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

/// Join consecutive points into a polyline. A single point is drawn as a dot.
pub fn lines(buf: &mut RasterBuffer, points: &[Point], color: Color, width: u32) {
    match points {
        [] => {}
        [p] => line(buf, p.x as i64, p.y as i64, p.x as i64, p.y as i64, color, width),
        _ => {
            for pair in points.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                line(
                    buf, a.x as i64, a.y as i64, b.x as i64, b.y as i64, color, width,
                );
            }
        }
    }
}

/// Filled circle by squared-distance test over the bounding square.
///
/// With `outline = Some((color, width))`, the ring between `radius` and
/// `radius + width` is painted in the outline color.
pub fn filled_circle(
    buf: &mut RasterBuffer,
    center: Point,
    radius: u32,
    color: Color,
    outline: Option<(Color, u32)>,
) {
    let r = radius as i64;
    let (outline_color, ow) = match outline {
        Some((c, w)) => (c, w as i64),
        None => (color, 0),
    };
    let outer = r + ow;
    let (cx, cy) = (center.x as i64, center.y as i64);
    let r2 = r * r;
    let outer2 = outer * outer;

    for y in (cy - outer)..=(cy + outer) {
        for x in (cx - outer)..=(cx + outer) {
            let d2 = (x - cx) * (x - cx) + (y - cy) * (y - cy);
            if d2 <= r2 {
                buf.put(x, y, color);
            } else if ow > 0 && d2 <= outer2 {
                buf.put(x, y, outline_color);
            }
        }
    }
}

/// Ray-casting point-in-polygon test.
///
/// Horizontal edges never toggle the state; vertical edges toggle whenever
/// the point is to their left.
pub fn point_inside(x: i64, y: i64, points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut xinters = 0.0f64;
    let (mut p1x, mut p1y) = (points[0].x as i64, points[0].y as i64);

    for i in 1..=n {
        let p2 = points[i % n];
        let (p2x, p2y) = (p2.x as i64, p2.y as i64);
        if y > p1y.min(p2y) && y <= p1y.max(p2y) && x <= p1x.max(p2x) {
            if p1y != p2y {
                xinters = (y - p1y) as f64 * (p2x - p1x) as f64 / (p2y - p1y) as f64 + p1x as f64;
            }
            if p1x == p2x || x as f64 <= xinters {
                inside = !inside;
            }
        }
        p1x = p2x;
        p1y = p2y;
    }
    inside
}

/// Draw a closed polygon outline and optionally fill its interior.
pub fn polygon(
    buf: &mut RasterBuffer,
    points: &[Point],
    width: u32,
    outline: Color,
    fill: Option<Color>,
) {
    if points.is_empty() {
        return;
    }
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        line(
            buf, a.x as i64, a.y as i64, b.x as i64, b.y as i64, outline, width,
        );
    }

    let Some(fill) = fill else {
        return;
    };
    let poly = Polygon::new(points.to_vec());
    let Some((min, max)) = poly.bounds() else {
        return;
    };
    let y_lo = (min.y as i64).max(0);
    let y_hi = (max.y as i64).min(buf.height() as i64 - 1);
    let x_lo = (min.x as i64).max(0);
    let x_hi = (max.x as i64).min(buf.width() as i64 - 1);
    for y in y_lo..=y_hi {
        for x in x_lo..=x_hi {
            if point_inside(x, y, points) {
                buf.put(x, y, fill);
            }
        }
    }
}

/// Dot positions in `[min, max)` spaced from `min`, limited to the part
/// that can touch a buffer edge of length `extent`.
fn dot_range(min: i32, max: i32, extent: u32) -> impl Iterator<Item = i64> {
    let (min, max) = (min as i64, max as i64);
    let step = ZONE_DOT_SPACING as i64;
    let lo = -ZONE_DOT_RADIUS;
    let start = if min < lo {
        min + (lo - min + step - 1) / step * step
    } else {
        min
    };
    let end = max.min(extent as i64 + ZONE_DOT_RADIUS);
    (start..end).step_by(ZONE_DOT_SPACING)
}

/// Cover each zone's bounding box with a dot pattern; the floor stays
/// visible between dots.
pub fn zones(buf: &mut RasterBuffer, zones: &[Polygon], color: Color) {
    for zone in zones {
        let Some((min, max)) = zone.bounds() else {
            continue;
        };
        for y in dot_range(min.y, max.y, buf.height()) {
            for x in dot_range(min.x, max.x, buf.width()) {
                buf.fill_rect(
                    x - ZONE_DOT_RADIUS,
                    y - ZONE_DOT_RADIUS,
                    x + ZONE_DOT_RADIUS,
                    y + ZONE_DOT_RADIUS,
                    color,
                );
            }
        }
    }
}
