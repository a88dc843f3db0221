//! Calibration points: image corners mapped back to vacuum coordinates.

use crate::core::{CalibrationPoint, CropBox, ImageSize, Point};

/// Four corner mappings for the current crop, rotation and aspect offsets.
///
/// Vacuum corners come from `crop_area` pulled in by the aspect offsets and
/// scaled by `coord_divisor` (document units per pixel). Map corners are
/// the output image corners, clockwise from top-left. Rotating the image
/// counter-clockwise shifts which vacuum corner lands on each map corner.
pub fn calibration_points(
    crop_area: &CropBox,
    offset_x: i64,
    offset_y: i64,
    rotation: u32,
    crop_img_size: ImageSize,
    coord_divisor: i32,
) -> [CalibrationPoint; 4] {
    let s = coord_divisor.max(1) as i64;
    let pt = |x: i64, y: i64| Point::new((x * s) as i32, (y * s) as i32);

    let left = crop_area.trim_left + offset_x;
    let right = crop_area.trim_right - offset_x;
    let top = crop_area.trim_up + offset_y;
    let bottom = crop_area.trim_down - offset_y;

    let mut vacuum = [
        pt(left, top),
        pt(right, top),
        pt(right, bottom),
        pt(left, bottom),
    ];
    vacuum.rotate_left(((rotation % 360) / 90) as usize);

    let (w, h) = (crop_img_size.width as i32, crop_img_size.height as i32);
    let map = [
        Point::new(0, 0),
        Point::new(w, 0),
        Point::new(w, h),
        Point::new(0, h),
    ];

    [0, 1, 2, 3].map(|i| CalibrationPoint {
        vacuum: vacuum[i],
        map: map[i],
    })
}
