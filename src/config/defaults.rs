//! Default value functions for serde deserialization.

use crate::core::Color;

pub fn color_background() -> Color {
    [0, 125, 255, 255]
}

pub fn color_wall() -> Color {
    [255, 255, 0, 255]
}

pub fn color_floor() -> Color {
    [135, 206, 250, 255]
}

pub fn color_move() -> Color {
    [238, 247, 255, 255]
}

pub fn color_robot() -> Color {
    [255, 255, 204, 255]
}

pub fn color_charger() -> Color {
    [255, 128, 0, 255]
}

pub fn color_go_to() -> Color {
    [0, 255, 0, 255]
}

pub fn color_no_go() -> Color {
    [255, 0, 0, 125]
}

pub fn color_zone_clean() -> Color {
    [255, 255, 255, 125]
}

pub fn color_obstacle() -> Color {
    [255, 0, 0, 255]
}

pub fn color_predicted_path() -> Color {
    [93, 109, 126, 255]
}

pub fn color_rooms() -> Vec<Color> {
    vec![
        [135, 206, 250, 255],
        [176, 226, 255, 255],
        [165, 105, 18, 255],
        [164, 211, 238, 255],
        [141, 182, 205, 255],
        [96, 123, 139, 255],
        [224, 255, 255, 255],
        [209, 238, 238, 255],
        [180, 205, 205, 255],
        [122, 139, 139, 255],
        [175, 238, 238, 255],
        [84, 153, 199, 255],
        [133, 193, 233, 255],
        [245, 176, 65, 255],
        [82, 190, 128, 255],
        [72, 201, 176, 255],
    ]
}

pub fn margin() -> u32 {
    100
}

pub fn aspect_ratio() -> String {
    "None".to_string()
}

pub fn enabled() -> bool {
    true
}

pub fn max_empty_frames() -> u32 {
    5
}

pub fn json_sync_threshold() -> usize {
    100 * 1024
}

pub fn binary_sync_threshold() -> usize {
    150 * 1024
}

pub fn cache_min_size() -> usize {
    50 * 1024
}

pub fn cache_ttl_secs() -> u64 {
    600
}

pub fn cache_capacity() -> usize {
    32
}

pub fn sweep_interval_secs() -> u64 {
    60
}

pub fn max_concurrent() -> usize {
    4
}

pub fn queue_capacity() -> usize {
    64
}

pub fn storage_dir() -> String {
    "./storage".to_string()
}

pub fn download_timeout_secs() -> u64 {
    6
}

pub fn download_grace_secs() -> u64 {
    1
}
