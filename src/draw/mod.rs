//! Rasterizer: RGBA buffer, pixel primitives and composite icons.
//!
//! Functions here hold no state; every call mutates the caller's buffer.

mod icons;
mod primitives;
mod raster;

pub use icons::{battery_charger, go_to_flag, obstacles, robot, virtual_walls};
pub use primitives::{
    blit_runs, fill_background, filled_circle, line, lines, point_inside, polygon, zones,
};
pub use raster::RasterBuffer;
