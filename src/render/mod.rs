//! Frame rendering.
//!
//! ```text
//! MapDocument ─► BaseLayerCache (floor, rooms, walls, dock, no-go)
//!                    │ copy
//!                    ▼
//!               draw_dynamic (zones, flag, paths, obstacles, robot)
//!                    │
//!                    ▼
//!               AutoCropZoom ─► OffsetResizer ─► RenderedFrame
//! ```

mod context;
mod frame;
mod layers;
mod pipeline;

pub use context::RenderContext;
pub use frame::RenderedFrame;
pub use layers::{BaseLayerCache, MAX_FRAMES, draw_base, draw_dynamic, layer_hash, robot_draw_angle};
pub use pipeline::RenderPipeline;
