//! World-to-screen geometry and draw orchestration.
//!
//! Nothing here paints pixels; drawing goes through [`RenderBackend`].

mod backend;
mod compositor;
mod shapes;
mod transform;

pub use backend::{Bitmap, Color, DrawCommand, RecordingBackend, RenderBackend};
pub use compositor::{
    Compositor, FrameInfo, area_bitmap, draw_game_info, item_color, item_log_lines, quality_color,
    resist_color,
};
pub use shapes::{IconShape, arrow_head, icon_bounds, icon_outline};
pub use transform::{
    Affine, AreaView, MAP_ROTATION, MAX_ZOOM, MIN_ZOOM, MapPosition, MapTransform, Point, Rect,
    Surface, ViewConfig, ViewMode, ZOOM_STEP, ultra_wide_margin, world_to_screen,
};
