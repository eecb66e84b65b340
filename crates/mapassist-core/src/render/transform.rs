//! World-to-screen geometry.
//!
//! Everything here is pure arithmetic over `f32`; no drawing happens in this
//! module. Matrices follow the row-vector convention, so `a * b` applies `a`
//! first and `b` second.

use std::f32::consts::FRAC_PI_4;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::unit::Position;

/// Rotation applied to the area grid to match the isometric camera.
pub const MAP_ROTATION: f32 = FRAC_PI_4;

/// Zoom change per key press.
pub const ZOOM_STEP: f32 = 0.25;
pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 4.0;

/// Width-to-height ratio above which the overlay is narrowed.
const ULTRA_WIDE_RATIO: f64 = 2.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scale(self, sx: f32, sy: f32) -> Self {
        Self::new(self.x * sx, self.y * sy)
    }

    /// Rotate around the origin.
    pub fn rotate(self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Rotate around `center`.
    pub fn rotate_around(self, radians: f32, center: Point) -> Self {
        (self - center).rotate(radians) + center
    }

    /// Angle of the vector from the origin, in radians.
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<Position> for Point {
    fn from(pos: Position) -> Self {
        Point::new(pos.x as f32, pos.y as f32)
    }
}

/// Axis-aligned rectangle given by its edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Smallest rectangle containing every point, or `None` for no points.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for p in iter {
            rect.left = rect.left.min(p.x);
            rect.top = rect.top.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.bottom = rect.bottom.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn pad(&self, amount: f32) -> Self {
        Rect::new(
            self.left - amount,
            self.top - amount,
            self.right + amount,
            self.bottom + amount,
        )
    }

    /// Shrink to fit inside `outer`.
    pub fn clamp_to(&self, outer: &Rect) -> Self {
        Rect::new(
            self.left.max(outer.left),
            self.top.max(outer.top),
            self.right.min(outer.right),
            self.bottom.min(outer.bottom),
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }
}

/// 3x2 affine matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub m11: f32,
    pub m12: f32,
    pub m21: f32,
    pub m22: f32,
    pub m31: f32,
    pub m32: f32,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
        m31: 0.0,
        m32: 0.0,
    };

    pub fn translation(offset: Point) -> Self {
        Affine {
            m31: offset.x,
            m32: offset.y,
            ..Self::IDENTITY
        }
    }

    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Affine {
            m11: cos,
            m12: sin,
            m21: -sin,
            m22: cos,
            m31: 0.0,
            m32: 0.0,
        }
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Affine {
            m11: sx,
            m22: sy,
            ..Self::IDENTITY
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            p.x * self.m11 + p.y * self.m21 + self.m31,
            p.x * self.m12 + p.y * self.m22 + self.m32,
        )
    }
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Affine {
    type Output = Affine;

    fn mul(self, b: Affine) -> Affine {
        let a = self;
        Affine {
            m11: a.m11 * b.m11 + a.m12 * b.m21,
            m12: a.m11 * b.m12 + a.m12 * b.m22,
            m21: a.m21 * b.m11 + a.m22 * b.m21,
            m22: a.m21 * b.m12 + a.m22 * b.m22,
            m31: a.m31 * b.m11 + a.m32 * b.m21 + b.m31,
            m32: a.m31 * b.m12 + a.m32 * b.m22 + b.m32,
        }
    }
}

/// Where the map sits on the overlay window.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum MapPosition {
    #[default]
    Center,
    TopLeft,
    TopRight,
}

/// How the map follows the player.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ViewMode {
    /// Centered on the player and drawn over the game's own automap.
    #[default]
    Overlay,
    /// The whole area, fit into a box of the configured size.
    Static,
}

/// Zoom, size and placement of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub zoom_level: f32,
    pub size: f32,
    pub position: MapPosition,
    pub mode: ViewMode,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom_level: 1.0,
            size: 450.0,
            position: MapPosition::Center,
            mode: ViewMode::Overlay,
        }
    }
}

impl ViewConfig {
    pub fn is_overlay(&self) -> bool {
        self.mode == ViewMode::Overlay
    }

    /// Returns `false` once the zoom limit is reached.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom_level <= MIN_ZOOM {
            return false;
        }
        self.zoom_level -= ZOOM_STEP;
        self.size = (self.size * 1.15).round();
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.zoom_level >= MAX_ZOOM {
            return false;
        }
        self.zoom_level += ZOOM_STEP;
        self.size = (self.size * 0.85).round();
        true
    }

    /// Horizontal and vertical scale factors for an area whose rotated
    /// bounds are `output`.
    ///
    /// A size of zero or an output rectangle without height falls back to a
    /// multiplier of 1.
    pub fn scale_ratios(&self, output: &Rect) -> (f32, f32) {
        let mut multiplier = 5.5 - self.zoom_level;

        if !self.is_overlay() {
            let height = output.height();
            multiplier = if height == 0.0 {
                1.0
            } else {
                self.size / height
            };
            if multiplier == 0.0 || !multiplier.is_finite() {
                multiplier = 1.0;
            }
        } else if self.position != MapPosition::Center {
            multiplier *= 0.5;
        }

        if self.is_overlay() {
            (multiplier, multiplier * 0.5)
        } else {
            (multiplier, multiplier)
        }
    }

    /// Width of the map box for corner placement.
    pub fn render_width(&self, output: &Rect) -> f32 {
        let height = output.height();
        if height == 0.0 {
            self.size
        } else {
            self.size * output.width() / height
        }
    }
}

/// Area placement data needed to build the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AreaView {
    /// World position of the grid's top-left cell.
    pub origin: Point,
    /// Grid-space bounds of everything worth drawing.
    pub input: Rect,
    /// `input` after rotation by [`MAP_ROTATION`].
    pub output: Rect,
}

/// Overlay window size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Surface {
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Left/right margin for windows wider than 21:10.
pub fn ultra_wide_margin(width: u32, height: u32) -> u32 {
    let margin = ((width as f64 - height as f64 * ULTRA_WIDE_RATIO) / 2.0).round();
    margin.max(0.0) as u32
}

/// The two matrices the compositor draws with.
///
/// `map` places the area bitmap; `area` places world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapTransform {
    pub map: Affine,
    pub area: Affine,
    pub scale_width: f32,
    pub scale_height: f32,
    pub draw_bounds: Rect,
}

impl MapTransform {
    pub fn new(view: &ViewConfig, area: &AreaView, player: Point, surface: Surface) -> Self {
        let (scale_width, scale_height) = view.scale_ratios(&area.output);

        let mut draw_bounds = surface.bounds();
        let render_width = view.render_width(&area.output);
        match view.position {
            MapPosition::TopLeft => draw_bounds.right = draw_bounds.left + render_width,
            MapPosition::TopRight => draw_bounds.left = draw_bounds.right - render_width,
            MapPosition::Center => {}
        }

        let map = if view.is_overlay() {
            let base = Affine::translation(area.origin)
                * Affine::translation(Point::new(-player.x, -player.y))
                * Affine::rotation(MAP_ROTATION)
                * Affine::scale(scale_width, scale_height);
            match view.position {
                MapPosition::Center => {
                    base * Affine::translation(Point::new(surface.width / 2.0, surface.height / 2.0))
                        // lines up with the in-game automap
                        * Affine::translation(Point::new(2.0, -8.0))
                }
                _ => {
                    base * Affine::translation(draw_bounds.top_left())
                        * Affine::translation(Point::new(
                            draw_bounds.width() / 2.0,
                            draw_bounds.height() / 2.0,
                        ))
                }
            }
        } else {
            let base = Affine::translation(Point::new(
                -area.input.width() / 2.0,
                -area.input.height() / 2.0,
            )) * Affine::rotation(MAP_ROTATION)
                * Affine::translation(Point::new(-area.output.left, -area.output.top))
                * Affine::scale(scale_width, scale_height)
                * Affine::translation(draw_bounds.top_left());
            match view.position {
                MapPosition::Center => {
                    base * Affine::translation(Point::new(surface.width / 2.0, surface.height / 2.0))
                        * Affine::translation(Point::new(
                            -area.output.width() / 2.0 * scale_width,
                            -area.output.height() / 2.0 * scale_height,
                        ))
                }
                _ => base,
            }
        };

        let mut world = Affine::translation(Point::new(-area.origin.x, -area.origin.y));
        if !view.is_overlay() {
            world = world * Affine::translation(Point::new(-area.input.left, -area.input.top));
        }

        Self {
            map,
            area: world * map,
            scale_width,
            scale_height,
            draw_bounds,
        }
    }

    pub fn world_to_screen(&self, point: Point) -> Point {
        self.area.apply(point)
    }

    /// Pull `point` toward `origin` until its screen position is inside the
    /// draw bounds shrunk by `padding`. Works in world space.
    pub fn move_point_in_bounds(&self, point: Point, origin: Point, padding: f32) -> Point {
        let bounds = self.draw_bounds.pad(-padding);
        let start = self.world_to_screen(origin);
        let end = self.world_to_screen(point);

        let mut resize = 1.0f32;
        if end.x < bounds.left {
            resize = resize.min((bounds.left - start.x) / (end.x - start.x));
        }
        if end.x > bounds.right {
            resize = resize.min((bounds.right - start.x) / (end.x - start.x));
        }
        if end.y < bounds.top {
            resize = resize.min((bounds.top - start.y) / (end.y - start.y));
        }
        if end.y > bounds.bottom {
            resize = resize.min((bounds.bottom - start.y) / (end.y - start.y));
        }

        if resize < 1.0 && resize.is_finite() {
            (point - origin) * resize + origin
        } else {
            point
        }
    }

    /// Shift a centered text box of `size` so it stays inside the draw
    /// bounds. Works in screen space.
    pub fn move_text_in_bounds(&self, center: Point, size: Point) -> Point {
        let half = size * 0.5;
        let bounds = self.draw_bounds;
        let mut p = center;
        if p.x - half.x < bounds.left {
            p.x = bounds.left + half.x;
        }
        if p.x + half.x > bounds.right {
            p.x = bounds.right - half.x;
        }
        if p.y - half.y < bounds.top {
            p.y = bounds.top + half.y;
        }
        if p.y + half.y > bounds.bottom {
            p.y = bounds.bottom - half.y;
        }
        p
    }
}

/// One-shot world-to-screen mapping.
pub fn world_to_screen(
    point: Point,
    view: &ViewConfig,
    area: &AreaView,
    player: Point,
    surface: Surface,
) -> Point {
    MapTransform::new(view, area, player, surface).world_to_screen(point)
}
