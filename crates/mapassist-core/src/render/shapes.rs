//! Icon outlines, centered on the origin in screen pixels.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::render::transform::{MAP_ROTATION, Point, Rect};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum IconShape {
    #[default]
    None,
    Square,
    SquareOutline,
    Ellipse,
    EllipseOutline,
    Portal,
    Polygon,
    Cross,
}

impl IconShape {
    /// Outline shapes are stroked, the rest are filled.
    pub fn is_filled(self) -> bool {
        !matches!(
            self,
            IconShape::SquareOutline | IconShape::EllipseOutline | IconShape::Portal | IconShape::Cross
        )
    }
}

/// Outline of an icon of `size` world units.
///
/// Squares and the box around ellipses and portals are rotated with the map.
/// Portals always use the horizontal scale so they keep their proportions in
/// overlay mode. An empty list means nothing to draw.
pub fn icon_outline(shape: IconShape, size: f32, scale_width: f32, scale_height: f32) -> Vec<Point> {
    let square = || {
        [
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    };
    let half = size / 2.0;
    let centered = move |p: Point| p - Point::new(half, half);

    match shape {
        IconShape::None => Vec::new(),
        IconShape::Square
        | IconShape::SquareOutline
        | IconShape::Ellipse
        | IconShape::EllipseOutline => square()
            .into_iter()
            .map(|p| centered(p).rotate(MAP_ROTATION).scale(scale_width, scale_height))
            .collect(),
        IconShape::Portal => square()
            .into_iter()
            .map(|p| centered(p).rotate(MAP_ROTATION).scale(scale_width, scale_width * 2.0))
            .collect(),
        IconShape::Polygon => {
            let cut = size / 10.0;
            [
                Point::new(0.0, half),
                Point::new(half - cut, half - cut),
                Point::new(half, 0.0),
                Point::new(half + cut, half - cut),
                Point::new(size, half),
                Point::new(half + cut, half + cut),
                Point::new(half, size),
                Point::new(half - cut, half + cut),
            ]
            .into_iter()
            .map(|p| centered(p).scale(scale_width, scale_height))
            .collect()
        }
        IconShape::Cross => {
            let a = size * 0.25;
            let b = size * 0.50;
            let c = size * 0.75;
            let d = size;
            [
                Point::new(0.0, a),
                Point::new(a, 0.0),
                Point::new(b, a),
                Point::new(c, 0.0),
                Point::new(d, a),
                Point::new(c, b),
                Point::new(d, c),
                Point::new(c, d),
                Point::new(b, c),
                Point::new(a, d),
                Point::new(0.0, c),
                Point::new(a, b),
            ]
            .into_iter()
            .map(|p| centered(p).scale(scale_width, scale_height))
            .collect()
        }
    }
}

/// Screen-space bounding box of an icon, used to offset labels.
pub fn icon_bounds(shape: IconShape, size: f32, scale_width: f32, scale_height: f32) -> Rect {
    Rect::bounding(icon_outline(shape, size, scale_width, scale_height)).unwrap_or_default()
}

/// Arrow head triangle with its tip at `tip`, pointing along `angle`.
pub fn arrow_head(tip: Point, angle: f32, size: f32) -> [Point; 3] {
    let back = -(3.0f32.sqrt()) / 2.0;
    [
        Point::new(back, 0.5),
        Point::new(back, -0.5),
        Point::new(0.0, 0.0),
    ]
    .map(|p| (p * size + Point::new(size / 2.0, 0.0)).rotate(angle) + tip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_is_diamond() {
        let points = icon_outline(IconShape::Square, 10.0, 1.0, 1.0);
        assert_eq!(points.len(), 4);
        // rotated 45 degrees, the corners sit on the axes
        let bounds = icon_bounds(IconShape::Square, 10.0, 1.0, 1.0);
        let diag = 10.0 * std::f32::consts::SQRT_2;
        assert!((bounds.width() - diag).abs() < 1e-3);
        assert!((bounds.height() - diag).abs() < 1e-3);
    }

    #[test]
    fn test_portal_keeps_proportions() {
        let wide = icon_bounds(IconShape::Portal, 10.0, 2.0, 1.0);
        let narrow = icon_bounds(IconShape::Portal, 10.0, 2.0, 0.5);
        assert_eq!(wide, narrow);
        assert!((wide.height() - 2.0 * wide.width()).abs() < 1e-3);
    }

    #[test]
    fn test_cross_and_polygon_centered() {
        for shape in [IconShape::Cross, IconShape::Polygon] {
            let bounds = icon_bounds(shape, 8.0, 1.0, 1.0);
            assert_eq!(bounds, Rect::new(-4.0, -4.0, 4.0, 4.0));
        }
        assert_eq!(icon_outline(IconShape::Cross, 8.0, 1.0, 1.0).len(), 12);
    }

    #[test]
    fn test_none_draws_nothing() {
        assert!(icon_outline(IconShape::None, 8.0, 1.0, 1.0).is_empty());
        assert_eq!(icon_bounds(IconShape::None, 8.0, 1.0, 1.0), Rect::default());
    }

    #[test]
    fn test_filled() {
        assert!(IconShape::Square.is_filled());
        assert!(!IconShape::EllipseOutline.is_filled());
        assert_eq!("squareoutline".parse::<IconShape>().unwrap(), IconShape::SquareOutline);
    }

    #[test]
    fn test_arrow_head_tip() {
        let tri = arrow_head(Point::new(10.0, 0.0), 0.0, 4.0);
        // tip pushed forward by half the size
        assert_eq!(tri[2], Point::new(12.0, 0.0));
    }
}
