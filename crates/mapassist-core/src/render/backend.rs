use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::render::transform::{Point, Rect};

/// RGBA color. Written in config files as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const GOLD: Color = Color::rgb(199, 179, 119);
    pub const BROWN: Color = Color::rgb(165, 42, 42);
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Scale alpha by `opacity` in `0.0..=1.0`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || Error::ConfigParseError(format!("Invalid color '{}'", s));
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(bad());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
        let a = if hex.len() == 8 { byte(6)? } else { 255 };
        Ok(Color::rgba(byte(0)?, byte(2)?, byte(4)?, a))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Row-major RGBA image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Color::rgba(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }
}

/// Drawing primitives the compositor needs from a renderer.
///
/// All coordinates are screen pixels except for [`RenderBackend::draw_bitmap`],
/// which receives the transform to place the bitmap with.
pub trait RenderBackend {
    fn draw_bitmap(&mut self, bitmap: &Bitmap, transform: &crate::render::Affine, opacity: f32);

    fn draw_line(&mut self, from: Point, to: Point, color: Color, thickness: f32);

    fn draw_ellipse(&mut self, center: Point, radius_x: f32, radius_y: f32, color: Color, fill: bool, thickness: f32);

    fn draw_polygon(&mut self, points: &[Point], color: Color, fill: bool, thickness: f32);

    fn draw_text(&mut self, center: Point, text: &str, font: &str, size: f32, color: Color);

    /// Text extent in pixels, used to keep labels inside the draw bounds.
    fn measure_text(&self, text: &str, _font: &str, size: f32) -> Point {
        Point::new(text.chars().count() as f32 * size * 0.6, size * 1.3)
    }

    fn push_clip(&mut self, _bounds: Rect) {}

    fn pop_clip(&mut self) {}
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Bitmap { width: u32, height: u32, opacity: f32 },
    Line { from: Point, to: Point, color: Color },
    Ellipse { center: Point, color: Color, fill: bool },
    Polygon { points: Vec<Point>, color: Color, fill: bool },
    Text { center: Point, text: String, color: Color },
}

/// Backend that records calls instead of drawing.
///
/// Used by the headless CLI loop and in tests.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<DrawCommand>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn count(&self, pred: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| pred(c)).count()
    }
}

impl RenderBackend for RecordingBackend {
    fn draw_bitmap(&mut self, bitmap: &Bitmap, _transform: &crate::render::Affine, opacity: f32) {
        self.commands.push(DrawCommand::Bitmap {
            width: bitmap.width,
            height: bitmap.height,
            opacity,
        });
    }

    fn draw_line(&mut self, from: Point, to: Point, color: Color, _thickness: f32) {
        self.commands.push(DrawCommand::Line { from, to, color });
    }

    fn draw_ellipse(&mut self, center: Point, _rx: f32, _ry: f32, color: Color, fill: bool, _thickness: f32) {
        self.commands.push(DrawCommand::Ellipse {
            center,
            color,
            fill,
        });
    }

    fn draw_polygon(&mut self, points: &[Point], color: Color, fill: bool, _thickness: f32) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
            fill,
        });
    }

    fn draw_text(&mut self, center: Point, text: &str, _font: &str, _size: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            center,
            text: text.to_string(),
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse() {
        assert_eq!("#FF8000".parse::<Color>().unwrap(), Color::rgb(255, 128, 0));
        assert_eq!("10203040".parse::<Color>().unwrap(), Color::rgba(16, 32, 48, 64));
        assert!("#12345".parse::<Color>().is_err());
        assert!("#GG0000".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_serde() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            color: Color,
        }
        let text = toml::to_string(&Wrapper {
            color: Color::rgba(1, 2, 3, 4),
        })
        .unwrap();
        assert!(text.contains("#01020304"));
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back.color, Color::rgba(1, 2, 3, 4));
    }

    #[test]
    fn test_opacity() {
        assert_eq!(Color::WHITE.with_opacity(0.5).a, 128);
        assert!(Color::WHITE.with_opacity(0.0).is_transparent());
    }

    #[test]
    fn test_bitmap_bounds() {
        let mut bmp = Bitmap::new(2, 2);
        bmp.set(1, 1, Color::RED);
        bmp.set(5, 5, Color::RED);
        assert_eq!(bmp.get(1, 1), Some(Color::RED));
        assert_eq!(bmp.get(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(bmp.get(2, 0), None);
    }
}
