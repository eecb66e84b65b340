//! Static layout of one area as computed by the geometry server.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::game::Area;
use crate::render::{AreaView, MAP_ROTATION, Point, Rect};
use crate::unit::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellClass {
    Walkable,
    /// Blocked cell touching a walkable one.
    Border,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacentLevel {
    pub area: Area,
    pub origin: Position,
    pub width: u32,
    pub height: u32,
    /// World positions of the passages into this level.
    pub exits: Vec<Position>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAreaGeometry {
    level_origin: Position,
    #[serde(default)]
    map_rows: Vec<Vec<u32>>,
    #[serde(default)]
    adjacent_levels: HashMap<String, RawAdjacentLevel>,
    #[serde(default)]
    npcs: HashMap<String, Vec<Position>>,
    #[serde(default)]
    objects: HashMap<String, Vec<Position>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdjacentLevel {
    #[serde(default)]
    exits: Vec<Position>,
    #[serde(default)]
    origin: Position,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Walkability grid plus the static objects of one area.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaGeometry {
    pub area: Area,
    /// World position of grid cell (0, 0).
    pub origin: Position,
    width: usize,
    height: usize,
    cells: Vec<CellClass>,
    pub adjacent_levels: BTreeMap<Area, AdjacentLevel>,
    /// NPC id to world positions.
    pub npcs: BTreeMap<u32, Vec<Position>>,
    /// Object id to world positions.
    pub objects: BTreeMap<u32, Vec<Position>>,
    view_input: Rect,
    view_output: Rect,
}

impl AreaGeometry {
    /// Parse a geometry server response body.
    pub fn from_json(area: Area, json: &str) -> Result<Self> {
        let raw: RawAreaGeometry = serde_json::from_str(json)?;
        Self::from_raw(area, raw)
    }

    fn from_raw(area: Area, raw: RawAreaGeometry) -> Result<Self> {
        let height = raw.map_rows.len();
        let width = raw
            .map_rows
            .iter()
            .map(|row| row.iter().map(|&n| n as usize).sum::<usize>())
            .max()
            .unwrap_or(0);

        let mut cells = vec![CellClass::Blocked; width * height];
        for (y, row) in raw.map_rows.iter().enumerate() {
            // runs alternate blocked/walkable, starting blocked
            let mut x = 0;
            let mut walkable = false;
            for &run in row {
                if walkable {
                    for cell in &mut cells[y * width + x..y * width + x + run as usize] {
                        *cell = CellClass::Walkable;
                    }
                }
                x += run as usize;
                walkable = !walkable;
            }
        }

        let mut adjacent_levels = BTreeMap::new();
        for (key, level) in raw.adjacent_levels {
            let id = parse_id(&key)?;
            adjacent_levels.insert(
                Area(id),
                AdjacentLevel {
                    area: Area(id),
                    origin: level.origin,
                    width: level.width,
                    height: level.height,
                    exits: level.exits,
                },
            );
        }

        let mut geometry = Self {
            area,
            origin: raw.level_origin,
            width,
            height,
            cells,
            adjacent_levels,
            npcs: parse_id_map(raw.npcs)?,
            objects: parse_id_map(raw.objects)?,
            view_input: Rect::default(),
            view_output: Rect::default(),
        };
        geometry.classify_borders();
        geometry.calc_view_areas(MAP_ROTATION);
        Ok(geometry)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Class of the cell at grid coordinates. Out of range is blocked.
    pub fn cell(&self, x: usize, y: usize) -> CellClass {
        if x >= self.width || y >= self.height {
            return CellClass::Blocked;
        }
        self.cells[y * self.width + x]
    }

    pub fn adjacent_areas(&self) -> impl Iterator<Item = Area> + '_ {
        self.adjacent_levels.keys().copied()
    }

    pub fn has_object(&self, object_id: u32) -> bool {
        self.objects
            .get(&object_id)
            .is_some_and(|positions| !positions.is_empty())
    }

    /// Grid bounds of all walkable and border cells, padded by one cell.
    pub fn view_input_rect(&self) -> Rect {
        self.view_input
    }

    /// [`Self::view_input_rect`] after rotation around its center.
    pub fn view_output_rect(&self) -> Rect {
        self.view_output
    }

    pub fn view(&self) -> AreaView {
        AreaView {
            origin: self.origin.into(),
            input: self.view_input,
            output: self.view_output,
        }
    }

    fn classify_borders(&mut self) {
        let mut borders = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.cell(x, y) == CellClass::Blocked && self.touches_walkable(x, y) {
                    borders.push(y * self.width + x);
                }
            }
        }
        for i in borders {
            self.cells[i] = CellClass::Border;
        }
    }

    fn touches_walkable(&self, x: usize, y: usize) -> bool {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 {
                    continue;
                }
                if self.cell(nx as usize, ny as usize) == CellClass::Walkable {
                    return true;
                }
            }
        }
        false
    }

    fn calc_view_areas(&mut self, angle: f32) {
        let points: Vec<Point> = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.cell(x, y) != CellClass::Blocked)
            .map(|(x, y)| Point::new(x as f32, y as f32))
            .collect();

        let grid = Rect::new(0.0, 0.0, self.width as f32, self.height as f32);
        let Some(bounds) = Rect::bounding(points.iter().copied()) else {
            return;
        };
        let input = bounds.pad(1.0).clamp_to(&grid);
        let center = input.center();
        let output = Rect::bounding(points.iter().map(|p| p.rotate_around(angle, center)))
            .unwrap_or_default()
            .pad(1.0);

        self.view_input = input;
        self.view_output = output;
    }
}

fn parse_id(key: &str) -> Result<u32> {
    key.trim().parse().map_err(|_| {
        Error::CollaboratorProtocol(format!("Expected a numeric id, got '{}'", key))
    })
}

fn parse_id_map(raw: HashMap<String, Vec<Position>>) -> Result<BTreeMap<u32, Vec<Position>>> {
    raw.into_iter()
        .map(|(key, positions)| Ok((parse_id(&key)?, positions)))
        .collect()
}
