//! Per-area draw orchestration.
//!
//! A [`Compositor`] is built once per area: it owns the area bitmap and the
//! points of interest. Every frame it computes a [`MapTransform`] from the
//! snapshot and issues draw calls in a fixed order: map bitmap, points of
//! interest, live shrines and portals, monsters, items, players.

use std::sync::Arc;

use chrono::Utc;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::config::{ItemLogSettings, MapColors, PoiRendering, Settings};
use crate::error::{Error, Result};
use crate::game::{Area, GameSnapshot, ItemLogEntry};
use crate::map::poi::object;
use crate::map::{AreaGeometry, CellClass, PoiKind, PointOfInterest, portal_label, shrine_label};
use crate::render::backend::{Bitmap, Color, RenderBackend};
use crate::render::shapes::{IconShape, arrow_head, icon_bounds, icon_outline};
use crate::render::transform::{MapTransform, Point, Surface, ViewConfig};
use crate::unit::{ItemQuality, MonsterTier, Resist, UnitRecord};

/// Lines shorter than this many pixels are not drawn.
const MIN_LINE_LENGTH: f32 = 60.0;

/// Inputs for one frame.
pub struct FrameInfo<'a> {
    pub snapshot: &'a GameSnapshot,
    pub settings: &'a Settings,
    pub surface: Surface,
}

pub fn quality_color(quality: ItemQuality) -> Option<Color> {
    match quality {
        ItemQuality::Inferior | ItemQuality::Normal => Some(Color::WHITE),
        ItemQuality::Superior => Some(Color::GRAY),
        ItemQuality::Magic => Some(Color::rgb(65, 105, 225)),
        ItemQuality::Set => Some(Color::rgb(50, 205, 50)),
        ItemQuality::Rare => Some(Color::YELLOW),
        ItemQuality::Unique => Some(Color::GOLD),
        ItemQuality::Craft => Some(Color::ORANGE),
        ItemQuality::Tempered => None,
    }
}

/// Color of an item log line. Ethereal and socketed white items use the
/// superior color.
pub fn item_color(entry: &ItemLogEntry) -> Option<Color> {
    let quality = entry.quality?;
    let base = quality_color(quality)?;
    let keeps_own_color = matches!(
        quality,
        ItemQuality::Magic
            | ItemQuality::Set
            | ItemQuality::Rare
            | ItemQuality::Unique
            | ItemQuality::Craft
    );
    if !keeps_own_color && (entry.ethereal || entry.sockets > 0) {
        return quality_color(ItemQuality::Superior);
    }
    Some(base)
}

/// Text and color of every item log line, oldest first. Entries without a
/// known quality color are left out.
pub fn item_log_lines<'a>(
    entries: impl IntoIterator<Item = &'a ItemLogEntry>,
) -> Vec<(String, Color)> {
    entries
        .into_iter()
        .filter_map(|entry| item_color(entry).map(|color| (entry.label(), color)))
        .collect()
}

pub fn resist_color(resist: Resist) -> Color {
    match resist {
        Resist::Damage => Color::rgb(205, 133, 63),
        Resist::Magic => Color::rgb(255, 140, 0),
        Resist::Fire => Color::RED,
        Resist::Lightning => Color::YELLOW,
        Resist::Cold => Color::rgb(0, 128, 255),
        Resist::Poison => Color::rgb(0, 200, 0),
    }
}

/// Rasterize the area's walkable and border cells over its view input
/// rectangle.
pub fn area_bitmap(geometry: &AreaGeometry, colors: &MapColors) -> Bitmap {
    let input = geometry.view_input_rect();
    let width = input.width().max(0.0) as u32;
    let height = input.height().max(0.0) as u32;
    let left = input.left.max(0.0) as usize;
    let top = input.top.max(0.0) as usize;

    let mut bitmap = Bitmap::new(width, height);
    if colors.walkable.is_none() && colors.border.is_none() {
        return bitmap;
    }

    for y in 0..height {
        for x in 0..width {
            let color = match geometry.cell(x as usize + left, y as usize + top) {
                CellClass::Walkable => colors.walkable,
                CellClass::Border => colors.border,
                CellClass::Blocked => None,
            };
            if let Some(color) = color.filter(|c| !c.is_transparent()) {
                bitmap.set(x, y, color);
            }
        }
    }
    bitmap
}

pub struct Compositor {
    geometry: Arc<AreaGeometry>,
    pois: Vec<PointOfInterest>,
    bitmap: Bitmap,
}

impl Compositor {
    pub fn new(geometry: Arc<AreaGeometry>, pois: Vec<PointOfInterest>, colors: &MapColors) -> Self {
        let bitmap = area_bitmap(&geometry, colors);
        debug!(
            "Compositor for {}: {}x{} bitmap, {} points of interest",
            geometry.area,
            bitmap.width,
            bitmap.height,
            pois.len()
        );
        Self {
            geometry,
            pois,
            bitmap,
        }
    }

    pub fn area(&self) -> Area {
        self.geometry.area
    }

    pub fn geometry(&self) -> &AreaGeometry {
        &self.geometry
    }

    pub fn points_of_interest(&self) -> &[PointOfInterest] {
        &self.pois
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn transform(&self, view: &ViewConfig, player: Point, surface: Surface) -> MapTransform {
        MapTransform::new(view, &self.geometry.view(), player, surface)
    }

    /// Draw the map and everything on it. Returns the transform used.
    ///
    /// Fails if the snapshot is for a different area than this compositor.
    pub fn draw<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        frame: &FrameInfo<'_>,
    ) -> Result<MapTransform> {
        let snapshot = frame.snapshot;
        if snapshot.area != self.geometry.area {
            return Err(Error::InvalidSnapshot(format!(
                "Compositor is for {}, snapshot is in {}",
                self.geometry.area, snapshot.area
            )));
        }

        let settings = frame.settings;
        let player: Point = snapshot.player_position.into();
        let transform = self.transform(&settings.rendering.view(), player, frame.surface);

        backend.push_clip(transform.draw_bounds);
        backend.draw_bitmap(&self.bitmap, &transform.map, settings.rendering.opacity);

        let mut painter = Painter {
            backend,
            transform: &transform,
            player,
            opacity: settings.rendering.icon_opacity,
        };
        self.draw_points_of_interest(&mut painter, settings);
        draw_objects(&mut painter, snapshot, settings);
        draw_monsters(&mut painter, snapshot, settings);
        if settings.item_log.enabled {
            draw_items(&mut painter, snapshot, settings);
        }
        self.draw_players(&mut painter, snapshot, settings);

        painter.backend.pop_clip();
        Ok(transform)
    }

    fn draw_points_of_interest<B: RenderBackend + ?Sized>(
        &self,
        painter: &mut Painter<'_, B>,
        settings: &Settings,
    ) {
        let player = painter.player;

        for poi in &self.pois {
            let rendering = settings.map.poi(poi.kind);
            let position: Point = poi.position.into();
            if rendering.can_draw_icon() {
                painter.icon(rendering, position);
            }
            if rendering.can_draw_line() {
                // keep room for the label at the end of the line
                let padding = if rendering.can_draw_label() {
                    rendering.label_font_size * 1.3 / 2.0
                } else {
                    0.0
                };
                let end = painter
                    .transform
                    .move_point_in_bounds(position, player, padding);
                painter.line(rendering, player, end);
            }
        }

        for poi in &self.pois {
            if poi.label.trim().is_empty() || poi.kind == PoiKind::Shrine {
                continue;
            }
            let rendering = settings.map.poi(poi.kind);
            if !rendering.can_draw_label() {
                continue;
            }
            let mut position: Point = poi.position.into();
            if rendering.can_draw_line() {
                position = painter
                    .transform
                    .move_point_in_bounds(position, player, 0.0);
            }
            painter.label(rendering, position, &poi.label, None);
        }
    }

    fn draw_players<B: RenderBackend + ?Sized>(
        &self,
        painter: &mut Painter<'_, B>,
        snapshot: &GameSnapshot,
        settings: &Settings,
    ) {
        let party = &settings.map.player;
        let others = &settings.map.non_party_player;

        let Some(me) = snapshot.local_roster_entry() else {
            // no roster: only the local player is known
            if party.can_draw_icon() {
                painter.icon(party, snapshot.player_position.into());
            }
            return;
        };

        for entry in &snapshot.roster {
            let mine = entry.unit_id == me.unit_id;
            let in_party = entry.same_party(me);

            let unit = if mine {
                Some(&snapshot.player)
            } else {
                snapshot.players.iter().find(|p| p.unit_id == entry.unit_id)
            };

            match unit {
                // the unit table is fresher than the roster
                Some(unit) => {
                    let position: Point = unit.position.into();
                    if in_party {
                        if party.can_draw_icon() {
                            painter.icon(party, position);
                        }
                        if party.can_draw_label() && !mine {
                            painter.label(party, position, &entry.name, None);
                        }
                    } else {
                        if !mine {
                            if others.can_draw_icon() {
                                painter.icon(others, position);
                            }
                        } else if party.can_draw_icon() {
                            painter.icon(party, position);
                        }
                        if others.can_draw_label() && !mine {
                            painter.label(others, position, &entry.name, None);
                        }
                    }
                }
                None => {
                    let nearby = entry.area == snapshot.area
                        || self.geometry.adjacent_levels.contains_key(&entry.area);
                    // roster positions are only kept up to date for party members
                    if !nearby || !in_party {
                        continue;
                    }
                    let position: Point = entry.position.into();
                    if party.can_draw_icon() {
                        painter.icon(party, position);
                    }
                    if party.can_draw_label() && !mine {
                        painter.label(party, position, &entry.name, None);
                    }
                }
            }
        }
    }
}

fn draw_objects<B: RenderBackend + ?Sized>(
    painter: &mut Painter<'_, B>,
    snapshot: &GameSnapshot,
    settings: &Settings,
) {
    for unit in &snapshot.objects {
        let Some(info) = unit.object() else {
            continue;
        };
        let position: Point = unit.position.into();

        if object::is_shrine(unit.txt_file_no) {
            let rendering = &settings.map.shrine;
            if rendering.can_draw_icon() {
                painter.icon(rendering, position);
            }
            if rendering.can_draw_label() {
                if let Some(label) = shrine_label(info.interact_type) {
                    painter.label(rendering, position, label, None);
                }
            }
        } else if object::is_portal(unit.txt_file_no) {
            let rendering = &settings.map.portal;
            if rendering.can_draw_icon() {
                painter.icon(rendering, position);
            }
            if rendering.can_draw_label() {
                let destination = Area(info.interact_type as u32);
                if let Some(label) = portal_label(destination, Some(info.owner.as_str())) {
                    painter.label(rendering, position, &label, None);
                }
            }
        }
    }
}

fn draw_monsters<B: RenderBackend + ?Sized>(
    painter: &mut Painter<'_, B>,
    snapshot: &GameSnapshot,
    settings: &Settings,
) {
    let of_tier = |tier: MonsterTier| {
        snapshot
            .monsters
            .iter()
            .filter(move |m| m.monster_tier() == Some(tier))
    };

    for tier in MonsterTier::iter() {
        let rendering = settings.map.monster(tier);
        if !rendering.can_draw_icon() {
            continue;
        }
        for monster in of_tier(tier) {
            painter.icon(rendering, monster.position.into());
        }
    }

    // immunity markers go on top of every icon
    for tier in MonsterTier::iter() {
        let rendering = settings.map.monster(tier);
        if !rendering.can_draw_icon() {
            continue;
        }
        for monster in of_tier(tier) {
            painter.immunities(rendering, monster);
        }
    }
}

fn draw_items<B: RenderBackend + ?Sized>(
    painter: &mut Painter<'_, B>,
    snapshot: &GameSnapshot,
    settings: &Settings,
) {
    let rendering = &settings.map.item;
    let filter = &settings.item_log.filter;
    let shown: Vec<&UnitRecord> = snapshot
        .items
        .iter()
        .filter(|item| item.is_dropped() && filter.matches(item))
        .collect();

    if rendering.can_draw_icon() {
        for item in &shown {
            painter.icon(rendering, item.position.into());
        }
    }

    let now = Utc::now();
    for item in &shown {
        let entry = ItemLogEntry::from_item(item, snapshot.area, now);
        let Some(color) = entry.quality.and_then(quality_color) else {
            continue;
        };
        painter.label(rendering, item.position.into(), &entry.label(), Some(color));
    }
}

/// Game IP, area name and the item log, top-left anchored at `anchor`.
///
/// Nothing is drawn while a panel covers the play field.
pub fn draw_game_info<B: RenderBackend + ?Sized>(
    backend: &mut B,
    anchor: Point,
    snapshot: &GameSnapshot,
    item_log: &[(String, Color)],
    settings: &ItemLogSettings,
    map_error: bool,
) {
    if snapshot.menu.any_panel_open() {
        return;
    }

    let font_size = settings.label_font_size;
    let line_height = font_size * 1.5;
    let mut cursor = anchor;
    let text = |backend: &mut B, at: Point, line: &str, font: &str, size: f32, color: Color| {
        let extent = backend.measure_text(line, font, size);
        backend.draw_text(at + extent * 0.5, line, font, size, color);
    };

    if !snapshot.session.game_ip.is_empty() {
        let line = format!("Game IP: {}", snapshot.session.game_ip);
        text(backend, cursor, &line, "Consolas", 14.0, Color::RED);
        cursor.y += line_height + 5.0;
    }

    let area = format!("Area: {}", snapshot.area.display_name());
    text(backend, cursor, &area, "Consolas", 14.0, Color::rgb(255, 218, 100));
    cursor.y += line_height + 5.0;

    if map_error {
        text(backend, cursor, "ERROR LOADING GAME MAP!", "Consolas", 20.0, Color::ORANGE);
        cursor.y += line_height + 5.0;
    }

    if !settings.enabled {
        return;
    }
    for (i, (line, color)) in item_log.iter().enumerate() {
        let at = cursor + Point::new(0.0, i as f32 * line_height);
        text(backend, at, line, &settings.label_font, font_size, *color);
    }
}

/// Draw helpers bound to one frame's transform.
struct Painter<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    transform: &'a MapTransform,
    player: Point,
    opacity: f32,
}

impl<B: RenderBackend + ?Sized> Painter<'_, B> {
    fn icon(&mut self, rendering: &PoiRendering, world: Point) {
        let at = self.transform.world_to_screen(world);
        self.shape(
            rendering.icon_shape,
            rendering.icon_color,
            rendering.icon_size,
            rendering.icon_thickness,
            at,
            false,
        );
    }

    /// Icon at a screen position. `equal_scaling` uses the horizontal
    /// scale on both axes.
    fn shape(
        &mut self,
        shape: IconShape,
        color: Color,
        size: f32,
        thickness: f32,
        at: Point,
        equal_scaling: bool,
    ) {
        let sw = self.transform.scale_width;
        let sh = if equal_scaling {
            sw
        } else {
            self.transform.scale_height
        };
        let color = color.with_opacity(self.opacity);

        match shape {
            IconShape::None => {}
            IconShape::Ellipse | IconShape::EllipseOutline => self.backend.draw_ellipse(
                at,
                size * sw / 2.0,
                size * sh / 2.0,
                color,
                shape.is_filled(),
                thickness,
            ),
            IconShape::Portal => {
                self.backend
                    .draw_ellipse(at, size * sw / 2.0, size * sw, color, false, thickness)
            }
            _ => {
                let points: Vec<Point> = icon_outline(shape, size, sw, sh)
                    .into_iter()
                    .map(|p| p + at)
                    .collect();
                self.backend
                    .draw_polygon(&points, color, shape.is_filled(), thickness);
            }
        }
    }

    fn line(&mut self, rendering: &PoiRendering, from: Point, to: Point) {
        let start = self.transform.world_to_screen(from);
        let end = self.transform.world_to_screen(to);
        let delta = end - start;
        if delta.length() <= MIN_LINE_LENGTH {
            return;
        }

        let angle = delta.angle();
        let direction = Point::new(angle.cos(), angle.sin());
        let sw = self.transform.scale_width;
        let color = rendering.line_color.with_opacity(self.opacity);
        let start = start + direction * (5.0 * sw);

        if rendering.can_draw_arrow_head() {
            let end = end - direction * (rendering.arrow_head_size + sw);
            self.backend
                .draw_line(start, end, color, rendering.line_thickness);
            let head = arrow_head(end, angle, rendering.arrow_head_size);
            self.backend.draw_polygon(&head, color, true, rendering.line_thickness);
        } else {
            self.backend
                .draw_line(start, end, color, rendering.line_thickness);
        }
    }

    /// Label below the icon, or on the far side from the player when the
    /// kind has arrow heads.
    fn label(&mut self, rendering: &PoiRendering, world: Point, text: &str, color: Option<Color>) {
        let player = self.transform.world_to_screen(self.player);
        let mut at = self.transform.world_to_screen(world);
        let extent = self
            .backend
            .measure_text(text, &rendering.label_font, rendering.label_font_size);

        let direction = if !rendering.can_draw_arrow_head() || player.y < at.y {
            1.0
        } else {
            -1.0
        };
        if rendering.can_draw_icon() {
            let icon = icon_bounds(
                rendering.icon_shape,
                rendering.icon_size,
                self.transform.scale_width,
                self.transform.scale_height,
            );
            at.y += icon.height() / 2.0 * direction;
        }
        at.y += (extent.y / 2.0 + 10.0) * direction;
        let at = self.transform.move_text_in_bounds(at, extent);

        let color = color.unwrap_or(rendering.label_color).with_opacity(self.opacity);
        self.backend.draw_text(
            at,
            text,
            &rendering.label_font,
            rendering.label_font_size,
            color,
        );
    }

    /// One dot per immunity, centered above the monster's icon.
    fn immunities(&mut self, rendering: &PoiRendering, monster: &UnitRecord) {
        let Some(info) = monster.monster() else {
            return;
        };
        if info.immunities.is_empty() {
            return;
        }

        let sw = self.transform.scale_width;
        let at = self.transform.world_to_screen(monster.position.into());
        let icon = icon_bounds(
            rendering.icon_shape,
            rendering.icon_size,
            sw,
            self.transform.scale_height,
        );
        let dot = (icon.height() / 12.0).max(3.0 / sw);
        let step = dot * sw * 1.5;

        let mut x = -step * (info.immunities.len() - 1) as f32 / 2.0;
        for &resist in &info.immunities {
            let center = at + Point::new(x, -icon.height() - dot);
            self.shape(IconShape::Ellipse, resist_color(resist), dot, 1.0, center, true);
            x += step;
        }
    }
}
