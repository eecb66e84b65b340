use serde::{Deserialize, Serialize};

use crate::map::PoiKind;
use crate::render::{Color, IconShape};
use crate::unit::MonsterTier;

/// How one kind of thing is drawn: icon, guide line and label.
///
/// A part with a transparent color or a zero size is not drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoiRendering {
    pub icon_shape: IconShape,
    pub icon_color: Color,
    pub icon_size: f32,
    pub icon_thickness: f32,
    pub line_color: Color,
    pub line_thickness: f32,
    pub arrow_head_size: f32,
    pub label_font: String,
    pub label_font_size: f32,
    pub label_color: Color,
}

impl Default for PoiRendering {
    fn default() -> Self {
        Self {
            icon_shape: IconShape::None,
            icon_color: Color::TRANSPARENT,
            icon_size: 0.0,
            icon_thickness: 1.0,
            line_color: Color::TRANSPARENT,
            line_thickness: 1.0,
            arrow_head_size: 0.0,
            label_font: "Helvetica".to_string(),
            label_font_size: 14.0,
            label_color: Color::TRANSPARENT,
        }
    }
}

impl PoiRendering {
    pub fn icon(shape: IconShape, color: Color, size: f32) -> Self {
        Self {
            icon_shape: shape,
            icon_color: color,
            icon_size: size,
            ..Default::default()
        }
    }

    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.icon_thickness = thickness;
        self
    }

    pub fn with_line(mut self, color: Color, thickness: f32, arrow_head_size: f32) -> Self {
        self.line_color = color;
        self.line_thickness = thickness;
        self.arrow_head_size = arrow_head_size;
        self
    }

    pub fn with_label(mut self, color: Color) -> Self {
        self.label_color = color;
        self
    }

    pub fn can_draw_icon(&self) -> bool {
        self.icon_shape != IconShape::None
            && self.icon_size > 0.0
            && !self.icon_color.is_transparent()
    }

    pub fn can_draw_line(&self) -> bool {
        !self.line_color.is_transparent() && self.line_thickness > 0.0
    }

    pub fn can_draw_arrow_head(&self) -> bool {
        self.can_draw_line() && self.arrow_head_size > 0.0
    }

    pub fn can_draw_label(&self) -> bool {
        !self.label_color.is_transparent()
            && self.label_font_size > 0.0
            && !self.label_font.trim().is_empty()
    }
}

/// Per-kind rendering for everything drawn on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub next_area: PoiRendering,
    pub previous_area: PoiRendering,
    pub waypoint: PoiRendering,
    pub quest: PoiRendering,
    pub shrine: PoiRendering,
    pub super_chest: PoiRendering,
    pub normal_chest: PoiRendering,
    pub armor_weapon_rack: PoiRendering,
    pub portal: PoiRendering,
    pub normal_monster: PoiRendering,
    pub elite_monster: PoiRendering,
    pub unique_monster: PoiRendering,
    pub super_unique_monster: PoiRendering,
    pub item: PoiRendering,
    pub player: PoiRendering,
    pub non_party_player: PoiRendering,
}

impl Default for MapSettings {
    fn default() -> Self {
        let purple = Color::rgb(255, 0, 255);
        Self {
            next_area: PoiRendering::icon(IconShape::Square, purple, 10.0)
                .with_line(purple, 1.0, 10.0)
                .with_label(purple),
            previous_area: PoiRendering::icon(IconShape::Square, purple, 10.0).with_label(purple),
            waypoint: PoiRendering::icon(IconShape::Square, Color::rgb(16, 140, 235), 10.0),
            quest: PoiRendering::icon(IconShape::Square, Color::rgb(255, 215, 0), 10.0)
                .with_line(Color::rgb(255, 215, 0), 1.0, 10.0)
                .with_label(Color::rgb(255, 215, 0)),
            shrine: PoiRendering::icon(IconShape::Ellipse, Color::rgb(255, 230, 90), 10.0)
                .with_label(Color::rgb(255, 230, 90)),
            super_chest: PoiRendering::icon(IconShape::Ellipse, Color::rgb(17, 255, 0), 10.0),
            normal_chest: PoiRendering::icon(IconShape::EllipseOutline, Color::rgb(255, 0, 255), 8.0)
                .with_thickness(2.0),
            armor_weapon_rack: PoiRendering::icon(IconShape::Polygon, Color::rgb(255, 232, 153), 8.0),
            portal: PoiRendering::icon(IconShape::Portal, Color::rgb(0, 140, 255), 15.0)
                .with_thickness(2.0)
                .with_label(Color::rgb(0, 140, 255)),
            normal_monster: PoiRendering::icon(IconShape::Cross, Color::rgb(255, 0, 0), 5.0),
            elite_monster: PoiRendering::icon(IconShape::Cross, Color::rgb(255, 140, 0), 5.0),
            unique_monster: PoiRendering::icon(IconShape::Cross, Color::GOLD, 5.0),
            super_unique_monster: PoiRendering::icon(IconShape::Cross, Color::GOLD, 8.0),
            item: PoiRendering::icon(IconShape::Ellipse, Color::WHITE, 4.0).with_label(Color::WHITE),
            player: PoiRendering::icon(IconShape::Square, Color::rgb(255, 255, 0), 8.0)
                .with_label(Color::rgb(255, 255, 0)),
            non_party_player: PoiRendering::icon(IconShape::Square, Color::rgb(255, 64, 64), 8.0)
                .with_label(Color::rgb(255, 64, 64)),
        }
    }
}

impl MapSettings {
    pub fn poi(&self, kind: PoiKind) -> &PoiRendering {
        match kind {
            PoiKind::NextArea => &self.next_area,
            PoiKind::PreviousArea => &self.previous_area,
            PoiKind::Waypoint => &self.waypoint,
            PoiKind::Quest => &self.quest,
            PoiKind::Shrine => &self.shrine,
            PoiKind::SuperChest => &self.super_chest,
            PoiKind::NormalChest => &self.normal_chest,
            PoiKind::ArmorWeaponRack => &self.armor_weapon_rack,
        }
    }

    pub fn monster(&self, tier: MonsterTier) -> &PoiRendering {
        match tier {
            MonsterTier::Normal => &self.normal_monster,
            MonsterTier::Elite => &self.elite_monster,
            MonsterTier::Unique => &self.unique_monster,
            MonsterTier::SuperUnique => &self.super_unique_monster,
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_can_draw() {
        let hidden = PoiRendering::default();
        assert!(!hidden.can_draw_icon());
        assert!(!hidden.can_draw_line());
        assert!(!hidden.can_draw_label());

        let line = PoiRendering::default().with_line(Color::RED, 1.0, 0.0);
        assert!(line.can_draw_line());
        assert!(!line.can_draw_arrow_head());

        let zero = PoiRendering::icon(IconShape::Square, Color::RED, 0.0);
        assert!(!zero.can_draw_icon());
    }

    #[test]
    fn test_every_kind_has_a_setting() {
        let map = MapSettings::default();
        for kind in PoiKind::iter() {
            assert!(map.poi(kind).can_draw_icon(), "{} has no icon", kind);
        }
        for tier in MonsterTier::iter() {
            assert!(map.monster(tier).can_draw_icon());
        }
    }
}
