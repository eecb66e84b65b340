//! Points of interest derived from area geometry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use tracing::debug;

use crate::game::Area;
use crate::map::geometry::AreaGeometry;
use crate::unit::Position;

/// Object ids from the game's object table.
pub mod object {
    pub const SHRINE: u32 = 2;
    pub const TOWN_PORTAL: u32 = 59;
    pub const PERMANENT_PORTAL: u32 = 60;
    pub const HORADRIC_ORIFICE: u32 = 152;
    pub const SPARKLY_CHEST: u32 = 397;

    pub const WAYPOINTS: &[u32] = &[
        119, 145, 156, 157, 237, 238, 288, 323, 324, 398, 402, 429, 494, 496, 511, 539,
    ];

    pub const QUEST: &[(u32, &str)] = &[
        (17, "CairnStoneAlpha"),
        (30, "InifussTree"),
        (152, "HoradricOrifice"),
        (268, "WirtCorpse"),
        (354, "HoradricCubeChest"),
        (355, "HoradricScrollChest"),
        (356, "StaffOfKingsChest"),
        (357, "YetAnotherTome"),
        (376, "HellForge"),
        (558, "FrozenAnya"),
    ];

    pub const SUPER_CHESTS: &[(u32, &str)] = &[
        (387, "ArcaneLargeChestLeft"),
        (389, "ArcaneLargeChestRight"),
        (390, "ArcaneSmallChestLeft"),
        (391, "ArcaneSmallChestRight"),
        (397, "SparklyChest"),
        (580, "GoodChest"),
    ];

    pub const NORMAL_CHESTS: &[(u32, &str)] = &[
        (5, "LargeChestRight"),
        (6, "LargeChestLeft"),
        (87, "TombLargeChestL"),
        (88, "TombLargeChestR"),
        (139, "MediumChestLeft"),
        (140, "LargeChestLeft2"),
        (146, "Act2MediumChestRight"),
        (147, "Act2LargeChestRight"),
        (148, "Act2LargeChestLeft"),
        (181, "JungleChest"),
        (329, "MafistoLargeChestLeft"),
        (330, "MafistoLargeChestRight"),
        (405, "KhalimChest1"),
        (406, "KhalimChest2"),
        (407, "KhalimChest3"),
        (455, "ExpansionChestRight"),
        (466, "ExpansionWoodChestLeft"),
        (505, "BurialChestLeft"),
        (506, "BurialChestRight"),
    ];

    pub const ARMOR_WEAPON_RACKS: &[(u32, &str)] = &[
        (104, "ArmorStandRight"),
        (105, "ArmorStandLeft"),
        (106, "WeaponRackRight"),
        (107, "WeaponRackLeft"),
        (443, "ExpansionArmorStandRight"),
        (444, "ExpansionArmorStandLeft"),
        (445, "ExpansionWeaponRackRight"),
        (446, "ExpansionWeaponRackLeft"),
    ];

    pub const SHRINES: &[(u32, &str)] = &[
        (2, "Shrine"),
        (81, "ForestAltar"),
        (83, "HornShrine"),
        (170, "DesertShrine1"),
        (171, "DesertShrine2"),
        (172, "DesertShrine3"),
        (173, "DesertShrine4"),
        (174, "DesertShrine5"),
        (175, "SteleDesertMagicShrine"),
    ];

    pub(crate) fn name_in(table: &[(u32, &'static str)], id: u32) -> Option<&'static str> {
        table.iter().find(|(i, _)| *i == id).map(|(_, name)| *name)
    }

    pub(crate) fn contains(table: &[(u32, &str)], id: u32) -> bool {
        table.iter().any(|(i, _)| *i == id)
    }

    pub fn is_waypoint(id: u32) -> bool {
        WAYPOINTS.contains(&id)
    }

    pub fn is_shrine(id: u32) -> bool {
        contains(SHRINES, id)
    }

    pub fn is_portal(id: u32) -> bool {
        id == TOWN_PORTAL || id == PERMANENT_PORTAL
    }
}

/// Shrine effect names, indexed by the object's interact type.
const SHRINE_TYPES: &[&str] = &[
    "None",
    "Refill",
    "Health",
    "Mana",
    "HPXChange",
    "ManaXChange",
    "Armor",
    "Combat",
    "ResistFire",
    "ResistCold",
    "ResistLight",
    "ResistPoison",
    "Skill",
    "ManaRegen",
    "Stamina",
    "Experience",
    "Shrine",
    "Portal",
    "Gem",
    "Fire",
    "Monster",
    "Explosive",
    "Poison",
];

pub fn shrine_label(interact_type: u8) -> Option<&'static str> {
    SHRINE_TYPES.get(interact_type as usize).copied()
}

/// Label for a portal leading to `destination`, optionally owned by a player.
pub fn portal_label(destination: Area, owner: Option<&str>) -> Option<String> {
    if destination == Area::NONE || !destination.is_valid() {
        return None;
    }
    let area = destination.display_name();
    match owner.filter(|o| !o.trim().is_empty()) {
        Some(owner) => Some(format!("{} ({})", area, owner)),
        None => Some(area),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum PoiKind {
    NextArea,
    PreviousArea,
    Waypoint,
    Quest,
    Shrine,
    SuperChest,
    NormalChest,
    ArmorWeaponRack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub label: String,
    pub position: Position,
    pub kind: PoiKind,
}

impl PointOfInterest {
    fn new(label: impl Into<String>, position: Position, kind: PoiKind) -> Self {
        Self {
            label: label.into(),
            position,
            kind,
        }
    }
}

/// Object an area has as its own quest target.
fn area_quest_object(area: Area) -> Option<u32> {
    match area {
        Area::MATRONS_DEN | Area::FURNACE_OF_PAIN => Some(object::SPARKLY_CHEST),
        _ => None,
    }
}

/// Compute the points of interest of `geometry`.
///
/// `load` supplies other areas' geometry; it is only called in Canyon of
/// the Magi, to find the tomb that holds the Horadric Orifice.
pub fn points_of_interest<F>(geometry: &AreaGeometry, mut load: F) -> Vec<PointOfInterest>
where
    F: FnMut(Area) -> Option<Arc<AreaGeometry>>,
{
    let mut pois = Vec::new();

    if geometry.area == Area::CANYON_OF_THE_MAGI {
        let real_tomb = (Area::TAL_RASHAS_TOMB_1.id()..=Area::TAL_RASHAS_TOMB_7.id())
            .map(Area)
            .find(|&tomb| load(tomb).is_some_and(|g| g.has_object(object::HORADRIC_ORIFICE)));
        debug!("Real Tal Rasha tomb: {:?}", real_tomb);

        if let Some(tomb) = real_tomb {
            if let Some(exit) = geometry
                .adjacent_levels
                .get(&tomb)
                .and_then(|level| level.exits.first())
            {
                pois.push(PointOfInterest::new(tomb.display_name(), *exit, PoiKind::NextArea));
            }
        }
    } else if let Some((&highest, _)) = geometry.adjacent_levels.last_key_value() {
        if highest > geometry.area {
            if let Some(exit) = geometry.adjacent_levels[&highest].exits.first() {
                pois.push(PointOfInterest::new(
                    highest.display_name(),
                    *exit,
                    PoiKind::NextArea,
                ));
            }
        }
        for level in geometry.adjacent_levels.values() {
            if level.area == highest {
                continue;
            }
            for exit in &level.exits {
                pois.push(PointOfInterest::new(
                    level.area.display_name(),
                    *exit,
                    PoiKind::PreviousArea,
                ));
            }
        }
    }

    let area_quest = area_quest_object(geometry.area);
    for (&id, positions) in &geometry.objects {
        let Some(&first) = positions.first() else {
            continue;
        };

        if object::is_waypoint(id) {
            pois.push(PointOfInterest::new("Waypoint", first, PoiKind::Waypoint));
        } else if let Some(name) = object::name_in(object::QUEST, id) {
            pois.push(PointOfInterest::new(name, first, PoiKind::Quest));
        } else if area_quest == Some(id) {
            let name = object::name_in(object::SUPER_CHESTS, id).unwrap_or("Quest");
            pois.push(PointOfInterest::new(name, first, PoiKind::Quest));
        } else {
            let tables = [
                (object::SHRINES, PoiKind::Shrine),
                (object::SUPER_CHESTS, PoiKind::SuperChest),
                (object::NORMAL_CHESTS, PoiKind::NormalChest),
                (object::ARMOR_WEAPON_RACKS, PoiKind::ArmorWeaponRack),
            ];
            if let Some((name, kind)) = tables
                .iter()
                .find_map(|(table, kind)| object::name_in(table, id).map(|n| (n, *kind)))
            {
                pois.extend(
                    positions
                        .iter()
                        .map(|&pos| PointOfInterest::new(name, pos, kind)),
                );
            }
        }
    }

    pois
}
