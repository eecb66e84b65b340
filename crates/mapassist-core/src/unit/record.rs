use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::Result;
use crate::process::layout::{item, monster, object, path, unit};
use crate::process::{ByteBuffer, RemoteStruct};
use crate::unit::types::{
    IMMUNITY_THRESHOLD, ItemFlags, ItemQuality, MonsterTier, MonsterTypeFlags, Resist, UnitType,
    item_mode, stat,
};

/// World position in game units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// `UnitAny` as laid out in the game process.
#[derive(Debug, Clone, Default)]
pub struct RawUnit {
    pub unit_type: u32,
    pub txt_file_no: u32,
    pub unit_id: u32,
    pub mode: u32,
    pub unit_data: u64,
    pub act: u64,
    pub path: u64,
    pub stats_list_ex: u64,
    pub inventory: u64,
    pub owner_type: u32,
    pub owner_id: u32,
    pub list_next: u64,
    pub room_next: u64,
}

impl RemoteStruct for RawUnit {
    const SIZE: usize = unit::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            unit_type: buf.read_u32_at(unit::UNIT_TYPE)?,
            txt_file_no: buf.read_u32_at(unit::TXT_FILE_NO)?,
            unit_id: buf.read_u32_at(unit::UNIT_ID)?,
            mode: buf.read_u32_at(unit::MODE)?,
            unit_data: buf.read_u64_at(unit::UNIT_DATA)?,
            act: buf.read_u64_at(unit::ACT)?,
            path: buf.read_u64_at(unit::PATH)?,
            stats_list_ex: buf.read_u64_at(unit::STATS_LIST_EX)?,
            inventory: buf.read_u64_at(unit::INVENTORY)?,
            owner_type: buf.read_u32_at(unit::OWNER_TYPE)?,
            owner_id: buf.read_u32_at(unit::OWNER_ID)?,
            list_next: buf.read_u64_at(unit::LIST_NEXT)?,
            room_next: buf.read_u64_at(unit::ROOM_NEXT)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawPath {
    pub dynamic: Position,
    pub static_pos: Position,
    pub room1: u64,
}

impl RawPath {
    pub fn position(&self, unit_type: UnitType) -> Position {
        if unit_type.is_movable() {
            self.dynamic
        } else {
            self.static_pos
        }
    }
}

impl RemoteStruct for RawPath {
    const SIZE: usize = path::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            dynamic: Position::new(
                buf.read_u16_at(path::DYNAMIC_X)?,
                buf.read_u16_at(path::DYNAMIC_Y)?,
            ),
            // the static path stores full u32 tile coordinates
            static_pos: Position::new(
                buf.read_u32_at(path::STATIC_X)? as u16,
                buf.read_u32_at(path::STATIC_Y)? as u16,
            ),
            room1: buf.read_u64_at(path::ROOM1)?,
        })
    }
}

/// One `{ layer, stat, value }` entry of a stat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatValue {
    pub layer: u16,
    pub stat: u16,
    pub value: i32,
}

impl RemoteStruct for StatValue {
    const SIZE: usize = 8;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            layer: buf.read_u16_at(0)?,
            stat: buf.read_u16_at(2)?,
            value: buf.read_i32_at(4)?,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawMonsterData {
    pub type_flags: MonsterTypeFlags,
}

impl RemoteStruct for RawMonsterData {
    const SIZE: usize = monster::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            type_flags: MonsterTypeFlags(buf.read_u8_at(monster::TYPE_FLAGS)?),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawItemData {
    pub quality: u32,
    pub flags: ItemFlags,
}

impl RemoteStruct for RawItemData {
    const SIZE: usize = item::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            quality: buf.read_u32_at(item::QUALITY)?,
            flags: ItemFlags(buf.read_u32_at(item::FLAGS)?),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawObjectData {
    pub object_txt: u64,
    pub interact_type: u8,
    pub portal_flags: u8,
    pub shrine_txt: u64,
    pub owner: String,
}

impl RemoteStruct for RawObjectData {
    const SIZE: usize = object::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            object_txt: buf.read_u64_at(object::OBJECT_TXT)?,
            interact_type: buf.read_u8_at(object::INTERACT_TYPE)?,
            portal_flags: buf.read_u8_at(object::PORTAL_FLAGS)?,
            shrine_txt: buf.read_u64_at(object::SHRINE_TXT)?,
            owner: buf.read_ascii_at(object::OWNER, object::OWNER_LEN)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonsterInfo {
    pub type_flags: MonsterTypeFlags,
    pub immunities: Vec<Resist>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub quality: Option<ItemQuality>,
    pub flags: ItemFlags,
    pub sockets: u32,
    pub owner_id: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Shrine type for shrines, destination area for portals.
    pub interact_type: u8,
    /// Name of the player who opened a town portal.
    pub owner: String,
}

/// Type-specific part of a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum UnitPayload {
    Player { name: String },
    Monster(MonsterInfo),
    Item(ItemInfo),
    Object(ObjectInfo),
    #[default]
    None,
}

/// One live unit, decoded during a single snapshot.
///
/// Equality and hashing use `unit_id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitRecord {
    pub address: u64,
    pub unit_type: UnitType,
    pub txt_file_no: u32,
    pub unit_id: u32,
    pub mode: u32,
    pub position: Position,
    pub stats: BTreeMap<u16, i32>,
    pub payload: UnitPayload,
    #[serde(skip)]
    pub inventory: u64,
    #[serde(skip)]
    pub act: u64,
    #[serde(skip)]
    pub room1: u64,
}

impl UnitRecord {
    pub fn stat(&self, id: u16) -> Option<i32> {
        self.stats.get(&id).copied()
    }

    /// Every element this unit is immune to, in resist order.
    pub fn immunities(&self) -> Vec<Resist> {
        immunities_from_stats(&self.stats)
    }

    pub fn is_player(&self) -> bool {
        self.unit_type == UnitType::Player
    }

    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            UnitPayload::Player { name } => Some(name),
            _ => None,
        }
    }

    pub fn monster(&self) -> Option<&MonsterInfo> {
        match &self.payload {
            UnitPayload::Monster(info) => Some(info),
            _ => None,
        }
    }

    pub fn item(&self) -> Option<&ItemInfo> {
        match &self.payload {
            UnitPayload::Item(info) => Some(info),
            _ => None,
        }
    }

    pub fn object(&self) -> Option<&ObjectInfo> {
        match &self.payload {
            UnitPayload::Object(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_elite(&self) -> bool {
        self.monster().is_some_and(|m| m.type_flags.is_elite())
    }

    pub fn monster_tier(&self) -> Option<MonsterTier> {
        self.monster().map(|m| m.type_flags.tier())
    }

    /// Items lying on the ground or falling to it.
    pub fn is_dropped(&self) -> bool {
        self.unit_type == UnitType::Item
            && matches!(self.mode, item_mode::ON_GROUND | item_mode::DROPPING)
    }

    /// Content key for an item: base type plus where it lies.
    pub fn item_hash(&self) -> String {
        format!("{}/{}/{}", self.txt_file_no, self.position.x, self.position.y)
    }

    pub fn sockets(&self) -> u32 {
        self.stat(stat::NUM_SOCKETS).unwrap_or(0).max(0) as u32
    }
}

impl PartialEq for UnitRecord {
    fn eq(&self, other: &Self) -> bool {
        self.unit_id == other.unit_id
    }
}

impl Eq for UnitRecord {}

impl Hash for UnitRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unit_id.hash(state);
    }
}

pub fn immunities_from_stats(stats: &BTreeMap<u16, i32>) -> Vec<Resist> {
    Resist::iter()
        .filter(|resist| {
            stats
                .get(&resist.stat_id())
                .is_some_and(|&value| value >= IMMUNITY_THRESHOLD)
        })
        .collect()
}
