use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[repr(u32)]
pub enum UnitType {
    Player = 0,
    Monster = 1,
    Object = 2,
    Missile = 3,
    Item = 4,
    Tile = 5,
}

impl UnitType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Player),
            1 => Some(Self::Monster),
            2 => Some(Self::Object),
            3 => Some(Self::Missile),
            4 => Some(Self::Item),
            5 => Some(Self::Tile),
            _ => None,
        }
    }

    /// Index into the unit hash table.
    pub fn table_index(self) -> usize {
        self as usize
    }

    /// Objects and items sit on a static path; everything else moves.
    pub fn is_movable(self) -> bool {
        !matches!(self, Self::Object | Self::Item)
    }
}

/// Stat ids read from a unit's stat list.
pub mod stat {
    pub const LEVEL: u16 = 12;
    pub const DAMAGE_RESIST: u16 = 36;
    pub const MAGIC_RESIST: u16 = 37;
    pub const FIRE_RESIST: u16 = 39;
    pub const LIGHTNING_RESIST: u16 = 41;
    pub const COLD_RESIST: u16 = 43;
    pub const POISON_RESIST: u16 = 45;
    pub const NUM_SOCKETS: u16 = 194;
}

/// Resistance value at which a unit is immune.
pub const IMMUNITY_THRESHOLD: i32 = 100;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Resist {
    Damage,
    Magic,
    Fire,
    Lightning,
    Cold,
    Poison,
}

impl Resist {
    pub fn stat_id(self) -> u16 {
        match self {
            Self::Damage => stat::DAMAGE_RESIST,
            Self::Magic => stat::MAGIC_RESIST,
            Self::Fire => stat::FIRE_RESIST,
            Self::Lightning => stat::LIGHTNING_RESIST,
            Self::Cold => stat::COLD_RESIST,
            Self::Poison => stat::POISON_RESIST,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
#[repr(u32)]
pub enum ItemQuality {
    Inferior = 1,
    Normal = 2,
    Superior = 3,
    Magic = 4,
    Set = 5,
    Rare = 6,
    Unique = 7,
    Craft = 8,
    Tempered = 9,
}

impl ItemQuality {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Inferior),
            2 => Some(Self::Normal),
            3 => Some(Self::Superior),
            4 => Some(Self::Magic),
            5 => Some(Self::Set),
            6 => Some(Self::Rare),
            7 => Some(Self::Unique),
            8 => Some(Self::Craft),
            9 => Some(Self::Tempered),
            _ => None,
        }
    }
}

/// Item mode values.
pub mod item_mode {
    pub const STORED: u32 = 0;
    pub const EQUIPPED: u32 = 1;
    pub const IN_BELT: u32 = 2;
    pub const ON_GROUND: u32 = 3;
    pub const ON_CURSOR: u32 = 4;
    pub const DROPPING: u32 = 5;
    pub const SOCKETED: u32 = 6;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemFlags(pub u32);

impl ItemFlags {
    pub const IDENTIFIED: u32 = 0x0000_0010;
    pub const SOCKETED: u32 = 0x0000_0800;
    pub const NEW: u32 = 0x0000_2000;
    pub const ETHEREAL: u32 = 0x0040_0000;
    pub const RUNEWORD: u32 = 0x0400_0000;

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    pub fn is_ethereal(self) -> bool {
        self.contains(Self::ETHEREAL)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonsterTypeFlags(pub u8);

impl MonsterTypeFlags {
    pub const OTHER: u8 = 0x01;
    pub const SUPER_UNIQUE: u8 = 0x02;
    pub const CHAMPION: u8 = 0x04;
    pub const UNIQUE: u8 = 0x08;
    pub const MINION: u8 = 0x10;
    pub const POSSESSED: u8 = 0x20;
    pub const GHOSTLY: u8 = 0x40;
    pub const MULTISHARD: u8 = 0x80;

    pub fn contains(self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    /// Any special type bit set.
    pub fn is_elite(self) -> bool {
        self.0 > 0
    }

    pub fn tier(self) -> MonsterTier {
        if self.contains(Self::SUPER_UNIQUE) {
            MonsterTier::SuperUnique
        } else if self.contains(Self::UNIQUE) {
            MonsterTier::Unique
        } else if self.is_elite() {
            MonsterTier::Elite
        } else {
            MonsterTier::Normal
        }
    }
}

/// Rendering tier of a monster, in draw order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum MonsterTier {
    Normal,
    Elite,
    Unique,
    SuperUnique,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_unit_type_from_u32() {
        for ty in UnitType::iter() {
            assert_eq!(UnitType::from_u32(ty as u32), Some(ty));
        }
        assert_eq!(UnitType::from_u32(6), None);
        assert!(UnitType::Monster.is_movable());
        assert!(!UnitType::Item.is_movable());
        assert!(!UnitType::Object.is_movable());
    }

    #[test]
    fn test_resist_stat_ids_in_order() {
        let ids: Vec<u16> = Resist::iter().map(Resist::stat_id).collect();
        assert_eq!(ids, vec![36, 37, 39, 41, 43, 45]);
    }

    #[test]
    fn test_monster_tier() {
        assert_eq!(MonsterTypeFlags(0).tier(), MonsterTier::Normal);
        assert_eq!(MonsterTypeFlags(MonsterTypeFlags::CHAMPION).tier(), MonsterTier::Elite);
        assert_eq!(MonsterTypeFlags(MonsterTypeFlags::MINION).tier(), MonsterTier::Elite);
        assert_eq!(
            MonsterTypeFlags(MonsterTypeFlags::UNIQUE | MonsterTypeFlags::GHOSTLY).tier(),
            MonsterTier::Unique
        );
        assert_eq!(
            MonsterTypeFlags(MonsterTypeFlags::SUPER_UNIQUE | MonsterTypeFlags::UNIQUE).tier(),
            MonsterTier::SuperUnique
        );
        assert!(MonsterTier::Normal < MonsterTier::SuperUnique);
    }

    #[test]
    fn test_item_flags() {
        let flags = ItemFlags(ItemFlags::ETHEREAL | ItemFlags::IDENTIFIED);
        assert!(flags.is_ethereal());
        assert!(!flags.contains(ItemFlags::SOCKETED));
        assert_eq!(ItemQuality::from_u32(7), Some(ItemQuality::Unique));
        assert_eq!(ItemQuality::from_u32(0), None);
        assert_eq!("unique".parse::<ItemQuality>().unwrap(), ItemQuality::Unique);
    }
}
