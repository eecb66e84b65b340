//! Memory layout constants for D2R game structures
//!
//! All offsets are relative to the start of the structure they belong to.
//! Root structures are located through [`crate::offset::ResolvedOffsets`];
//! everything else is reached by following pointers from a unit.
//!
//! # Pointer graph
//!
//! ```text
//! UnitHashTable[type][bucket] -> UnitAny -> pListNext -> UnitAny -> ... -> null
//!                                  |
//!                                  +-> pUnitData   (PlayerData / MonsterData / ItemData / ObjectData)
//!                                  +-> pPath       -> pRoom1 -> pRoom2 -> pLevel -> LevelId
//!                                  +-> pAct        -> MapSeed, ActId, pActMisc -> Difficulty
//!                                  +-> pStatsListEx -> Stats { FirstStatPtr, Size } -> StatValue[]
//!                                  +-> pInventory
//! ```

/// Unit hash table: one block of bucket heads per unit type.
pub mod hash_table {
    /// Bucket heads per unit type.
    pub const BUCKETS: usize = 128;

    /// Byte distance between two unit-type blocks (`128 * 8`).
    pub const TYPE_STRIDE: u64 = 0x400;
}

/// `UnitAny`
///
/// ```text
/// Offset   Field          Size
/// ─────────────────────────────
/// 0x00     UnitType       4
/// 0x04     TxtFileNo      4
/// 0x08     UnitId         4
/// 0x0C     Mode           4
/// 0x10     pUnitData      8
/// 0x20     pAct           8
/// 0x38     pPath          8
/// 0x88     pStatsListEx   8
/// 0x90     pInventory     8
/// 0x150    pListNext      8
/// 0x158    pRoomNext      8
/// ```
pub mod unit {
    pub const UNIT_TYPE: usize = 0x00;
    pub const TXT_FILE_NO: usize = 0x04;
    pub const UNIT_ID: usize = 0x08;
    pub const MODE: usize = 0x0C;
    pub const UNIT_DATA: usize = 0x10;
    pub const ACT: usize = 0x20;
    pub const PATH: usize = 0x38;
    pub const STATS_LIST_EX: usize = 0x88;
    pub const INVENTORY: usize = 0x90;
    pub const OWNER_TYPE: usize = 0x100;
    pub const OWNER_ID: usize = 0x104;
    pub const LIST_NEXT: usize = 0x150;
    pub const ROOM_NEXT: usize = 0x158;

    pub const SIZE: usize = 0x160;
}

/// `Path`: dynamic coordinates for movable units, static for objects and items.
pub mod path {
    pub const DYNAMIC_X: usize = 0x02;
    pub const DYNAMIC_Y: usize = 0x06;
    pub const STATIC_X: usize = 0x10;
    pub const STATIC_Y: usize = 0x14;
    pub const ROOM1: usize = 0x20;

    pub const SIZE: usize = 0x28;
}

/// `Room1` / `Room2` / `Level`, followed to get the current area id.
pub mod room {
    pub const ROOM1_TO_ROOM2: u64 = 0x18;
    pub const ROOM2_TO_LEVEL: u64 = 0x90;
    pub const LEVEL_ID: u64 = 0x1F8;
}

/// `Act` and `ActMisc`
pub mod act {
    pub const MAP_SEED: usize = 0x14;
    pub const ACT_ID: usize = 0x20;
    pub const ACT_MISC: usize = 0x70;

    pub const SIZE: usize = 0x78;

    /// Difficulty byte inside `ActMisc`.
    pub const MISC_DIFFICULTY: u64 = 0x830;
}

/// `StatListEx`
///
/// The active stat array is `{ FirstStatPtr: u64, Size: u64 }` at 0x30;
/// each entry is `{ layer: u16, stat: u16, value: i32 }`.
pub mod stats {
    pub const STATS_ARRAY: usize = 0x30;
    pub const STAT_ENTRY_SIZE: usize = 8;

    /// Upper bound on entries read from one list; anything larger is treated
    /// as a torn read.
    pub const MAX_ENTRIES: u64 = 512;
}

/// `MonsterData`
pub mod monster {
    pub const TYPE_FLAGS: usize = 0x1A;

    pub const SIZE: usize = 0x20;
}

/// `ItemData`
pub mod item {
    pub const QUALITY: usize = 0x00;
    pub const FLAGS: usize = 0x18;

    pub const SIZE: usize = 0x1C;
}

/// `ObjectData` (packed)
///
/// ```text
/// Offset   Field          Size
/// ─────────────────────────────
/// 0x00     pObjectTxt     8
/// 0x08     InteractType   1
/// 0x09     PortalFlags    1
/// 0x0C     pShrineTxt     8
/// 0x34     Owner          16 (ASCII)
/// ```
pub mod object {
    pub const OBJECT_TXT: usize = 0x00;
    pub const INTERACT_TYPE: usize = 0x08;
    pub const PORTAL_FLAGS: usize = 0x09;
    pub const SHRINE_TXT: usize = 0x0C;
    pub const OWNER: usize = 0x34;
    pub const OWNER_LEN: usize = 0x10;

    pub const SIZE: usize = 0x44;
}

/// `PlayerData`: the character name is the first field.
pub mod player {
    pub const NAME: usize = 0x00;
    pub const NAME_LEN: usize = 0x10;
}

/// Inventory discriminator for the local player.
///
/// The int at `inventory + offset` differs from the sentinel only for the
/// locally controlled character. The offset and sentinel depend on whether
/// the expansion flag in the module is set.
pub mod inventory {
    pub const BASE_CHECK_OFFSET: u64 = 0x30;
    pub const BASE_CHECK_SENTINEL: i32 = 1;

    pub const EXPANSION_CHECK_OFFSET: u64 = 0x70;
    pub const EXPANSION_CHECK_SENTINEL: i32 = 0;
}

/// `RosterMember`, a singly linked list of party entries.
pub mod roster {
    pub const NAME: usize = 0x00;
    pub const NAME_LEN: usize = 0x10;
    pub const UNIT_ID: usize = 0x10;
    pub const LIFE: usize = 0x14;
    pub const CLASS_ID: usize = 0x1C;
    pub const LEVEL: usize = 0x20;
    pub const PARTY_ID: usize = 0x22;
    pub const AREA: usize = 0x24;
    pub const POS_X: usize = 0x28;
    pub const POS_Y: usize = 0x2C;
    pub const NEXT: usize = 0x148;

    pub const SIZE: usize = 0x150;

    /// Party id used when a player is in no party.
    pub const NO_PARTY: u16 = u16::MAX;

    /// Guard against a corrupted list.
    pub const MAX_ENTRIES: usize = 16;
}

/// `MenuData`: one bool byte per panel.
pub mod menu {
    pub const INVENTORY: usize = 0x01;
    pub const CHARACTER: usize = 0x02;
    pub const SKILL_SELECT: usize = 0x03;
    pub const SKILL_TREE: usize = 0x04;
    pub const CHAT: usize = 0x05;
    pub const NPC_INTERACT: usize = 0x08;
    pub const ESC_MENU: usize = 0x09;
    pub const MAP: usize = 0x0A;
    pub const NPC_SHOP: usize = 0x0B;
    pub const QUEST_LOG: usize = 0x0E;
    pub const WAYPOINT: usize = 0x13;
    pub const PARTY: usize = 0x15;
    pub const STASH: usize = 0x18;
    pub const CUBE: usize = 0x19;
    pub const MERCENARY_INVENTORY: usize = 0x1E;

    pub const SIZE: usize = 0x1F;
}

/// Session block at `GameIpOffset`.
pub mod session {
    pub const GAME_IP: u64 = 0x00;
    pub const GAME_IP_LEN: usize = 0x20;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_table_stride_covers_all_buckets() {
        assert_eq!(hash_table::TYPE_STRIDE as usize, hash_table::BUCKETS * 8);
    }

    #[test]
    fn test_unit_size_covers_fields() {
        assert!(unit::ROOM_NEXT + 8 <= unit::SIZE);
        assert!(path::ROOM1 + 8 <= path::SIZE);
        assert!(act::ACT_MISC + 8 <= act::SIZE);
        assert!(object::OWNER + object::OWNER_LEN <= object::SIZE);
        assert!(roster::NEXT + 8 <= roster::SIZE);
        assert!(menu::MERCENARY_INVENTORY < menu::SIZE);
    }
}
