use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Logical root pointers located relative to the module base.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum OffsetName {
    UnitHashTable,
    UiMapFlag,
    GameIpOffset,
    MenuDataOffset,
    RosterDataOffset,
    ExpansionCheck,
}

impl OffsetName {
    /// Offsets without which no snapshot can be built.
    pub fn is_required(self) -> bool {
        matches!(self, OffsetName::UnitHashTable | OffsetName::ExpansionCheck)
    }
}

/// Byte offsets (RVAs) of every logical root, resolved once per attach.
///
/// A value of `0` means "not resolved".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOffsets {
    pub version: String,
    pub unit_hash_table: u64,
    pub ui_map_flag: u64,
    pub game_ip: u64,
    pub menu_data: u64,
    pub roster_data: u64,
    pub expansion_check: u64,
}

impl ResolvedOffsets {
    pub fn get(&self, name: OffsetName) -> u64 {
        match name {
            OffsetName::UnitHashTable => self.unit_hash_table,
            OffsetName::UiMapFlag => self.ui_map_flag,
            OffsetName::GameIpOffset => self.game_ip,
            OffsetName::MenuDataOffset => self.menu_data,
            OffsetName::RosterDataOffset => self.roster_data,
            OffsetName::ExpansionCheck => self.expansion_check,
        }
    }

    pub fn set(&mut self, name: OffsetName, value: u64) {
        let slot = match name {
            OffsetName::UnitHashTable => &mut self.unit_hash_table,
            OffsetName::UiMapFlag => &mut self.ui_map_flag,
            OffsetName::GameIpOffset => &mut self.game_ip,
            OffsetName::MenuDataOffset => &mut self.menu_data,
            OffsetName::RosterDataOffset => &mut self.roster_data,
            OffsetName::ExpansionCheck => &mut self.expansion_check,
        };
        *slot = value;
    }

    /// Check if the offsets needed to build a snapshot are present
    pub fn is_valid(&self) -> bool {
        use strum::IntoEnumIterator;
        OffsetName::iter()
            .filter(|name| name.is_required())
            .all(|name| self.get(name) != 0)
    }

    /// Names of offsets that are still zero.
    pub fn missing(&self) -> Vec<OffsetName> {
        use strum::IntoEnumIterator;
        OffsetName::iter().filter(|&n| self.get(n) == 0).collect()
    }

    /// Absolute address of a root for a module loaded at `base`.
    pub fn address(&self, base: u64, name: OffsetName) -> Option<u64> {
        match self.get(name) {
            0 => None,
            rva => Some(base + rva),
        }
    }
}
