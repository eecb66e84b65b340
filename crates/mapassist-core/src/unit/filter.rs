use std::collections::HashSet;

use crate::unit::UnitRecord;
use crate::unit::types::UnitType;

/// Town NPCs, critters and other non-combat monster ids.
pub const DEFAULT_DUMMY_MONSTERS: &[u32] = &[
    146, 147, 148, 149, 150, 151, 152, 154, 155, 157, 158, 159, 175, 176, 177, 178, 179, 185,
    195, 196, 197, 198, 199, 200, 201, 202, 210, 244, 245, 246, 251, 252, 253, 254, 255, 256,
    257, 264, 265, 266, 297, 331, 338, 339, 344, 355, 359, 363, 364, 367, 405, 406, 408, 511,
    512, 513, 514, 515, 520, 521, 523, 524, 525, 527, 528, 533, 535, 536, 537, 538, 539, 543,
];

/// Modes in which a monster is dead or a corpse.
pub const DEFAULT_EXCLUDED_MODES: &[u32] = &[0, 12];

/// Decides which monster units are live, hostile monsters.
///
/// The exclusion lists are data and can be extended from configuration.
#[derive(Debug, Clone)]
pub struct MonsterFilter {
    dummies: HashSet<u32>,
    excluded_modes: HashSet<u32>,
}

impl Default for MonsterFilter {
    fn default() -> Self {
        Self {
            dummies: DEFAULT_DUMMY_MONSTERS.iter().copied().collect(),
            excluded_modes: DEFAULT_EXCLUDED_MODES.iter().copied().collect(),
        }
    }
}

impl MonsterFilter {
    pub fn with_dummies(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.dummies.extend(ids);
        self
    }

    pub fn with_excluded_modes(mut self, modes: impl IntoIterator<Item = u32>) -> Self {
        self.excluded_modes.extend(modes);
        self
    }

    pub fn is_dummy(&self, txt_file_no: u32) -> bool {
        self.dummies.contains(&txt_file_no)
    }

    pub fn is_monster(&self, unit: &UnitRecord) -> bool {
        unit.unit_type == UnitType::Monster
            && !self.excluded_modes.contains(&unit.mode)
            && !self.is_dummy(unit.txt_file_no)
    }
}
