//! Live unit graph: players, monsters, items and objects.

mod filter;
mod graph;
mod record;
pub mod types;

pub use filter::{DEFAULT_DUMMY_MONSTERS, DEFAULT_EXCLUDED_MODES, MonsterFilter};
pub use graph::{UnitGraph, UnitIter};
pub use record::{
    ItemInfo, MonsterInfo, ObjectInfo, Position, RawUnit, StatValue, UnitPayload, UnitRecord,
    immunities_from_stats,
};
pub use types::{
    ItemFlags, ItemQuality, MonsterTier, MonsterTypeFlags, Resist, UnitType,
};
