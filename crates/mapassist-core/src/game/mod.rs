mod area;
mod builder;
mod context;
mod difficulty;
mod item_log;
mod loot;
mod snapshot;

pub use area::Area;
pub use builder::{SnapshotBuilder, is_local_player};
pub use context::GameContext;
pub use difficulty::Difficulty;
pub use item_log::{DEFAULT_ITEM_LOG_CAPACITY, ItemLogEntry, ItemSeenRegistry, ItemSeenState};
pub use loot::{ItemAlert, LootFilter, LootRule, SilentAlert};
pub use snapshot::{GameSnapshot, MenuFlags, RosterEntry, Session};

#[cfg(test)]
pub(crate) use snapshot::tests as snapshot_tests;
