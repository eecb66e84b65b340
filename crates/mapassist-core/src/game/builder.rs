//! Per-frame snapshot assembly.
//!
//! Every read failure below this point is reported as an error from
//! [`SnapshotBuilder::try_build`]; [`SnapshotBuilder::build`] turns it into
//! "no snapshot this frame" so the render loop never sees it.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::game::{
    Area, Difficulty, GameContext, GameSnapshot, ItemAlert, ItemSeenRegistry, ItemSeenState,
    LootFilter, MenuFlags, RosterEntry, Session,
};
use crate::offset::OffsetName;
use crate::process::layout::{act, inventory, roster};
use crate::process::{ByteBuffer, ReadMemory, RemoteStruct};
use crate::unit::{MonsterFilter, UnitGraph, UnitRecord, UnitType};

/// `Act`, reached from the player unit.
#[derive(Debug, Clone, Copy)]
struct RawAct {
    map_seed: u32,
    act_id: u32,
    act_misc: u64,
}

impl RemoteStruct for RawAct {
    const SIZE: usize = act::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            map_seed: buf.read_u32_at(act::MAP_SEED)?,
            act_id: buf.read_u32_at(act::ACT_ID)?,
            act_misc: buf.read_u64_at(act::ACT_MISC)?,
        })
    }
}

/// Whether a player unit is the locally controlled character.
///
/// Only the local character has an inventory whose discriminator differs
/// from the sentinel; the offset and sentinel depend on expansion mode.
pub fn is_local_player<R: ReadMemory>(
    reader: &R,
    unit: &UnitRecord,
    expansion: bool,
) -> Result<bool> {
    if !unit.is_player() || unit.inventory == 0 {
        return Ok(false);
    }
    let (offset, sentinel) = if expansion {
        (
            inventory::EXPANSION_CHECK_OFFSET,
            inventory::EXPANSION_CHECK_SENTINEL,
        )
    } else {
        (inventory::BASE_CHECK_OFFSET, inventory::BASE_CHECK_SENTINEL)
    };
    Ok(reader.read_i32(unit.inventory + offset)? != sentinel)
}

/// Builds [`GameSnapshot`]s and owns the per-process item state.
pub struct SnapshotBuilder {
    monster_filter: MonsterFilter,
    loot_filter: LootFilter,
    alert: Option<Box<dyn ItemAlert>>,
    items: ItemSeenRegistry,
    last_seed: HashMap<u32, u32>,
}

impl SnapshotBuilder {
    pub fn new(monster_filter: MonsterFilter, loot_filter: LootFilter, log_capacity: usize) -> Self {
        Self {
            monster_filter,
            loot_filter,
            alert: None,
            items: ItemSeenRegistry::new(log_capacity),
            last_seed: HashMap::new(),
        }
    }

    pub fn with_alert(mut self, alert: Box<dyn ItemAlert>) -> Self {
        self.alert = Some(alert);
        self
    }

    pub fn item_state(&self, process_id: u32) -> Option<&ItemSeenState> {
        self.items.state(process_id)
    }

    /// Drop everything remembered about a process that went away.
    pub fn forget_process(&mut self, process_id: u32) {
        self.items.remove(process_id);
        self.last_seed.remove(&process_id);
    }

    /// Build a snapshot, or `None` if this frame has no consistent data.
    pub fn build<R: ReadMemory>(&mut self, ctx: &GameContext<R>) -> Option<GameSnapshot> {
        match self.try_build(ctx) {
            Ok(snapshot) => Some(snapshot),
            Err(e) if e.is_transient() => {
                debug!("No snapshot this frame: {}", e);
                None
            }
            Err(e) => {
                warn!("No snapshot this frame: {}", e);
                None
            }
        }
    }

    pub fn try_build<R: ReadMemory>(&mut self, ctx: &GameContext<R>) -> Result<GameSnapshot> {
        let reader = ctx.reader();
        let graph = ctx.unit_graph()?;
        let expansion = ctx.is_expansion()?;

        let player = find_local_player(&graph, expansion)?
            .ok_or_else(|| Error::InvalidSnapshot("Player unit not found".to_string()))?;

        if player.act == 0 {
            return Err(Error::InvalidSnapshot("Player has no act".to_string()));
        }
        let raw_act: RawAct = reader.read_struct(player.act)?;
        if raw_act.act_misc == 0 {
            return Err(Error::InvalidSnapshot("Act has no misc data".to_string()));
        }
        let difficulty_raw = reader.read_u8(raw_act.act_misc + act::MISC_DIFFICULTY)?;
        let area = Area(graph.level_id(&player)?);

        let map_seed = raw_act.map_seed;
        if map_seed == 0 {
            return Err(Error::InvalidSnapshot("Map seed is zero".to_string()));
        }
        let difficulty = Difficulty::from_u8(difficulty_raw).ok_or_else(|| {
            Error::InvalidSnapshot(format!("Unknown difficulty {}", difficulty_raw))
        })?;
        if !area.is_valid() {
            return Err(Error::InvalidSnapshot(format!("Unknown area id {}", area.0)));
        }

        let process_id = ctx.process_id();
        if self.last_seed.insert(process_id, map_seed) != Some(map_seed) {
            info!(
                "New game: seed {} {} act {} ({})",
                map_seed, difficulty, raw_act.act_id, area
            );
            self.items.reset(process_id);
        }

        let menu = match ctx.address(OffsetName::MenuDataOffset) {
            Some(address) => reader.read_struct::<MenuFlags>(address)?,
            None => MenuFlags::default(),
        };
        let session = Session {
            game_ip: ctx.game_ip()?,
        };
        let roster = match ctx.address(OffsetName::RosterDataOffset) {
            Some(address) => read_roster(reader, reader.read_ptr(address)?)?,
            None => Vec::new(),
        };

        let monsters: Vec<UnitRecord> = graph
            .collect(UnitType::Monster)
            .into_iter()
            .filter(|unit| self.monster_filter.is_monster(unit))
            .collect();
        let items: Vec<UnitRecord> = graph
            .collect(UnitType::Item)
            .into_iter()
            .filter(UnitRecord::is_dropped)
            .collect();
        let objects = graph.collect(UnitType::Object);
        let players: Vec<UnitRecord> = graph
            .collect(UnitType::Player)
            .into_iter()
            .filter(|unit| unit.unit_id != player.unit_id)
            .collect();

        self.record_items(process_id, &items, area);

        Ok(GameSnapshot {
            process_id,
            player_name: player.name().unwrap_or_default().to_string(),
            player_position: player.position,
            player,
            map_seed,
            difficulty,
            area,
            expansion,
            map_shown: ctx.map_shown()?,
            menu,
            session,
            roster,
            monsters,
            items,
            objects,
            players,
        })
    }

    fn record_items(&mut self, process_id: u32, items: &[UnitRecord], area: Area) {
        let now = Utc::now();
        let state = self.items.state_mut(process_id);
        for item in items {
            let Some(entry) = state.observe(item, area, now) else {
                continue;
            };
            debug!("New item: {}", entry.label());
            if !self.loot_filter.matches(item) {
                continue;
            }
            if let Some(alert) = &self.alert {
                alert.alert(&entry);
            }
        }
    }
}

fn find_local_player<R: ReadMemory>(
    graph: &UnitGraph<R>,
    expansion: bool,
) -> Result<Option<UnitRecord>> {
    for unit in graph.enumerate(UnitType::Player) {
        let unit = match unit {
            Ok(unit) => unit,
            Err(e) => {
                debug!("Skipping unreadable player unit: {}", e);
                continue;
            }
        };
        if is_local_player(graph.reader(), &unit, expansion)? {
            return Ok(Some(unit));
        }
    }
    Ok(None)
}

fn read_roster<R: ReadMemory>(reader: &R, head: u64) -> Result<Vec<RosterEntry>> {
    let mut entries = Vec::new();
    let mut visited = HashSet::new();
    let mut current = head;

    while current != 0 && entries.len() < roster::MAX_ENTRIES && visited.insert(current) {
        let entry: RosterEntry = reader.read_struct(current)?;
        current = entry.next;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockMemoryBuilder;
    use crate::process::layout::{path, player as player_layout, unit};

    #[test]
    fn test_read_roster_stops_on_cycle() {
        let reader = MockMemoryBuilder::new()
            .write_ascii(0x000, "Alice")
            .write_u32(0x010, 1)
            .write_u16(0x022, 0)
            .write_ptr(0x148, 0x200)
            .write_ascii(0x200, "Bob")
            .write_u32(0x210, 2)
            .write_u16(0x222, u16::MAX)
            .write_ptr(0x348, 0x000)
            .with_size(0x400)
            .build();

        let entries = read_roster(&reader, 0x1000).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert!(entries[0].in_party());
        assert!(!entries[1].in_party());
    }

    #[test]
    fn test_is_local_player_branches() {
        let reader = MockMemoryBuilder::new()
            .write_i32(0x30, 1)
            .write_i32(0x70, 5)
            .with_size(0x100)
            .build();
        let mut unit = crate::game::snapshot_tests::player_record(1, "me");
        unit.inventory = 0x1000;

        // base game: value at +0x30 equals the sentinel
        assert!(!is_local_player(&reader, &unit, false).unwrap());
        // expansion: value at +0x70 differs from 0
        assert!(is_local_player(&reader, &unit, true).unwrap());

        unit.inventory = 0;
        assert!(!is_local_player(&reader, &unit, true).unwrap());
    }

    #[test]
    fn test_missing_player_is_transient() {
        let table = 0x100;
        let reader = MockMemoryBuilder::new()
            .with_size(0x2000)
            // one player that is not local
            .write_ptr(table, 0x1000)
            .write_u32(0x1000 + unit::UNIT_TYPE, 0)
            .write_u32(0x1000 + unit::UNIT_ID, 5)
            .write_ptr(0x1000 + unit::PATH, 0x1800)
            .write_ptr(0x1800 + path::ROOM1, 0)
            .write_ptr(0x1000 + unit::UNIT_DATA, 0x1900)
            .write_ascii(0x1900 + player_layout::NAME, "other")
            .build();
        let ctx = GameContext::new(
            reader,
            crate::offset::ResolvedOffsets {
                unit_hash_table: table as u64,
                expansion_check: 0x50,
                ..Default::default()
            },
            7,
        );

        let mut builder = SnapshotBuilder::new(MonsterFilter::default(), LootFilter::default(), 5);
        let err = builder.try_build(&ctx).unwrap_err();
        assert!(err.is_transient());
        assert!(builder.build(&ctx).is_none());
    }
}
