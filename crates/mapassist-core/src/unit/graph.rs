//! Walking the unit hash table.
//!
//! ```text
//! table + type * 0x400
//!   [bucket 0] -> unit -> unit -> null
//!   [bucket 1] -> null
//!   ...
//!   [bucket 127] -> unit -> null
//! ```
//!
//! The chains live in a process that keeps running while we read them, so a
//! chain may be torn mid-update or loop back on itself. Traversal is bounded
//! by a set of visited node addresses and yields each unit id at most once.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::error::{Error, Result};
use crate::process::ReadMemory;
use crate::process::layout::{hash_table, player, room, stats};
use crate::unit::record::{
    ItemInfo, MonsterInfo, ObjectInfo, RawItemData, RawMonsterData, RawObjectData, RawPath,
    RawUnit, StatValue, immunities_from_stats,
};
use crate::unit::types::{ItemQuality, UnitType, stat};
use crate::unit::{UnitPayload, UnitRecord};

/// Owner type value for units owned by a player.
const OWNER_PLAYER: u32 = 0;

/// Read access to the live unit graph of one process.
pub struct UnitGraph<R: ReadMemory> {
    reader: R,
    table_address: u64,
}

impl<R: ReadMemory> UnitGraph<R> {
    /// `table_address` is the absolute address of the unit hash table.
    pub fn new(reader: R, table_address: u64) -> Self {
        Self {
            reader,
            table_address,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Lazily enumerate every live unit of one type.
    ///
    /// A node that cannot be read ends its chain with one `Err` item; the walk
    /// continues with the next bucket. A node whose details cannot be read
    /// yields `Err` but its chain continues.
    pub fn enumerate(&self, unit_type: UnitType) -> UnitIter<'_, R> {
        UnitIter {
            graph: self,
            unit_type,
            heads: None,
            bucket: 0,
            current: 0,
            visited: HashSet::new(),
            seen_ids: HashSet::new(),
            done: false,
        }
    }

    /// Enumerate and keep only the units that decoded cleanly.
    pub fn collect(&self, unit_type: UnitType) -> Vec<UnitRecord> {
        self.enumerate(unit_type)
            .filter_map(|unit| match unit {
                Ok(unit) => Some(unit),
                Err(e) => {
                    debug!("Skipping {} unit: {}", unit_type, e);
                    None
                }
            })
            .collect()
    }

    fn read_heads(&self, unit_type: UnitType) -> Result<Vec<u64>> {
        let address = self.table_address + unit_type.table_index() as u64 * hash_table::TYPE_STRIDE;
        let bytes = self.reader.read_bytes(address, hash_table::BUCKETS * 8)?;
        Ok(bytes
            .chunks_exact(8)
            .filter_map(|chunk| chunk.try_into().ok().map(u64::from_le_bytes))
            .collect())
    }

    fn decode(&self, address: u64, raw: RawUnit) -> Result<UnitRecord> {
        let unit_type = UnitType::from_u32(raw.unit_type).ok_or_else(|| {
            Error::InvalidSnapshot(format!(
                "Unknown unit type {} at {:#x}",
                raw.unit_type, address
            ))
        })?;

        let path = if raw.path == 0 {
            RawPath::default()
        } else {
            self.reader.read_struct::<RawPath>(raw.path)?
        };
        let stats = self.read_stats(raw.stats_list_ex)?;

        let payload = match unit_type {
            UnitType::Player => UnitPayload::Player {
                name: if raw.unit_data == 0 {
                    String::new()
                } else {
                    self.reader
                        .read_ascii(raw.unit_data + player::NAME as u64, player::NAME_LEN)?
                },
            },
            UnitType::Monster => {
                let data = if raw.unit_data == 0 {
                    RawMonsterData::default()
                } else {
                    self.reader.read_struct::<RawMonsterData>(raw.unit_data)?
                };
                UnitPayload::Monster(MonsterInfo {
                    type_flags: data.type_flags,
                    immunities: immunities_from_stats(&stats),
                })
            }
            UnitType::Item => {
                let data = if raw.unit_data == 0 {
                    RawItemData::default()
                } else {
                    self.reader.read_struct::<RawItemData>(raw.unit_data)?
                };
                UnitPayload::Item(ItemInfo {
                    quality: ItemQuality::from_u32(data.quality),
                    flags: data.flags,
                    sockets: stats.get(&stat::NUM_SOCKETS).copied().unwrap_or(0).max(0) as u32,
                    owner_id: (raw.owner_type == OWNER_PLAYER && raw.owner_id != u32::MAX)
                        .then_some(raw.owner_id),
                })
            }
            UnitType::Object => {
                let data = if raw.unit_data == 0 {
                    RawObjectData::default()
                } else {
                    self.reader.read_struct::<RawObjectData>(raw.unit_data)?
                };
                UnitPayload::Object(ObjectInfo {
                    interact_type: data.interact_type,
                    owner: data.owner,
                })
            }
            UnitType::Missile | UnitType::Tile => UnitPayload::None,
        };

        Ok(UnitRecord {
            address,
            unit_type,
            txt_file_no: raw.txt_file_no,
            unit_id: raw.unit_id,
            mode: raw.mode,
            position: path.position(unit_type),
            stats,
            payload,
            inventory: raw.inventory,
            act: raw.act,
            room1: path.room1,
        })
    }

    fn read_stats(&self, stats_list_ex: u64) -> Result<BTreeMap<u16, i32>> {
        if stats_list_ex == 0 {
            return Ok(BTreeMap::new());
        }

        let array = stats_list_ex + stats::STATS_ARRAY as u64;
        let first = self.reader.read_ptr(array)?;
        let count = self.reader.read_u64(array + 8)?;
        if first == 0 || count == 0 {
            return Ok(BTreeMap::new());
        }
        if count > stats::MAX_ENTRIES {
            return Err(Error::InvalidSnapshot(format!(
                "Stat list at {:#x} claims {} entries",
                stats_list_ex, count
            )));
        }

        let values: Vec<StatValue> = self.reader.read_array(first, count as usize)?;
        Ok(values.into_iter().map(|v| (v.stat, v.value)).collect())
    }

    /// Area id of the level a unit stands in: `room1 -> room2 -> level -> id`.
    pub fn level_id(&self, unit: &UnitRecord) -> Result<u32> {
        if unit.room1 == 0 {
            return Err(Error::InvalidSnapshot(format!(
                "Unit {} has no room",
                unit.unit_id
            )));
        }
        let room2 = self.reader.read_ptr(unit.room1 + room::ROOM1_TO_ROOM2)?;
        if room2 == 0 {
            return Err(Error::read_failed(unit.room1, "Null room2 pointer"));
        }
        let level = self.reader.read_ptr(room2 + room::ROOM2_TO_LEVEL)?;
        if level == 0 {
            return Err(Error::read_failed(room2, "Null level pointer"));
        }
        self.reader.read_u32(level + room::LEVEL_ID)
    }
}

/// Lazy, finite walk over one unit type's buckets.
pub struct UnitIter<'g, R: ReadMemory> {
    graph: &'g UnitGraph<R>,
    unit_type: UnitType,
    heads: Option<Vec<u64>>,
    bucket: usize,
    current: u64,
    visited: HashSet<u64>,
    seen_ids: HashSet<u32>,
    done: bool,
}

impl<R: ReadMemory> Iterator for UnitIter<'_, R> {
    type Item = Result<UnitRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.heads.is_none() {
                match self.graph.read_heads(self.unit_type) {
                    Ok(heads) => self.heads = Some(heads),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }

            if self.current == 0 {
                let head = self
                    .heads
                    .as_ref()
                    .and_then(|heads| heads.get(self.bucket))
                    .copied();
                match head {
                    Some(head) => {
                        self.current = head;
                        self.bucket += 1;
                        continue;
                    }
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            }

            let address = self.current;
            if !self.visited.insert(address) {
                debug!("Cycle in {} chain at {:#x}", self.unit_type, address);
                self.current = 0;
                continue;
            }

            let raw: RawUnit = match self.graph.reader.read_struct(address) {
                Ok(raw) => raw,
                Err(e) => {
                    self.current = 0;
                    return Some(Err(e));
                }
            };
            self.current = raw.list_next;

            if !self.seen_ids.insert(raw.unit_id) {
                continue;
            }

            return Some(self.graph.decode(address, raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockMemoryBuilder;
    use crate::unit::Position;
    use crate::process::layout::{monster, path, unit};
    use crate::unit::types::Resist;

    const TABLE: usize = 0x100;
    const NODES: usize = 0x4000;

    fn node_offset(i: usize) -> usize {
        NODES + i * 0x200
    }

    fn write_unit(
        builder: MockMemoryBuilder,
        index: usize,
        unit_type: UnitType,
        unit_id: u32,
        next: Option<usize>,
    ) -> MockMemoryBuilder {
        let at = node_offset(index);
        let builder = builder
            .write_u32(at + unit::UNIT_TYPE, unit_type as u32)
            .write_u32(at + unit::TXT_FILE_NO, 5)
            .write_u32(at + unit::UNIT_ID, unit_id)
            .write_u32(at + unit::MODE, 1);
        match next {
            Some(n) => builder.write_ptr(at + unit::LIST_NEXT, node_offset(n)),
            None => builder,
        }
    }

    fn bucket(builder: MockMemoryBuilder, unit_type: UnitType, slot: usize, node: usize) -> MockMemoryBuilder {
        let at = TABLE + unit_type as usize * 0x400 + slot * 8;
        builder.write_ptr(at, node_offset(node))
    }

    fn graph(builder: MockMemoryBuilder) -> UnitGraph<crate::process::MockMemoryReader> {
        let table = builder.addr(TABLE);
        UnitGraph::new(builder.with_size(NODES + 0x4000).build(), table)
    }

    #[test]
    fn test_enumerate_chains_across_buckets() {
        let b = MockMemoryBuilder::new();
        let b = write_unit(b, 0, UnitType::Monster, 10, Some(1));
        let b = write_unit(b, 1, UnitType::Monster, 11, None);
        let b = write_unit(b, 2, UnitType::Monster, 12, None);
        let b = bucket(b, UnitType::Monster, 0, 0);
        let b = bucket(b, UnitType::Monster, 127, 2);
        let graph = graph(b);

        let ids: Vec<u32> = graph
            .enumerate(UnitType::Monster)
            .map(|u| u.unwrap().unit_id)
            .collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert!(graph.collect(UnitType::Player).is_empty());
    }

    #[test]
    fn test_enumerate_terminates_on_cycle() {
        let b = MockMemoryBuilder::new();
        let b = write_unit(b, 0, UnitType::Monster, 1, Some(1));
        let b = write_unit(b, 1, UnitType::Monster, 2, Some(0));
        let b = write_unit(b, 2, UnitType::Monster, 3, Some(2));
        let b = bucket(b, UnitType::Monster, 0, 0);
        let b = bucket(b, UnitType::Monster, 1, 2);
        let graph = graph(b);

        let ids: Vec<u32> = graph
            .collect(UnitType::Monster)
            .into_iter()
            .map(|u| u.unit_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_enumerate_skips_duplicate_ids() {
        let b = MockMemoryBuilder::new();
        let b = write_unit(b, 0, UnitType::Item, 7, Some(1));
        let b = write_unit(b, 1, UnitType::Item, 7, Some(2));
        let b = write_unit(b, 2, UnitType::Item, 8, None);
        let b = bucket(b, UnitType::Item, 3, 0);
        let graph = graph(b);

        let ids: Vec<u32> = graph.collect(UnitType::Item).iter().map(|u| u.unit_id).collect();
        assert_eq!(ids, vec![7, 8]);
    }

    #[test]
    fn test_unreadable_node_ends_chain_only() {
        let b = MockMemoryBuilder::new();
        let b = write_unit(b, 0, UnitType::Monster, 1, None);
        let b = bucket(b, UnitType::Monster, 1, 0);
        // bucket 0 points far outside the image
        let b = b.write_u64(TABLE + 0x400, 0xDEAD_0000);
        let graph = graph(b);

        let results: Vec<_> = graph.enumerate(UnitType::Monster).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().unit_id, 1);
    }

    #[test]
    fn test_null_sub_pointers_yield_defaults() {
        let b = MockMemoryBuilder::new();
        let b = write_unit(b, 0, UnitType::Monster, 1, None);
        let b = bucket(b, UnitType::Monster, 0, 0);
        let graph = graph(b);

        let unit = graph.collect(UnitType::Monster).remove(0);
        assert_eq!(unit.position, Position::default());
        assert!(unit.stats.is_empty());
        assert!(!unit.is_elite());
        assert!(unit.immunities().is_empty());
    }

    #[test]
    fn test_monster_details() {
        let at = node_offset(0);
        let path_at = 0x3000;
        let data_at = 0x3100;
        let stats_at = 0x3200;
        let values_at = 0x3300;

        let b = MockMemoryBuilder::new();
        let b = write_unit(b, 0, UnitType::Monster, 42, None)
            .write_ptr(at + unit::PATH, path_at)
            .write_u16(path_at + path::DYNAMIC_X, 5100)
            .write_u16(path_at + path::DYNAMIC_Y, 4900)
            .write_ptr(at + unit::UNIT_DATA, data_at)
            .write_u8(data_at + monster::TYPE_FLAGS, 0x08)
            .write_ptr(at + unit::STATS_LIST_EX, stats_at)
            .write_ptr(stats_at + 0x30, values_at)
            .write_u64(stats_at + 0x38, 2)
            .write_u16(values_at + 2, 39)
            .write_i32(values_at + 4, 100)
            .write_u16(values_at + 10, 43)
            .write_i32(values_at + 12, 40);
        let b = bucket(b, UnitType::Monster, 0, 0);
        let graph = graph(b);

        let unit = graph.collect(UnitType::Monster).remove(0);
        assert_eq!(unit.position, Position::new(5100, 4900));
        assert!(unit.is_elite());
        assert_eq!(unit.monster().unwrap().immunities, vec![Resist::Fire]);
        assert_eq!(unit.stat(43), Some(40));
    }

    #[test]
    fn test_level_id() {
        let at = node_offset(0);
        let b = MockMemoryBuilder::new();
        let b = write_unit(b, 0, UnitType::Player, 1, None)
            .write_ptr(at + unit::PATH, 0x3000)
            .write_ptr(0x3000 + path::ROOM1, 0x3100)
            .write_ptr(0x3100 + 0x18, 0x3200)
            .write_ptr(0x3200 + 0x90, 0x3400)
            .write_u32(0x3400 + 0x1F8, 75);
        let b = bucket(b, UnitType::Player, 0, 0);
        let graph = graph(b);

        let unit = graph.collect(UnitType::Player).remove(0);
        assert_eq!(graph.level_id(&unit).unwrap(), 75);
    }
}
