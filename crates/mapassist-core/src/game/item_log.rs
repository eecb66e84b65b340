use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::Area;
use crate::unit::{ItemQuality, Position, UnitRecord};

/// Default number of entries kept in the item log.
pub const DEFAULT_ITEM_LOG_CAPACITY: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLogEntry {
    pub unit_id: u32,
    pub hash: String,
    pub txt_file_no: u32,
    pub quality: Option<ItemQuality>,
    pub ethereal: bool,
    pub sockets: u32,
    pub position: Position,
    pub area: Area,
    pub seen_at: DateTime<Utc>,
}

impl ItemLogEntry {
    pub fn from_item(item: &UnitRecord, area: Area, seen_at: DateTime<Utc>) -> Self {
        let info = item.item();
        Self {
            unit_id: item.unit_id,
            hash: item.item_hash(),
            txt_file_no: item.txt_file_no,
            quality: info.and_then(|i| i.quality),
            ethereal: info.is_some_and(|i| i.flags.is_ethereal()),
            sockets: info.map_or(0, |i| i.sockets),
            position: item.position,
            area,
            seen_at,
        }
    }

    /// Text shown in the log, e.g. `[Eth] [4 S] Superior #300`.
    pub fn label(&self) -> String {
        let mut label = String::new();
        if self.ethereal {
            label.push_str("[Eth] ");
        }
        if self.sockets > 0 {
            label.push_str(&format!("[{} S] ", self.sockets));
        }
        match self.quality {
            Some(quality) => label.push_str(&format!("{} #{}", quality, self.txt_file_no)),
            None => label.push_str(&format!("#{}", self.txt_file_no)),
        }
        label
    }
}

/// Which items one game process has already reported.
///
/// The log is a strict FIFO that never grows past its capacity.
#[derive(Debug, Clone)]
pub struct ItemSeenState {
    seen_hashes: HashSet<String>,
    seen_ids: HashSet<u32>,
    log: VecDeque<ItemLogEntry>,
    capacity: usize,
}

impl ItemSeenState {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen_hashes: HashSet::new(),
            seen_ids: HashSet::new(),
            log: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Mark an item as seen. Returns `true` the first time.
    ///
    /// An item counts as seen when either its content hash or its unit id
    /// has been recorded before.
    pub fn mark_seen(&mut self, item: &UnitRecord) -> bool {
        let hash = item.item_hash();
        if self.seen_hashes.contains(&hash) || self.seen_ids.contains(&item.unit_id) {
            return false;
        }
        self.seen_hashes.insert(hash);
        self.seen_ids.insert(item.unit_id);
        true
    }

    /// Append to the log, evicting the oldest entry when full.
    pub fn push(&mut self, entry: ItemLogEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.log.len() >= self.capacity {
            self.log.pop_front();
        }
        self.log.push_back(entry);
    }

    /// Mark and log in one step. Returns the new entry the first time an
    /// item is seen, `None` afterwards.
    pub fn observe(
        &mut self,
        item: &UnitRecord,
        area: Area,
        now: DateTime<Utc>,
    ) -> Option<ItemLogEntry> {
        if !self.mark_seen(item) {
            return None;
        }
        let entry = ItemLogEntry::from_item(item, area, now);
        self.push(entry.clone());
        Some(entry)
    }

    pub fn is_seen(&self, item: &UnitRecord) -> bool {
        self.seen_ids.contains(&item.unit_id) || self.seen_hashes.contains(&item.item_hash())
    }

    pub fn log(&self) -> impl Iterator<Item = &ItemLogEntry> {
        self.log.iter()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty() && self.seen_ids.is_empty() && self.seen_hashes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.seen_hashes.clear();
        self.seen_ids.clear();
        self.log.clear();
    }
}

/// Item state for every game process seen so far, keyed by process id.
#[derive(Debug, Clone)]
pub struct ItemSeenRegistry {
    states: HashMap<u32, ItemSeenState>,
    capacity: usize,
}

impl ItemSeenRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            states: HashMap::new(),
            capacity,
        }
    }

    pub fn state(&self, process_id: u32) -> Option<&ItemSeenState> {
        self.states.get(&process_id)
    }

    pub fn state_mut(&mut self, process_id: u32) -> &mut ItemSeenState {
        let capacity = self.capacity;
        self.states
            .entry(process_id)
            .or_insert_with(|| ItemSeenState::new(capacity))
    }

    pub fn reset(&mut self, process_id: u32) {
        if let Some(state) = self.states.get_mut(&process_id) {
            state.clear();
        }
    }

    pub fn remove(&mut self, process_id: u32) {
        self.states.remove(&process_id);
    }
}

impl Default for ItemSeenRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::unit::{ItemFlags, ItemInfo, UnitPayload, UnitType};

    fn item(unit_id: u32, x: u16) -> UnitRecord {
        UnitRecord {
            address: 0,
            unit_type: UnitType::Item,
            txt_file_no: 300,
            unit_id,
            mode: 3,
            position: Position::new(x, 10),
            stats: BTreeMap::new(),
            payload: UnitPayload::Item(ItemInfo {
                quality: Some(ItemQuality::Superior),
                flags: ItemFlags(ItemFlags::ETHEREAL),
                sockets: 4,
                owner_id: None,
            }),
            inventory: 0,
            act: 0,
            room1: 0,
        }
    }

    #[test]
    fn test_observe_once() {
        let mut state = ItemSeenState::new(5);
        let now = Utc::now();
        assert!(state.observe(&item(1, 1), Area(2), now).is_some());
        assert!(state.observe(&item(1, 1), Area(2), now).is_none());
        // same content under a new id
        assert!(state.observe(&item(2, 1), Area(2), now).is_none());
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut state = ItemSeenState::new(3);
        let now = Utc::now();
        for id in 1..=4 {
            state.observe(&item(id, id as u16), Area(2), now);
        }
        let ids: Vec<u32> = state.log().map(|e| e.unit_id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert!(state.is_seen(&item(1, 1)));
    }

    #[test]
    fn test_label() {
        let entry = ItemLogEntry::from_item(&item(1, 1), Area(2), Utc::now());
        assert_eq!(entry.label(), "[Eth] [4 S] Superior #300");
    }

    #[test]
    fn test_registry_per_process() {
        let mut registry = ItemSeenRegistry::new(2);
        let now = Utc::now();
        registry.state_mut(10).observe(&item(1, 1), Area(2), now);
        registry.state_mut(20).observe(&item(1, 1), Area(2), now);
        assert_eq!(registry.state(10).unwrap().len(), 1);

        registry.reset(10);
        assert!(registry.state(10).unwrap().is_empty());
        assert_eq!(registry.state(20).unwrap().len(), 1);
        assert_eq!(registry.state_mut(30).capacity(), 2);
    }
}
