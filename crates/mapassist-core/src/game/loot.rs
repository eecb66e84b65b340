use serde::{Deserialize, Serialize};

use crate::game::ItemLogEntry;
use crate::unit::{ItemQuality, UnitRecord};

/// One filter rule. Every field that is set must match; empty lists match
/// anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootRule {
    pub qualities: Vec<ItemQuality>,
    pub item_ids: Vec<u32>,
    pub ethereal: Option<bool>,
    pub min_sockets: Option<u32>,
    pub max_sockets: Option<u32>,
}

impl LootRule {
    pub fn matches(&self, item: &UnitRecord) -> bool {
        let Some(info) = item.item() else {
            return false;
        };

        if !self.qualities.is_empty()
            && !info.quality.is_some_and(|q| self.qualities.contains(&q))
        {
            return false;
        }
        if !self.item_ids.is_empty() && !self.item_ids.contains(&item.txt_file_no) {
            return false;
        }
        if self.ethereal.is_some_and(|eth| eth != info.flags.is_ethereal()) {
            return false;
        }
        if self.min_sockets.is_some_and(|min| info.sockets < min) {
            return false;
        }
        if self.max_sockets.is_some_and(|max| info.sockets > max) {
            return false;
        }
        true
    }
}

/// A list of rules; an item passes if any rule matches.
///
/// A filter without rules lets every item through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LootFilter {
    pub rules: Vec<LootRule>,
}

impl LootFilter {
    pub fn new(rules: Vec<LootRule>) -> Self {
        Self { rules }
    }

    pub fn matches(&self, item: &UnitRecord) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|rule| rule.matches(item))
    }
}

/// Side effect fired for a newly seen item that passes the filter.
///
/// The audio backend lives outside this crate.
pub trait ItemAlert: Send {
    fn alert(&self, entry: &ItemLogEntry);
}

/// Alert that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAlert;

impl ItemAlert for SilentAlert {
    fn alert(&self, _entry: &ItemLogEntry) {}
}
