use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::game::{Area, Difficulty};
use crate::process::layout::{menu, roster};
use crate::process::{ByteBuffer, RemoteStruct};
use crate::unit::{Position, UnitRecord};

/// Open/closed state of every in-game panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuFlags {
    pub inventory: bool,
    pub character: bool,
    pub skill_select: bool,
    pub skill_tree: bool,
    pub chat: bool,
    pub npc_interact: bool,
    pub esc_menu: bool,
    pub map: bool,
    pub npc_shop: bool,
    pub quest_log: bool,
    pub waypoint: bool,
    pub party: bool,
    pub stash: bool,
    pub cube: bool,
    pub mercenary_inventory: bool,
}

impl MenuFlags {
    /// Any panel that covers the play field. The automap and chat don't count.
    pub fn any_panel_open(&self) -> bool {
        self.inventory
            || self.character
            || self.skill_select
            || self.skill_tree
            || self.npc_interact
            || self.esc_menu
            || self.npc_shop
            || self.quest_log
            || self.waypoint
            || self.party
            || self.stash
            || self.cube
            || self.mercenary_inventory
    }
}

impl RemoteStruct for MenuFlags {
    const SIZE: usize = menu::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            inventory: buf.read_bool_at(menu::INVENTORY)?,
            character: buf.read_bool_at(menu::CHARACTER)?,
            skill_select: buf.read_bool_at(menu::SKILL_SELECT)?,
            skill_tree: buf.read_bool_at(menu::SKILL_TREE)?,
            chat: buf.read_bool_at(menu::CHAT)?,
            npc_interact: buf.read_bool_at(menu::NPC_INTERACT)?,
            esc_menu: buf.read_bool_at(menu::ESC_MENU)?,
            map: buf.read_bool_at(menu::MAP)?,
            npc_shop: buf.read_bool_at(menu::NPC_SHOP)?,
            quest_log: buf.read_bool_at(menu::QUEST_LOG)?,
            waypoint: buf.read_bool_at(menu::WAYPOINT)?,
            party: buf.read_bool_at(menu::PARTY)?,
            stash: buf.read_bool_at(menu::STASH)?,
            cube: buf.read_bool_at(menu::CUBE)?,
            mercenary_inventory: buf.read_bool_at(menu::MERCENARY_INVENTORY)?,
        })
    }
}

/// One member of the party roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub unit_id: u32,
    pub life: u32,
    pub class_id: u32,
    pub level: u16,
    pub party_id: u16,
    pub area: Area,
    pub position: Position,
    #[serde(skip)]
    pub next: u64,
}

impl RosterEntry {
    pub fn in_party(&self) -> bool {
        self.party_id != roster::NO_PARTY
    }

    pub fn same_party(&self, other: &RosterEntry) -> bool {
        self.in_party() && self.party_id == other.party_id
    }
}

impl RemoteStruct for RosterEntry {
    const SIZE: usize = roster::SIZE;

    fn decode(buf: &ByteBuffer<'_>) -> Result<Self> {
        Ok(Self {
            name: buf.read_ascii_at(roster::NAME, roster::NAME_LEN)?,
            unit_id: buf.read_u32_at(roster::UNIT_ID)?,
            life: buf.read_u32_at(roster::LIFE)?,
            class_id: buf.read_u32_at(roster::CLASS_ID)?,
            level: buf.read_u16_at(roster::LEVEL)?,
            party_id: buf.read_u16_at(roster::PARTY_ID)?,
            area: Area(buf.read_u32_at(roster::AREA)?),
            position: Position::new(
                buf.read_u32_at(roster::POS_X)? as u16,
                buf.read_u32_at(roster::POS_Y)? as u16,
            ),
            next: buf.read_u64_at(roster::NEXT)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub game_ip: String,
}

/// One consistent, point-in-time view of the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub process_id: u32,
    pub player: UnitRecord,
    pub player_name: String,
    pub player_position: Position,
    pub map_seed: u32,
    pub difficulty: Difficulty,
    pub area: Area,
    pub expansion: bool,
    pub map_shown: bool,
    pub menu: MenuFlags,
    pub session: Session,
    pub roster: Vec<RosterEntry>,
    pub monsters: Vec<UnitRecord>,
    pub items: Vec<UnitRecord>,
    pub objects: Vec<UnitRecord>,
    pub players: Vec<UnitRecord>,
}

impl GameSnapshot {
    /// A different game: seed, difficulty or character changed.
    pub fn has_game_changed(&self, previous: Option<&GameSnapshot>) -> bool {
        match previous {
            None => true,
            Some(other) => {
                self.map_seed != other.map_seed
                    || self.difficulty != other.difficulty
                    || self.player_name != other.player_name
            }
        }
    }

    pub fn has_map_changed(&self, previous: Option<&GameSnapshot>) -> bool {
        self.has_game_changed(previous) || previous.is_some_and(|other| self.area != other.area)
    }

    /// The local player's roster entry.
    pub fn local_roster_entry(&self) -> Option<&RosterEntry> {
        self.roster
            .iter()
            .find(|entry| entry.unit_id == self.player.unit_id)
    }

    /// Whether another player is in the local player's party.
    pub fn is_party_member(&self, unit_id: u32) -> bool {
        let Some(me) = self.local_roster_entry() else {
            return false;
        };
        self.roster
            .iter()
            .any(|entry| entry.unit_id == unit_id && entry.same_party(me))
    }
}
