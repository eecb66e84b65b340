use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A game level id.
///
/// Ids `1..=136` are real levels; `0` means "no area" (menus, loading).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Area(pub u32);

const NAMES: [&str; 137] = [
    "None",
    "RogueEncampment",
    "BloodMoor",
    "ColdPlains",
    "StonyField",
    "DarkWood",
    "BlackMarsh",
    "TamoeHighland",
    "DenOfEvil",
    "CaveLevel1",
    "UndergroundPassageLevel1",
    "HoleLevel1",
    "PitLevel1",
    "CaveLevel2",
    "UndergroundPassageLevel2",
    "HoleLevel2",
    "PitLevel2",
    "BurialGrounds",
    "Crypt",
    "Mausoleum",
    "ForgottenTower",
    "TowerCellarLevel1",
    "TowerCellarLevel2",
    "TowerCellarLevel3",
    "TowerCellarLevel4",
    "TowerCellarLevel5",
    "MonasteryGate",
    "OuterCloister",
    "Barracks",
    "JailLevel1",
    "JailLevel2",
    "JailLevel3",
    "InnerCloister",
    "Cathedral",
    "CatacombsLevel1",
    "CatacombsLevel2",
    "CatacombsLevel3",
    "CatacombsLevel4",
    "Tristram",
    "MooMooFarm",
    "LutGholein",
    "RockyWaste",
    "DryHills",
    "FarOasis",
    "LostCity",
    "ValleyOfSnakes",
    "CanyonOfTheMagi",
    "SewersLevel1Act2",
    "SewersLevel2Act2",
    "SewersLevel3Act2",
    "HaremLevel1",
    "HaremLevel2",
    "PalaceCellarLevel1",
    "PalaceCellarLevel2",
    "PalaceCellarLevel3",
    "StonyTombLevel1",
    "HallsOfTheDeadLevel1",
    "HallsOfTheDeadLevel2",
    "ClawViperTempleLevel1",
    "StonyTombLevel2",
    "HallsOfTheDeadLevel3",
    "ClawViperTempleLevel2",
    "MaggotLairLevel1",
    "MaggotLairLevel2",
    "MaggotLairLevel3",
    "AncientTunnels",
    "TalRashasTomb1",
    "TalRashasTomb2",
    "TalRashasTomb3",
    "TalRashasTomb4",
    "TalRashasTomb5",
    "TalRashasTomb6",
    "TalRashasTomb7",
    "DurielsLair",
    "ArcaneSanctuary",
    "KurastDocks",
    "SpiderForest",
    "GreatMarsh",
    "FlayerJungle",
    "LowerKurast",
    "KurastBazaar",
    "UpperKurast",
    "KurastCauseway",
    "Travincal",
    "ArachnidLair",
    "SpiderCavern",
    "SwampyPitLevel1",
    "SwampyPitLevel2",
    "FlayerDungeonLevel1",
    "FlayerDungeonLevel2",
    "SwampyPitLevel3",
    "FlayerDungeonLevel3",
    "SewersLevel1Act3",
    "SewersLevel2Act3",
    "RuinedTemple",
    "DisusedFane",
    "ForgottenReliquary",
    "ForgottenTemple",
    "RuinedFane",
    "DisusedReliquary",
    "DuranceOfHateLevel1",
    "DuranceOfHateLevel2",
    "DuranceOfHateLevel3",
    "ThePandemoniumFortress",
    "OuterSteppes",
    "PlainsOfDespair",
    "CityOfTheDamned",
    "RiverOfFlame",
    "ChaosSanctuary",
    "Harrogath",
    "BloodyFoothills",
    "FrigidHighlands",
    "ArreatPlateau",
    "CrystallinePassage",
    "FrozenRiver",
    "GlacialTrail",
    "DrifterCavern",
    "FrozenTundra",
    "TheAncientsWay",
    "IcyCellar",
    "ArreatSummit",
    "NihlathaksTemple",
    "HallsOfAnguish",
    "HallsOfPain",
    "HallsOfVaught",
    "Abaddon",
    "PitOfAcheron",
    "InfernalPit",
    "TheWorldStoneKeepLevel1",
    "TheWorldStoneKeepLevel2",
    "TheWorldStoneKeepLevel3",
    "ThroneOfDestruction",
    "TheWorldstoneChamber",
    "MatronsDen",
    "ForgottenSands",
    "FurnaceOfPain",
    "UberTristram",
];

impl Area {
    pub const NONE: Area = Area(0);
    pub const ROGUE_ENCAMPMENT: Area = Area(1);
    pub const LUT_GHOLEIN: Area = Area(40);
    pub const CANYON_OF_THE_MAGI: Area = Area(46);
    pub const TAL_RASHAS_TOMB_1: Area = Area(66);
    pub const TAL_RASHAS_TOMB_7: Area = Area(72);
    pub const ARCANE_SANCTUARY: Area = Area(74);
    pub const KURAST_DOCKS: Area = Area(75);
    pub const PANDEMONIUM_FORTRESS: Area = Area(103);
    pub const HARROGATH: Area = Area(109);
    pub const MATRONS_DEN: Area = Area(133);
    pub const FORGOTTEN_SANDS: Area = Area(134);
    pub const FURNACE_OF_PAIN: Area = Area(135);
    pub const UBER_TRISTRAM: Area = Area(136);

    /// Highest known level id.
    pub const MAX_ID: u32 = 136;

    pub fn id(self) -> u32 {
        self.0
    }

    /// A real level, as opposed to `None` or an out-of-range id.
    pub fn is_valid(self) -> bool {
        (1..=Self::MAX_ID).contains(&self.0)
    }

    pub fn is_town(self) -> bool {
        matches!(
            self,
            Self::ROGUE_ENCAMPMENT
                | Self::LUT_GHOLEIN
                | Self::KURAST_DOCKS
                | Self::PANDEMONIUM_FORTRESS
                | Self::HARROGATH
        )
    }

    pub fn is_tal_rasha_tomb(self) -> bool {
        (Self::TAL_RASHAS_TOMB_1.0..=Self::TAL_RASHAS_TOMB_7.0).contains(&self.0)
    }

    /// Identifier-style name, e.g. `CanyonOfTheMagi`.
    pub fn name(self) -> Option<&'static str> {
        NAMES.get(self.0 as usize).copied()
    }

    /// Human readable name, e.g. `Canyon Of The Magi`.
    pub fn display_name(self) -> String {
        let Some(name) = self.name() else {
            return format!("Area {}", self.0);
        };
        let mut out = String::with_capacity(name.len() + 8);
        let mut prev: Option<char> = None;
        for c in name.chars() {
            if let Some(p) = prev {
                let boundary = (c.is_ascii_uppercase() && !p.is_ascii_uppercase())
                    || (c.is_ascii_digit() && !p.is_ascii_digit());
                if boundary {
                    out.push(' ');
                }
            }
            out.push(c);
            prev = Some(c);
        }
        out
    }

    pub fn all() -> impl Iterator<Item = Area> {
        (1..=Self::MAX_ID).map(Area)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Area({})", self.0),
        }
    }
}

impl FromStr for Area {
    type Err = Error;

    /// Accepts a numeric id or a name, ignoring case, spaces and apostrophes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(id) = trimmed.parse::<u32>() {
            return Ok(Area(id));
        }

        let wanted: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        NAMES
            .iter()
            .position(|name| name.to_ascii_lowercase() == wanted)
            .map(|id| Area(id as u32))
            .ok_or_else(|| Error::ConfigParseError(format!("Unknown area '{}'", s)))
    }
}

impl Serialize for Area {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for Area {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Id(u32),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Id(id) => Ok(Area(id)),
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}
