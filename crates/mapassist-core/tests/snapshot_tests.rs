//! Integration tests for mapassist-core
//!
//! These tests build a synthetic game image with `MockMemoryBuilder` and
//! drive it through the public API: unit graph, snapshot builder, area
//! cache and overlay.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mapassist_core::process::layout::{act, inventory, path, player, room, stats, unit};
use mapassist_core::render::{AreaView, Rect, ViewMode};
use mapassist_core::unit::{ItemQuality, MonsterTier};
use mapassist_core::{
    Area, AreaDataService, Difficulty, FrameOutcome, GameContext, GeometryRequest,
    GeometrySource, ItemAlert, ItemLogEntry, ItemSeenState, LootFilter, LootRule, MapTransform,
    MockMemoryBuilder, MockMemoryReader, MonsterFilter, Overlay, Point, RecordingBackend,
    ResolvedOffsets, Resist, Result, Settings, SnapshotBuilder, Surface, UnitGraph, UnitRecord,
    UnitType, ViewConfig,
};

const PID: u32 = 4242;

const TABLE: usize = 0x100;
const EXPANSION_FLAG: usize = 0x50;
const TYPE_STRIDE: usize = 0x400;

const PLAYER: usize = 0x2000;
const PLAYER_NAME: usize = 0x2200;
const ACT: usize = 0x2300;
const PLAYER_PATH: usize = 0x2400;
const INVENTORY: usize = 0x2500;
const ROOM1: usize = 0x2600;
const ROOM2: usize = 0x2700;
const LEVEL: usize = 0x2800;
const ACT_MISC: usize = 0x2A00;

const MONSTER: usize = 0x3400;
const MONSTER_PATH: usize = 0x3700;
const MONSTER_STATS: usize = 0x3800;
const MONSTER_STAT_VALUES: usize = 0x3900;

const ITEM: usize = 0x3C00;
const ITEM_DATA: usize = 0x3E00;
const ITEM_PATH: usize = 0x3F00;

const IMAGE_SIZE: usize = 0x4200;

/// Options for one synthetic game image.
struct Image {
    seed: u32,
    expansion: bool,
    area: u32,
    with_item: bool,
    monster_stats: Vec<(u16, i32)>,
    /// Inventory values at the expansion (+0x70) and base (+0x30) checks.
    inventory_checks: (i32, i32),
}

impl Default for Image {
    fn default() -> Self {
        Self {
            seed: 12345,
            expansion: true,
            area: 2,
            with_item: true,
            monster_stats: vec![(39, 100)],
            // passes the expansion check, fails the base-game one
            inventory_checks: (1, 1),
        }
    }
}

fn bucket(unit_type: UnitType, index: usize) -> usize {
    TABLE + unit_type as usize * TYPE_STRIDE + index * 8
}

impl Image {
    fn build(&self) -> MockMemoryReader {
        let mut mem = MockMemoryBuilder::new()
            .with_size(IMAGE_SIZE)
            .write_u8(EXPANSION_FLAG, u8::from(self.expansion))
            // local player
            .write_ptr(bucket(UnitType::Player, 0), PLAYER)
            .write_u32(PLAYER + unit::UNIT_TYPE, 0)
            .write_u32(PLAYER + unit::UNIT_ID, 1)
            .write_u32(PLAYER + unit::MODE, 1)
            .write_ptr(PLAYER + unit::UNIT_DATA, PLAYER_NAME)
            .write_ptr(PLAYER + unit::ACT, ACT)
            .write_ptr(PLAYER + unit::PATH, PLAYER_PATH)
            .write_ptr(PLAYER + unit::INVENTORY, INVENTORY)
            .write_ascii(PLAYER_NAME + player::NAME, "Hero")
            .write_u16(PLAYER_PATH + path::DYNAMIC_X, 5010)
            .write_u16(PLAYER_PATH + path::DYNAMIC_Y, 4010)
            .write_ptr(PLAYER_PATH + path::ROOM1, ROOM1)
            .write_ptr(ROOM1 + room::ROOM1_TO_ROOM2 as usize, ROOM2)
            .write_ptr(ROOM2 + room::ROOM2_TO_LEVEL as usize, LEVEL)
            .write_u32(LEVEL + room::LEVEL_ID as usize, self.area)
            .write_i32(
                INVENTORY + inventory::EXPANSION_CHECK_OFFSET as usize,
                self.inventory_checks.0,
            )
            .write_i32(
                INVENTORY + inventory::BASE_CHECK_OFFSET as usize,
                self.inventory_checks.1,
            )
            .write_u32(ACT + act::MAP_SEED, self.seed)
            .write_u32(ACT + act::ACT_ID, 0)
            .write_ptr(ACT + act::ACT_MISC, ACT_MISC)
            .write_u8(ACT_MISC + act::MISC_DIFFICULTY as usize, 2)
            // one monster, linked to itself and listed in two buckets
            .write_ptr(bucket(UnitType::Monster, 0), MONSTER)
            .write_ptr(bucket(UnitType::Monster, 7), MONSTER)
            .write_u32(MONSTER + unit::UNIT_TYPE, 1)
            .write_u32(MONSTER + unit::TXT_FILE_NO, 5)
            .write_u32(MONSTER + unit::UNIT_ID, 10)
            .write_u32(MONSTER + unit::MODE, 1)
            .write_ptr(MONSTER + unit::PATH, MONSTER_PATH)
            .write_ptr(MONSTER + unit::STATS_LIST_EX, MONSTER_STATS)
            .write_ptr(MONSTER + unit::LIST_NEXT, MONSTER)
            .write_u16(MONSTER_PATH + path::DYNAMIC_X, 5020)
            .write_u16(MONSTER_PATH + path::DYNAMIC_Y, 4020);

        if !self.monster_stats.is_empty() {
            mem = mem
                .write_ptr(MONSTER_STATS + stats::STATS_ARRAY, MONSTER_STAT_VALUES)
                .write_u64(
                    MONSTER_STATS + stats::STATS_ARRAY + 8,
                    self.monster_stats.len() as u64,
                );
            for (i, &(stat, value)) in self.monster_stats.iter().enumerate() {
                let entry = MONSTER_STAT_VALUES + i * stats::STAT_ENTRY_SIZE;
                mem = mem
                    .write_u16(entry, 0)
                    .write_u16(entry + 2, stat)
                    .write_i32(entry + 4, value);
            }
        }

        if self.with_item {
            mem = mem
                .write_ptr(bucket(UnitType::Item, 0), ITEM)
                .write_u32(ITEM + unit::UNIT_TYPE, 4)
                .write_u32(ITEM + unit::TXT_FILE_NO, 300)
                .write_u32(ITEM + unit::UNIT_ID, 20)
                .write_u32(ITEM + unit::MODE, 3)
                .write_ptr(ITEM + unit::UNIT_DATA, ITEM_DATA)
                .write_ptr(ITEM + unit::PATH, ITEM_PATH)
                .write_u32(ITEM + unit::OWNER_ID, u32::MAX)
                .write_u32(ITEM_DATA, 7)
                .write_u32(ITEM_PATH + path::STATIC_X, 5015)
                .write_u32(ITEM_PATH + path::STATIC_Y, 4015);
        }

        mem.build()
    }

    fn context(&self) -> GameContext<MockMemoryReader> {
        let offsets = ResolvedOffsets {
            unit_hash_table: TABLE as u64,
            expansion_check: EXPANSION_FLAG as u64,
            ..Default::default()
        };
        GameContext::new(self.build(), offsets, PID)
    }
}

fn builder() -> SnapshotBuilder {
    SnapshotBuilder::new(MonsterFilter::default(), LootFilter::default(), 5)
}

/// Geometry source that counts requests and answers from a fixed reply.
struct CountingSource {
    reply: Mutex<Option<String>>,
    requests: AtomicUsize,
}

impl CountingSource {
    fn new(reply: Option<&str>) -> Self {
        Self {
            reply: Mutex::new(reply.map(str::to_string)),
            requests: AtomicUsize::new(0),
        }
    }

    fn set_reply(&self, reply: Option<&str>) {
        *self.reply.lock().unwrap() = reply.map(str::to_string);
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl GeometrySource for CountingSource {
    fn fetch(&self, _request: GeometryRequest) -> Result<Option<String>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.lock().unwrap().clone())
    }
}

const BLOOD_MOOR: &str = r#"{
    "levelOrigin": {"x": 5000, "y": 4000},
    "mapRows": [[1, 40], [1, 40], [1, 40], [1, 40]],
    "adjacentLevels": {},
    "npcs": {},
    "objects": {}
}"#;

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_expansion_snapshot_end_to_end() {
        let ctx = Image::default().context();
        let snapshot = builder().try_build(&ctx).unwrap();

        assert_eq!(snapshot.process_id, PID);
        assert_eq!(snapshot.player_name, "Hero");
        assert_eq!(snapshot.player.unit_id, 1);
        assert_eq!((snapshot.player_position.x, snapshot.player_position.y), (5010, 4010));
        assert_eq!(snapshot.map_seed, 12345);
        assert_eq!(snapshot.difficulty, Difficulty::Hell);
        assert_eq!(snapshot.area, Area(2));
        assert!(snapshot.expansion);
        assert!(!snapshot.map_shown);
        assert!(snapshot.players.is_empty());
        assert!(snapshot.roster.is_empty());
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].txt_file_no, 300);
    }

    #[test]
    fn test_expansion_player_rejected_by_base_game_check() {
        // same inventory, only the expansion flag differs
        let base = Image {
            expansion: false,
            ..Default::default()
        };
        assert!(builder().build(&base.context()).is_none());
        assert!(builder().build(&Image::default().context()).is_some());
    }

    #[test]
    fn test_base_game_snapshot() {
        let ctx = Image {
            expansion: false,
            inventory_checks: (0, 0),
            ..Default::default()
        }
        .context();
        let snapshot = builder().try_build(&ctx).unwrap();
        assert!(!snapshot.expansion);
        assert_eq!(snapshot.player_name, "Hero");
    }

    #[test]
    fn test_base_game_player_rejected_by_expansion_check() {
        let ctx = Image {
            inventory_checks: (0, 0),
            ..Default::default()
        }
        .context();
        assert!(builder().build(&ctx).is_none());
    }

    #[test]
    fn test_zero_seed_is_rejected() {
        let ctx = Image {
            seed: 0,
            ..Default::default()
        }
        .context();
        let mut builder = builder();
        let err = builder.try_build(&ctx).unwrap_err();
        assert!(err.is_transient());
        assert!(builder.build(&ctx).is_none());
    }

    #[test]
    fn test_unknown_area_is_rejected() {
        let ctx = Image {
            area: 0,
            ..Default::default()
        }
        .context();
        assert!(builder().build(&ctx).is_none());
    }
}

mod unit_graph_tests {
    use super::*;

    #[test]
    fn test_cyclic_duplicated_monster_listed_once() {
        let reader = Image::default().build();
        let graph = UnitGraph::new(&reader, reader_address(&reader, TABLE));

        let monsters: Vec<UnitRecord> = graph.collect(UnitType::Monster);
        assert_eq!(monsters.len(), 1);
        assert_eq!(monsters[0].unit_id, 10);
        assert_eq!(monsters[0].monster_tier(), Some(MonsterTier::Normal));
    }

    #[test]
    fn test_empty_types_yield_nothing() {
        let reader = Image::default().build();
        let graph = UnitGraph::new(&reader, reader_address(&reader, TABLE));
        assert!(graph.collect(UnitType::Object).is_empty());
        assert!(graph.collect(UnitType::Missile).is_empty());
    }

    fn reader_address(reader: &MockMemoryReader, offset: usize) -> u64 {
        use mapassist_core::ReadMemory;
        reader.base_address() + offset as u64
    }
}

mod immunity_tests {
    use super::*;

    fn monster_immunities(stats: Vec<(u16, i32)>) -> Vec<Resist> {
        let ctx = Image {
            monster_stats: stats,
            ..Default::default()
        }
        .context();
        let snapshot = builder().try_build(&ctx).unwrap();
        assert_eq!(snapshot.monsters.len(), 1);
        snapshot.monsters[0].immunities()
    }

    #[test]
    fn test_single_fire_immunity() {
        // lightning at 99 is a resistance, not an immunity
        let immunities = monster_immunities(vec![(39, 100), (41, 99)]);
        assert_eq!(immunities, vec![Resist::Fire]);
    }

    #[test]
    fn test_all_immunities() {
        let immunities =
            monster_immunities(vec![(36, 100), (37, 110), (39, 100), (41, 120), (43, 100), (45, 200)]);
        assert_eq!(
            immunities,
            vec![
                Resist::Damage,
                Resist::Magic,
                Resist::Fire,
                Resist::Lightning,
                Resist::Cold,
                Resist::Poison,
            ]
        );
    }

    #[test]
    fn test_no_stats_no_immunities() {
        assert!(monster_immunities(Vec::new()).is_empty());
    }
}

mod item_state_tests {
    use super::*;

    #[test]
    fn test_item_logged_once_per_game() {
        let ctx = Image::default().context();
        let mut builder = builder();

        builder.try_build(&ctx).unwrap();
        builder.try_build(&ctx).unwrap();

        let state = builder.item_state(PID).unwrap();
        assert_eq!(state.len(), 1);
        let labels: Vec<String> = state.log().map(|entry| entry.label()).collect();
        assert_eq!(labels, vec!["Unique #300".to_string()]);
    }

    #[test]
    fn test_seed_change_clears_item_state() {
        let mut builder = builder();
        builder.try_build(&Image::default().context()).unwrap();
        assert_eq!(builder.item_state(PID).map(ItemSeenState::len), Some(1));

        let next_game = Image {
            seed: 777,
            with_item: false,
            ..Default::default()
        };
        builder.try_build(&next_game.context()).unwrap();
        assert_eq!(builder.item_state(PID).map(ItemSeenState::is_empty), Some(true));

        // the old item counts as new again in the next game
        let item_appears = Image {
            seed: 777,
            ..Default::default()
        };
        builder.try_build(&item_appears.context()).unwrap();
        assert_eq!(builder.item_state(PID).map(ItemSeenState::len), Some(1));
    }

    #[test]
    fn test_filtered_out_item_is_logged_without_alert() {
        let alerts = Arc::new(AtomicUsize::new(0));
        let filter = LootFilter::new(vec![LootRule {
            qualities: vec![ItemQuality::Set],
            ..Default::default()
        }]);
        let mut builder = SnapshotBuilder::new(MonsterFilter::default(), filter, 5)
            .with_alert(Box::new(CountingAlert(alerts.clone())));

        let snapshot = builder.try_build(&Image::default().context()).unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(builder.item_state(PID).map(ItemSeenState::len), Some(1));
        assert_eq!(alerts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_matching_item_fires_alert_once() {
        let alerts = Arc::new(AtomicUsize::new(0));
        let filter = LootFilter::new(vec![LootRule {
            qualities: vec![ItemQuality::Unique],
            ..Default::default()
        }]);
        let mut builder = SnapshotBuilder::new(MonsterFilter::default(), filter, 5)
            .with_alert(Box::new(CountingAlert(alerts.clone())));

        let ctx = Image::default().context();
        builder.try_build(&ctx).unwrap();
        builder.try_build(&ctx).unwrap();
        assert_eq!(alerts.load(Ordering::SeqCst), 1);
    }

    struct CountingAlert(Arc<AtomicUsize>);

    impl ItemAlert for CountingAlert {
        fn alert(&self, _entry: &ItemLogEntry) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_forget_process_drops_state() {
        let mut builder = builder();
        builder.try_build(&Image::default().context()).unwrap();
        builder.forget_process(PID);
        assert!(builder.item_state(PID).is_none());
    }

    #[test]
    fn test_log_is_bounded_fifo() {
        let ctx = Image::default().context();
        let template = builder().try_build(&ctx).unwrap().items.remove(0);

        let mut state = ItemSeenState::new(3);
        let now = chrono::Utc::now();
        for i in 0..5u32 {
            let mut item = template.clone();
            item.unit_id = 100 + i;
            item.txt_file_no = 300 + i;
            assert!(state.observe(&item, Area(2), now).is_some());
            // seen items are never logged twice
            assert!(state.observe(&item, Area(2), now).is_none());
        }

        assert_eq!(state.len(), 3);
        let ids: Vec<u32> = state.log().map(|entry| entry.txt_file_no).collect();
        assert_eq!(ids, vec![302, 303, 304]);
    }
}

mod area_service_tests {
    use super::*;

    #[test]
    fn test_missing_geometry_is_not_cached() {
        let source = Arc::new(CountingSource::new(None));
        let service = AreaDataService::new(source.clone(), 12345, Difficulty::Hell);

        assert!(service.get_area(Area(2)).is_none());
        assert!(service.get_area(Area(2)).is_none());
        assert_eq!(source.requests(), 2);
        assert!(!service.is_cached(Area(2)));

        source.set_reply(Some(BLOOD_MOOR));
        let geometry = service.get_area(Area(2)).unwrap();
        assert_eq!(geometry.area, Area(2));
        assert!(service.get_area(Area(2)).is_some());
        assert_eq!(source.requests(), 3);
        assert_eq!(service.cached_areas(), vec![Area(2)]);
    }

    #[test]
    fn test_clear_forces_refetch() {
        let source = Arc::new(CountingSource::new(Some(BLOOD_MOOR)));
        let service = AreaDataService::new(source.clone(), 1, Difficulty::Normal);

        service.get_area(Area(2)).unwrap();
        service.clear();
        assert!(!service.is_cached(Area(2)));
        service.get_area(Area(2)).unwrap();
        assert_eq!(source.requests(), 2);
    }
}

mod transform_tests {
    use super::*;

    #[test]
    fn test_static_view_without_height_falls_back() {
        let view = ViewConfig {
            mode: ViewMode::Static,
            ..Default::default()
        };
        let flat = Rect::new(0.0, 0.0, 10.0, 0.0);
        assert_eq!(view.scale_ratios(&flat), (1.0, 1.0));

        let area = AreaView {
            origin: Point::new(100.0, 100.0),
            input: flat,
            output: flat,
        };
        let transform = MapTransform::new(
            &view,
            &area,
            Point::new(105.0, 100.0),
            Surface::new(800.0, 600.0),
        );
        let p = transform.world_to_screen(Point::new(105.0, 100.0));
        assert!(p.x.is_finite() && p.y.is_finite());
    }
}

mod overlay_tests {
    use super::*;

    #[test]
    fn test_tick_draws_live_game() {
        let source = Arc::new(CountingSource::new(Some(BLOOD_MOOR)));
        let mut settings = Settings::default();
        settings.rendering.toggle_via_in_game_map = false;
        let mut overlay = Overlay::new(settings, source.clone());
        let mut builder = builder();
        let mut backend = RecordingBackend::new();
        let ctx = Image::default().context();
        let surface = Surface::new(1920.0, 1080.0);

        let outcome = overlay.tick(&mut builder, &ctx, &mut backend, surface, true);
        assert_eq!(outcome, FrameOutcome::Drawn);
        assert!(backend.texts().any(|t| t == "Area: Blood Moor"));
        assert!(backend.texts().any(|t| t == "Unique #300"));

        backend.clear();
        overlay.tick(&mut builder, &ctx, &mut backend, surface, true);
        assert_eq!(source.requests(), 1);
    }

    #[test]
    fn test_tick_without_player_has_no_snapshot() {
        let source = Arc::new(CountingSource::new(Some(BLOOD_MOOR)));
        let mut overlay = Overlay::new(Settings::default(), source.clone());
        let mut backend = RecordingBackend::new();
        let ctx = Image {
            seed: 0,
            ..Default::default()
        }
        .context();

        let outcome = overlay.tick(&mut builder(), &ctx, &mut backend, Surface::new(800.0, 600.0), true);
        assert_eq!(outcome, FrameOutcome::NoSnapshot);
        assert!(backend.commands.is_empty());
        assert_eq!(source.requests(), 0);
    }
}
