use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::rendering::MapSettings;
use crate::error::{Error, Result};
use crate::game::{Area, DEFAULT_ITEM_LOG_CAPACITY, LootFilter};
use crate::map::GeometryServerConfig;
use crate::render::{Color, MapPosition, ViewConfig, ViewMode};
use crate::unit::MonsterFilter;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingSettings {
    pub zoom_level: f32,
    pub size: f32,
    pub position: MapPosition,
    pub mode: ViewMode,
    /// Opacity of the area bitmap.
    pub opacity: f32,
    /// Opacity of icons, lines and labels.
    pub icon_opacity: f32,
    /// Only draw while the in-game automap is shown.
    pub toggle_via_in_game_map: bool,
}

impl Default for RenderingSettings {
    fn default() -> Self {
        let view = ViewConfig::default();
        Self {
            zoom_level: view.zoom_level,
            size: view.size,
            position: view.position,
            mode: view.mode,
            opacity: 0.6,
            icon_opacity: 1.0,
            toggle_via_in_game_map: true,
        }
    }
}

impl RenderingSettings {
    pub fn view(&self) -> ViewConfig {
        ViewConfig {
            zoom_level: self.zoom_level,
            size: self.size,
            position: self.position,
            mode: self.mode,
        }
    }

    pub fn set_view(&mut self, view: ViewConfig) {
        self.zoom_level = view.zoom_level;
        self.size = view.size;
        self.position = view.position;
        self.mode = view.mode;
    }
}

/// Colors of the area bitmap. Unset means the cell class is not drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapColors {
    pub walkable: Option<Color>,
    pub border: Option<Color>,
}

impl Default for MapColors {
    fn default() -> Self {
        Self {
            walkable: None,
            border: Some(Color::WHITE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemLogSettings {
    pub enabled: bool,
    pub capacity: usize,
    pub play_sound_on_drop: bool,
    pub sound_file: Option<PathBuf>,
    pub label_font: String,
    pub label_font_size: f32,
    /// Items that are logged, alerted and drawn. Empty lets everything through.
    pub filter: LootFilter,
}

impl Default for ItemLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_ITEM_LOG_CAPACITY,
            play_sound_on_drop: false,
            sound_file: None,
            label_font: "Consolas".to_string(),
            label_font_size: 14.0,
            filter: LootFilter::default(),
        }
    }
}

/// Additions to the built-in monster exclusion lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterSettings {
    pub extra_dummies: Vec<u32>,
    pub extra_excluded_modes: Vec<u32>,
}

impl MonsterSettings {
    pub fn filter(&self) -> MonsterFilter {
        MonsterFilter::default()
            .with_dummies(self.extra_dummies.iter().copied())
            .with_excluded_modes(self.extra_excluded_modes.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorSettings {
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// Diablo II install directory handed to the server.
    pub game_path: PathBuf,
    pub restart_limit: u32,
    pub startup_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for CollaboratorSettings {
    fn default() -> Self {
        let server = GeometryServerConfig::default();
        Self {
            executable: server.executable,
            args: server.args,
            game_path: server.game_path,
            restart_limit: server.restart_limit,
            startup_timeout_secs: server.startup_timeout.as_secs(),
            request_timeout_secs: server.request_timeout.as_secs(),
        }
    }
}

impl CollaboratorSettings {
    pub fn server_config(&self) -> GeometryServerConfig {
        GeometryServerConfig {
            executable: self.executable.clone(),
            args: self.args.clone(),
            game_path: self.game_path.clone(),
            restart_limit: self.restart_limit,
            startup_timeout: Duration::from_secs(self.startup_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub process_name: String,
    pub frame_interval_ms: u64,
    /// `key = 0xVALUE` offsets file that replaces the signature scan.
    pub offsets_file: Option<PathBuf>,
    /// JSON signature set used instead of the built-in one.
    pub signatures_file: Option<PathBuf>,
    /// Skip drawing while another window has focus.
    pub require_foreground: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            process_name: "D2R.exe".to_string(),
            frame_interval_ms: 50,
            offsets_file: None,
            signatures_file: None,
            require_foreground: true,
        }
    }
}

impl GameSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Everything read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Areas where nothing is drawn, by id or name.
    pub hidden_areas: Vec<Area>,
    /// Areas fetched in the background as soon as a game starts.
    pub prefetch_areas: Vec<Area>,
    pub rendering: RenderingSettings,
    pub map_colors: MapColors,
    pub map: MapSettings,
    pub item_log: ItemLogSettings,
    pub monsters: MonsterSettings,
    pub collaborator: CollaboratorSettings,
    pub game: GameSettings,
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} not found, using default settings", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParseError(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::ConfigParseError(e.to_string()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn is_hidden(&self, area: Area) -> bool {
        self.hidden_areas.contains(&area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::IconShape;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.game.process_name, "D2R.exe");
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let err = Settings::parse("[rendering\nsize = ").unwrap_err();
        assert!(matches!(err, Error::ConfigParseError(_)));
        assert!(err.is_fatal_at_startup());

        let err = Settings::parse("[map_colors]\nborder = \"#12\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParseError(_)));
    }

    #[test]
    fn test_partial_file() {
        let settings = Settings::parse(
            r##"
            hidden_areas = ["Rogue Encampment", 40]

            [rendering]
            size = 600
            position = "TopRight"
            mode = "Static"

            [map.super_unique_monster]
            icon_shape = "Polygon"
            icon_color = "#FF000080"
            icon_size = 12

            [[item_log.filter]]
            qualities = ["Unique", "Set"]
        "##,
        )
        .unwrap();

        assert!(settings.is_hidden(Area::ROGUE_ENCAMPMENT));
        assert!(settings.is_hidden(Area::LUT_GHOLEIN));
        assert!(!settings.is_hidden(Area::HARROGATH));

        let view = settings.rendering.view();
        assert_eq!(view.size, 600.0);
        assert_eq!(view.position, MapPosition::TopRight);
        assert!(!view.is_overlay());
        assert_eq!(view.zoom_level, 1.0);

        let su = &settings.map.super_unique_monster;
        assert_eq!(su.icon_shape, IconShape::Polygon);
        assert_eq!(su.icon_color, Color::rgba(255, 0, 0, 128));
        assert_eq!(su.label_font_size, 14.0);
        // untouched sections keep their defaults
        assert_eq!(settings.map.player, MapSettings::default().player);
        assert_eq!(settings.item_log.filter.rules.len(), 1);
        assert_eq!(settings.item_log.capacity, DEFAULT_ITEM_LOG_CAPACITY);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut settings = Settings::default();
        settings.prefetch_areas = vec![Area::CANYON_OF_THE_MAGI];
        settings.collaborator.game_path = PathBuf::from("C:/Games/Diablo II");
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(
            loaded.collaborator.server_config().request_timeout,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_monster_filter_extension() {
        let monsters = MonsterSettings {
            extra_dummies: vec![9999],
            extra_excluded_modes: Vec::new(),
        };
        let filter = monsters.filter();
        assert!(filter.is_dummy(9999));
        assert!(filter.is_dummy(146));
    }
}
