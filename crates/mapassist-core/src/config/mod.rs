//! User settings and the constants they default to.
//!
//! - `Settings` - everything read from `config.toml`
//! - `PoiRendering` / `MapSettings` - per-kind icon, line and label styles
//! - Attach loop timing constants

mod rendering;
mod settings;

pub use rendering::{MapSettings, PoiRendering};
pub use settings::{
    CollaboratorSettings, DEFAULT_CONFIG_FILE, GameSettings, ItemLogSettings, MapColors,
    MonsterSettings, RenderingSettings, Settings,
};

/// Process attach configuration.
pub mod attach {
    use std::time::Duration;

    /// Delay between looks for the game process.
    pub const PROCESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

    /// Consecutive frames without a snapshot before the process is re-checked.
    pub const MAX_EMPTY_FRAMES: u32 = 100;

    /// Frames to wait before asking again for geometry that failed to load.
    pub const GEOMETRY_RETRY_FRAMES: u32 = 40;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_constants() {
        assert_eq!(attach::PROCESS_POLL_INTERVAL.as_secs(), 2);
        assert!(attach::MAX_EMPTY_FRAMES > 0);
        assert!(attach::GEOMETRY_RETRY_FRAMES > 0);
    }
}
