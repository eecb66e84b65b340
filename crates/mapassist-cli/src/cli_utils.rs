//! Common CLI utility functions shared across commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use mapassist_core::config::GameSettings;
use mapassist_core::offset::load_signatures;
use mapassist_core::render::item_color;
use mapassist_core::{
    Color, ItemAlert, ItemLogEntry, MemoryReader, OffsetResolver, ProcessHandle, ProcessProvider,
    ResolvedOffsets, Settings, SignatureScan, SnapshotBuilder, StaticOffsets,
    SystemProcessProvider,
};
use owo_colors::OwoColorize;
use tracing::{debug, info};

/// Load settings; a malformed file stops the program.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let settings =
        Settings::load(path).with_context(|| format!("Invalid settings in {}", path.display()))?;
    debug!("Settings loaded from {}", path.display());
    Ok(settings)
}

/// Open a game process by PID or by executable name.
pub fn open_process(pid: Option<u32>, process_name: &str) -> Result<ProcessHandle> {
    let provider = SystemProcessProvider::new(process_name);
    let process = match pid {
        Some(pid) => provider.open_process(pid)?,
        None => provider.find_process()?,
    };
    debug!(
        "Process {} base {:#x} size {:#x}",
        process.pid, process.base_address, process.module_size
    );
    Ok(process)
}

/// Resolve offsets from the configured file, or by scanning the module.
pub fn resolve_offsets(
    reader: &MemoryReader,
    process: &ProcessHandle,
    game: &GameSettings,
) -> Result<ResolvedOffsets> {
    let resolver = match (&game.offsets_file, &game.signatures_file) {
        (Some(path), _) => {
            info!("Using offsets from {}", path.display());
            OffsetResolver::new(StaticOffsets::from_file(path)?)
        }
        (None, Some(path)) => {
            let signatures = load_signatures(path)
                .with_context(|| format!("Invalid signatures in {}", path.display()))?;
            info!("Using signatures from {} ({})", path.display(), signatures.version);
            OffsetResolver::new(SignatureScan::with_signatures(
                signatures,
                process.module_size as usize,
            ))
        }
        (None, None) => OffsetResolver::new(SignatureScan::new(process.module_size as usize)),
    };
    Ok(resolver.resolve(reader)?.clone())
}

pub fn attach(pid: Option<u32>, settings: &Settings) -> Result<(Arc<ProcessHandle>, MemoryReader)> {
    let process = Arc::new(open_process(pid, &settings.game.process_name)?);
    let reader = MemoryReader::new(Arc::clone(&process));
    Ok((process, reader))
}

pub fn snapshot_builder(settings: &Settings) -> SnapshotBuilder {
    SnapshotBuilder::new(
        settings.monsters.filter(),
        settings.item_log.filter.clone(),
        settings.item_log.capacity,
    )
    .with_alert(Box::new(LogAlert {
        bell: settings.item_log.play_sound_on_drop,
    }))
}

/// Logs new drops, prints them in their quality color and optionally rings
/// the terminal bell.
struct LogAlert {
    bell: bool,
}

impl ItemAlert for LogAlert {
    fn alert(&self, entry: &ItemLogEntry) {
        info!("Dropped in {}: {}", entry.area, entry.label());
        let color = item_color(entry).unwrap_or(Color::WHITE);
        println!(
            "{} {}",
            entry.area.display_name().dimmed(),
            entry.label().truecolor(color.r, color.g, color.b)
        );
        if self.bell {
            print!("\x07");
        }
    }
}
