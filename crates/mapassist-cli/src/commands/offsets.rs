//! Offsets command implementation.
//!
//! The output file can be used as `game.offsets_file` in the settings.

use std::path::Path;

use anyhow::Result;
use mapassist_core::offset::OffsetName;
use mapassist_core::save_offsets;
use owo_colors::OwoColorize;
use strum::IntoEnumIterator;

use crate::cli_utils::{attach, load_settings, resolve_offsets};

pub fn run(config: &Path, pid: Option<u32>, output: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let (process, reader) = attach(pid, &settings)?;
    println!(
        "Found process (PID: {}, Base: 0x{:X}, Size: 0x{:X})",
        process.pid, process.base_address, process.module_size
    );

    let offsets = resolve_offsets(&reader, &process, &settings.game)?;

    println!();
    println!("=== Offsets ===");
    for name in OffsetName::iter() {
        let value = offsets.get(name);
        let mark = if value != 0 {
            "✓".green().to_string()
        } else if name.is_required() {
            "✗".red().to_string()
        } else {
            "✗".yellow().to_string()
        };
        println!("{:<18} 0x{:08X}  {}", name.as_ref(), value, mark);
    }

    if let Some(path) = output {
        save_offsets(path, &offsets)?;
        println!();
        println!("Offsets saved to {}", path.display());
    }
    Ok(())
}
