//! Snapshot command implementation.

use std::path::Path;

use anyhow::Result;
use mapassist_core::GameContext;

use crate::cli_utils::{attach, load_settings, resolve_offsets, snapshot_builder};

/// Print a single snapshot as JSON.
pub fn run(config: &Path, pid: Option<u32>) -> Result<()> {
    let settings = load_settings(config)?;
    let (process, reader) = attach(pid, &settings)?;
    let offsets = resolve_offsets(&reader, &process, &settings.game)?;
    let ctx = GameContext::new(reader, offsets, process.pid);

    let snapshot = snapshot_builder(&settings).try_build(&ctx)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
