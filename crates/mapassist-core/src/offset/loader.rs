//! Static offset files.
//!
//! ```text
//! D2R 1.2.x
//! UnitHashTable = 0x20AF660
//! ExpansionCheck = 0x20B2278
//! ```
//!
//! The first line is a free-form version label; every other line is a
//! `key = 0xHEX` pair. Unknown keys are logged and ignored.

use std::fs;
use std::path::Path;

use strum::IntoEnumIterator;
use tracing::warn;

use crate::error::{Error, Result};
use crate::offset::{OffsetName, ResolvedOffsets};

pub fn load_offsets<P: AsRef<Path>>(path: P) -> Result<ResolvedOffsets> {
    let content = fs::read_to_string(&path)?;
    parse_offsets(&content)
}

pub fn save_offsets<P: AsRef<Path>>(path: P, offsets: &ResolvedOffsets) -> Result<()> {
    fs::write(path, format_offsets(offsets))?;
    Ok(())
}

fn parse_offsets(content: &str) -> Result<ResolvedOffsets> {
    let mut offsets = ResolvedOffsets::default();
    let mut lines = content.lines();

    if let Some(version) = lines.next() {
        offsets.version = version.trim().to_string();
    }

    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::InvalidOffset(format!(
                "Expected 'key = value', got '{}'",
                line
            )));
        };
        let key = key.trim();
        let value = value.trim();

        match key.parse::<OffsetName>() {
            Ok(name) => offsets.set(name, parse_hex_value(value)?),
            Err(_) => warn!("Unknown offset key: '{}' (value: {})", key, value),
        }
    }

    Ok(offsets)
}

pub(crate) fn parse_hex_value(value: &str) -> Result<u64> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::InvalidOffset(format!("Failed to parse '{}': {}", value, e)))
}

fn format_offsets(offsets: &ResolvedOffsets) -> String {
    let mut lines = vec![offsets.version.clone()];
    for name in OffsetName::iter() {
        lines.push(format!("{} = {:#x}", name, offsets.get(name)));
    }
    lines.join("\n") + "\n"
}
