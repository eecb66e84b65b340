//! CLI argument definitions for mapassist.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mapassist_core::{Area, DEFAULT_CONFIG_FILE, Difficulty};

#[derive(Parser)]
#[command(name = "mapassist")]
#[command(about = "Diablo II: Resurrected map overlay", version)]
pub struct Args {
    /// Settings file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, env = "MAPASSIST_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Attach to the game and draw every frame (default)
    Run {
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
        /// Overlay width in pixels
        #[arg(long, default_value = "1920")]
        width: u32,
        /// Overlay height in pixels
        #[arg(long, default_value = "1080")]
        height: u32,
    },
    /// Resolve the root offsets and print them
    Offsets {
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
        /// Write the offsets to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print one game snapshot as JSON
    Snapshot {
        /// Process ID (skip automatic detection)
        #[arg(long)]
        pid: Option<u32>,
    },
    /// Fetch one area from the geometry server and summarize it
    Area {
        /// Map seed
        #[arg(long)]
        seed: u32,
        /// Normal, Nightmare or Hell
        #[arg(long, default_value = "Normal")]
        difficulty: Difficulty,
        /// Area id or name, e.g. 46 or "Canyon of the Magi"
        area: Area,
        /// Print points of interest as JSON
        #[arg(long)]
        json: bool,
    },
}
