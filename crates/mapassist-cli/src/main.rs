mod cli;
mod cli_utils;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mapassist=info,mapassist_core=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match args.command {
        Some(Command::Run { pid, width, height }) => commands::run::run(&args.config, pid, width, height),
        Some(Command::Offsets { pid, output }) => {
            commands::offsets::run(&args.config, pid, output.as_deref())
        }
        Some(Command::Snapshot { pid }) => commands::snapshot::run(&args.config, pid),
        Some(Command::Area {
            seed,
            difficulty,
            area,
            json,
        }) => commands::area::run(&args.config, seed, difficulty, area, json),
        None => commands::run::run(&args.config, None, 1920, 1080),
    }
}
