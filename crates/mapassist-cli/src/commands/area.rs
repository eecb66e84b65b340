//! Area command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, bail};
use mapassist_core::{
    Area, AreaDataService, Difficulty, GeometryClient, ShutdownSignal, points_of_interest,
};

use crate::cli_utils::load_settings;

pub fn run(config: &Path, seed: u32, difficulty: Difficulty, area: Area, json: bool) -> Result<()> {
    if !area.is_valid() {
        bail!("Unknown area {}", area.id());
    }
    let settings = load_settings(config)?;
    let shutdown = Arc::new(ShutdownSignal::new());
    let client = Arc::new(GeometryClient::start(
        settings.collaborator.server_config(),
        Arc::clone(&shutdown),
    )?);

    let service = AreaDataService::new(client.clone(), seed, difficulty);
    let Some(geometry) = service.get_area(area) else {
        bail!("No geometry for {} (seed {}, {})", area, seed, difficulty);
    };
    let pois = points_of_interest(&geometry, |other| service.get_area(other));

    // stop prefetch workers before the server goes away
    shutdown.trigger();
    service.clear();
    client.close();

    if json {
        println!("{}", serde_json::to_string_pretty(&pois)?);
        return Ok(());
    }

    println!("{} (seed {}, {})", area.display_name(), seed, difficulty);
    println!(
        "  Grid:    {}x{} at ({}, {})",
        geometry.width(),
        geometry.height(),
        geometry.origin.x,
        geometry.origin.y
    );
    let adjacent: Vec<String> = geometry.adjacent_areas().map(|a| a.display_name()).collect();
    println!("  Exits:   {}", adjacent.join(", "));
    println!("  Objects: {}", geometry.objects.values().map(Vec::len).sum::<usize>());
    println!("  NPCs:    {}", geometry.npcs.values().map(Vec::len).sum::<usize>());
    println!();
    println!("=== Points of interest ===");
    for poi in &pois {
        println!(
            "{:<16} ({:>5}, {:>5})  {}",
            poi.kind.to_string(),
            poi.position.x,
            poi.position.y,
            poi.label
        );
    }
    Ok(())
}
