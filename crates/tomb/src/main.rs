//! Loads a level file and prints a summary of the built world. Doubles as a
//! smoke test against real game data.

use anyhow::Result;
use clap::Parser;
use log::*;
use tomb_world::{LoadParams, LoadedLevel};

pub mod cli;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = cli::Args::parse();

    info!("tomb {VERSION}");

    let progress = |permille: u16| trace!("load progress {}.{}%", permille / 10, permille % 10);
    let params = LoadParams {
        progress: Some(&progress),
        ..Default::default()
    };

    let LoadedLevel {
        format,
        world,
        warnings,
    } = tomb_world::load_level(&args.level, &params)?;

    info!("format: {format:?}");
    info!(
        "{} rooms, {} meshes, {} models, {} entities",
        world.rooms.len(),
        world.meshes.len(),
        world.skeletal_models.len(),
        world.entities.len(),
    );
    info!(
        "{} texture pages, {} sprites, {} boxes, {} samples",
        world.texture_pages.len(),
        world.sprites.len(),
        world.boxes.len(),
        world.samples.len(),
    );
    if let Some(skybox) = world.skybox {
        info!("skybox model {skybox}");
    }

    if args.rooms {
        for room in &world.rooms {
            let walls = room.sectors.iter().filter(|s| s.is_wall()).count();
            let triangles = room
                .collision
                .as_ref()
                .map(|c| c.triangles.len())
                .unwrap_or(0);
            info!(
                "room {:3}: {}x{} sectors ({} walls), {} portals, {} collision triangles",
                room.id,
                room.num_x_sectors,
                room.num_z_sectors,
                walls,
                room.portals.len(),
                triangles,
            );
        }
    }

    if warnings.is_empty() {
        info!("no warnings");
    } else if args.warnings {
        for warning in &warnings {
            warn!("{warning}");
        }
    } else {
        warn!("{} warnings (rerun with --warnings to list them)", warnings.len());
    }

    Ok(())
}
