//! # Grotto Command Line
//!
//! Generates a dungeon and prints what a bug report needs: the random state,
//! room and road counts, and optionally the graph JSON and a text minimap.

use clap::Parser;
use grotto::{
    generate_dungeon, render_minimap, GenerationConfig, GraphGenerator, GrottoError,
    GrottoResult, MapGraph,
};
use std::path::{Path, PathBuf};

/// Command line arguments for the Grotto generator.
#[derive(Parser, Debug)]
#[command(name = "grotto")]
#[command(about = "Procedural cave-dungeon generator")]
#[command(version)]
struct Args {
    /// Map width in tiles
    #[arg(long, default_value_t = grotto::config::DEFAULT_MAP_WIDTH)]
    width: u32,

    /// Map height in tiles
    #[arg(long, default_value_t = grotto::config::DEFAULT_MAP_HEIGHT)]
    height: u32,

    /// Number of room slots
    #[arg(long, default_value_t = grotto::config::DEFAULT_ROOM_COUNT)]
    rooms: u32,

    /// Random state to replay, as printed by a previous run (`!rnd,...`)
    #[arg(short, long)]
    seed: Option<String>,

    /// Skip the small wall-pocket repair step
    #[arg(long)]
    fast: bool,

    /// Write the room graph as JSON to this file
    #[arg(long)]
    graph_out: Option<PathBuf>,

    /// Print a text minimap of the generated map
    #[arg(long)]
    minimap: bool,

    /// Check a previously exported graph file instead of generating
    #[arg(long, value_name = "PATH")]
    validate: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> GrottoResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level)?;
    log::info!("Starting Grotto v{}", grotto::VERSION);

    match &args.validate {
        Some(path) => validate_graph_file(path, &args),
        None => run_generation(&args),
    }
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) -> GrottoResult<()> {
    #[cfg(feature = "dev-tools")]
    {
        let filter = tracing_subscriber::EnvFilter::try_new(log_level).map_err(|e| {
            GrottoError::InvalidConfig(format!("log level '{}': {}", log_level, e))
        })?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        let level: log::LevelFilter = log_level.parse().map_err(|_| {
            GrottoError::InvalidConfig(format!("unknown log level '{}'", log_level))
        })?;
        env_logger::Builder::new()
            .filter_level(level)
            .format_target(false)
            .init();
    }

    Ok(())
}

fn run_generation(args: &Args) -> GrottoResult<()> {
    let config = GenerationConfig {
        random_state: args.seed.clone(),
        fast_mode: args.fast,
        ..GenerationConfig::new(args.width, args.height, args.rooms)
    };

    let dungeon = generate_dungeon(&config)?;
    println!("random state: {}", dungeon.random_state);
    println!(
        "rooms: {} of {} placed, {} carved",
        dungeon.graph.vertices.len(),
        config.room_count,
        dungeon.rooms.len()
    );
    println!("roads: {}", dungeon.graph.roads.len());
    println!("walkable tiles: {}", dungeon.walkable_count());
    if let Some(spawn) = dungeon.player_spawn() {
        println!("player spawn: ({}, {})", spawn.x, spawn.y);
    }

    if let Some(path) = &args.graph_out {
        std::fs::write(path, dungeon.graph.to_json()?)?;
        log::info!("graph written to {}", path.display());
    }

    if args.minimap {
        for line in render_minimap(&dungeon.tiles) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn validate_graph_file(path: &Path, args: &Args) -> GrottoResult<()> {
    let graph = MapGraph::from_json(&std::fs::read_to_string(path)?)?;
    GraphGenerator::check(&graph, args.width, args.height)?;
    println!(
        "{}: {} rooms, {} roads, valid for a {}x{} map",
        path.display(),
        graph.vertices.len(),
        graph.roads.len(),
        args.width,
        args.height
    );
    Ok(())
}
