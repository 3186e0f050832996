//! Demo binary that walks a viewpoint across procedurally generated tile
//! terrain, keeping a board of render squares in step, and prints an ASCII
//! map of the world around the final position.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p tessera-demo -- --seed 7 --steps 64`.
//! Pass `--async-generation` to solve chunks on background threads, or
//! `--async-workers 4` to also fix the pool size.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tessera_board::{Board, TerrainApplier};
use tessera_config::{CliArgs, Config, WalkConfig};
use tessera_terrain::{
    StreamingConfig, TerrainCategory, TerrainError, TerrainStreamer, TileCoord, UnknownCategory,
};
use tracing::{error, info, warn};

/// Builds the streamer configuration from the loaded settings.
fn streaming_config(config: &Config) -> Result<StreamingConfig, UnknownCategory> {
    let terrain = &config.terrain;
    Ok(StreamingConfig {
        tile_unit_size: terrain.tile_unit_size,
        square_size: terrain.square_size,
        visible_range: terrain.visible_range,
        eviction_margin: terrain.eviction_margin,
        default_category: terrain.default_category.parse::<TerrainCategory>()?,
        seed: terrain.seed,
        max_backtracks: terrain.max_backtracks,
    })
}

/// World position after `step` steps of the walk.
fn walk_position(walk: &WalkConfig, step: u32) -> (f64, f64) {
    (
        walk.start_x + walk.step_x * step as f64,
        walk.start_z + walk.step_z * step as f64,
    )
}

/// Glyph rows of the terrain around `center`, one row per `z`. The centre
/// tile is marked `@` and tiles that are not loaded are blank.
fn ascii_map(streamer: &TerrainStreamer, center: TileCoord, radius: u32) -> String {
    let r = radius as i32;
    let mut out = String::with_capacity(((2 * r + 2) * (2 * r + 1)) as usize);
    for z in center.z - r..=center.z + r {
        for x in center.x - r..=center.x + r {
            let tile = TileCoord::new(x, z);
            let glyph = if tile == center {
                '@'
            } else {
                streamer
                    .store()
                    .terrain_type(tile)
                    .map(TerrainCategory::glyph)
                    .unwrap_or(' ')
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}

fn walk_sync(
    streamer: &mut TerrainStreamer,
    board: &mut Board,
    walk: &WalkConfig,
) -> Result<(), TerrainError> {
    let applier = TerrainApplier::new();
    for step in 0..walk.steps {
        let (x, z) = walk_position(walk, step);
        let update = streamer.update_terrain(x, z)?;
        let applied = applier.apply_to_board(streamer, board, x, z);
        info!(
            step,
            x,
            z,
            generated = update.generated,
            evicted = update.evicted,
            squares = board.len(),
            skipped = applied.skipped,
            "walk step"
        );
    }
    Ok(())
}

fn walk_async(
    streamer: &mut TerrainStreamer,
    board: &mut Board,
    walk: &WalkConfig,
    workers: usize,
) -> Result<(), TerrainError> {
    let solver = streamer.spawn_async_solver(workers);
    let applier = TerrainApplier::new();
    let mut last = walk_position(walk, 0);

    for step in 0..walk.steps {
        let (x, z) = walk_position(walk, step);
        last = (x, z);
        let request = streamer.request_terrain(x, z, &solver);
        let merged = streamer.merge_completed(&solver)?;
        let applied = applier.apply_to_board(streamer, board, x, z);
        info!(
            step,
            x,
            z,
            submitted = request.submitted,
            cancelled = request.cancelled,
            merged,
            evicted = request.evicted,
            in_flight = solver.in_flight_count(),
            skipped = applied.skipped,
            "walk step"
        );
    }

    // Let outstanding chunks land so the final map is complete.
    let deadline = std::time::Instant::now() + Duration::from_secs(30);
    while solver.in_flight_count() > 0 && std::time::Instant::now() < deadline {
        streamer.merge_completed(&solver)?;
        std::thread::sleep(Duration::from_millis(5));
    }
    streamer.merge_completed(&solver)?;
    if solver.in_flight_count() > 0 {
        warn!(pending = solver.in_flight_count(), "gave up waiting for chunk solver");
    }
    applier.apply_to_board(streamer, board, last.0, last.1);
    Ok(())
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;
    let mut streamer = TerrainStreamer::new(streaming_config(config)?)?;
    let mut board = Board::for_streamer(&streamer, config.board.segments);

    info!(
        seed = config.terrain.seed,
        tile_unit_size = config.terrain.tile_unit_size,
        visible_range = config.terrain.visible_range,
        async_generation = config.walk.async_generation,
        async_workers = config.walk.async_workers,
        "starting terrain walk"
    );

    if config.walk.async_generation {
        walk_async(&mut streamer, &mut board, &config.walk, config.walk.async_workers)?;
    } else {
        walk_sync(&mut streamer, &mut board, &config.walk)?;
    }

    let stats = streamer.stats();
    info!(
        chunks_generated = stats.chunks_generated,
        solver_invocations = stats.solver_invocations,
        chunks_evicted = stats.chunks_evicted,
        backtracks = stats.backtracks,
        tiles = streamer.store().tile_count(),
        squares = board.len(),
        "walk finished"
    );

    if config.debug.print_map {
        let (x, z) = walk_position(&config.walk, config.walk.steps.saturating_sub(1));
        let center = TileCoord::from_world(x, z, config.terrain.square_size);
        print!("{}", ascii_map(&streamer, center, config.debug.map_radius));
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("tessera")
    });

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    tessera_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
