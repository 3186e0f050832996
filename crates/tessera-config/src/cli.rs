//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Tessera terrain demo command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "tessera", about = "Streams procedural tile terrain around a walking viewpoint")]
pub struct CliArgs {
    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tiles per chunk edge.
    #[arg(long)]
    pub tile_unit_size: Option<u32>,

    /// Chunks generated in each direction around the viewpoint.
    #[arg(long)]
    pub visible_range: Option<u32>,

    /// World units per tile.
    #[arg(long)]
    pub square_size: Option<f64>,

    /// Number of walk steps.
    #[arg(long)]
    pub steps: Option<u32>,

    /// Solve chunks on background threads.
    #[arg(long)]
    pub async_generation: bool,

    /// Async solver threads (0 = one per spare CPU core). Implies
    /// `--async-generation`.
    #[arg(long)]
    pub async_workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.terrain.seed = seed;
        }
        if let Some(size) = args.tile_unit_size {
            self.terrain.tile_unit_size = size;
        }
        if let Some(range) = args.visible_range {
            self.terrain.visible_range = range;
        }
        if let Some(size) = args.square_size {
            self.terrain.square_size = size;
        }
        if let Some(steps) = args.steps {
            self.walk.steps = steps;
        }
        if args.async_generation {
            self.walk.async_generation = true;
        }
        if let Some(workers) = args.async_workers {
            self.walk.async_generation = true;
            self.walk.async_workers = workers;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
