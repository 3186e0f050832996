//! Procedural tile terrain: wave-function-collapse category solving, height
//! sampling and smoothing, and chunk streaming around a moving viewpoint.

mod async_generation;
mod category;
mod coords;
mod height;
mod rules;
mod seed;
mod smoother;
mod solver;
mod store;
mod streaming;
mod tile;

pub use async_generation::{AsyncChunkSolver, ChunkTask, SolvedChunk, solve_chunk};
pub use category::{CATEGORY_COUNT, CategorySet, TerrainCategory, Tint, UnknownCategory};
pub use coords::{ChunkCoord, Direction, TileCoord};
pub use height::{HeightGenerator, HeightProfile, HeightSource, NoTiles, interpolated_height};
pub use rules::{AdjacencyRules, ExclusionRule, RuleTableError};
pub use seed::{chunk_rng, derive_chunk_seed, fingerprint};
pub use smoother::{smooth, smooth_with_padding};
pub use solver::{
    CollapsedGrid, Contradiction, DEFAULT_MAX_BACKTRACKS, SolveError, SolveStats,
    WaveCollapseSolver,
};
pub use store::{ChunkState, TileStore};
pub use streaming::{
    MAX_TILE_UNIT_SIZE, MAX_VISIBLE_RANGE, RequestReport, StreamingConfig, StreamingConfigError,
    StreamingStats, TerrainError, TerrainStreamer, UpdateReport,
};
pub use tile::{TerrainData, TileMap};
