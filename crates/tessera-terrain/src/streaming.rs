//! Chunk streaming around a moving viewpoint.
//!
//! [`TerrainStreamer::update_terrain`] generates every missing chunk within
//! `visible_range` of the viewpoint's chunk (nearest first), then evicts
//! whole chunks that drifted beyond `visible_range + eviction_margin`. The
//! gap between the two radii keeps chunks at the edge of the view from
//! being regenerated on every small movement.
//!
//! Chunks are solved into a chunk-local map and smoothed against already
//! merged neighbours before they are merged, so a failed generation never
//! leaves partial tiles in the store.

use tracing::{debug, trace};

use crate::async_generation::{AsyncChunkSolver, ChunkTask, solve_chunk};
use crate::category::TerrainCategory;
use crate::coords::{ChunkCoord, TileCoord};
use crate::height::{self, HeightGenerator};
use crate::rules::{AdjacencyRules, RuleTableError};
use crate::smoother;
use crate::solver::{DEFAULT_MAX_BACKTRACKS, SolveError, SolveStats};
use crate::store::{ChunkState, TileStore};
use crate::tile::TileMap;

/// Largest accepted `tile_unit_size`.
pub const MAX_TILE_UNIT_SIZE: u32 = 1024;

/// Largest accepted `visible_range`.
pub const MAX_VISIBLE_RANGE: u32 = 1024;

/// Invalid [`StreamingConfig`] values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamingConfigError {
    #[error("tile_unit_size must be at least 1")]
    ZeroChunkSize,

    #[error("tile_unit_size {0} exceeds the maximum of {max}", max = MAX_TILE_UNIT_SIZE)]
    ChunkTooLarge(u32),

    #[error("visible_range {0} exceeds the maximum of {max}", max = MAX_VISIBLE_RANGE)]
    RangeTooLarge(u32),

    #[error("square_size must be positive and finite, got {0}")]
    InvalidSquareSize(f64),
}

/// Errors from the streaming manager.
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("invalid streaming configuration: {0}")]
    Config(#[from] StreamingConfigError),

    #[error("invalid adjacency rules: {0}")]
    Rules(#[from] RuleTableError),

    /// A chunk could not be solved. The store was left untouched.
    #[error("failed to generate chunk ({}, {})", chunk.x, chunk.z)]
    Generation {
        chunk: ChunkCoord,
        #[source]
        source: SolveError,
    },
}

/// Streaming parameters, fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamingConfig {
    /// Tiles per chunk edge.
    pub tile_unit_size: u32,
    /// World units per tile.
    pub square_size: f64,
    /// Chunks generated in each direction around the viewpoint's chunk.
    pub visible_range: u32,
    /// Extra chunks retained beyond `visible_range` before eviction.
    pub eviction_margin: u32,
    /// Reported for tiles that are not stored.
    pub default_category: TerrainCategory,
    /// World seed.
    pub seed: u64,
    /// Solver recovery budget per chunk.
    pub max_backtracks: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            tile_unit_size: 8,
            square_size: 1.0,
            visible_range: 2,
            eviction_margin: 1,
            default_category: TerrainCategory::Grass,
            seed: 0,
            max_backtracks: DEFAULT_MAX_BACKTRACKS,
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> Result<(), StreamingConfigError> {
        if self.tile_unit_size == 0 {
            return Err(StreamingConfigError::ZeroChunkSize);
        }
        if self.tile_unit_size > MAX_TILE_UNIT_SIZE {
            return Err(StreamingConfigError::ChunkTooLarge(self.tile_unit_size));
        }
        if self.visible_range > MAX_VISIBLE_RANGE {
            return Err(StreamingConfigError::RangeTooLarge(self.visible_range));
        }
        if !self.square_size.is_finite() || self.square_size <= 0.0 {
            return Err(StreamingConfigError::InvalidSquareSize(self.square_size));
        }
        Ok(())
    }

    /// Chebyshev chunk distance beyond which chunks are evicted.
    pub fn retain_radius(&self) -> u32 {
        self.visible_range.saturating_add(self.eviction_margin)
    }
}

/// What one `update_terrain` call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Chunks generated and merged.
    pub generated: usize,
    /// Chunks evicted.
    pub evicted: usize,
}

/// What one `request_terrain` call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestReport {
    /// Chunks handed to the async solver.
    pub submitted: usize,
    /// Pending chunks that fell out of range and were cancelled.
    pub cancelled: usize,
    /// Merged chunks evicted.
    pub evicted: usize,
}

/// Cumulative counters since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub chunks_generated: u64,
    pub solver_invocations: u64,
    pub chunks_evicted: u64,
    pub backtracks: u64,
}

/// Owns the global tile store and keeps it populated around a viewpoint.
#[derive(Debug)]
pub struct TerrainStreamer {
    config: StreamingConfig,
    rules: AdjacencyRules,
    heights: HeightGenerator,
    store: TileStore,
    stats: StreamingStats,
    center: Option<ChunkCoord>,
}

impl TerrainStreamer {
    /// Creates a streamer with the standard rule table and height profiles.
    pub fn new(config: StreamingConfig) -> Result<Self, TerrainError> {
        Self::with_rules(config, AdjacencyRules::standard(), HeightGenerator::standard())
    }

    pub fn with_rules(
        config: StreamingConfig,
        rules: AdjacencyRules,
        heights: HeightGenerator,
    ) -> Result<Self, TerrainError> {
        config.validate()?;
        rules.validate()?;
        Ok(Self {
            store: TileStore::new(config.tile_unit_size),
            config,
            rules,
            heights,
            stats: StreamingStats::default(),
            center: None,
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn rules(&self) -> &AdjacencyRules {
        &self.rules
    }

    pub fn heights(&self) -> &HeightGenerator {
        &self.heights
    }

    /// Read-only view of the global tile store.
    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn stats(&self) -> StreamingStats {
        self.stats
    }

    /// Chunk of the most recent update centre.
    pub fn center_chunk(&self) -> Option<ChunkCoord> {
        self.center
    }

    /// Chunk containing the world-space point `(world_x, world_z)`.
    pub fn chunk_at_world(&self, world_x: f64, world_z: f64) -> ChunkCoord {
        TileCoord::from_world(world_x, world_z, self.config.square_size)
            .chunk(self.config.tile_unit_size)
    }

    /// Chunks within `visible_range` of `center`, nearest first.
    pub fn chunks_in_range(&self, center: ChunkCoord) -> Vec<ChunkCoord> {
        let r = self.config.visible_range as i32;
        let mut chunks: Vec<ChunkCoord> = (-r..=r)
            .flat_map(|dz| (-r..=r).map(move |dx| ChunkCoord::new(center.x + dx, center.z + dz)))
            .collect();
        chunks.sort_by_key(|c| (c.distance_sq(center), c.z, c.x));
        chunks
    }

    /// Generates missing chunks around the world-space centre and evicts
    /// distant ones.
    ///
    /// On error, chunks generated earlier in the same call stay merged; the
    /// failing chunk is never partially stored.
    pub fn update_terrain(
        &mut self,
        world_x: f64,
        world_z: f64,
    ) -> Result<UpdateReport, TerrainError> {
        let center = self.chunk_at_world(world_x, world_z);
        self.center = Some(center);

        let mut report = UpdateReport::default();
        for chunk in self.chunks_in_range(center) {
            if self.store.is_present(chunk) {
                continue;
            }
            self.generate_chunk(chunk)?;
            report.generated += 1;
        }

        report.evicted = self.evict_beyond(center);
        if report.generated > 0 || report.evicted > 0 {
            debug!(
                center_x = center.x,
                center_z = center.z,
                generated = report.generated,
                evicted = report.evicted,
                tiles = self.store.tile_count(),
                "terrain updated"
            );
        }
        Ok(report)
    }

    /// Category of the tile containing tile-space `(x, z)`, or the configured
    /// default if that tile is not stored.
    pub fn terrain_type(&self, x: f64, z: f64) -> TerrainCategory {
        self.store
            .terrain_type(TileCoord::containing(x, z))
            .unwrap_or(self.config.default_category)
    }

    /// Bilinearly interpolated height at tile-space `(x, z)`, in world units.
    pub fn interpolated_height(&self, x: f64, z: f64) -> f64 {
        height::interpolated_height(&self.store, x, z, self.config.square_size)
    }

    /// An async solver sharing this streamer's rules and height profiles.
    ///
    /// A `thread_count` of `0` sizes the pool from the available CPU cores.
    pub fn spawn_async_solver(&self, thread_count: usize) -> AsyncChunkSolver {
        let (rules, heights) = (self.rules.clone(), self.heights.clone());
        match thread_count {
            0 => AsyncChunkSolver::with_defaults(rules, heights),
            n => AsyncChunkSolver::new(rules, heights, n, 64, 128),
        }
    }

    /// Submits missing chunks around the world-space centre to `solver`,
    /// cancels pending chunks that left the retained radius and evicts
    /// distant merged chunks.
    ///
    /// Submitted chunks are merged later by [`TerrainStreamer::merge_completed`].
    pub fn request_terrain(
        &mut self,
        world_x: f64,
        world_z: f64,
        solver: &AsyncChunkSolver,
    ) -> RequestReport {
        let center = self.chunk_at_world(world_x, world_z);
        self.center = Some(center);

        let mut report = RequestReport::default();
        for chunk in self.chunks_in_range(center) {
            if self.store.is_present(chunk) {
                continue;
            }
            let task = self.task_for(chunk);
            if solver.submit(task).is_err() {
                trace!(x = chunk.x, z = chunk.z, "solver queue full; retrying next request");
                break;
            }
            self.store.mark_generating(chunk);
            report.submitted += 1;
        }

        let radius = self.config.retain_radius();
        for chunk in self.store.chunks_beyond(center, radius) {
            if self.store.cancel_generating(chunk) {
                solver.cancel(chunk);
                report.cancelled += 1;
            }
        }
        report.evicted = self.evict_beyond(center);
        report
    }

    /// Smooths and merges every chunk the async solver has finished.
    ///
    /// Results for chunks that were cancelled or evicted meanwhile are
    /// dropped. All successful results are merged even if one failed; the
    /// first failure is returned and its chunk reverts to unrequested.
    pub fn merge_completed(&mut self, solver: &AsyncChunkSolver) -> Result<usize, TerrainError> {
        let mut merged = 0;
        let mut first_error = None;

        for solved in solver.drain_results() {
            if self.store.chunk_state(solved.chunk) != Some(ChunkState::Generating) {
                trace!(x = solved.chunk.x, z = solved.chunk.z, "dropping stale chunk");
                continue;
            }
            self.stats.solver_invocations += 1;
            trace!(
                x = solved.chunk.x,
                z = solved.chunk.z,
                generation_time_us = solved.generation_time_us,
                "chunk solved off-thread"
            );
            match solved.outcome {
                Ok((tiles, stats)) => {
                    self.merge_solved(solved.chunk, tiles, stats);
                    merged += 1;
                }
                Err(source) => {
                    self.store.cancel_generating(solved.chunk);
                    if first_error.is_none() {
                        first_error = Some(TerrainError::Generation {
                            chunk: solved.chunk,
                            source,
                        });
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(merged),
        }
    }

    fn task_for(&self, chunk: ChunkCoord) -> ChunkTask {
        ChunkTask {
            chunk,
            seed: self.config.seed,
            tile_unit_size: self.config.tile_unit_size,
            max_backtracks: self.config.max_backtracks,
        }
    }

    fn generate_chunk(&mut self, chunk: ChunkCoord) -> Result<(), TerrainError> {
        let task = self.task_for(chunk);
        self.stats.solver_invocations += 1;
        let (tiles, stats) = solve_chunk(&self.rules, &self.heights, &task)
            .map_err(|source| TerrainError::Generation { chunk, source })?;
        self.merge_solved(chunk, tiles, stats);
        Ok(())
    }

    /// Moves chunk-local tiles to world coordinates, smooths them against
    /// merged neighbours and stores them.
    fn merge_solved(&mut self, chunk: ChunkCoord, local: TileMap, stats: SolveStats) {
        let origin = chunk.origin(self.config.tile_unit_size);
        let placed = local.translated(origin.x, origin.z);
        let smoothed = smoother::smooth_with_padding(&placed, &self.store);
        let count = self.store.merge_chunk(chunk, &smoothed);

        self.stats.chunks_generated += 1;
        self.stats.backtracks += u64::from(stats.backtracks);
        debug!(
            x = chunk.x,
            z = chunk.z,
            tiles = count,
            backtracks = stats.backtracks,
            "chunk generated"
        );
    }

    fn evict_beyond(&mut self, center: ChunkCoord) -> usize {
        let mut evicted = 0;
        for chunk in self.store.chunks_beyond(center, self.config.retain_radius()) {
            if self.store.chunk_state(chunk) != Some(ChunkState::Merged) {
                continue;
            }
            let tiles = self.store.evict_chunk(chunk);
            self.stats.chunks_evicted += 1;
            evicted += 1;
            debug!(x = chunk.x, z = chunk.z, tiles, "chunk evicted");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Direction;
    use crate::seed::fingerprint;
    use std::time::{Duration, Instant};

    fn config(tile_unit_size: u32, visible_range: u32) -> StreamingConfig {
        StreamingConfig {
            tile_unit_size,
            visible_range,
            seed: 1234,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_chunk_scenario() {
        let mut streamer = TerrainStreamer::new(config(8, 0)).unwrap();
        let report = streamer.update_terrain(0.0, 0.0).unwrap();
        assert_eq!(report.generated, 1);

        let store = streamer.store();
        assert_eq!(store.tile_count(), 64);
        for z in 0..8 {
            for x in 0..8 {
                assert!(store.get(TileCoord::new(x, z)).is_some(), "missing ({x}, {z})");
            }
        }
        assert!(store.get(TileCoord::new(8, 0)).is_none());
        assert!(store.get(TileCoord::new(-1, 0)).is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let zero = StreamingConfig {
            tile_unit_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            TerrainStreamer::new(zero),
            Err(TerrainError::Config(StreamingConfigError::ZeroChunkSize))
        ));

        let negative = StreamingConfig {
            square_size: -1.0,
            ..Default::default()
        };
        assert!(TerrainStreamer::new(negative).is_err());

        let nan = StreamingConfig {
            square_size: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());

        let huge_chunk = StreamingConfig {
            tile_unit_size: MAX_TILE_UNIT_SIZE + 1,
            ..Default::default()
        };
        assert_eq!(
            huge_chunk.validate(),
            Err(StreamingConfigError::ChunkTooLarge(MAX_TILE_UNIT_SIZE + 1))
        );
        let huge_range = StreamingConfig {
            visible_range: u32::MAX,
            ..Default::default()
        };
        assert_eq!(
            huge_range.validate(),
            Err(StreamingConfigError::RangeTooLarge(u32::MAX))
        );
    }

    #[test]
    fn test_range_covers_square_around_centre() {
        let mut streamer = TerrainStreamer::new(config(4, 2)).unwrap();
        let report = streamer.update_terrain(1.0, 1.0).unwrap();
        assert_eq!(report.generated, 25);
        assert_eq!(streamer.store().tile_count(), 25 * 16);
        assert_eq!(streamer.store().chunk_count(), 25);
    }

    #[test]
    fn test_chunks_in_range_nearest_first() {
        let streamer = TerrainStreamer::new(config(4, 2)).unwrap();
        let center = ChunkCoord::new(3, -1);
        let chunks = streamer.chunks_in_range(center);
        assert_eq!(chunks[0], center);
        for pair in chunks.windows(2) {
            assert!(pair[0].distance_sq(center) <= pair[1].distance_sq(center));
        }
    }

    #[test]
    fn test_no_duplicate_generation() {
        let mut streamer = TerrainStreamer::new(config(4, 1)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        let before = streamer.stats().solver_invocations;

        let report = streamer.update_terrain(0.0, 0.0).unwrap();
        assert_eq!(report, UpdateReport::default());
        assert_eq!(streamer.stats().solver_invocations, before);

        // Moving within the same chunk changes nothing either.
        streamer.update_terrain(3.9, 2.0).unwrap();
        assert_eq!(streamer.stats().solver_invocations, before);
    }

    #[test]
    fn test_evict_and_regenerate_cycle() {
        let mut streamer = TerrainStreamer::new(config(4, 1)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        assert!(streamer.store().get(TileCoord::new(0, 0)).is_some());
        let first = streamer.stats().solver_invocations;

        let report = streamer.update_terrain(400.0, 0.0).unwrap();
        assert_eq!(report.evicted, 9);
        assert!(streamer.store().get(TileCoord::new(0, 0)).is_none());
        assert_eq!(streamer.terrain_type(0.5, 0.5), TerrainCategory::Grass);
        assert_eq!(streamer.interpolated_height(0.5, 0.5), 0.0);

        streamer.update_terrain(0.0, 0.0).unwrap();
        assert!(streamer.store().get(TileCoord::new(0, 0)).is_some());
        assert_eq!(streamer.stats().solver_invocations, first + 18);
        assert_eq!(streamer.stats().chunks_evicted, 18);
    }

    #[test]
    fn test_eviction_margin_keeps_nearby_chunks() {
        let mut streamer = TerrainStreamer::new(config(4, 1)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        // One chunk east: the west column is now 2 away, within range + margin.
        let report = streamer.update_terrain(4.0, 0.0).unwrap();
        assert_eq!(report.generated, 3);
        assert_eq!(report.evicted, 0);
        // Two more chunks east: the original west column is 3 away.
        let report = streamer.update_terrain(12.0, 0.0).unwrap();
        assert_eq!(report.evicted, 6);
    }

    #[test]
    fn test_store_stays_bounded_while_walking() {
        let mut streamer = TerrainStreamer::new(config(4, 1)).unwrap();
        let bound = {
            let side = 2 * streamer.config().retain_radius() as usize + 1;
            side * side
        };
        for step in 0..40 {
            streamer.update_terrain(step as f64 * 3.0, step as f64 * -1.5).unwrap();
            assert!(streamer.store().chunk_count() <= bound);
            assert_eq!(streamer.store().tile_count(), streamer.store().chunk_count() * 16);
        }
    }

    #[test]
    fn test_negative_world_coordinates() {
        let mut streamer = TerrainStreamer::new(config(4, 0)).unwrap();
        streamer.update_terrain(-0.5, -0.5).unwrap();
        assert_eq!(streamer.center_chunk(), Some(ChunkCoord::new(-1, -1)));
        assert!(streamer.store().get(TileCoord::new(-1, -1)).is_some());
        assert!(streamer.store().get(TileCoord::new(-4, -4)).is_some());
        assert!(streamer.store().get(TileCoord::new(0, 0)).is_none());
    }

    #[test]
    fn test_far_coordinates_stay_queryable() {
        let mut streamer = TerrainStreamer::new(config(4, 1)).unwrap();
        assert_eq!(streamer.interpolated_height(3.0e9, 0.5), 0.0);
        assert_eq!(streamer.terrain_type(-3.0e9, 3.0e9), TerrainCategory::Grass);

        let report = streamer.update_terrain(3.0e10, 0.0).unwrap();
        assert_eq!(report.generated, 9);
        let edge = TileCoord::new(TileCoord::LIMIT, 0);
        assert!(streamer.store().get(edge).is_some());
        assert_eq!(
            Some(streamer.terrain_type(3.0e10, 0.0)),
            streamer.store().terrain_type(edge)
        );
        assert!(streamer.interpolated_height(3.0e10, 0.5).is_finite());

        let report = streamer.update_terrain(-3.0e10, -3.0e10).unwrap();
        assert_eq!(report.generated, 9);
        assert_eq!(report.evicted, 9);
        let corner = TileCoord::new(-TileCoord::LIMIT, -TileCoord::LIMIT);
        assert!(streamer.store().get(corner).is_some());
        assert_eq!(streamer.store().tile_count(), 9 * 16);
    }

    #[test]
    fn test_square_size_scales_world_mapping_and_height() {
        let mut streamer = TerrainStreamer::new(StreamingConfig {
            square_size: 2.0,
            ..config(4, 0)
        })
        .unwrap();
        // World x = 9 is tile 4, which is in chunk 1.
        streamer.update_terrain(9.0, 0.0).unwrap();
        assert_eq!(streamer.center_chunk(), Some(ChunkCoord::new(1, 0)));

        let tile = TileCoord::new(5, 2);
        let stored = streamer.store().get(tile).unwrap().height;
        let queried = streamer.interpolated_height(5.0, 2.0);
        assert!((queried - stored * 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_interpolation_exact_at_stored_tiles() {
        let mut streamer = TerrainStreamer::new(config(8, 1)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        for (tile, data) in streamer.store().tiles().iter() {
            let h = streamer.interpolated_height(tile.x as f64, tile.z as f64);
            assert!((h - data.height).abs() < 1e-6);
            assert_eq!(streamer.terrain_type(tile.x as f64 + 0.5, tile.z as f64 + 0.5), data.category);
        }
    }

    #[test]
    fn test_chunks_respect_adjacency_internally() {
        let mut streamer = TerrainStreamer::new(config(8, 1)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        let store = streamer.store();
        let rules = streamer.rules();
        for (tile, data) in store.tiles().iter() {
            for direction in [Direction::East, Direction::South] {
                let (dx, dz) = direction.offset();
                let next = tile.offset(dx, dz);
                if next.chunk(8) != tile.chunk(8) {
                    continue;
                }
                let other = store.get(next).unwrap();
                assert!(rules.permits(data.category, other.category, direction));
                assert!(rules.permits(other.category, data.category, direction.opposite()));
            }
        }
    }

    #[test]
    fn test_same_seed_same_world() {
        let mut a = TerrainStreamer::new(config(6, 1)).unwrap();
        let mut b = TerrainStreamer::new(config(6, 1)).unwrap();
        a.update_terrain(10.0, -3.0).unwrap();
        b.update_terrain(10.0, -3.0).unwrap();
        assert_eq!(fingerprint(a.store().tiles()), fingerprint(b.store().tiles()));
    }

    #[test]
    fn test_contradictory_rules_leave_store_untouched() {
        use crate::category::CategorySet;
        use crate::rules::ExclusionRule;

        let every: &[TerrainCategory] = &TerrainCategory::ALL;
        let entries: Vec<(TerrainCategory, &[TerrainCategory])> =
            every.iter().map(|&c| (c, every)).collect();
        let mut exclusions = Vec::new();
        for c in TerrainCategory::ALL {
            let east = TerrainCategory::from_index((c.index() + 1) % 8).unwrap();
            let south = TerrainCategory::from_index((c.index() * 3) % 8).unwrap();
            exclusions.push(ExclusionRule {
                category: c,
                forbidden: CategorySet::FULL.without(east),
                directions: vec![Direction::East],
            });
            exclusions.push(ExclusionRule {
                category: c,
                forbidden: CategorySet::FULL.without(south),
                directions: vec![Direction::South],
            });
        }
        let rules = AdjacencyRules::new(&entries, &exclusions).unwrap();
        let mut streamer =
            TerrainStreamer::with_rules(config(4, 0), rules, HeightGenerator::standard()).unwrap();

        let err = streamer.update_terrain(0.0, 0.0).unwrap_err();
        assert!(matches!(err, TerrainError::Generation { chunk, .. } if chunk == ChunkCoord::new(0, 0)));
        assert_eq!(streamer.store().tile_count(), 0);
        assert_eq!(streamer.store().chunk_count(), 0);
    }

    #[test]
    fn test_async_request_and_merge() {
        let mut streamer = TerrainStreamer::new(config(8, 1)).unwrap();
        let solver = streamer.spawn_async_solver(2);
        let report = streamer.request_terrain(0.0, 0.0, &solver);
        assert_eq!(report.submitted, 9);
        assert_eq!(streamer.store().tile_count(), 0);

        // A second request while chunks are pending submits nothing new.
        assert_eq!(streamer.request_terrain(0.0, 0.0, &solver).submitted, 0);

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut merged = 0;
        while merged < 9 && Instant::now() < deadline {
            merged += streamer.merge_completed(&solver).unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(merged, 9);
        assert_eq!(streamer.store().tile_count(), 9 * 64);
        assert!(
            streamer
                .store()
                .chunks()
                .all(|(_, state)| state == ChunkState::Merged)
        );
    }

    #[test]
    fn test_auto_sized_async_pool_merges() {
        let mut streamer = TerrainStreamer::new(config(4, 0)).unwrap();
        let solver = streamer.spawn_async_solver(0);
        assert_eq!(streamer.request_terrain(0.0, 0.0, &solver).submitted, 1);

        let deadline = Instant::now() + Duration::from_secs(30);
        let mut merged = 0;
        while merged < 1 && Instant::now() < deadline {
            merged += streamer.merge_completed(&solver).unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(merged, 1);
        assert_eq!(streamer.store().tile_count(), 16);
    }

    #[test]
    fn test_async_cancels_chunks_out_of_range() {
        let mut streamer = TerrainStreamer::new(config(8, 0)).unwrap();
        let solver = streamer.spawn_async_solver(1);
        streamer.request_terrain(0.0, 0.0, &solver);
        let report = streamer.request_terrain(1000.0, 0.0, &solver);
        assert_eq!(report.submitted, 1);
        assert_eq!(report.cancelled, 1);
        assert_eq!(streamer.store().chunk_state(ChunkCoord::new(0, 0)), None);

        // Whatever the worker finished for the cancelled chunk is dropped.
        let deadline = Instant::now() + Duration::from_secs(30);
        while solver.in_flight_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        streamer.merge_completed(&solver).unwrap();
        assert!(streamer.store().get(TileCoord::new(0, 0)).is_none());
    }
}
