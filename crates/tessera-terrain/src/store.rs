//! The global tile store: every merged tile, plus the lifecycle state of the
//! chunks that own them.
//!
//! A chunk is either wholly present or wholly absent. Tiles enter only through
//! [`TileStore::merge_chunk`] and leave only through [`TileStore::evict_chunk`].

use rustc_hash::FxHashMap;

use crate::category::TerrainCategory;
use crate::coords::{ChunkCoord, TileCoord};
use crate::height::HeightSource;
use crate::tile::{TerrainData, TileMap};

/// Lifecycle of a chunk known to the store. Chunks with no entry are
/// unrequested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Submitted for generation; no tiles stored yet.
    Generating,
    /// Solved, smoothed and merged.
    Merged,
}

/// Sparse tile storage keyed by world tile coordinate.
#[derive(Clone, Debug)]
pub struct TileStore {
    tile_unit_size: u32,
    tiles: TileMap,
    chunks: FxHashMap<ChunkCoord, ChunkState>,
}

impl TileStore {
    pub fn new(tile_unit_size: u32) -> Self {
        Self {
            tile_unit_size,
            tiles: TileMap::new(),
            chunks: FxHashMap::default(),
        }
    }

    pub fn tile_unit_size(&self) -> u32 {
        self.tile_unit_size
    }

    #[inline]
    pub fn get(&self, tile: TileCoord) -> Option<&TerrainData> {
        self.tiles.get(tile)
    }

    pub fn terrain_type(&self, tile: TileCoord) -> Option<TerrainCategory> {
        self.tiles.get(tile).map(|d| d.category)
    }

    /// All stored tiles.
    pub fn tiles(&self) -> &TileMap {
        &self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn chunk_state(&self, chunk: ChunkCoord) -> Option<ChunkState> {
        self.chunks.get(&chunk).copied()
    }

    /// Whether the chunk is generating or merged.
    pub fn is_present(&self, chunk: ChunkCoord) -> bool {
        self.chunks.contains_key(&chunk)
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Every known chunk and its state, in arbitrary order.
    pub fn chunks(&self) -> impl Iterator<Item = (ChunkCoord, ChunkState)> + '_ {
        self.chunks.iter().map(|(&c, &s)| (c, s))
    }

    /// Records that `chunk` has been handed to a generator. Returns `false` if
    /// the chunk was already present.
    pub fn mark_generating(&mut self, chunk: ChunkCoord) -> bool {
        if self.chunks.contains_key(&chunk) {
            return false;
        }
        self.chunks.insert(chunk, ChunkState::Generating);
        true
    }

    /// Forgets a chunk that is still generating. Merged chunks are left alone.
    pub fn cancel_generating(&mut self, chunk: ChunkCoord) -> bool {
        if self.chunks.get(&chunk) == Some(&ChunkState::Generating) {
            self.chunks.remove(&chunk);
            true
        } else {
            false
        }
    }

    /// Stores the tiles of `chunk`, keyed by world coordinate, and marks the
    /// chunk merged. Tiles that do not belong to `chunk` are ignored.
    ///
    /// Returns the number of tiles stored.
    pub fn merge_chunk(&mut self, chunk: ChunkCoord, tiles: &TileMap) -> usize {
        let mut merged = 0;
        for (tile, data) in tiles.iter() {
            if tile.chunk(self.tile_unit_size) != chunk {
                debug_assert!(false, "tile {tile:?} is outside chunk {chunk:?}");
                continue;
            }
            self.tiles.insert(tile, *data);
            merged += 1;
        }
        self.chunks.insert(chunk, ChunkState::Merged);
        merged
    }

    /// Removes a chunk and all of its tiles. Returns the number of tiles
    /// removed.
    pub fn evict_chunk(&mut self, chunk: ChunkCoord) -> usize {
        if self.chunks.remove(&chunk).is_none() {
            return 0;
        }
        chunk
            .tiles(self.tile_unit_size)
            .filter(|&t| self.tiles.remove(t).is_some())
            .count()
    }

    /// Chunks whose Chebyshev distance from `center` exceeds `radius`.
    pub fn chunks_beyond(&self, center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
        let mut far: Vec<_> = self
            .chunks
            .keys()
            .copied()
            .filter(|c| c.chebyshev_distance(center) > radius)
            .collect();
        far.sort();
        far
    }
}

impl HeightSource for TileStore {
    fn height_at(&self, tile: TileCoord) -> Option<f64> {
        self.tiles.height_at(tile)
    }
}
