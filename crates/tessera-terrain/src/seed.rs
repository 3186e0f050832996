//! Deterministic per-chunk randomness.
//!
//! Every chunk draws from its own RNG derived from the world seed and the
//! chunk coordinate, so a chunk's contents do not depend on the order chunks
//! are requested in or on which thread solves them.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::coords::ChunkCoord;
use crate::tile::TileMap;

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

/// Derive a u64 seed for a chunk from the world seed and chunk coordinate.
///
/// Uses SipHash (via std's `DefaultHasher`) to combine the two into a
/// well-distributed u64.
pub fn derive_chunk_seed(world_seed: u64, chunk: ChunkCoord) -> u64 {
    let mut hasher = DefaultHasher::new();
    world_seed.hash(&mut hasher);
    chunk.x.hash(&mut hasher);
    chunk.z.hash(&mut hasher);
    hasher.finish()
}

/// Derive a deterministic RNG for a specific chunk.
pub fn chunk_rng(world_seed: u64, chunk: ChunkCoord) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_chunk_seed(world_seed, chunk))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Hash the contents of a tile map for determinism comparison.
///
/// Tiles are visited in `(z, x)` order so the digest is independent of map
/// iteration order. Heights are hashed by bit pattern.
pub fn fingerprint(tiles: &TileMap) -> u64 {
    let mut hasher = DefaultHasher::new();
    for tile in tiles.sorted_coords() {
        if let Some(data) = tiles.get(tile) {
            tile.hash(&mut hasher);
            data.category.hash(&mut hasher);
            data.height.to_bits().hash(&mut hasher);
            data.tint.0.hash(&mut hasher);
        }
    }
    hasher.finish()
}
