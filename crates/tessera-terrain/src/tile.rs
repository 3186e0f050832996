//! Per-tile terrain records and a sparse map of them keyed by packed
//! tile coordinate.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::category::{TerrainCategory, Tint};
use crate::coords::TileCoord;
use crate::height::HeightSource;

/// Everything generated for one tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainData {
    pub category: TerrainCategory,
    /// Height in tile units; multiplied by the square size at query time.
    pub height: f64,
    pub tint: Tint,
}

/// A sparse set of tiles, keyed by [`TileCoord::packed`].
#[derive(Clone, Debug, Default)]
pub struct TileMap {
    tiles: HashMap<u64, TerrainData, FxBuildHasher>,
}

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tiles: HashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    #[inline]
    pub fn get(&self, tile: TileCoord) -> Option<&TerrainData> {
        self.tiles.get(&tile.packed())
    }

    #[inline]
    pub fn get_mut(&mut self, tile: TileCoord) -> Option<&mut TerrainData> {
        self.tiles.get_mut(&tile.packed())
    }

    #[inline]
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.tiles.contains_key(&tile.packed())
    }

    /// Inserts a tile, returning the previous record at that coordinate.
    pub fn insert(&mut self, tile: TileCoord, data: TerrainData) -> Option<TerrainData> {
        self.tiles.insert(tile.packed(), data)
    }

    pub fn remove(&mut self, tile: TileCoord) -> Option<TerrainData> {
        self.tiles.remove(&tile.packed())
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterates `(coordinate, record)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, &TerrainData)> {
        self.tiles
            .iter()
            .map(|(&key, data)| (TileCoord::from_packed(key), data))
    }

    /// Coordinates sorted by `(z, x)`, for stable output.
    pub fn sorted_coords(&self) -> Vec<TileCoord> {
        let mut coords: Vec<_> = self.tiles.keys().map(|&k| TileCoord::from_packed(k)).collect();
        coords.sort_by_key(|t| (t.z, t.x));
        coords
    }

    /// Returns a copy with every coordinate shifted by `(dx, dz)`.
    pub fn translated(&self, dx: i32, dz: i32) -> Self {
        let mut out = Self::with_capacity(self.len());
        for (tile, data) in self.iter() {
            out.insert(tile.offset(dx, dz), *data);
        }
        out
    }
}

impl HeightSource for TileMap {
    fn height_at(&self, tile: TileCoord) -> Option<f64> {
        self.get(tile).map(|d| d.height)
    }
}

impl FromIterator<(TileCoord, TerrainData)> for TileMap {
    fn from_iter<I: IntoIterator<Item = (TileCoord, TerrainData)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (tile, data) in iter {
            map.insert(tile, data);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(category: TerrainCategory, height: f64) -> TerrainData {
        TerrainData {
            category,
            height,
            tint: Tint(0),
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let mut map = TileMap::new();
        let tile = TileCoord::new(-3, 9);
        assert!(map.insert(tile, data(TerrainCategory::Path, 0.1)).is_none());
        assert_eq!(map.get(tile).map(|d| d.category), Some(TerrainCategory::Path));
        assert_eq!(map.height_at(tile), Some(0.1));
        assert!(map.remove(tile).is_some());
        assert!(map.is_empty());
    }

    #[test]
    fn test_translated_shifts_every_tile() {
        let map: TileMap = [
            (TileCoord::new(0, 0), data(TerrainCategory::Dirt, 0.0)),
            (TileCoord::new(1, 2), data(TerrainCategory::Water, -0.4)),
        ]
        .into_iter()
        .collect();

        let moved = map.translated(8, -8);
        assert_eq!(moved.len(), 2);
        assert_eq!(
            moved.get(TileCoord::new(9, -6)).map(|d| d.category),
            Some(TerrainCategory::Water)
        );
        assert!(!moved.contains(TileCoord::new(1, 2)));
    }

    #[test]
    fn test_sorted_coords_row_major() {
        let map: TileMap = [(2, 1), (0, 0), (1, 0), (0, 1)]
            .into_iter()
            .map(|(x, z)| (TileCoord::new(x, z), data(TerrainCategory::Grass, 1.5)))
            .collect();
        assert_eq!(
            map.sorted_coords(),
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(1, 0),
                TileCoord::new(0, 1),
                TileCoord::new(2, 1),
            ]
        );
    }
}
