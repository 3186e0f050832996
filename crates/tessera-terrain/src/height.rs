//! Per-category tile heights and the continuous heightfield query.
//!
//! Tile heights are sampled once, when a solver cell is materialised. Queries
//! between tiles reconstruct a continuous surface by bilinear interpolation
//! over whatever tiles are currently stored.

use rand::Rng;

use crate::category::{CATEGORY_COUNT, TerrainCategory, Tint};
use crate::coords::TileCoord;
use crate::tile::TerrainData;

/// Height range and tint for one category.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightProfile {
    /// Lowest height (inclusive), in tile units.
    pub min: f64,
    /// Highest height (exclusive). Equal to `min` for a constant height.
    pub max: f64,
    /// Colour the rendering boundary paints the tile with.
    pub tint: Tint,
}

impl HeightProfile {
    pub const fn new(min: f64, max: f64, tint: u32) -> Self {
        Self {
            min,
            max,
            tint: Tint(tint),
        }
    }

    /// A uniform sample in `[min, max)`, or `min` if the range is empty.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max > self.min {
            rng.random_range(self.min..self.max)
        } else {
            self.min
        }
    }
}

/// Turns solved categories into [`TerrainData`].
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGenerator {
    profiles: [HeightProfile; CATEGORY_COUNT],
}

impl HeightGenerator {
    /// Uses the given profile for each category (indexed by
    /// [`TerrainCategory::index`]).
    pub fn new(profiles: [HeightProfile; CATEGORY_COUNT]) -> Self {
        Self { profiles }
    }

    /// Board-game defaults: water below zero, grass as the raised plateau.
    pub fn standard() -> Self {
        let mut profiles = [HeightProfile::new(0.0, 0.0, 0); CATEGORY_COUNT];
        for category in TerrainCategory::ALL {
            profiles[category.index()] = match category {
                TerrainCategory::Dirt => HeightProfile::new(0.0, 0.5, 0x8B4513),
                TerrainCategory::Grass => HeightProfile::new(1.5, 2.0, 0x808080),
                TerrainCategory::Tree => HeightProfile::new(0.5, 1.0, 0x228B22),
                TerrainCategory::Building => HeightProfile::new(1.0, 1.5, 0xA0522D),
                TerrainCategory::Wall => HeightProfile::new(0.8, 1.0, 0x808080),
                TerrainCategory::Path => HeightProfile::new(0.1, 0.1, 0xD2B48C),
                TerrainCategory::Bridge => HeightProfile::new(0.3, 0.5, 0x8B4513),
                TerrainCategory::Water => HeightProfile::new(-0.5, -0.3, 0x4169E1),
            };
        }
        Self { profiles }
    }

    pub fn profile(&self, category: TerrainCategory) -> &HeightProfile {
        &self.profiles[category.index()]
    }

    /// Samples a height for `category` and attaches its tint.
    pub fn create<R: Rng + ?Sized>(&self, category: TerrainCategory, rng: &mut R) -> TerrainData {
        let profile = self.profile(category);
        TerrainData {
            category,
            height: profile.sample(rng),
            tint: profile.tint,
        }
    }
}

impl Default for HeightGenerator {
    fn default() -> Self {
        Self::standard()
    }
}

/// Anything that can report the stored height of a tile.
pub trait HeightSource {
    /// Height of the tile at `tile`, or `None` if no tile is stored there.
    fn height_at(&self, tile: TileCoord) -> Option<f64>;
}

/// Source with no tiles. Used where a region is smoothed without padding.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTiles;

impl HeightSource for NoTiles {
    fn height_at(&self, _tile: TileCoord) -> Option<f64> {
        None
    }
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Bilinearly interpolated height at tile-space `(x, z)`, scaled by
/// `tile_scale`.
///
/// Corners with no stored tile count as height `0`.
pub fn interpolated_height<S: HeightSource + ?Sized>(
    source: &S,
    x: f64,
    z: f64,
    tile_scale: f64,
) -> f64 {
    let corner = TileCoord::containing(x, z);

    let h = |dx: i32, dz: i32| source.height_at(corner.offset(dx, dz)).unwrap_or(0.0);
    let h00 = h(0, 0);
    let h10 = h(1, 0);
    let h01 = h(0, 1);
    let h11 = h(1, 1);

    let fx = x - x.floor();
    let fz = z - z.floor();

    let h0 = lerp(h00, h10, fx);
    let h1 = lerp(h01, h11, fx);
    lerp(h0, h1, fz) * tile_scale
}
