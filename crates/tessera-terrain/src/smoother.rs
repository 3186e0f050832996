//! Local height averaging applied to freshly solved tiles.
//!
//! Each tile's height becomes the mean of its own height and the heights of
//! its present 8-connected neighbours. Missing neighbours are left out of
//! the mean rather than counted as zero. Category and tint never change.

use crate::coords::TileCoord;
use crate::height::{HeightSource, NoTiles};
use crate::tile::TileMap;

const NEIGHBORHOOD: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Smooths a self-contained region. Neighbours outside `tiles` are absent.
pub fn smooth(tiles: &TileMap) -> TileMap {
    smooth_with_padding(tiles, &NoTiles)
}

/// Smooths the tiles in `region`, reading neighbours that fall outside it
/// from `padding`.
///
/// Heights are read from the unsmoothed input, so the result does not depend
/// on visit order. The output holds exactly the coordinates of `region`;
/// padding tiles only contribute to the averages of cells next to them.
pub fn smooth_with_padding<P: HeightSource + ?Sized>(region: &TileMap, padding: &P) -> TileMap {
    let mut out = TileMap::with_capacity(region.len());
    for (tile, data) in region.iter() {
        let mut sum = data.height;
        let mut count = 1u32;
        for &(dx, dz) in &NEIGHBORHOOD {
            if let Some(h) = neighbor_height(region, padding, tile.offset(dx, dz)) {
                sum += h;
                count += 1;
            }
        }
        let mut smoothed = *data;
        smoothed.height = sum / count as f64;
        out.insert(tile, smoothed);
    }
    out
}

#[inline]
fn neighbor_height<P: HeightSource + ?Sized>(
    region: &TileMap,
    padding: &P,
    tile: TileCoord,
) -> Option<f64> {
    region
        .height_at(tile)
        .or_else(|| padding.height_at(tile))
}
