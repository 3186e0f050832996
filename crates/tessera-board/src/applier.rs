//! Pushes streamed terrain onto the board.
//!
//! The applier is the only reader of generated terrain outside the terrain
//! crate. It tolerates absent tiles (not generated yet, or still in flight
//! on the async solver) by skipping their squares.

use tessera_terrain::{ChunkCoord, TerrainData, TerrainStreamer, TileCoord};
use tracing::{debug, warn};

use crate::board::{Board, BoardSquare, Prop, PropKind};

/// What one `apply_to_board` call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Squares created for newly loaded tiles.
    pub created: usize,
    /// Squares whose geometry, tint and prop were refreshed (including new ones).
    pub updated: usize,
    /// Tiles in range with no stored terrain.
    pub skipped: usize,
    /// Squares dropped because their tile left the retained radius or was
    /// evicted.
    pub removed: usize,
}

/// Updates board squares from a [`TerrainStreamer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TerrainApplier;

impl TerrainApplier {
    pub fn new() -> Self {
        Self
    }

    /// Refreshes every square within the streamer's visible range of the
    /// world-space centre and drops squares that are out of range.
    ///
    /// A board built for a different square size is switched to the
    /// streamer's and rebuilt.
    pub fn apply_to_board(
        &self,
        streamer: &TerrainStreamer,
        board: &mut Board,
        center_x: f64,
        center_z: f64,
    ) -> ApplyReport {
        let config = streamer.config();
        let size = config.tile_unit_size;
        let center = streamer.chunk_at_world(center_x, center_z);
        let mut report = ApplyReport::default();

        let square_size = config.square_size as f32;
        let previous = board.square_size();
        if board.set_square_size(square_size) {
            warn!(previous, square_size, "board square size does not match terrain; rebuilding");
        }

        for chunk in streamer.chunks_in_range(center) {
            for tile in chunk.tiles(size) {
                let Some(data) = streamer.store().get(tile) else {
                    report.skipped += 1;
                    continue;
                };
                let (square, created) = board.get_or_create(tile);
                if created {
                    report.created += 1;
                }
                apply_terrain_to_square(streamer, square, data);
                report.updated += 1;
            }
        }

        let radius = config.retain_radius();
        report.removed = board.remove_where(|square| {
            out_of_range(square.tile.chunk(size), center, radius)
                || streamer.store().get(square.tile).is_none()
        });

        debug!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            removed = report.removed,
            squares = board.len(),
            "board applied"
        );
        report
    }
}

fn out_of_range(chunk: ChunkCoord, center: ChunkCoord, radius: u32) -> bool {
    chunk.chebyshev_distance(center) > radius
}

/// Displaces the square's vertices to the interpolated heightfield, tints it
/// and places its prop.
fn apply_terrain_to_square(streamer: &TerrainStreamer, square: &mut BoardSquare, data: &TerrainData) {
    let square_size = streamer.config().square_size;
    let TileCoord { x: tile_x, z: tile_z } = square.tile;

    for vertex in &mut square.vertices {
        let local_x = vertex.x as f64 / square_size;
        let local_z = vertex.z as f64 / square_size;
        vertex.y = streamer.interpolated_height(tile_x as f64 + local_x, tile_z as f64 + local_z) as f32;
    }

    square.category = data.category;
    square.tint = data.tint.to_rgb_f32();
    square.prop = PropKind::for_category(data.category).map(|kind| {
        let mut position = square.position;
        position.y = (data.height * square_size) as f32 + kind.lift();
        Prop { kind, position }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tessera_terrain::{
        AdjacencyRules, CATEGORY_COUNT, HeightGenerator, HeightProfile, StreamingConfig,
        TerrainCategory,
    };

    fn config(visible_range: u32, square_size: f64) -> StreamingConfig {
        StreamingConfig {
            tile_unit_size: 4,
            visible_range,
            square_size,
            seed: 77,
            ..Default::default()
        }
    }

    fn flat_streamer(height: f64) -> TerrainStreamer {
        let heights = HeightGenerator::new([HeightProfile::new(height, height, 0x336699); CATEGORY_COUNT]);
        TerrainStreamer::with_rules(config(1, 1.0), AdjacencyRules::standard(), heights).unwrap()
    }

    #[test]
    fn test_squares_created_for_loaded_tiles() {
        let mut streamer = TerrainStreamer::new(config(1, 1.0)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        let mut board = Board::new(1.0, 2);

        let report = TerrainApplier::new().apply_to_board(&streamer, &mut board, 0.0, 0.0);
        assert_eq!(report.created, 9 * 16);
        assert_eq!(report.skipped, 0);
        assert_eq!(board.len(), streamer.store().tile_count());

        let again = TerrainApplier::new().apply_to_board(&streamer, &mut board, 0.0, 0.0);
        assert_eq!(again.created, 0);
        assert_eq!(again.updated, 9 * 16);
    }

    #[test]
    fn test_square_takes_tile_tint_category_and_heights() {
        let mut streamer = TerrainStreamer::new(config(1, 2.0)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        let mut board = Board::new(2.0, 2);
        TerrainApplier::new().apply_to_board(&streamer, &mut board, 0.0, 0.0);

        for square in board.iter() {
            let data = streamer.store().get(square.tile).unwrap();
            assert_eq!(square.category, data.category);
            assert_eq!(square.tint, data.tint.to_rgb_f32());

            // Centre vertex sits on the tile's own grid point.
            let centre = square.vertices[4];
            assert_eq!((centre.x, centre.z), (0.0, 0.0));
            assert!((centre.y as f64 - data.height * 2.0).abs() < 1e-4);

            // Corner vertices sample the heightfield half a tile away.
            let corner = square.vertices[0];
            let expected = streamer.interpolated_height(
                square.tile.x as f64 - 0.5,
                square.tile.z as f64 - 0.5,
            );
            assert!((corner.y as f64 - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_props_follow_category() {
        let mut streamer = TerrainStreamer::new(config(2, 1.0)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        let mut board = Board::new(1.0, 1);
        TerrainApplier::new().apply_to_board(&streamer, &mut board, 0.0, 0.0);

        for square in board.iter() {
            let data = streamer.store().get(square.tile).unwrap();
            match (data.category, square.prop) {
                (TerrainCategory::Tree, Some(prop)) => {
                    assert_eq!(prop.kind, PropKind::Tree);
                    assert!((prop.position.y - (data.height as f32 + 0.25)).abs() < 1e-5);
                }
                (TerrainCategory::Building, Some(prop)) => {
                    assert_eq!(prop.kind, PropKind::Building);
                    assert!((prop.position.y - (data.height as f32 + 0.5)).abs() < 1e-5);
                }
                (_, prop) => assert!(prop.is_none()),
            }
        }
    }

    #[test]
    fn test_interior_of_flat_world_is_level() {
        let mut streamer = flat_streamer(1.0);
        streamer.update_terrain(0.0, 0.0).unwrap();
        let mut board = Board::new(1.0, 2);
        TerrainApplier::new().apply_to_board(&streamer, &mut board, 0.0, 0.0);

        let square = board.get(TileCoord::new(0, 0)).unwrap();
        for vertex in &square.vertices {
            assert!((vertex.y - 1.0).abs() < 1e-5);
        }
        for normal in square.vertex_normals() {
            assert!((normal - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn test_absent_tiles_are_skipped() {
        let streamer = TerrainStreamer::new(config(1, 1.0)).unwrap();
        let mut board = Board::new(1.0, 1);
        let report = TerrainApplier::new().apply_to_board(&streamer, &mut board, 0.0, 0.0);
        assert_eq!(report.skipped, 9 * 16);
        assert_eq!(report.created, 0);
        assert!(board.is_empty());
    }

    #[test]
    fn test_board_adopts_streamer_square_size() {
        let mut streamer = TerrainStreamer::new(config(1, 2.0)).unwrap();
        streamer.update_terrain(0.0, 0.0).unwrap();
        let applier = TerrainApplier::new();

        let mut matched = Board::for_streamer(&streamer, 2);
        assert_eq!(matched.square_size(), 2.0);
        applier.apply_to_board(&streamer, &mut matched, 0.0, 0.0);

        // A stale square from the wrong scale must not survive the switch.
        let mut mismatched = Board::new(1.0, 2);
        mismatched.get_or_create(TileCoord::new(0, 0));
        let report = applier.apply_to_board(&streamer, &mut mismatched, 0.0, 0.0);
        assert_eq!(mismatched.square_size(), 2.0);
        assert_eq!(report.created, 9 * 16);
        assert_eq!(mismatched.len(), matched.len());

        for square in mismatched.iter() {
            let reference = matched.get(square.tile).unwrap();
            assert_eq!(square.position, reference.position);
            assert_eq!(square.vertices, reference.vertices);
            assert_eq!(square.vertices[0].x, -1.0);
        }
    }

    #[test]
    fn test_distant_squares_removed() {
        let mut streamer = TerrainStreamer::new(config(1, 1.0)).unwrap();
        let applier = TerrainApplier::new();
        let mut board = Board::new(1.0, 1);

        streamer.update_terrain(0.0, 0.0).unwrap();
        applier.apply_to_board(&streamer, &mut board, 0.0, 0.0);
        assert!(board.get(TileCoord::new(0, 0)).is_some());

        streamer.update_terrain(200.0, 0.0).unwrap();
        let report = applier.apply_to_board(&streamer, &mut board, 200.0, 0.0);
        assert_eq!(report.removed, 9 * 16);
        assert!(board.get(TileCoord::new(0, 0)).is_none());
        assert_eq!(board.len(), streamer.store().tile_count());
    }
}
