//! Render-side board: one square per loaded tile, with a displaced vertex
//! grid, a tint and an optional prop model.

use glam::Vec3;
use rustc_hash::FxHashMap;
use tessera_terrain::{TerrainCategory, TerrainStreamer, TileCoord};

/// Decorative model placed on top of a square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropKind {
    Tree,
    Building,
}

impl PropKind {
    /// Model for tiles of `category`, if it has one.
    pub fn for_category(category: TerrainCategory) -> Option<Self> {
        match category {
            TerrainCategory::Tree => Some(PropKind::Tree),
            TerrainCategory::Building => Some(PropKind::Building),
            _ => None,
        }
    }

    /// Height of the model's origin above the tile surface.
    pub fn lift(self) -> f32 {
        match self {
            PropKind::Tree => 0.25,
            PropKind::Building => 0.5,
        }
    }
}

/// A placed prop model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prop {
    pub kind: PropKind,
    /// World-space position of the model origin.
    pub position: Vec3,
}

/// One board square.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardSquare {
    pub tile: TileCoord,
    /// World-space centre of the square at height zero.
    pub position: Vec3,
    /// `(segments + 1)²` vertices relative to `position`, row by row along
    /// `+x` then `+z`. `y` holds the displaced surface height.
    pub vertices: Vec<Vec3>,
    pub category: TerrainCategory,
    /// Linear RGB in `[0, 1]`.
    pub tint: [f32; 3],
    pub prop: Option<Prop>,
}

impl BoardSquare {
    /// A flat square centred on `tile`.
    pub fn new(tile: TileCoord, square_size: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let step = square_size / segments as f32;
        let half = square_size * 0.5;
        let mut vertices = Vec::with_capacity(((segments + 1) * (segments + 1)) as usize);
        for j in 0..=segments {
            for i in 0..=segments {
                vertices.push(Vec3::new(-half + i as f32 * step, 0.0, -half + j as f32 * step));
            }
        }
        Self {
            tile,
            position: Vec3::new(tile.x as f32 * square_size, 0.0, tile.z as f32 * square_size),
            vertices,
            category: TerrainCategory::Grass,
            tint: [1.0, 1.0, 1.0],
            prop: None,
        }
    }

    /// Vertices per row.
    pub fn row_len(&self) -> usize {
        (self.vertices.len() as f64).sqrt().round() as usize
    }

    /// Per-vertex normals from central differences over the vertex grid.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let n = self.row_len();
        let at = |i: usize, j: usize| self.vertices[j * n + i];
        let mut normals = Vec::with_capacity(self.vertices.len());
        for j in 0..n {
            for i in 0..n {
                let along_x = at((i + 1).min(n - 1), j) - at(i.saturating_sub(1), j);
                let along_z = at(i, (j + 1).min(n - 1)) - at(i, j.saturating_sub(1));
                let normal = along_z.cross(along_x).normalize_or_zero();
                normals.push(if normal == Vec3::ZERO { Vec3::Y } else { normal });
            }
        }
        normals
    }
}

/// All squares currently on the board, keyed by tile.
#[derive(Clone, Debug)]
pub struct Board {
    square_size: f32,
    segments: u32,
    squares: FxHashMap<TileCoord, BoardSquare>,
}

impl Board {
    pub fn new(square_size: f32, segments: u32) -> Self {
        Self {
            square_size,
            segments: segments.max(1),
            squares: FxHashMap::default(),
        }
    }

    /// A board whose squares match the streamer's tile size.
    pub fn for_streamer(streamer: &TerrainStreamer, segments: u32) -> Self {
        Self::new(streamer.config().square_size as f32, segments)
    }

    pub fn square_size(&self) -> f32 {
        self.square_size
    }

    /// Switches to a new square size. Existing squares were built for the old
    /// size and are dropped. Returns `true` if the size changed.
    pub fn set_square_size(&mut self, square_size: f32) -> bool {
        if self.square_size == square_size {
            return false;
        }
        self.square_size = square_size;
        self.squares.clear();
        true
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn get(&self, tile: TileCoord) -> Option<&BoardSquare> {
        self.squares.get(&tile)
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoardSquare> {
        self.squares.values()
    }

    /// The square for `tile`, creating a flat one if needed. The flag is
    /// `true` when the square was created.
    pub fn get_or_create(&mut self, tile: TileCoord) -> (&mut BoardSquare, bool) {
        let size = self.square_size;
        let segments = self.segments;
        let mut created = false;
        let square = self.squares.entry(tile).or_insert_with(|| {
            created = true;
            BoardSquare::new(tile, size, segments)
        });
        (square, created)
    }

    /// Removes every square for which `drop` returns `true`. Returns the
    /// number removed.
    pub fn remove_where(&mut self, mut drop: impl FnMut(&BoardSquare) -> bool) -> usize {
        let before = self.squares.len();
        self.squares.retain(|_, square| !drop(square));
        before - self.squares.len()
    }
}
