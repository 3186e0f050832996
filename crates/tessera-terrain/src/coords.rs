//! Integer tile and chunk coordinates on the board plane.

/// A tile position in world tile units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
}

impl TileCoord {
    /// Largest tile coordinate magnitude produced from continuous positions.
    ///
    /// Positions further out are clamped onto this bound, leaving enough
    /// headroom that neighbour offsets, chunk origins and visible-range
    /// chunk arithmetic stay inside `i32`.
    pub const LIMIT: i32 = 1 << 29;

    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The tile containing the continuous tile-space point `(x, z)`, clamped
    /// to `±LIMIT`. NaN maps to `0`.
    pub fn containing(x: f64, z: f64) -> Self {
        Self::new(clamp_tile(x), clamp_tile(z))
    }

    /// The tile under a world-space point, given the world size of one tile.
    pub fn from_world(world_x: f64, world_z: f64, square_size: f64) -> Self {
        Self::containing(world_x / square_size, world_z / square_size)
    }

    /// Packs both coordinates into one `u64` map key.
    ///
    /// `x` occupies the high 32 bits and `z` the low 32 bits, each stored
    /// as its two's-complement bit pattern.
    #[inline]
    pub const fn packed(self) -> u64 {
        ((self.x as u32 as u64) << 32) | (self.z as u32 as u64)
    }

    /// Inverse of [`TileCoord::packed`].
    #[inline]
    pub const fn from_packed(key: u64) -> Self {
        Self::new((key >> 32) as u32 as i32, key as u32 as i32)
    }

    #[inline]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz)
    }

    /// The chunk that owns this tile.
    pub const fn chunk(self, tile_unit_size: u32) -> ChunkCoord {
        let size = tile_unit_size as i32;
        ChunkCoord::new(self.x.div_euclid(size), self.z.div_euclid(size))
    }

    /// `max(|dx|, |dz|)` to another tile.
    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        if dx > dz { dx } else { dz }
    }
}

fn clamp_tile(v: f64) -> i32 {
    let limit = TileCoord::LIMIT as f64;
    v.floor().clamp(-limit, limit) as i32
}

/// Identifies a square block of `tile_unit_size × tile_unit_size` tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// World tile coordinate of this chunk's local `(0, 0)` tile.
    pub const fn origin(self, tile_unit_size: u32) -> TileCoord {
        let size = tile_unit_size as i32;
        TileCoord::new(self.x * size, self.z * size)
    }

    /// Iterates every tile of the chunk, row by row.
    pub fn tiles(self, tile_unit_size: u32) -> impl Iterator<Item = TileCoord> {
        let origin = self.origin(tile_unit_size);
        let size = tile_unit_size as i32;
        (0..size).flat_map(move |dz| (0..size).map(move |dx| origin.offset(dx, dz)))
    }

    pub const fn chebyshev_distance(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        if dx > dz { dx } else { dz }
    }

    /// Squared Euclidean distance, used to order generation nearest-first.
    pub const fn distance_sq(self, other: Self) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dz = self.z.abs_diff(other.z) as u64;
        dx * dx + dz * dz
    }
}

/// One of the four orthogonal neighbour directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `-z`
    North,
    /// `+x`
    East,
    /// `+z`
    South,
    /// `-x`
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// `(dx, dz)` step to the neighbour in this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
