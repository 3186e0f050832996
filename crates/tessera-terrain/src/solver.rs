//! Wave-function-collapse solver that assigns one [`TerrainCategory`] to
//! every cell of a rectangular grid.
//!
//! Each step collapses the uncollapsed cell with the fewest remaining
//! options (ties broken uniformly at random) to a uniformly chosen option,
//! then narrows neighbouring cells breadth-first through the
//! [`AdjacencyRules`]. Option sets only ever shrink, so the loop performs at
//! most one collapse per cell plus bounded propagation work.
//!
//! If propagation would leave a cell with no options, the solver undoes the
//! most recent collapse, bans the category it picked, and carries on. Every
//! narrowing is recorded on a trail so undo is exact. Recovery is bounded by
//! [`WaveCollapseSolver::max_backtracks`]. When nothing is left to undo the
//! rule table cannot tile the grid and solving fails with a
//! [`SolveError`].

use std::collections::VecDeque;
use std::fmt;

use rand::Rng;

use crate::category::{CategorySet, TerrainCategory};
use crate::coords::{Direction, TileCoord};
use crate::height::HeightGenerator;
use crate::rules::AdjacencyRules;
use crate::tile::TileMap;

/// Default bound on undo steps per solve.
pub const DEFAULT_MAX_BACKTRACKS: u32 = 256;

/// Where and why propagation ran out of options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contradiction {
    /// Cell whose options were being propagated, as `(x, z)`.
    pub cell: (usize, usize),
    /// Remaining options of that cell.
    pub source: CategorySet,
    /// Direction from `cell` to the cell that would have been emptied.
    pub direction: Direction,
    /// Options the emptied neighbour had before narrowing.
    pub neighbor_options: CategorySet,
}

impl Contradiction {
    /// Grid position of the cell that would have been emptied.
    pub fn neighbor(&self) -> (usize, usize) {
        let (dx, dz) = self.direction.offset();
        (
            (self.cell.0 as i64 + dx as i64) as usize,
            (self.cell.1 as i64 + dz as i64) as usize,
        )
    }
}

impl fmt::Display for Contradiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nx, nz) = self.neighbor();
        write!(
            f,
            "cell ({}, {}) holding {} permits none of {} at ({nx}, {nz}) to its {}",
            self.cell.0, self.cell.1, self.source, self.neighbor_options, self.direction
        )
    }
}

/// Fatal solver failures. Both indicate a rule table that cannot tile the
/// requested grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    /// Propagation emptied a cell and there was no collapse left to undo.
    #[error("contradictory adjacency rules: {0}")]
    Contradiction(Contradiction),

    /// Recovery gave up after `limit` undo steps.
    #[error("gave up after {limit} backtracks; last contradiction: {last}")]
    BacktrackLimitExceeded { limit: u32, last: Contradiction },
}

impl SolveError {
    /// The contradiction that ended the solve.
    pub fn contradiction(&self) -> &Contradiction {
        match self {
            SolveError::Contradiction(c) => c,
            SolveError::BacktrackLimitExceeded { last, .. } => last,
        }
    }
}

/// Counters gathered during one solve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolveStats {
    /// Collapse decisions made, including ones later undone.
    pub collapses: usize,
    /// Undo steps taken to recover from contradictions.
    pub backtracks: u32,
    /// Smallest option-set size ever written to a cell.
    pub min_options: usize,
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    collapsed: bool,
    options: CategorySet,
}

/// Previous state of a cell, restored on undo.
#[derive(Clone, Copy, Debug)]
struct TrailEntry {
    index: usize,
    previous: Cell,
}

#[derive(Clone, Copy, Debug)]
struct Decision {
    index: usize,
    choice: TerrainCategory,
    trail_len: usize,
}

/// Working state of one solve.
struct Wave {
    width: usize,
    depth: usize,
    cells: Vec<Cell>,
    trail: Vec<TrailEntry>,
    decisions: Vec<Decision>,
    candidates: Vec<usize>,
    stats: SolveStats,
}

impl Wave {
    fn new(width: usize, depth: usize) -> Self {
        let initial = Cell {
            collapsed: false,
            options: CategorySet::FULL,
        };
        Self {
            width,
            depth,
            cells: vec![initial; width * depth],
            trail: Vec::new(),
            decisions: Vec::new(),
            candidates: Vec::new(),
            stats: SolveStats {
                min_options: CategorySet::FULL.len(),
                ..Default::default()
            },
        }
    }

    #[inline]
    fn position(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        let (x, z) = self.position(index);
        let (dx, dz) = direction.offset();
        let nx = x.checked_add_signed(dx as isize)?;
        let nz = z.checked_add_signed(dz as isize)?;
        (nx < self.width && nz < self.depth).then(|| nz * self.width + nx)
    }

    fn write(&mut self, index: usize, cell: Cell) {
        debug_assert!(!cell.options.is_empty(), "solver wrote an empty option set");
        debug_assert!(!cell.collapsed || cell.options.len() == 1);
        self.trail.push(TrailEntry {
            index,
            previous: self.cells[index],
        });
        self.cells[index] = cell;
        self.stats.min_options = self.stats.min_options.min(cell.options.len());
    }

    fn undo_to(&mut self, trail_len: usize) {
        while self.trail.len() > trail_len {
            if let Some(entry) = self.trail.pop() {
                self.cells[entry.index] = entry.previous;
            }
        }
    }

    /// Picks an uncollapsed cell of minimum entropy, uniformly among ties.
    fn select<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        let mut min_entropy = usize::MAX;
        self.candidates.clear();
        for (index, cell) in self.cells.iter().enumerate() {
            if cell.collapsed {
                continue;
            }
            let entropy = cell.options.len();
            if entropy < min_entropy {
                min_entropy = entropy;
                self.candidates.clear();
                self.candidates.push(index);
            } else if entropy == min_entropy {
                self.candidates.push(index);
            }
        }
        if self.candidates.is_empty() {
            return None;
        }
        let pick = rng.random_range(0..self.candidates.len());
        Some(self.candidates[pick])
    }

    fn collapse<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) {
        let options = self.cells[index].options;
        let pick = rng.random_range(0..options.len());
        let Some(choice) = options.nth(pick) else {
            unreachable!("uncollapsed cell holds {options:?}");
        };
        self.decisions.push(Decision {
            index,
            choice,
            trail_len: self.trail.len(),
        });
        self.write(
            index,
            Cell {
                collapsed: true,
                options: CategorySet::single(choice),
            },
        );
        self.stats.collapses += 1;
    }

    /// Narrows neighbours breadth-first, starting from `start`.
    fn propagate(&mut self, start: usize, rules: &AdjacencyRules) -> Result<(), Contradiction> {
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let source = self.cells[current].options;
            for direction in Direction::ALL {
                let Some(next) = self.neighbor(current, direction) else {
                    continue;
                };
                let neighbor = self.cells[next];
                if neighbor.collapsed {
                    continue;
                }
                let permitted = rules.permitted_neighbors(source, direction);
                let narrowed = neighbor.options.intersection(permitted);
                if narrowed == neighbor.options {
                    continue;
                }
                if narrowed.is_empty() {
                    return Err(Contradiction {
                        cell: self.position(current),
                        source,
                        direction,
                        neighbor_options: neighbor.options,
                    });
                }
                self.write(
                    next,
                    Cell {
                        collapsed: false,
                        options: narrowed,
                    },
                );
                queue.push_back(next);
            }
        }
        Ok(())
    }

    /// Unwinds collapses until propagation succeeds again.
    fn recover(
        &mut self,
        mut last: Contradiction,
        rules: &AdjacencyRules,
        max_backtracks: u32,
    ) -> Result<(), SolveError> {
        loop {
            let Some(decision) = self.decisions.pop() else {
                return Err(SolveError::Contradiction(last));
            };
            if self.stats.backtracks >= max_backtracks {
                return Err(SolveError::BacktrackLimitExceeded {
                    limit: max_backtracks,
                    last,
                });
            }
            self.stats.backtracks += 1;
            self.undo_to(decision.trail_len);

            let remaining = self.cells[decision.index].options.without(decision.choice);
            if remaining.is_empty() {
                continue;
            }
            self.write(
                decision.index,
                Cell {
                    collapsed: false,
                    options: remaining,
                },
            );
            match self.propagate(decision.index, rules) {
                Ok(()) => return Ok(()),
                Err(contradiction) => last = contradiction,
            }
        }
    }
}

/// Solves grids of a fixed size against a rule table.
#[derive(Clone, Debug)]
pub struct WaveCollapseSolver<'a> {
    rules: &'a AdjacencyRules,
    width: usize,
    depth: usize,
    max_backtracks: u32,
}

impl<'a> WaveCollapseSolver<'a> {
    /// Creates a solver for `width × depth` grids.
    pub fn new(rules: &'a AdjacencyRules, width: usize, depth: usize) -> Self {
        Self {
            rules,
            width,
            depth,
            max_backtracks: DEFAULT_MAX_BACKTRACKS,
        }
    }

    /// Sets the recovery budget. `0` fails on the first contradiction.
    pub fn with_max_backtracks(mut self, max_backtracks: u32) -> Self {
        self.max_backtracks = max_backtracks;
        self
    }

    pub fn max_backtracks(&self) -> u32 {
        self.max_backtracks
    }

    /// Collapses every cell of the grid.
    pub fn solve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CollapsedGrid, SolveError> {
        let mut wave = Wave::new(self.width, self.depth);

        while let Some(index) = wave.select(rng) {
            wave.collapse(index, rng);
            if let Err(contradiction) = wave.propagate(index, self.rules) {
                wave.recover(contradiction, self.rules, self.max_backtracks)?;
            }
        }

        let mut categories = Vec::with_capacity(wave.cells.len());
        for cell in &wave.cells {
            match cell.options.single_member() {
                Some(category) => categories.push(category),
                None => unreachable!("collapsed cell holds {:?}", cell.options),
            }
        }

        if wave.stats.backtracks > 0 {
            tracing::warn!(
                backtracks = wave.stats.backtracks,
                width = self.width,
                depth = self.depth,
                "solver recovered from contradictions"
            );
        }

        Ok(CollapsedGrid {
            width: self.width,
            depth: self.depth,
            categories,
            stats: wave.stats,
        })
    }

    /// Solves the grid and samples a height for every cell. Tiles are keyed
    /// by local coordinate, `(0, 0)` to `(width - 1, depth - 1)`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        heights: &HeightGenerator,
        rng: &mut R,
    ) -> Result<TileMap, SolveError> {
        let grid = self.solve(rng)?;
        Ok(grid.materialize(heights, rng))
    }
}

/// A fully collapsed grid: exactly one category per cell.
#[derive(Clone, Debug)]
pub struct CollapsedGrid {
    width: usize,
    depth: usize,
    categories: Vec<TerrainCategory>,
    stats: SolveStats,
}

impl CollapsedGrid {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    /// Category at local `(x, z)`, or `None` outside the grid.
    pub fn get(&self, x: usize, z: usize) -> Option<TerrainCategory> {
        if x < self.width && z < self.depth {
            Some(self.categories[z * self.width + x])
        } else {
            None
        }
    }

    /// Iterates `(x, z, category)` row by row.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, TerrainCategory)> + '_ {
        self.categories
            .iter()
            .enumerate()
            .map(|(i, &c)| (i % self.width, i / self.width, c))
    }

    /// Samples [`crate::TerrainData`] for every cell, in row order.
    pub fn materialize<R: Rng + ?Sized>(&self, heights: &HeightGenerator, rng: &mut R) -> TileMap {
        let mut tiles = TileMap::with_capacity(self.categories.len());
        for (x, z, category) in self.iter() {
            tiles.insert(
                TileCoord::new(x as i32, z as i32),
                heights.create(category, rng),
            );
        }
        tiles
    }
}
