//! Adjacency rule table: which categories may sit next to which.
//!
//! The table is built once from declarative entries into fixed-size arrays
//! indexed by [`TerrainCategory`], so the solver never branches on a
//! particular category.

use crate::category::{CATEGORY_COUNT, CategorySet, TerrainCategory};
use crate::coords::Direction;

use TerrainCategory::*;

/// Errors found while building an [`AdjacencyRules`] table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleTableError {
    /// A category has no allowed neighbour entry at all.
    #[error("no allowed-neighbour entry for {0}")]
    MissingEntry(TerrainCategory),

    /// A category was given two allowed-neighbour entries.
    #[error("duplicate allowed-neighbour entry for {0}")]
    DuplicateEntry(TerrainCategory),

    /// After exclusions, a category has no neighbour in some direction that
    /// it permits and that permits it back, so any cell next to it would be
    /// left without options.
    #[error("{category} has no mutually permitted neighbour to the {direction}")]
    EmptyNeighborSet {
        category: TerrainCategory,
        direction: Direction,
    },
}

/// A direction-sensitive exclusion layered over the base table.
#[derive(Clone, Debug)]
pub struct ExclusionRule {
    /// Category whose neighbours are restricted.
    pub category: TerrainCategory,
    /// Categories that may not appear next to `category`.
    pub forbidden: CategorySet,
    /// Directions (from `category` towards the neighbour) the rule applies in.
    pub directions: Vec<Direction>,
}

impl ExclusionRule {
    /// Forbids `category` next to any of `forbidden` in all four orthogonal
    /// directions.
    pub fn orthogonal(category: TerrainCategory, forbidden: &[TerrainCategory]) -> Self {
        Self {
            category,
            forbidden: CategorySet::from_slice(forbidden),
            directions: Direction::ALL.to_vec(),
        }
    }
}

/// Static neighbour rules for the wave-collapse solver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyRules {
    allowed: [CategorySet; CATEGORY_COUNT],
    excluded: [[CategorySet; 4]; CATEGORY_COUNT],
    /// `mutual[c][d]`: neighbours `n` in direction `d` with `c` permitting `n`
    /// and `n` permitting `c` in the opposite direction.
    mutual: [[CategorySet; 4]; CATEGORY_COUNT],
}

impl AdjacencyRules {
    /// Builds a table from one `(category, allowed neighbours)` entry per
    /// category and a list of exclusions.
    ///
    /// Each exclusion is mirrored: forbidding `b` to the east of `a` also
    /// forbids `a` to the west of `b`.
    pub fn new(
        entries: &[(TerrainCategory, &[TerrainCategory])],
        exclusions: &[ExclusionRule],
    ) -> Result<Self, RuleTableError> {
        let mut seen = CategorySet::EMPTY;
        let mut allowed = [CategorySet::EMPTY; CATEGORY_COUNT];
        for &(category, neighbours) in entries {
            if seen.contains(category) {
                return Err(RuleTableError::DuplicateEntry(category));
            }
            seen = seen.with(category);
            allowed[category.index()] = CategorySet::from_slice(neighbours);
        }
        if let Some(missing) = CategorySet::FULL.difference(seen).iter().next() {
            return Err(RuleTableError::MissingEntry(missing));
        }

        let mut excluded = [[CategorySet::EMPTY; 4]; CATEGORY_COUNT];
        for rule in exclusions {
            for &direction in &rule.directions {
                let slot = &mut excluded[rule.category.index()][direction.index()];
                *slot = slot.union(rule.forbidden);
                for other in rule.forbidden.iter() {
                    let mirror = &mut excluded[other.index()][direction.opposite().index()];
                    *mirror = mirror.with(rule.category);
                }
            }
        }

        let mut rules = Self {
            allowed,
            excluded,
            mutual: [[CategorySet::EMPTY; 4]; CATEGORY_COUNT],
        };
        for category in TerrainCategory::ALL {
            for direction in Direction::ALL {
                let mutual: CategorySet = rules
                    .effective(category, direction)
                    .iter()
                    .filter(|&n| rules.effective(n, direction.opposite()).contains(category))
                    .collect();
                rules.mutual[category.index()][direction.index()] = mutual;
            }
        }
        rules.validate()?;
        Ok(rules)
    }

    /// The board-game rule set: land, settlements and water with Water kept
    /// orthogonally apart from Buildings and Walls.
    pub fn standard() -> Self {
        let entries: [(TerrainCategory, &[TerrainCategory]); CATEGORY_COUNT] = [
            (Water, &[Water, Bridge, Dirt]),
            (Dirt, &[Dirt, Grass, Path, Water]),
            (Grass, &[Grass, Tree, Dirt, Path, Building]),
            (Tree, &[Tree, Grass]),
            (Building, &[Building, Path, Grass]),
            (Wall, &[Wall, Path, Grass]),
            (Path, &[Path, Dirt, Grass, Building, Wall]),
            (Bridge, &[Bridge, Water, Path]),
        ];
        let exclusions = [ExclusionRule::orthogonal(Water, &[Building, Wall])];

        match Self::new(&entries, &exclusions) {
            Ok(rules) => rules,
            Err(e) => unreachable!("standard rule table is well formed: {e}"),
        }
    }

    /// Checks that every category leaves at least one mutually permitted
    /// option for a neighbour in every direction.
    pub fn validate(&self) -> Result<(), RuleTableError> {
        for category in TerrainCategory::ALL {
            for direction in Direction::ALL {
                if self.mutual(category, direction).is_empty() {
                    return Err(RuleTableError::EmptyNeighborSet {
                        category,
                        direction,
                    });
                }
            }
        }
        Ok(())
    }

    /// Base allowed-neighbour set for `category`, ignoring exclusions.
    pub fn allowed(&self, category: TerrainCategory) -> CategorySet {
        self.allowed[category.index()]
    }

    /// Allowed neighbours of `category` in `direction` after exclusions.
    #[inline]
    pub fn effective(&self, category: TerrainCategory, direction: Direction) -> CategorySet {
        self.allowed[category.index()].difference(self.excluded[category.index()][direction.index()])
    }

    /// Neighbours in `direction` that `category` permits and that permit
    /// `category` back.
    #[inline]
    pub fn mutual(&self, category: TerrainCategory, direction: Direction) -> CategorySet {
        self.mutual[category.index()][direction.index()]
    }

    /// Union of the mutual neighbour sets of every option in `options`.
    ///
    /// This is the set a neighbouring cell in `direction` is narrowed to
    /// during propagation, so every finished pair is permitted both ways.
    pub fn permitted_neighbors(&self, options: CategorySet, direction: Direction) -> CategorySet {
        options
            .iter()
            .fold(CategorySet::EMPTY, |acc, c| acc.union(self.mutual(c, direction)))
    }

    /// Whether `neighbor` may sit in `direction` from `category`.
    pub fn permits(
        &self,
        category: TerrainCategory,
        neighbor: TerrainCategory,
        direction: Direction,
    ) -> bool {
        self.effective(category, direction).contains(neighbor)
    }

    /// Whether `a` and `b` may be neighbours with `b` in `direction` from
    /// `a`: each side permits the other.
    pub fn compatible(&self, a: TerrainCategory, b: TerrainCategory, direction: Direction) -> bool {
        self.permits(a, b, direction) && self.permits(b, a, direction.opposite())
    }
}

impl Default for AdjacencyRules {
    fn default() -> Self {
        Self::standard()
    }
}
