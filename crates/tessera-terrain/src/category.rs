//! Terrain vocabulary: the closed set of tile categories and a compact
//! bitset over them used by the solver and the rule table.

use std::fmt;
use std::str::FromStr;

/// Number of terrain categories.
pub const CATEGORY_COUNT: usize = 8;

/// The kind of terrain a tile holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TerrainCategory {
    Dirt = 0,
    Grass = 1,
    Tree = 2,
    Building = 3,
    Wall = 4,
    Path = 5,
    Bridge = 6,
    Water = 7,
}

impl TerrainCategory {
    /// Every category, in index order.
    pub const ALL: [TerrainCategory; CATEGORY_COUNT] = [
        TerrainCategory::Dirt,
        TerrainCategory::Grass,
        TerrainCategory::Tree,
        TerrainCategory::Building,
        TerrainCategory::Wall,
        TerrainCategory::Path,
        TerrainCategory::Bridge,
        TerrainCategory::Water,
    ];

    /// Dense index in `0..CATEGORY_COUNT`, usable for table lookups.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`TerrainCategory::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Lower-case name used in config files and diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            TerrainCategory::Dirt => "dirt",
            TerrainCategory::Grass => "grass",
            TerrainCategory::Tree => "tree",
            TerrainCategory::Building => "building",
            TerrainCategory::Wall => "wall",
            TerrainCategory::Path => "path",
            TerrainCategory::Bridge => "bridge",
            TerrainCategory::Water => "water",
        }
    }

    /// Single-character glyph for ASCII map dumps.
    pub const fn glyph(self) -> char {
        match self {
            TerrainCategory::Dirt => ':',
            TerrainCategory::Grass => '.',
            TerrainCategory::Tree => 'T',
            TerrainCategory::Building => 'B',
            TerrainCategory::Wall => '#',
            TerrainCategory::Path => '=',
            TerrainCategory::Bridge => 'H',
            TerrainCategory::Water => '~',
        }
    }
}

impl fmt::Display for TerrainCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown terrain category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for TerrainCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == lowered)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A set of terrain categories packed into one byte.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CategorySet(u8);

impl CategorySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every category.
    pub const FULL: Self = Self(u8::MAX);

    /// A set holding exactly `category`.
    #[inline]
    pub const fn single(category: TerrainCategory) -> Self {
        Self(1 << category as u8)
    }

    /// Builds a set from a slice of categories.
    pub fn from_slice(categories: &[TerrainCategory]) -> Self {
        categories
            .iter()
            .fold(Self::EMPTY, |set, &c| set.with(c))
    }

    /// Raw bit representation.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn contains(self, category: TerrainCategory) -> bool {
        self.0 & (1 << category as u8) != 0
    }

    /// Returns a copy with `category` added.
    #[inline]
    pub const fn with(self, category: TerrainCategory) -> Self {
        Self(self.0 | (1 << category as u8))
    }

    /// Returns a copy with `category` removed.
    #[inline]
    pub const fn without(self, category: TerrainCategory) -> Self {
        Self(self.0 & !(1 << category as u8))
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Number of categories in the set (the solver's "entropy").
    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The only member, if the set holds exactly one category.
    pub fn single_member(self) -> Option<TerrainCategory> {
        if self.len() == 1 {
            TerrainCategory::from_index(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// The `n`-th member in index order.
    pub fn nth(self, n: usize) -> Option<TerrainCategory> {
        self.iter().nth(n)
    }

    /// Iterates members in index order.
    pub fn iter(self) -> impl Iterator<Item = TerrainCategory> {
        TerrainCategory::ALL
            .into_iter()
            .filter(move |&c| self.contains(c))
    }
}

impl FromIterator<TerrainCategory> for CategorySet {
    fn from_iter<I: IntoIterator<Item = TerrainCategory>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |set, c| set.with(c))
    }
}

impl fmt::Debug for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, c) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(c.name())?;
        }
        f.write_str("}")
    }
}

/// A packed `0xRRGGBB` colour used by the rendering boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tint(pub u32);

impl Tint {
    /// Red, green and blue channels in `[0.0, 1.0]`.
    pub fn to_rgb_f32(self) -> [f32; 3] {
        let r = ((self.0 >> 16) & 0xFF) as f32 / 255.0;
        let g = ((self.0 >> 8) & 0xFF) as f32 / 255.0;
        let b = (self.0 & 0xFF) as f32 / 255.0;
        [r, g, b]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip_covers_all() {
        for (i, c) in TerrainCategory::ALL.into_iter().enumerate() {
            assert_eq!(c.index(), i);
            assert_eq!(TerrainCategory::from_index(i), Some(c));
        }
        assert_eq!(TerrainCategory::from_index(CATEGORY_COUNT), None);
    }

    #[test]
    fn test_parse_names_case_insensitive() {
        assert_eq!("Water".parse::<TerrainCategory>(), Ok(TerrainCategory::Water));
        assert_eq!(" grass ".parse::<TerrainCategory>(), Ok(TerrainCategory::Grass));
        assert!("lava".parse::<TerrainCategory>().is_err());
    }

    #[test]
    fn test_full_set_has_every_category() {
        assert_eq!(CategorySet::FULL.len(), CATEGORY_COUNT);
        for c in TerrainCategory::ALL {
            assert!(CategorySet::FULL.contains(c));
        }
    }

    #[test]
    fn test_set_operations() {
        let a = CategorySet::from_slice(&[TerrainCategory::Water, TerrainCategory::Dirt]);
        let b = CategorySet::from_slice(&[TerrainCategory::Dirt, TerrainCategory::Grass]);

        assert_eq!(a.intersection(b), CategorySet::single(TerrainCategory::Dirt));
        assert_eq!(a.union(b).len(), 3);
        assert_eq!(a.difference(b), CategorySet::single(TerrainCategory::Water));
        assert!(a.without(TerrainCategory::Water).without(TerrainCategory::Dirt).is_empty());
    }

    #[test]
    fn test_single_member_only_for_singletons() {
        assert_eq!(
            CategorySet::single(TerrainCategory::Bridge).single_member(),
            Some(TerrainCategory::Bridge)
        );
        assert_eq!(CategorySet::EMPTY.single_member(), None);
        assert_eq!(CategorySet::FULL.single_member(), None);
    }

    #[test]
    fn test_nth_follows_index_order() {
        let set = CategorySet::from_slice(&[TerrainCategory::Water, TerrainCategory::Grass]);
        assert_eq!(set.nth(0), Some(TerrainCategory::Grass));
        assert_eq!(set.nth(1), Some(TerrainCategory::Water));
        assert_eq!(set.nth(2), None);
    }

    #[test]
    fn test_display_lists_names() {
        let set = CategorySet::from_slice(&[TerrainCategory::Wall, TerrainCategory::Path]);
        assert_eq!(set.to_string(), "{wall, path}");
    }

    #[test]
    fn test_tint_channels() {
        let [r, g, b] = Tint(0xFF8000).to_rgb_f32();
        assert!((r - 1.0).abs() < 1e-6);
        assert!((g - 128.0 / 255.0).abs() < 1e-6);
        assert!(b.abs() < 1e-6);
    }
}
