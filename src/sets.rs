//! Fixed-capacity bitset of terminal indices.
//!
//! `TerminalSet` backs both a non-terminal's FIRST set and an item's
//! lookahead cell. All operations are monotone-friendly: `union_with`
//! reports whether it actually grew the set, which the fixed-point loops
//! in `grammar::nullable_first` and `machine::lookahead` rely on to know
//! when to keep iterating.

use fixedbitset::FixedBitSet;

use crate::index::TermIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    bits: FixedBitSet,
}

impl TerminalSet {
    pub fn empty(capacity: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    pub fn insert(&mut self, term: TermIndex) -> bool {
        let already = self.bits.contains(term.0);
        self.bits.insert(term.0);
        !already
    }

    pub fn contains(&self, term: TermIndex) -> bool {
        self.bits.contains(term.0)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.count_ones(..) == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones(..)
    }

    /// Unions `other` into `self`, returning `true` if any new bit was set.
    pub fn union_with(&mut self, other: &TerminalSet) -> bool {
        let before = self.bits.count_ones(..);
        self.bits.union_with(&other.bits);
        self.bits.count_ones(..) != before
    }

    pub fn union(&self, other: &TerminalSet) -> TerminalSet {
        let mut result = self.clone();
        result.union_with(other);
        result
    }

    pub fn intersection(&self, other: &TerminalSet) -> TerminalSet {
        let mut bits = self.bits.clone();
        bits.intersect_with(&other.bits);
        TerminalSet { bits }
    }

    pub fn is_subset(&self, other: &TerminalSet) -> bool {
        self.bits.is_subset(&other.bits)
    }

    pub fn iter(&self) -> impl Iterator<Item = TermIndex> + '_ {
        self.bits.ones().map(TermIndex)
    }
}

impl FromIterator<TermIndex> for TerminalSet {
    fn from_iter<I: IntoIterator<Item = TermIndex>>(iter: I) -> Self {
        let mut max = 0;
        let items: Vec<TermIndex> = iter.into_iter().collect();
        for t in &items {
            max = max.max(t.0 + 1);
        }
        let mut set = TerminalSet::empty(max);
        for t in items {
            set.insert(t);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_reports_growth() {
        let mut a = TerminalSet::empty(8);
        let mut b = TerminalSet::empty(8);
        b.insert(TermIndex(3));
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert!(a.contains(TermIndex(3)));
    }

    #[test]
    fn subset_and_intersection() {
        let mut a = TerminalSet::empty(8);
        a.insert(TermIndex(1));
        a.insert(TermIndex(2));
        let mut b = TerminalSet::empty(8);
        b.insert(TermIndex(2));
        assert!(b.is_subset(&a));
        assert!(!a.is_subset(&b));
        let inter = a.intersection(&b);
        assert_eq!(inter.len(), 1);
        assert!(inter.contains(TermIndex(2)));
    }

    #[test]
    fn empty_and_len() {
        let set = TerminalSet::empty(4);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
