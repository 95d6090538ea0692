//! A bitmap-backed set of [`PackageId`]s.

use std::ops::{BitAnd, BitOr, BitXor, Sub};

use crate::{Error, PackageId, PoolId};

const WORD_BITS: u32 = u64::BITS;

/// A set of package ids backed by a bitmap, tagged with the pool it was
/// constructed against.
///
/// All binary operations require both operands to share a [`PoolId`]; a
/// mismatch returns [`Error::PoolMismatch`] rather than silently producing a
/// meaningless set.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PackageSet {
    pool: PoolId,
    words: Vec<u64>,
}

impl PackageSet {
    /// Creates a new, empty set tagged with `pool`.
    pub fn new(pool: PoolId) -> Self {
        Self {
            pool,
            words: Vec::new(),
        }
    }

    /// Returns the pool this set is tagged with.
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    fn word_index(id: PackageId) -> (usize, u32) {
        let idx = id.0;
        ((idx / WORD_BITS) as usize, idx % WORD_BITS)
    }

    fn ensure_capacity(&mut self, word_idx: usize) {
        if self.words.len() <= word_idx {
            self.words.resize(word_idx + 1, 0);
        }
    }

    /// Inserts `id` into the set.
    pub fn add(&mut self, id: PackageId) {
        let (word, bit) = Self::word_index(id);
        self.ensure_capacity(word);
        self.words[word] |= 1u64 << bit;
    }

    /// Removes `id` from the set, if present.
    pub fn remove(&mut self, id: PackageId) {
        let (word, bit) = Self::word_index(id);
        if word < self.words.len() {
            self.words[word] &= !(1u64 << bit);
        }
    }

    /// Returns `true` if `id` is a member of the set.
    pub fn contains(&self, id: PackageId) -> bool {
        let (word, bit) = Self::word_index(id);
        self.words
            .get(word)
            .is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Returns the number of members.
    pub fn size(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns an iterator over members in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_idx, &word)| {
            (0..WORD_BITS).filter_map(move |bit| {
                if word & (1u64 << bit) != 0 {
                    Some(PackageId(word_idx as u32 * WORD_BITS + bit))
                } else {
                    None
                }
            })
        })
    }

    fn check_pool(&self, other: &Self) -> Result<(), Error> {
        if self.pool != other.pool {
            return Err(Error::PoolMismatch {
                left: self.pool.0,
                right: other.pool.0,
            });
        }
        Ok(())
    }

    fn zip_words<'a>(a: &'a [u64], b: &'a [u64]) -> impl Iterator<Item = (u64, u64)> + 'a {
        let len = a.len().max(b.len());
        (0..len).map(move |i| (a.get(i).copied().unwrap_or(0), b.get(i).copied().unwrap_or(0)))
    }

    /// Returns the union of `self` and `other`.
    pub fn union(&self, other: &Self) -> Result<Self, Error> {
        self.check_pool(other)?;
        let words = Self::zip_words(&self.words, &other.words)
            .map(|(a, b)| a | b)
            .collect();
        Ok(Self { pool: self.pool, words })
    }

    /// Returns the intersection of `self` and `other`.
    pub fn intersection(&self, other: &Self) -> Result<Self, Error> {
        self.check_pool(other)?;
        let words = Self::zip_words(&self.words, &other.words)
            .map(|(a, b)| a & b)
            .collect();
        Ok(Self { pool: self.pool, words })
    }

    /// Returns the members of `self` not present in `other`.
    pub fn difference(&self, other: &Self) -> Result<Self, Error> {
        self.check_pool(other)?;
        let words = Self::zip_words(&self.words, &other.words)
            .map(|(a, b)| a & !b)
            .collect();
        Ok(Self { pool: self.pool, words })
    }

    /// Returns the members present in exactly one of `self` and `other`.
    pub fn symmetric_difference(&self, other: &Self) -> Result<Self, Error> {
        self.check_pool(other)?;
        let words = Self::zip_words(&self.words, &other.words)
            .map(|(a, b)| a ^ b)
            .collect();
        Ok(Self { pool: self.pool, words })
    }

    /// Returns `true` if every member of `self` is also a member of `other`.
    pub fn is_subset_of(&self, other: &Self) -> Result<bool, Error> {
        self.check_pool(other)?;
        Ok(Self::zip_words(&self.words, &other.words).all(|(a, b)| a & !b == 0))
    }

    /// Returns `true` if every member of `other` is also a member of `self`.
    pub fn is_superset_of(&self, other: &Self) -> Result<bool, Error> {
        other.is_subset_of(self)
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $op:ident) => {
        impl $trait for &PackageSet {
            type Output = PackageSet;

            fn $method(self, rhs: Self) -> PackageSet {
                self.$op(rhs).expect("pool mismatch in package set operator")
            }
        }
    };
}

impl_binop!(BitOr, bitor, union);
impl_binop!(BitAnd, bitand, intersection);
impl_binop!(Sub, sub, difference);
impl_binop!(BitXor, bitxor, symmetric_difference);

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pool: PoolId, ids: &[u32]) -> PackageSet {
        let mut s = PackageSet::new(pool);
        for &id in ids {
            s.add(PackageId(id));
        }
        s
    }

    #[test]
    fn union_intersection_absorption() {
        let pool = PoolId(1);
        let a = set(pool, &[1, 2, 3]);
        let b = set(pool, &[3, 4, 5]);
        let union = &a | &b;
        let back = &union & &a;
        assert_eq!(back, a);
    }

    #[test]
    fn difference_with_self_is_empty() {
        let pool = PoolId(1);
        let a = set(pool, &[1, 2, 3]);
        let diff = &a - &a;
        assert!(diff.is_empty());
    }

    #[test]
    fn symmetric_difference_identity() {
        let pool = PoolId(1);
        let a = set(pool, &[1, 2, 3]);
        let b = set(pool, &[2, 3, 4]);
        let sym = &a ^ &b;
        let via_union_minus_intersection = &(&a | &b) - &(&a & &b);
        assert_eq!(sym, via_union_minus_intersection);
    }

    #[test]
    fn pool_mismatch_is_rejected() {
        let a = set(PoolId(1), &[1]);
        let b = set(PoolId(2), &[1]);
        assert!(matches!(a.union(&b), Err(Error::PoolMismatch { .. })));
    }

    #[test]
    fn iteration_is_ascending() {
        let pool = PoolId(1);
        let a = set(pool, &[70, 3, 1, 64]);
        let collected: Vec<_> = a.iter().map(|id| id.0).collect();
        assert_eq!(collected, vec![1, 3, 64, 70]);
    }
}
