//! The record shape that flows from the sorter into the table writers.

use crate::permutation::Permutation;
use std::cmp::Ordering;

/// One permuted record: the permutation's leading field as `key`, the two
/// trailing fields as `v1`/`v2`, plus the upstream sorter's duplicate
/// count (1 when the input carried no count annotation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripleRecord {
    pub key: i64,
    pub v1: i64,
    pub v2: i64,
    pub count: u64,
}

impl TripleRecord {
    pub fn new(key: i64, v1: i64, v2: i64) -> Self {
        Self {
            key,
            v1,
            v2,
            count: 1,
        }
    }

    pub fn with_count(key: i64, v1: i64, v2: i64, count: u64) -> Self {
        Self { key, v1, v2, count }
    }

    /// Build a record from an `(s, p, o)` triple under the given
    /// permutation.
    pub fn from_spo(perm: Permutation, s: i64, p: i64, o: i64) -> Self {
        let (key, v1, v2) = perm.reorder(s, p, o);
        Self::new(key, v1, v2)
    }

    /// Sort order within one permutation: `(key, v1, v2)` ascending.
    /// Counts never participate in ordering.
    #[inline]
    pub fn cmp_fields(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then(self.v1.cmp(&other.v1))
            .then(self.v2.cmp(&other.v2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmp_fields_ignores_count() {
        let a = TripleRecord::with_count(1, 2, 3, 10);
        let b = TripleRecord::with_count(1, 2, 3, 99);
        assert_eq!(a.cmp_fields(&b), Ordering::Equal);
    }

    #[test]
    fn test_cmp_fields_lexicographic() {
        let a = TripleRecord::new(1, 5, 9);
        let b = TripleRecord::new(1, 6, 0);
        let c = TripleRecord::new(2, 0, 0);
        assert_eq!(a.cmp_fields(&b), Ordering::Less);
        assert_eq!(b.cmp_fields(&c), Ordering::Less);
    }

    #[test]
    fn test_from_spo_applies_permutation() {
        let r = TripleRecord::from_spo(Permutation::Pos, 7, 8, 9);
        assert_eq!((r.key, r.v1, r.v2), (8, 9, 7));
        assert_eq!(r.count, 1);
    }
}
