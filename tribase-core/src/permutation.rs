//! The six sort-order permutations of a `(s, p, o)` triple.
//!
//! Each permutation is stored and indexed independently. The wire ids are
//! stable: they appear in directory names, coordinate slots and the
//! differential index's ordering files, so they must never be renumbered.

use std::cmp::Ordering;

/// One of the six total orderings of a triple's three fields.
///
/// The leading field of a permutation is its "key"; the remaining two are
/// `value1` and `value2` in that permutation's sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Permutation {
    Spo = 0,
    Ops = 1,
    Pos = 2,
    Sop = 3,
    Osp = 4,
    Pso = 5,
}

/// All six permutations in wire-id order.
pub const ALL_PERMUTATIONS: [Permutation; 6] = [
    Permutation::Spo,
    Permutation::Ops,
    Permutation::Pos,
    Permutation::Sop,
    Permutation::Osp,
    Permutation::Pso,
];

impl Permutation {
    /// Stable wire id (0..=5), used in file names and slot indexing.
    #[inline]
    pub fn wire_id(self) -> u8 {
        self as u8
    }

    /// Decode a wire id back into a permutation.
    pub fn from_u8(id: u8) -> Option<Self> {
        match id {
            0 => Some(Permutation::Spo),
            1 => Some(Permutation::Ops),
            2 => Some(Permutation::Pos),
            3 => Some(Permutation::Sop),
            4 => Some(Permutation::Osp),
            5 => Some(Permutation::Pso),
            _ => None,
        }
    }

    /// Directory name for this permutation's on-disk files.
    pub fn dir_name(self) -> &'static str {
        match self {
            Permutation::Spo => "spo",
            Permutation::Ops => "ops",
            Permutation::Pos => "pos",
            Permutation::Sop => "sop",
            Permutation::Osp => "osp",
            Permutation::Pso => "pso",
        }
    }

    /// Reorder an `(s, p, o)` triple into this permutation's
    /// `(key, value1, value2)` order.
    #[inline]
    pub fn reorder(self, s: i64, p: i64, o: i64) -> (i64, i64, i64) {
        match self {
            Permutation::Spo => (s, p, o),
            Permutation::Ops => (o, p, s),
            Permutation::Pos => (p, o, s),
            Permutation::Sop => (s, o, p),
            Permutation::Osp => (o, s, p),
            Permutation::Pso => (p, s, o),
        }
    }

    /// Inverse of [`reorder`](Self::reorder): map `(key, value1, value2)`
    /// back to `(s, p, o)`.
    #[inline]
    pub fn restore(self, key: i64, v1: i64, v2: i64) -> (i64, i64, i64) {
        match self {
            Permutation::Spo => (key, v1, v2),
            Permutation::Ops => (v2, v1, key),
            Permutation::Pos => (v2, key, v1),
            Permutation::Sop => (key, v2, v1),
            Permutation::Osp => (v1, v2, key),
            Permutation::Pso => (v1, key, v2),
        }
    }

    /// The permutation with the same leading field whose two trailing
    /// fields are swapped (e.g. SPO ↔ SOP). The differential index stores
    /// both members of such a pair under one shared key index.
    pub fn inverse_pair(self) -> Permutation {
        match self {
            Permutation::Spo => Permutation::Sop,
            Permutation::Sop => Permutation::Spo,
            Permutation::Pos => Permutation::Pso,
            Permutation::Pso => Permutation::Pos,
            Permutation::Ops => Permutation::Osp,
            Permutation::Osp => Permutation::Ops,
        }
    }

    /// Compare two `(s, p, o)` triples in this permutation's sort order.
    #[inline]
    pub fn cmp_triples(self, a: (i64, i64, i64), b: (i64, i64, i64)) -> Ordering {
        let ka = self.reorder(a.0, a.1, a.2);
        let kb = self.reorder(b.0, b.1, b.2);
        ka.0.cmp(&kb.0).then(ka.1.cmp(&kb.1)).then(ka.2.cmp(&kb.2))
    }
}
