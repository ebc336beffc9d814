//! The three shared orderings of the differential index.
//!
//! The base store keeps six independent permutation indexes; a delta
//! batch is small enough that the two permutations sharing a leading
//! term can share one key index. Each ordering therefore serves two
//! permutations: the key is the shared leading term, and each key
//! record carries two live coordinate slots (one per projection) plus
//! two auxiliary counters stashed in otherwise-idle slots.
//!
//! On disk an ordering is a directory holding `p0` (first projection's
//! tables), `p1` (second projection's) and `stats`.

use tribase_core::Permutation;

/// An ordering grouped by one of the three triple terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TermOrdering {
    /// Keyed by subject: serves SPO and SOP.
    ByFirst = 0,
    /// Keyed by predicate: serves POS and PSO.
    BySecond = 1,
    /// Keyed by object: serves OPS and OSP.
    ByThird = 2,
}

/// All three orderings, in term order.
pub const ALL_ORDERINGS: [TermOrdering; 3] = [
    TermOrdering::ByFirst,
    TermOrdering::BySecond,
    TermOrdering::ByThird,
];

impl TermOrdering {
    /// Directory name under the differential index root.
    pub fn dir_name(self) -> &'static str {
        match self {
            TermOrdering::ByFirst => "s",
            TermOrdering::BySecond => "p",
            TermOrdering::ByThird => "o",
        }
    }

    /// The two permutations this ordering serves. Projection 0 goes to
    /// file `p0`, projection 1 to `p1`; the two are each other's
    /// [`inverse_pair`](Permutation::inverse_pair).
    pub fn permutations(self) -> [Permutation; 2] {
        match self {
            TermOrdering::ByFirst => [Permutation::Spo, Permutation::Sop],
            TermOrdering::BySecond => [Permutation::Pos, Permutation::Pso],
            TermOrdering::ByThird => [Permutation::Ops, Permutation::Osp],
        }
    }

    /// The ordering that serves `perm`, and which projection file
    /// (0 → `p0`, 1 → `p1`) holds its tables.
    pub fn of_permutation(perm: Permutation) -> (TermOrdering, usize) {
        match perm {
            Permutation::Spo => (TermOrdering::ByFirst, 0),
            Permutation::Sop => (TermOrdering::ByFirst, 1),
            Permutation::Pos => (TermOrdering::BySecond, 0),
            Permutation::Pso => (TermOrdering::BySecond, 1),
            Permutation::Ops => (TermOrdering::ByThird, 0),
            Permutation::Osp => (TermOrdering::ByThird, 1),
        }
    }
}

/// The idle slot that carries the auxiliary unique-first-term counter
/// for the live slot `live`. Within any one ordering the two live slots
/// and their two auxiliary slots are all distinct, so the counters never
/// collide with live coordinates.
#[inline]
pub fn auxiliary_slot(live: usize) -> usize {
    debug_assert!(live < 6);
    if live < 3 {
        (live + 1) % 3
    } else {
        (live + 1) % 3 + 3
    }
}
