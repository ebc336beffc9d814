//! Update bookkeeping shared by addition and removal batches.

use crate::stats::OrderingStats;
use tribase_core::Permutation;
use tribase_tables::{CoordinateIndex, TableReader};

/// Whether a differential batch asserts or retracts its triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaKind {
    Addition,
    Removal,
}

impl DeltaKind {
    pub fn label(self) -> &'static str {
        match self {
            DeltaKind::Addition => "add",
            DeltaKind::Removal => "rm",
        }
    }
}

/// Novelty probe against the base store. Additions ask whether a key
/// exists at all; removals compare group sizes to detect a key whose
/// entire stored group is being retracted.
pub trait BaseKeyProbe {
    /// Pairs stored under `key` in `perm`, `None` for an absent key.
    fn group_size(&self, perm: Permutation, key: i64) -> Option<u64>;

    fn contains_key(&self, perm: Permutation, key: i64) -> bool {
        self.group_size(perm, key).is_some()
    }
}

impl<I: CoordinateIndex> BaseKeyProbe for TableReader<I> {
    fn group_size(&self, perm: Permutation, key: i64) -> Option<u64> {
        let record = self.index(perm).get(key)?;
        let slot = record.get(perm.wire_id() as usize)?;
        Some(slot.element_count())
    }
}

/// Per-ordering counters accumulated while a build thread streams its
/// key groups. The crossed unique-pair counters are filled in later by
/// the sequential post-pass.
#[derive(Debug, Clone, Copy)]
pub struct UpdateStats {
    kind: DeltaKind,
    valid_triples: u64,
    total_keys: u64,
    new_keys: u64,
    total_count1: u64,
    total_count2: u64,
}

impl UpdateStats {
    pub fn new(kind: DeltaKind) -> Self {
        Self {
            kind,
            valid_triples: 0,
            total_keys: 0,
            new_keys: 0,
            total_count1: 0,
            total_count2: 0,
        }
    }

    pub fn kind(self) -> DeltaKind {
        self.kind
    }

    /// One key group seen. `affects_key_count` means the batch changes
    /// the permutation's key population: an addition under a key the
    /// base lacks, or a removal covering a key's entire stored group.
    pub fn record_key(&mut self, affects_key_count: bool) {
        self.total_keys += 1;
        if affects_key_count {
            self.new_keys += 1;
        }
    }

    /// One key group stored: `n` deduplicated records in each projection.
    pub fn record_group(&mut self, n: u64) {
        self.valid_triples += n;
        self.total_count1 += n;
        self.total_count2 += n;
    }

    /// Finish into the on-disk header once the post-pass has produced
    /// the crossed counters.
    pub fn into_stats(self, crossed_unique1: u64, crossed_unique2: u64) -> OrderingStats {
        OrderingStats {
            valid_triples: self.valid_triples,
            total_keys: self.total_keys,
            crossed_unique1,
            total_count1: self.total_count1,
            crossed_unique2,
            total_count2: self.total_count2,
            new_keys: self.new_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally_into_stats() {
        let mut tally = UpdateStats::new(DeltaKind::Addition);
        tally.record_key(false);
        tally.record_group(4);
        tally.record_key(true);
        tally.record_group(2);
        let stats = tally.into_stats(5, 6);
        assert_eq!(stats.valid_triples, 6);
        assert_eq!(stats.total_keys, 2);
        assert_eq!(stats.new_keys, 1);
        assert_eq!(stats.total_count1, 6);
        assert_eq!(stats.total_count2, 6);
        assert_eq!(stats.crossed_unique1, 5);
        assert_eq!(stats.crossed_unique2, 6);
    }
}
