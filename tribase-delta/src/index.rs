//! Read path over a built differential index.
//!
//! Lookups go key index → coordinate slot → packed address → cursor,
//! the same shape as the base store's read path, except that a
//! permutation resolves to one of three shared ordering directories and
//! to one of its two projection files.

use crate::builder::KEYS_FILE_NAME;
use crate::error::{DeltaError, Result};
use crate::ordering::{auxiliary_slot, TermOrdering};
use crate::stats::OrderingStats;
use crate::store::{PackedAddress, PROJECTION_FILE_NAMES};
use crate::update::DeltaKind;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tribase_core::{CoordinateSlot, Permutation};
use tribase_tables::{CoordinateIndex, FileCoordinateIndex, Signature, TableCursor, TableReader};

struct LoadedOrdering {
    index: FileCoordinateIndex,
    stats: OrderingStats,
    maps: [Option<Mmap>; 2],
}

fn load_ordering(root: &Path, ordering: TermOrdering) -> Result<LoadedOrdering> {
    let dir = root.join(ordering.dir_name());
    let index = FileCoordinateIndex::load(&dir.join(KEYS_FILE_NAME))?;
    let stats = OrderingStats::load(&dir)?;
    let mut maps = [None, None];
    for (i, name) in PROJECTION_FILE_NAMES.iter().enumerate() {
        let file = File::open(dir.join(name))?;
        if file.metadata()?.len() > 0 {
            maps[i] = Some(unsafe { Mmap::map(&file)? });
        }
    }
    Ok(LoadedOrdering { index, stats, maps })
}

/// One sealed differential batch, opened read-only.
pub struct DeltaIndex {
    kind: DeltaKind,
    orderings: [LoadedOrdering; 3],
}

impl DeltaIndex {
    pub fn open(root: &Path, kind: DeltaKind) -> Result<Self> {
        Ok(Self {
            kind,
            orderings: [
                load_ordering(root, TermOrdering::ByFirst)?,
                load_ordering(root, TermOrdering::BySecond)?,
                load_ordering(root, TermOrdering::ByThird)?,
            ],
        })
    }

    pub fn kind(&self) -> DeltaKind {
        self.kind
    }

    pub fn stats(&self, ordering: TermOrdering) -> &OrderingStats {
        &self.orderings[ordering as usize].stats
    }

    /// Distinct keys the batch touches in `perm`.
    pub fn unique_first_term_count(&self, perm: Permutation) -> u64 {
        let (ordering, _) = TermOrdering::of_permutation(perm);
        self.orderings[ordering as usize].index.len() as u64
    }

    /// Keys this batch adds to or retires from `perm`'s key population:
    /// for additions, keys absent from the base at build time; for
    /// removals, keys whose entire base group was retracted.
    pub fn new_key_count(&self, perm: Permutation) -> u64 {
        let (ordering, _) = TermOrdering::of_permutation(perm);
        self.orderings[ordering as usize].stats.new_keys
    }

    /// The live coordinate slot for `key` in `perm`, if present.
    pub fn lookup(&self, perm: Permutation, key: i64) -> Option<CoordinateSlot> {
        let (ordering, _) = TermOrdering::of_permutation(perm);
        self.orderings[ordering as usize]
            .index
            .get(key)?
            .get(perm.wire_id() as usize)
            .copied()
    }

    /// The per-key unique-first-term counter the post-pass stashed in
    /// the idle slot paired with `perm`.
    pub fn first_term_count(&self, perm: Permutation, key: i64) -> Option<u64> {
        let (ordering, _) = TermOrdering::of_permutation(perm);
        let record = self.orderings[ordering as usize].index.get(key)?;
        Some(record.auxiliary_first_term_count(auxiliary_slot(perm.wire_id() as usize)))
    }

    /// Cursor over one key's group, or `None` for an absent key.
    pub fn iterator(
        &self,
        perm: Permutation,
        key: i64,
        c1: Option<i64>,
        c2: Option<i64>,
    ) -> Result<Option<TableCursor<'_>>> {
        let (ordering, proj) = TermOrdering::of_permutation(perm);
        let loaded = &self.orderings[ordering as usize];
        let slot = match self.lookup(perm, key) {
            Some(slot) => slot,
            None => return Ok(None),
        };
        let sig = Signature::from_byte(slot.signature)?;
        let map = loaded.maps[proj].as_deref().ok_or_else(|| {
            DeltaError::Decode(format!(
                "coordinates reference empty {}/{} file",
                ordering.dir_name(),
                PROJECTION_FILE_NAMES[proj]
            ))
        })?;
        let begin = PackedAddress::from_slot(&slot).position() as usize;
        if begin > map.len() {
            return Err(DeltaError::Decode(format!(
                "address {} past end of {}/{} ({} bytes)",
                begin,
                ordering.dir_name(),
                PROJECTION_FILE_NAMES[proj],
                map.len()
            )));
        }
        let span = &map[begin..];
        let cursor = match c1 {
            Some(c1) => TableCursor::with_constraint(sig, span, slot.n_elements, c1, c2)?,
            None => TableCursor::new(sig, span, slot.n_elements)?,
        };
        Ok(Some(cursor))
    }

    /// Records under `key`, optionally constrained to `v1` (and `v2`).
    pub fn cardinality(
        &self,
        perm: Permutation,
        key: i64,
        v1: Option<i64>,
        v2: Option<i64>,
    ) -> Result<u64> {
        let slot = match self.lookup(perm, key) {
            Some(slot) => slot,
            None => return Ok(0),
        };
        if v1.is_none() {
            return Ok(slot.n_elements);
        }
        match self.iterator(perm, key, v1, v2)? {
            Some(mut cursor) => Ok(cursor.remaining_count()?),
            None => Ok(0),
        }
    }
}

/// The base store with differential batches registered against it.
/// Count queries answered through the view reflect the batches: each
/// registered addition contributes the keys the base had never seen,
/// each removal subtracts the keys it fully retracted.
pub struct StoreView<'a, I> {
    base: &'a TableReader<I>,
    deltas: Vec<&'a DeltaIndex>,
}

impl<'a, I: CoordinateIndex> StoreView<'a, I> {
    pub fn new(base: &'a TableReader<I>) -> Self {
        Self {
            base,
            deltas: Vec::new(),
        }
    }

    pub fn register(&mut self, delta: &'a DeltaIndex) {
        self.deltas.push(delta);
    }

    pub fn base(&self) -> &TableReader<I> {
        self.base
    }

    pub fn deltas(&self) -> &[&'a DeltaIndex] {
        &self.deltas
    }

    /// Distinct keys in `perm`, adjusted by every registered batch.
    pub fn unique_first_term_count(&self, perm: Permutation) -> u64 {
        let mut count = self.base.unique_first_term_count(perm);
        for delta in &self.deltas {
            let new_keys = delta.new_key_count(perm);
            match delta.kind() {
                DeltaKind::Addition => count += new_keys,
                DeltaKind::Removal => count = count.saturating_sub(new_keys),
            }
        }
        count
    }
}

