//! Base-store read path: key → coordinates → signature → cursor.
//!
//! Readers map each permutation's finalized table file read-only and
//! decode straight out of the mapping; encoded bytes and coordinate
//! records are immutable once written, so concurrent readers need no
//! locking.

use crate::coord_index::CoordinateIndex;
use crate::error::Result;
use crate::layout::TableCursor;
use crate::signature::Signature;
use crate::storage::TableStorage;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tribase_core::permutation::ALL_PERMUTATIONS;
use tribase_core::{CoordinateSlot, Permutation};

pub struct TableReader<I> {
    maps: Vec<Option<Mmap>>,
    indexes: [I; 6],
}

impl<I: CoordinateIndex> TableReader<I> {
    /// Map every permutation's finalized table file under `root`.
    /// Missing or empty files are fine: a store may hold only
    /// reference-only coordinates.
    pub fn open(root: &Path, indexes: [I; 6]) -> Result<Self> {
        let mut maps = Vec::with_capacity(6);
        for perm in ALL_PERMUTATIONS {
            let path = TableStorage::file_path(root, perm);
            let map = match File::open(&path) {
                Ok(file) => {
                    if file.metadata()?.len() == 0 {
                        None
                    } else {
                        Some(unsafe { Mmap::map(&file)? })
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            maps.push(map);
        }
        Ok(Self { maps, indexes })
    }

    pub fn index(&self, perm: Permutation) -> &I {
        &self.indexes[perm.wire_id() as usize]
    }

    /// Number of distinct keys in one permutation.
    pub fn unique_first_term_count(&self, perm: Permutation) -> u64 {
        self.indexes[perm.wire_id() as usize].len() as u64
    }

    /// Cursor over one key's group, or `None` for an absent key.
    /// `c1`/`c2` constrain iteration to a sub-key; `c2` requires `c1`.
    pub fn resolve_iterator(
        &self,
        perm: Permutation,
        key: i64,
        c1: Option<i64>,
        c2: Option<i64>,
    ) -> Result<Option<TableCursor<'_>>> {
        let slot = match self.lookup(perm, key) {
            Some(slot) => slot,
            None => return Ok(None),
        };
        self.resolve_with_slot(perm, slot, c1, c2).map(Some)
    }

    /// Cursor for already-resolved coordinates (the query layer caches
    /// them across scans).
    pub fn resolve_with_slot(
        &self,
        perm: Permutation,
        slot: CoordinateSlot,
        c1: Option<i64>,
        c2: Option<i64>,
    ) -> Result<TableCursor<'_>> {
        if let Some((v1, v2)) = slot.reference_values() {
            let matches =
                c1.map_or(true, |c| c == v1) && c2.map_or(true, |c| c == v2);
            return Ok(if matches {
                TableCursor::inline(v1, v2)
            } else {
                TableCursor::empty()
            });
        }
        let sig = Signature::from_byte(slot.signature)?;
        let map = self.maps[perm.wire_id() as usize]
            .as_deref()
            .ok_or_else(|| {
                crate::error::TableError::Decode(format!(
                    "coordinates reference unmapped {} table",
                    perm.dir_name()
                ))
            })?;
        let begin = slot.mark as usize;
        if begin > map.len() {
            return Err(crate::error::TableError::Decode(format!(
                "mark {} past end of {} table ({} bytes)",
                begin,
                perm.dir_name(),
                map.len()
            )));
        }
        let span = &map[begin..];
        match c1 {
            Some(c1) => TableCursor::with_constraint(sig, span, slot.n_elements, c1, c2),
            None => TableCursor::new(sig, span, slot.n_elements),
        }
    }

    fn lookup(&self, perm: Permutation, key: i64) -> Option<CoordinateSlot> {
        self.indexes[perm.wire_id() as usize]
            .get(key)?
            .get(perm.wire_id() as usize)
            .copied()
    }

    /// Raw-pair cardinality under a bound prefix of `(key, v1, v2)`.
    /// `skip_last` drops the last bound constraint before counting, the
    /// way the query layer counts one level up a scan. Unbound key sums
    /// the whole permutation.
    pub fn get_cardinality(
        &self,
        perm: Permutation,
        key: Option<i64>,
        v1: Option<i64>,
        v2: Option<i64>,
        skip_last: bool,
    ) -> Result<u64> {
        let (key, v1, v2) = if skip_last {
            if v2.is_some() {
                (key, v1, None)
            } else if v1.is_some() {
                (key, None, None)
            } else {
                (None, None, None)
            }
        } else {
            (key, v1, v2)
        };

        let key = match key {
            Some(k) => k,
            None => {
                let mut total = 0;
                let index = &self.indexes[perm.wire_id() as usize];
                for (_, record) in index.iter() {
                    if let Some(slot) = record.get(perm.wire_id() as usize) {
                        total += self.slot_total(perm, *slot)?;
                    }
                }
                return Ok(total);
            }
        };

        let slot = match self.lookup(perm, key) {
            Some(slot) => slot,
            None => return Ok(0),
        };
        if v1.is_none() {
            return self.slot_total(perm, slot);
        }
        let mut cursor = self.resolve_with_slot(perm, slot, v1, v2)?;
        cursor.remaining_count()
    }

    /// Total raw pairs under one slot. Aggregated tables store distinct
    /// pairs, so their raw total needs a decode pass over the counts.
    fn slot_total(&self, perm: Permutation, slot: CoordinateSlot) -> Result<u64> {
        if slot.is_reference_only() {
            return Ok(1);
        }
        let sig = Signature::from_byte(slot.signature)?;
        if !sig.is_aggregated() {
            return Ok(slot.element_count());
        }
        let mut cursor = self.resolve_with_slot(perm, slot, None, None)?;
        cursor.remaining_count()
    }
}
