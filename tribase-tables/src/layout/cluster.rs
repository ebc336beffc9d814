//! Varint cluster layout: rows grouped by distinct `field1`.
//!
//! ## Wire layout
//!
//! ```text
//! group g (one per distinct field1 value):
//!   field1:  vlong | vlong2   (per compr1); delta vs previous group's
//!                              field1 when the delta bit is clear
//!   count:   vlong             number of pairs in the group
//!   field2 × count:
//!            vlong | vlong2   (per compr2); first value absolute, the
//!                              rest delta vs the previous value2
//! ```
//!
//! Pays off when `field1` repeats in runs: the repeated value and its
//! per-row byte are replaced by one group header, and the sorted
//! `field2` run delta-codes well. Cluster tables are never aggregated.

use super::{read_vfield, write_vfield, Entry, Group};
use crate::signature::{ComprMode, Signature};
use std::io;
use tribase_core::varint::{read_vlong, write_vlong};

#[derive(Debug, Default)]
pub struct ClusterEncoder;

impl ClusterEncoder {
    pub fn encode(&mut self, sig: Signature, group: &Group<'_>, out: &mut Vec<u8>) {
        debug_assert!(!sig.is_aggregated(), "cluster tables are never aggregated");
        let delta = sig.delta_applied();
        let (c1, c2) = (sig.compr1(), sig.compr2());
        let mut prev_group: i64 = 0;
        let mut i = 0;
        let n = group.len();
        while i < n {
            let f1 = group.col1[i];
            let mut j = i + 1;
            while j < n && group.col1[j] == f1 {
                j += 1;
            }
            let enc1 = if delta { f1 - prev_group } else { f1 };
            prev_group = f1;
            write_vfield(out, enc1 as u64, c1);
            write_vlong(out, (j - i) as u64);
            for k in i..j {
                let enc2 = if k == i {
                    group.col2[k]
                } else {
                    group.col2[k] - group.col2[k - 1]
                };
                write_vfield(out, enc2 as u64, c2);
            }
            i = j;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u64,
    group_left: u64,
    cur1: i64,
    prev_group: i64,
    prev2: i64,
    delta: bool,
    c1: ComprMode,
    c2: ComprMode,
}

impl<'a> ClusterCursor<'a> {
    pub fn new(sig: Signature, buf: &'a [u8], n_elements: u64) -> Self {
        Self {
            buf,
            pos: 0,
            remaining: n_elements,
            group_left: 0,
            cur1: 0,
            prev_group: 0,
            prev2: 0,
            delta: sig.delta_applied(),
            c1: sig.compr1(),
            c2: sig.compr2(),
        }
    }

    pub fn next_raw(&mut self) -> io::Result<Option<Entry>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.group_left == 0 {
            let raw1 = read_vfield(self.buf, &mut self.pos, self.c1)? as i64;
            self.cur1 = if self.delta {
                self.prev_group + raw1
            } else {
                raw1
            };
            self.prev_group = self.cur1;
            self.group_left = read_vlong(self.buf, &mut self.pos)?;
            if self.group_left == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "empty cluster group",
                ));
            }
            let first = read_vfield(self.buf, &mut self.pos, self.c2)? as i64;
            self.prev2 = first;
        } else {
            let d = read_vfield(self.buf, &mut self.pos, self.c2)? as i64;
            self.prev2 += d;
        }
        self.group_left -= 1;
        self.remaining -= 1;
        Ok(Some((self.cur1, self.prev2, 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::StorageFormat;

    fn round_trip(sig: Signature, col1: &[i64], col2: &[i64]) -> Vec<Entry> {
        let counts = vec![1u64; col1.len()];
        let mut out = Vec::new();
        ClusterEncoder.encode(sig, &Group::new(col1, col2, &counts), &mut out);
        let mut cursor = ClusterCursor::new(sig, &out, col1.len() as u64);
        let mut entries = Vec::new();
        while let Some(e) = cursor.next_raw().unwrap() {
            entries.push(e);
        }
        entries
    }

    #[test]
    fn test_round_trip_all_mode_combinations() {
        let col1 = [4i64, 4, 4, 9, 9, 100_000, 100_000, 100_000, 100_001];
        let col2 = [1i64, 2, 900, 5, 80_000, 1, 2, 3, 77];
        for delta in [true, false] {
            for c1 in [ComprMode::VLong, ComprMode::VLong2] {
                for c2 in [ComprMode::VLong, ComprMode::VLong2] {
                    let sig = Signature::new(StorageFormat::Cluster)
                        .with_delta(delta)
                        .with_compr1(c1)
                        .with_compr2(c2);
                    let entries = round_trip(sig, &col1, &col2);
                    let expect: Vec<Entry> = col1
                        .iter()
                        .zip(&col2)
                        .map(|(&a, &b)| (a, b, 1))
                        .collect();
                    assert_eq!(entries, expect, "delta={} {:?}/{:?}", delta, c1, c2);
                }
            }
        }
    }

    #[test]
    fn test_beats_row_on_repeated_first_field() {
        let col1 = vec![123_456i64; 500];
        let col2: Vec<i64> = (0..500).map(|i| 1_000 + i).collect();
        let counts = vec![1u64; 500];
        let group = Group::new(&col1, &col2, &counts);

        let mut clustered = Vec::new();
        ClusterEncoder.encode(
            Signature::new(StorageFormat::Cluster),
            &group,
            &mut clustered,
        );
        let mut rowed = Vec::new();
        super::super::row::RowEncoder.encode(Signature::new(StorageFormat::Row), &group, &mut rowed);
        assert!(clustered.len() < rowed.len());
    }

    #[test]
    fn test_single_element_group() {
        let entries = round_trip(Signature::new(StorageFormat::Cluster), &[42], &[7]);
        assert_eq!(entries, vec![(42, 7, 1)]);
    }
}
