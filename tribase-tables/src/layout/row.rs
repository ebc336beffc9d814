//! Varint row layout: interleaved `(field1, field2)` rows.
//!
//! ## Wire layout
//!
//! ```text
//! row i:
//!   field1:  vlong | vlong2   (per compr1); delta vs previous row's
//!                              field1 when the delta bit is clear,
//!                              first row against 0
//!   field2:  vlong | vlong2   (per compr2), always absolute
//!   count:   vlong             only when aggregated
//! ```
//!
//! Delta coding relies on `col1` being sorted ascending, so encoded
//! deltas are never negative.

use super::{read_vfield, write_vfield, Entry, Group};
use crate::signature::{ComprMode, Signature};
use std::io;
use tribase_core::varint::{read_vlong, write_vlong};

#[derive(Debug, Default)]
pub struct RowEncoder;

impl RowEncoder {
    pub fn encode(&mut self, sig: Signature, group: &Group<'_>, out: &mut Vec<u8>) {
        let delta = sig.delta_applied();
        let aggregated = sig.is_aggregated();
        let (c1, c2) = (sig.compr1(), sig.compr2());
        let mut prev1: i64 = 0;
        for i in 0..group.len() {
            let f1 = group.col1[i];
            let enc1 = if delta { f1 - prev1 } else { f1 };
            prev1 = f1;
            write_vfield(out, enc1 as u64, c1);
            write_vfield(out, group.col2[i] as u64, c2);
            if aggregated {
                write_vlong(out, group.counts[i]);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RowCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u64,
    prev1: i64,
    delta: bool,
    aggregated: bool,
    c1: ComprMode,
    c2: ComprMode,
}

impl<'a> RowCursor<'a> {
    pub fn new(sig: Signature, buf: &'a [u8], n_elements: u64) -> Self {
        Self {
            buf,
            pos: 0,
            remaining: n_elements,
            prev1: 0,
            delta: sig.delta_applied(),
            aggregated: sig.is_aggregated(),
            c1: sig.compr1(),
            c2: sig.compr2(),
        }
    }

    pub fn next_raw(&mut self) -> io::Result<Option<Entry>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let raw1 = read_vfield(self.buf, &mut self.pos, self.c1)? as i64;
        let v1 = if self.delta { self.prev1 + raw1 } else { raw1 };
        self.prev1 = v1;
        let v2 = read_vfield(self.buf, &mut self.pos, self.c2)? as i64;
        let count = if self.aggregated {
            read_vlong(self.buf, &mut self.pos)?
        } else {
            1
        };
        self.remaining -= 1;
        Ok(Some((v1, v2, count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::StorageFormat;

    fn round_trip(sig: Signature, col1: &[i64], col2: &[i64], counts: &[u64]) -> Vec<Entry> {
        let mut out = Vec::new();
        RowEncoder.encode(sig, &Group::new(col1, col2, counts), &mut out);
        let mut cursor = RowCursor::new(sig, &out, col1.len() as u64);
        let mut entries = Vec::new();
        while let Some(e) = cursor.next_raw().unwrap() {
            entries.push(e);
        }
        entries
    }

    #[test]
    fn test_round_trip_all_mode_combinations() {
        let col1 = [5i64, 5, 9, 300, 300, 70_000];
        let col2 = [1i64, 80_000, 2, 2, 90, 1];
        let counts = [1u64; 6];
        for delta in [true, false] {
            for c1 in [ComprMode::VLong, ComprMode::VLong2] {
                for c2 in [ComprMode::VLong, ComprMode::VLong2] {
                    let sig = Signature::new(StorageFormat::Row)
                        .with_delta(delta)
                        .with_compr1(c1)
                        .with_compr2(c2);
                    let entries = round_trip(sig, &col1, &col2, &counts);
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
    fn test_aggregated_counts_round_trip() {
        let sig = Signature::new(StorageFormat::Row).with_aggregated(true);
        let entries = round_trip(sig, &[1, 1, 2], &[10, 11, 10], &[3, 1, 7]);
        assert_eq!(entries, vec![(1, 10, 3), (1, 11, 1), (2, 10, 7)]);
    }

    #[test]
    fn test_delta_shrinks_dense_groups() {
        let col1: Vec<i64> = (0..200).map(|i| 1_000_000 + i / 2).collect();
        let col2 = vec![1i64; 200];
        let counts = vec![1u64; 200];
        let base = Signature::new(StorageFormat::Row);
        let mut with_delta = Vec::new();
        let mut without = Vec::new();
        RowEncoder.encode(
            base.with_delta(true),
            &Group::new(&col1, &col2, &counts),
            &mut with_delta,
        );
        RowEncoder.encode(
            base.with_delta(false),
            &Group::new(&col1, &col2, &counts),
            &mut without,
        );
        assert!(with_delta.len() < without.len());
    }
}
