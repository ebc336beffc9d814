//! Fixed-width row layout: interleaved `(field1, field2)` at widths
//! declared by the signature's width flags.
//!
//! ## Wire layout
//!
//! ```text
//! row i:
//!   field1: width1 bytes, little-endian
//!   field2: width2 bytes, little-endian
//!   count:  u32              only when aggregated
//! ```
//!
//! The 16 `(width1, width2)` encode/decode pairs live in one dispatch
//! table indexed `(width_flag1 << 2) | width_flag2`, so the per-row hot
//! path is a single indirect call with no width branching.

use super::{Entry, Group};
use crate::signature::Signature;
use std::io;
use tribase_core::bytes::{read_u32, read_uw, write_uw};

/// Rows at or below this count are seeked by the cursor wrapper's
/// sequential consume loop; above it `skip_to` binary-searches.
const SEEK_LINEAR_MAX: u64 = 64;

/// One pre-built encoder/decoder pair for a fixed `(width1, width2)`.
pub struct FieldPairCodec {
    pub width1: u8,
    pub width2: u8,
    pub write: fn(&mut Vec<u8>, u64, u64),
    pub read: fn(&[u8], &mut usize) -> io::Result<(u64, u64)>,
}

fn write_pair<const W1: u8, const W2: u8>(out: &mut Vec<u8>, a: u64, b: u64) {
    write_uw(out, a, W1);
    write_uw(out, b, W2);
}

fn read_pair<const W1: u8, const W2: u8>(buf: &[u8], pos: &mut usize) -> io::Result<(u64, u64)> {
    let a = read_uw(buf, pos, W1)?;
    let b = read_uw(buf, pos, W2)?;
    Ok((a, b))
}

macro_rules! codec {
    ($w1:literal, $w2:literal) => {
        FieldPairCodec {
            width1: $w1,
            width2: $w2,
            write: write_pair::<$w1, $w2>,
            read: read_pair::<$w1, $w2>,
        }
    };
}

/// All 16 width combinations, indexed `(width_flag1 << 2) | width_flag2`
/// with flags ordered 1, 2, 4, 8 bytes.
pub static FIELD_PAIR_CODECS: [FieldPairCodec; 16] = [
    codec!(1, 1),
    codec!(1, 2),
    codec!(1, 4),
    codec!(1, 8),
    codec!(2, 1),
    codec!(2, 2),
    codec!(2, 4),
    codec!(2, 8),
    codec!(4, 1),
    codec!(4, 2),
    codec!(4, 4),
    codec!(4, 8),
    codec!(8, 1),
    codec!(8, 2),
    codec!(8, 4),
    codec!(8, 8),
];

#[derive(Debug, Default)]
pub struct FixedRowEncoder;

impl FixedRowEncoder {
    pub fn encode(&mut self, sig: Signature, group: &Group<'_>, out: &mut Vec<u8>) {
        let codec = &FIELD_PAIR_CODECS[sig.width_pair_index()];
        let aggregated = sig.is_aggregated();
        for i in 0..group.len() {
            (codec.write)(out, group.col1[i] as u64, group.col2[i] as u64);
            if aggregated {
                out.extend_from_slice(&(group.counts[i] as u32).to_le_bytes());
            }
        }
    }
}

#[derive(Clone)]
pub struct FixedRowCursor<'a> {
    buf: &'a [u8],
    codec: &'static FieldPairCodec,
    aggregated: bool,
    stride: usize,
    total: u64,
    idx: u64,
}

impl std::fmt::Debug for FixedRowCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedRowCursor")
            .field("width1", &self.codec.width1)
            .field("width2", &self.codec.width2)
            .field("idx", &self.idx)
            .field("total", &self.total)
            .finish()
    }
}

impl<'a> FixedRowCursor<'a> {
    pub fn new(sig: Signature, buf: &'a [u8], n_elements: u64) -> Self {
        let codec = &FIELD_PAIR_CODECS[sig.width_pair_index()];
        let aggregated = sig.is_aggregated();
        let mut stride = (codec.width1 + codec.width2) as usize;
        if aggregated {
            stride += 4;
        }
        Self {
            buf,
            codec,
            aggregated,
            stride,
            total: n_elements,
            idx: 0,
        }
    }

    pub fn next_raw(&mut self) -> io::Result<Option<Entry>> {
        if self.idx >= self.total {
            return Ok(None);
        }
        let mut pos = self.idx as usize * self.stride;
        let (a, b) = (self.codec.read)(self.buf, &mut pos)?;
        let count = if self.aggregated {
            u64::from(read_u32(self.buf, &mut pos)?)
        } else {
            1
        };
        self.idx += 1;
        Ok(Some((a as i64, b as i64, count)))
    }

    fn field1_at(&self, idx: u64) -> io::Result<i64> {
        let mut pos = idx as usize * self.stride;
        Ok(read_uw(self.buf, &mut pos, self.codec.width1)? as i64)
    }

    /// Binary-search forward to the first row with `field1 >= v1`. Small
    /// remainders are left for the wrapper's sequential loop.
    pub fn skip_to(&mut self, v1: i64) {
        if self.total - self.idx <= SEEK_LINEAR_MAX {
            return;
        }
        let mut lo = self.idx;
        let mut hi = self.total;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.field1_at(mid) {
                Ok(f1) if f1 < v1 => lo = mid + 1,
                Ok(_) => hi = mid,
                // corrupt span surfaces on the next next_raw()
                Err(_) => return,
            }
        }
        self.idx = lo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::StorageFormat;

    fn sig_for(w1: u8, w2: u8) -> Signature {
        Signature::new(StorageFormat::FixedRow).with_widths(w1, w2)
    }

    #[test]
    fn test_round_trip_all_16_width_combinations() {
        for w1 in [1u8, 2, 4, 8] {
            for w2 in [1u8, 2, 4, 8] {
                let max1 = (1i64 << (8 * w1.min(7) - 1)) - 1;
                let max2 = (1i64 << (8 * w2.min(7) - 1)) - 1;
                let col1 = [0i64, 1, max1 / 2, max1];
                let col2 = [max2, 0, max2 / 3, 1];
                let counts = [1u64; 4];
                let sig = sig_for(w1, w2);
                let mut out = Vec::new();
                FixedRowEncoder.encode(sig, &Group::new(&col1, &col2, &counts), &mut out);
                assert_eq!(out.len(), 4 * (w1 + w2) as usize);
                let mut cursor = FixedRowCursor::new(sig, &out, 4);
                for (&a, &b) in col1.iter().zip(&col2) {
                    assert_eq!(cursor.next_raw().unwrap(), Some((a, b, 1)), "{}x{}", w1, w2);
                }
                assert_eq!(cursor.next_raw().unwrap(), None);
            }
        }
    }

    #[test]
    fn test_codec_table_index_agrees_with_signature() {
        for w1 in [1u8, 2, 4, 8] {
            for w2 in [1u8, 2, 4, 8] {
                let codec = &FIELD_PAIR_CODECS[sig_for(w1, w2).width_pair_index()];
                assert_eq!((codec.width1, codec.width2), (w1, w2));
            }
        }
    }

    #[test]
    fn test_aggregated_rows_carry_u32_counts() {
        let sig = sig_for(2, 2).with_aggregated(true);
        let col1 = [10i64, 20];
        let col2 = [1i64, 2];
        let counts = [7u64, 100_000];
        let mut out = Vec::new();
        FixedRowEncoder.encode(sig, &Group::new(&col1, &col2, &counts), &mut out);
        assert_eq!(out.len(), 2 * (2 + 2 + 4));
        let mut cursor = FixedRowCursor::new(sig, &out, 2);
        assert_eq!(cursor.next_raw().unwrap(), Some((10, 1, 7)));
        assert_eq!(cursor.next_raw().unwrap(), Some((20, 2, 100_000)));
    }

    #[test]
    fn test_skip_to_binary_search() {
        let n = 1_000i64;
        let col1: Vec<i64> = (0..n).map(|i| i * 2).collect();
        let col2: Vec<i64> = (0..n).collect();
        let counts = vec![1u64; n as usize];
        let sig = sig_for(2, 2);
        let mut out = Vec::new();
        FixedRowEncoder.encode(sig, &Group::new(&col1, &col2, &counts), &mut out);

        let mut cursor = FixedRowCursor::new(sig, &out, n as u64);
        cursor.skip_to(999);
        assert_eq!(cursor.next_raw().unwrap(), Some((1000, 500, 1)));
        // never backward
        cursor.skip_to(0);
        assert_eq!(cursor.next_raw().unwrap(), Some((1002, 501, 1)));
    }
}
