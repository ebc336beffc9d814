//! Fixed-width cluster layout: `(field1, count, field2 × count)` groups.
//!
//! ## Wire layout
//!
//! ```text
//! group g (one per distinct field1 value):
//!   field1: width1 bytes, little-endian
//!   count:  1 or 4 bytes    per the signature's count-width flag
//!   field2 × count: width2 bytes each
//! ```
//!
//! The count width is fixed for the whole table from the largest group
//! (1 byte when every group holds ≤ 255 pairs). Because bit 0 of the
//! signature carries that flag, this format is never aggregated.

use super::{Entry, Group};
use crate::signature::Signature;
use std::io;
use tribase_core::bytes::{read_u32, read_u8, read_uw, write_uw};

#[derive(Debug, Default)]
pub struct FixedClusterEncoder;

impl FixedClusterEncoder {
    pub fn encode(&mut self, sig: Signature, group: &Group<'_>, out: &mut Vec<u8>) {
        let (w1, w2) = (sig.width1(), sig.width2());
        let cw = sig.count_width();
        let n = group.len();
        let mut i = 0;
        while i < n {
            let f1 = group.col1[i];
            let mut j = i + 1;
            while j < n && group.col1[j] == f1 {
                j += 1;
            }
            write_uw(out, f1 as u64, w1);
            let count = (j - i) as u64;
            if cw == 1 {
                debug_assert!(count <= 255, "count width 1 with group of {}", count);
                out.push(count as u8);
            } else {
                out.extend_from_slice(&(count as u32).to_le_bytes());
            }
            for k in i..j {
                write_uw(out, group.col2[k] as u64, w2);
            }
            i = j;
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixedClusterCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u64,
    group_left: u64,
    cur1: i64,
    w1: u8,
    w2: u8,
    cw: u8,
}

impl<'a> FixedClusterCursor<'a> {
    pub fn new(sig: Signature, buf: &'a [u8], n_elements: u64) -> Self {
        Self {
            buf,
            pos: 0,
            remaining: n_elements,
            group_left: 0,
            cur1: 0,
            w1: sig.width1(),
            w2: sig.width2(),
            cw: sig.count_width(),
        }
    }

    fn read_count(&mut self) -> io::Result<u64> {
        if self.cw == 1 {
            read_u8(self.buf, &mut self.pos).map(u64::from)
        } else {
            read_u32(self.buf, &mut self.pos).map(u64::from)
        }
    }

    pub fn next_raw(&mut self) -> io::Result<Option<Entry>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if self.group_left == 0 {
            self.cur1 = read_uw(self.buf, &mut self.pos, self.w1)? as i64;
            self.group_left = self.read_count()?;
            if self.group_left == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "empty fixed-cluster group",
                ));
            }
        }
        let v2 = read_uw(self.buf, &mut self.pos, self.w2)? as i64;
        self.group_left -= 1;
        self.remaining -= 1;
        Ok(Some((self.cur1, v2, 1)))
    }

    /// Hop whole groups (header + `count × width2` bytes) until the next
    /// group's value is `>= v1`. Forward only.
    pub fn skip_to(&mut self, v1: i64) {
        if self.group_left > 0 {
            // mid-group: the wrapper's consume loop finishes this group
            return;
        }
        while self.remaining > 0 {
            let saved = self.pos;
            let mut pos = self.pos;
            let f1 = match read_uw(self.buf, &mut pos, self.w1) {
                Ok(v) => v as i64,
                Err(_) => return,
            };
            if f1 >= v1 {
                self.pos = saved;
                return;
            }
            self.pos = pos;
            let count = match self.read_count() {
                Ok(c) => c,
                Err(_) => return,
            };
            self.pos += count as usize * self.w2 as usize;
            self.remaining = self.remaining.saturating_sub(count);
        }
    }
}
