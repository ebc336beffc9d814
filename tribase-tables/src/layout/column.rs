//! Grouped column layout: a block directory over distinct `field1`
//! values plus a contiguous second column.
//!
//! ## Wire layout
//!
//! ```text
//! size:     u32            bytes following this prefix
//! widths1:  u8             flag(w_value1) << 4 | flag(w_value2)
//! widths2:  u8             flag(w_count)  << 4 | flag(w_offset)
//! n_unique: vlong2         distinct field1 values
//! n_terms:  vlong2         total pairs
//! block × n_unique:
//!   value:  w_value1 bytes
//!   count:  w_count bytes   pairs sharing this value
//!   offset: w_offset bytes  byte offset of the run in the second column
//! second column: n_terms × w_value2 bytes
//! ```
//!
//! Width flags map 0→1, 1→2, 2→4, 3→8 bytes. The leading size prefix
//! makes the table self-delimiting, which the differential index's
//! packed block addressing depends on.
//!
//! Chosen for heavily skewed one-to-many groups: each distinct `field1`
//! is stored once, and a sub-key lookup only touches the directory.

use super::{Entry, Group};
use crate::signature::Signature;
use std::io;
use tribase_core::bytes::{flag_for_width, read_u32, read_u8, read_uw, width_for, width_for_flag, write_uw};
use tribase_core::varint::{read_vlong2, write_vlong2};

#[derive(Debug, Default)]
pub struct ColumnEncoder {
    // block directory scratch, reused across groups
    blocks: Vec<(u64, u64, u64)>,
}

impl ColumnEncoder {
    pub fn encode(&mut self, sig: Signature, group: &Group<'_>, out: &mut Vec<u8>) {
        debug_assert!(!sig.is_aggregated(), "column tables are never aggregated");
        let n = group.len();
        self.blocks.clear();

        let mut max1: u64 = 0;
        let mut max2: u64 = 0;
        let mut max_count: u64 = 0;
        let mut i = 0;
        while i < n {
            let f1 = group.col1[i];
            let mut j = i + 1;
            while j < n && group.col1[j] == f1 {
                j += 1;
            }
            let count = (j - i) as u64;
            self.blocks.push((f1 as u64, count, i as u64));
            max1 = max1.max(f1 as u64);
            max_count = max_count.max(count);
            i = j;
        }
        for &v2 in group.col2 {
            max2 = max2.max(v2 as u64);
        }

        let w1 = width_for(max1);
        let w2 = width_for(max2);
        let wc = width_for(max_count);
        let wo = width_for(n as u64 * w2 as u64);

        let size_pos = out.len();
        out.extend_from_slice(&[0u8; 4]);
        out.push((flag_for_width(w1) << 4) | flag_for_width(w2));
        out.push((flag_for_width(wc) << 4) | flag_for_width(wo));
        write_vlong2(out, self.blocks.len() as u64);
        write_vlong2(out, n as u64);
        for &(value, count, first_idx) in &self.blocks {
            write_uw(out, value, w1);
            write_uw(out, count, wc);
            write_uw(out, first_idx * w2 as u64, wo);
        }
        for &v2 in group.col2 {
            write_uw(out, v2 as u64, w2);
        }

        let size = (out.len() - size_pos - 4) as u32;
        out[size_pos..size_pos + 4].copy_from_slice(&size.to_le_bytes());
    }
}

#[derive(Debug, Clone)]
pub struct ColumnCursor<'a> {
    buf: &'a [u8],
    w1: u8,
    w2: u8,
    wc: u8,
    wo: u8,
    n_unique: u64,
    blocks_start: usize,
    second_start: usize,
    block_idx: u64,
    within: u64,
    // current block, decoded lazily on first access
    cur: Option<(i64, u64, usize)>,
}

impl<'a> ColumnCursor<'a> {
    pub fn new(buf: &'a [u8]) -> io::Result<Self> {
        let mut pos = 0;
        let size = read_u32(buf, &mut pos)? as usize;
        if buf.len() < 4 + size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "column table shorter than its size prefix",
            ));
        }
        let widths1 = read_u8(buf, &mut pos)?;
        let widths2 = read_u8(buf, &mut pos)?;
        let w1 = width_for_flag(widths1 >> 4);
        let w2 = width_for_flag(widths1 & 0x0F);
        let wc = width_for_flag(widths2 >> 4);
        let wo = width_for_flag(widths2 & 0x0F);
        let n_unique = read_vlong2(buf, &mut pos)?;
        let _n_terms = read_vlong2(buf, &mut pos)?;
        let blocks_start = pos;
        let block_len = (w1 + wc + wo) as usize;
        let second_start = blocks_start + n_unique as usize * block_len;
        if second_start > buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "column directory extends past table end",
            ));
        }
        Ok(Self {
            buf,
            w1,
            w2,
            wc,
            wo,
            n_unique,
            blocks_start,
            second_start,
            block_idx: 0,
            within: 0,
            cur: None,
        })
    }

    /// Total byte length of a column table starting at `buf`, from its
    /// size prefix.
    pub fn table_len(buf: &[u8]) -> io::Result<usize> {
        let mut pos = 0;
        let size = read_u32(buf, &mut pos)? as usize;
        Ok(4 + size)
    }

    fn block_len(&self) -> usize {
        (self.w1 + self.wc + self.wo) as usize
    }

    fn read_block(&self, idx: u64) -> io::Result<(i64, u64, usize)> {
        let mut pos = self.blocks_start + idx as usize * self.block_len();
        let value = read_uw(self.buf, &mut pos, self.w1)? as i64;
        let count = read_uw(self.buf, &mut pos, self.wc)?;
        let offset = read_uw(self.buf, &mut pos, self.wo)? as usize;
        Ok((value, count, offset))
    }

    pub fn next_raw(&mut self) -> io::Result<Option<Entry>> {
        loop {
            if self.block_idx >= self.n_unique {
                return Ok(None);
            }
            let (value, count, offset) = match self.cur {
                Some(b) => b,
                None => {
                    let b = self.read_block(self.block_idx)?;
                    self.cur = Some(b);
                    b
                }
            };
            if self.within >= count {
                self.block_idx += 1;
                self.within = 0;
                self.cur = None;
                continue;
            }
            let mut pos = self.second_start + offset + self.within as usize * self.w2 as usize;
            let v2 = read_uw(self.buf, &mut pos, self.w2)? as i64;
            self.within += 1;
            return Ok(Some((value, v2, 1)));
        }
    }

    /// Advance the directory until the current block's value is `>= v1`.
    /// Only ever moves forward.
    pub fn skip_to(&mut self, v1: i64) {
        while self.block_idx < self.n_unique {
            let block = match self.cur {
                Some(b) => b,
                None => match self.read_block(self.block_idx) {
                    Ok(b) => b,
                    // corrupt directory surfaces on the next next_raw()
                    Err(_) => return,
                },
            };
            self.cur = Some(block);
            if block.0 >= v1 {
                return;
            }
            self.block_idx += 1;
            self.within = 0;
            self.cur = None;
        }
    }
}
