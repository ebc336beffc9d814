//! Coordinate records: where one key's encoded group lives on disk.
//!
//! Every key carries six slots, one per permutation. The differential
//! index keys three shared indexes instead of six, so for each key two
//! slots hold live coordinates and two otherwise-idle slots are reused to
//! carry "unique first-term count" statistics. That reuse is a deliberate
//! space trick, not a format extension; it is confined to the
//! `auxiliary_first_term_count` accessors below so nothing else in the
//! workspace needs to know about it.
//!
//! ## Wire layout (115 bytes, little-endian)
//!
//! ```text
//! active:  u8            [0]        bitmask, bit i = slot i active
//! slot i (19 bytes each) [1 + 19*i ..]:
//!   file_id:    u16      [+0..+2]   u16::MAX = reference-only sentinel
//!   mark:       u64      [+2..+10]  byte offset (or value1 if reference)
//!   n_elements: u64      [+10..+18] group size (or value2 if reference)
//!   signature:  u8       [+18]
//! ```

use crate::bytes::{read_u16, read_u64, read_u8};
use std::io;

/// Wire size of one six-slot coordinate record.
pub const COORD_WIRE_SIZE: usize = 1 + 6 * 19;

/// `file_id` sentinel marking a reference-only slot: the group was a
/// single pair small enough to pack into the coordinate itself, so no
/// table bytes exist for it.
pub const SKIP_FILE_ID: u16 = u16::MAX;

/// One permutation's coordinates for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinateSlot {
    pub file_id: u16,
    pub mark: u64,
    pub n_elements: u64,
    pub signature: u8,
}

impl CoordinateSlot {
    /// A slot for a single-pair group stored inline: `v1` rides in `mark`
    /// and `v2` in `n_elements`. Values must be non-negative (term ids).
    pub fn reference_only(v1: i64, v2: i64) -> Self {
        Self {
            file_id: SKIP_FILE_ID,
            mark: v1 as u64,
            n_elements: v2 as u64,
            signature: 0,
        }
    }

    #[inline]
    pub fn is_reference_only(&self) -> bool {
        self.file_id == SKIP_FILE_ID
    }

    /// The inline pair of a reference-only slot.
    pub fn reference_values(&self) -> Option<(i64, i64)> {
        if self.is_reference_only() {
            Some((self.mark as i64, self.n_elements as i64))
        } else {
            None
        }
    }

    /// Number of pairs in the group this slot points at. Reference-only
    /// slots always hold exactly one pair.
    #[inline]
    pub fn element_count(&self) -> u64 {
        if self.is_reference_only() {
            1
        } else {
            self.n_elements
        }
    }
}

/// Six coordinate slots, one per permutation wire id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinateRecord {
    slots: [CoordinateSlot; 6],
    active: u8,
}

impl CoordinateRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate slot `idx` with the given coordinates.
    pub fn set(&mut self, idx: usize, slot: CoordinateSlot) {
        assert!(idx < 6, "slot index out of range: {}", idx);
        self.slots[idx] = slot;
        self.active |= 1 << idx;
    }

    /// The slot for permutation `idx`, if active.
    pub fn get(&self, idx: usize) -> Option<&CoordinateSlot> {
        assert!(idx < 6, "slot index out of range: {}", idx);
        if self.active & (1 << idx) != 0 {
            Some(&self.slots[idx])
        } else {
            None
        }
    }

    pub fn is_active(&self, idx: usize) -> bool {
        idx < 6 && self.active & (1 << idx) != 0
    }

    /// Stash a unique-first-term counter in an idle slot's `n_elements`
    /// field without activating the slot. Panics if the slot is active:
    /// the counter must never clobber live coordinates.
    pub fn set_auxiliary_first_term_count(&mut self, idx: usize, count: u64) {
        assert!(idx < 6, "slot index out of range: {}", idx);
        assert!(
            self.active & (1 << idx) == 0,
            "auxiliary counter would overwrite active slot {}",
            idx
        );
        self.slots[idx] = CoordinateSlot {
            file_id: 0,
            mark: 0,
            n_elements: count,
            signature: 0,
        };
    }

    /// Read back a counter stashed by
    /// [`set_auxiliary_first_term_count`](Self::set_auxiliary_first_term_count).
    pub fn auxiliary_first_term_count(&self, idx: usize) -> u64 {
        assert!(idx < 6, "slot index out of range: {}", idx);
        self.slots[idx].n_elements
    }

    /// Serialize to [`COORD_WIRE_SIZE`] bytes, little-endian.
    pub fn write_le(&self, buf: &mut [u8; COORD_WIRE_SIZE]) {
        buf[0] = self.active;
        for (i, slot) in self.slots.iter().enumerate() {
            let off = 1 + 19 * i;
            buf[off..off + 2].copy_from_slice(&slot.file_id.to_le_bytes());
            buf[off + 2..off + 10].copy_from_slice(&slot.mark.to_le_bytes());
            buf[off + 10..off + 18].copy_from_slice(&slot.n_elements.to_le_bytes());
            buf[off + 18] = slot.signature;
        }
    }

    /// Deserialize from a [`COORD_WIRE_SIZE`]-byte span.
    pub fn read_le(buf: &[u8]) -> io::Result<Self> {
        let mut pos = 0;
        let active = read_u8(buf, &mut pos)?;
        if active & 0xC0 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("coordinate active mask has reserved bits set: {:#x}", active),
            ));
        }
        let mut slots = [CoordinateSlot::default(); 6];
        for slot in &mut slots {
            slot.file_id = read_u16(buf, &mut pos)?;
            slot.mark = read_u64(buf, &mut pos)?;
            slot.n_elements = read_u64(buf, &mut pos)?;
            slot.signature = read_u8(buf, &mut pos)?;
        }
        Ok(Self { slots, active })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_slot() -> CoordinateSlot {
        CoordinateSlot {
            file_id: 3,
            mark: 0xDEAD_BEEF,
            n_elements: 42,
            signature: 0x91,
        }
    }

    #[test]
    fn test_set_get() {
        let mut rec = CoordinateRecord::new();
        assert_eq!(rec.get(2), None);
        rec.set(2, sample_slot());
        assert_eq!(rec.get(2), Some(&sample_slot()));
        assert!(rec.is_active(2));
        assert!(!rec.is_active(3));
    }

    #[test]
    fn test_wire_round_trip() {
        let mut rec = CoordinateRecord::new();
        rec.set(0, sample_slot());
        rec.set(5, CoordinateSlot::reference_only(7, 9));
        rec.set_auxiliary_first_term_count(1, 1234);

        let mut buf = [0u8; COORD_WIRE_SIZE];
        rec.write_le(&mut buf);
        let back = CoordinateRecord::read_le(&buf).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.auxiliary_first_term_count(1), 1234);
        assert_eq!(back.get(1), None);
    }

    #[test]
    fn test_reference_only_slot() {
        let slot = CoordinateSlot::reference_only(100, 200);
        assert!(slot.is_reference_only());
        assert_eq!(slot.reference_values(), Some((100, 200)));
        assert_eq!(slot.element_count(), 1);

        let plain = sample_slot();
        assert_eq!(plain.reference_values(), None);
        assert_eq!(plain.element_count(), 42);
    }

    #[test]
    #[should_panic(expected = "auxiliary counter would overwrite")]
    fn test_auxiliary_cannot_clobber_active_slot() {
        let mut rec = CoordinateRecord::new();
        rec.set(4, sample_slot());
        rec.set_auxiliary_first_term_count(4, 1);
    }

    #[test]
    fn test_reserved_active_bits_rejected() {
        let mut buf = [0u8; COORD_WIRE_SIZE];
        buf[0] = 0x80;
        assert!(CoordinateRecord::read_le(&buf).is_err());
    }
}
