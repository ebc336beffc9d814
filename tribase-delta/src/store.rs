//! Append-only projection files and the packed block addresses that
//! point into them.
//!
//! Each ordering writes its tables into two files, `p0` and `p1`, one
//! per served permutation. A table's location is packed into 32 bits as
//! `(block_index << 16) | offset_in_block` over virtual 64 KiB blocks,
//! which fits the coordinate slot's `file_id`/`mark` split: the block
//! index rides in `file_id`, the in-block offset in `mark`. Tables may
//! cross block boundaries; the blocks only partition the address, not
//! the bytes.

use crate::error::{DeltaError, Result};
use std::fs;
use std::path::Path;
use tribase_core::{CoordinateSlot, SKIP_FILE_ID};
use tribase_tables::mapped::AppendFile;

/// Virtual block size the packed address is split over.
pub const BLOCK_SIZE: u64 = 1 << 16;

/// A table's position in a projection file, packed block-and-offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedAddress {
    pub block: u16,
    pub offset: u16,
}

impl PackedAddress {
    /// Pack a byte position. Fails once the file outgrows the 32-bit
    /// packed form (the top block index aliases the reference-only
    /// sentinel, so it is excluded too).
    pub fn from_position(pos: u64) -> Result<Self> {
        let block = pos / BLOCK_SIZE;
        if block >= SKIP_FILE_ID as u64 {
            return Err(DeltaError::AddressOverflow(pos));
        }
        Ok(Self {
            block: block as u16,
            offset: (pos % BLOCK_SIZE) as u16,
        })
    }

    /// The byte position this address unpacks to.
    #[inline]
    pub fn position(self) -> u64 {
        (self.block as u64) << 16 | self.offset as u64
    }

    /// Embed into a coordinate slot alongside the table's signature and
    /// element count.
    pub fn to_slot(self, signature: u8, n_elements: u64) -> CoordinateSlot {
        CoordinateSlot {
            file_id: self.block,
            mark: self.offset as u64,
            n_elements,
            signature,
        }
    }

    /// Recover the address from a slot written by [`to_slot`](Self::to_slot).
    pub fn from_slot(slot: &CoordinateSlot) -> Self {
        Self {
            block: slot.file_id,
            offset: slot.mark as u16,
        }
    }
}

/// The two projection files of one ordering directory.
#[derive(Debug)]
pub struct ProjectionFiles {
    files: [AppendFile; 2],
}

pub const PROJECTION_FILE_NAMES: [&str; 2] = ["p0", "p1"];

impl ProjectionFiles {
    pub fn create(dir: &Path, growth_step: usize) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let p0 = AppendFile::create(&dir.join(PROJECTION_FILE_NAMES[0]), growth_step)?;
        let p1 = AppendFile::create(&dir.join(PROJECTION_FILE_NAMES[1]), growth_step)?;
        Ok(Self { files: [p0, p1] })
    }

    /// Append one encoded table to projection `proj`, returning its
    /// packed address.
    pub fn append(&mut self, proj: usize, bytes: &[u8]) -> Result<PackedAddress> {
        let pos = self.files[proj].append(bytes)?;
        PackedAddress::from_position(pos)
    }

    pub fn finalize(self) -> Result<()> {
        let [p0, p1] = self.files;
        p0.finalize()?;
        p1.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        for pos in [0u64, 1, 0xFFFF, 0x10000, 0x12345678, 0xFFFE_FFFF] {
            let addr = PackedAddress::from_position(pos).unwrap();
            assert_eq!(addr.position(), pos);
        }
        assert_eq!(
            PackedAddress::from_position(0x0003_0007).unwrap(),
            PackedAddress {
                block: 3,
                offset: 7
            }
        );
    }

    #[test]
    fn test_sentinel_block_rejected() {
        assert!(PackedAddress::from_position(0xFFFF_0000).is_err());
        assert!(PackedAddress::from_position(u64::MAX).is_err());
    }

    #[test]
    fn test_slot_round_trip() {
        let addr = PackedAddress::from_position(0x0042_0099).unwrap();
        let slot = addr.to_slot(0x91, 12);
        assert!(!slot.is_reference_only());
        assert_eq!(slot.n_elements, 12);
        assert_eq!(slot.signature, 0x91);
        assert_eq!(PackedAddress::from_slot(&slot), addr);
    }

    #[test]
    fn test_projection_files_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = ProjectionFiles::create(&dir.path().join("s"), 4096).unwrap();
        let a = files.append(0, b"alpha").unwrap();
        let b = files.append(0, b"beta").unwrap();
        let c = files.append(1, b"gamma").unwrap();
        assert_eq!(a.position(), 0);
        assert_eq!(b.position(), 5);
        assert_eq!(c.position(), 0);
        files.finalize().unwrap();
        assert_eq!(
            std::fs::read(dir.path().join("s").join("p0")).unwrap(),
            b"alphabeta"
        );
        assert_eq!(
            std::fs::read(dir.path().join("s").join("p1")).unwrap(),
            b"gamma"
        );
    }
}
