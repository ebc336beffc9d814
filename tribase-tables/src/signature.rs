//! The 1-byte strategy signature describing how one key's group is laid
//! out on disk.
//!
//! ## Bit layout
//!
//! ```text
//! bits 7-5   storage-format tag (see StorageFormat)
//! bit  4     vbyte family: set = NO delta on field 1
//!            fixed family: high bit of field-1 width flag
//! bit  3     vbyte family: field-1 compression mode (set = vlong2)
//!            fixed family: low bit of field-1 width flag
//! bit  2     vbyte family: field-2 compression mode (set = vlong2)
//!            fixed family: high bit of field-2 width flag
//! bit  1     vbyte family: unused
//!            fixed family: low bit of field-2 width flag
//! bit  0     aggregated flag; for FixedCluster it is instead the
//!            count-width flag (set = 4-byte group counts)
//! ```
//!
//! Width flags map 0→1, 1→2, 2→4, 3→8 bytes. A `FixedCluster` table is
//! never aggregated, which is why it can recycle bit 0.

use crate::error::{Result, TableError};
use tribase_core::bytes::{flag_for_width, width_for_flag};

const FORMAT_SHIFT: u8 = 5;
const NO_DELTA_BIT: u8 = 0x10;
const COMPR1_BIT: u8 = 0x08;
const COMPR2_BIT: u8 = 0x04;
const AGGREGATED_BIT: u8 = 0x01;

/// Storage-format tag, bits 7-5 of the signature.
///
/// Tag 2 belonged to a retired format and is rejected on decode, as are
/// the never-assigned tags 6 and 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StorageFormat {
    /// Interleaved varint rows, optional delta on field 1.
    Row = 0,
    /// Varint rows grouped by distinct field 1, in-group delta on field 2.
    Cluster = 1,
    /// Dictionary-style grouped column with a block directory.
    Column = 3,
    /// Interleaved fixed-width rows.
    FixedRow = 4,
    /// Fixed-width groups: (value1, count, value2 × count).
    FixedCluster = 5,
}

impl StorageFormat {
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(StorageFormat::Row),
            1 => Ok(StorageFormat::Cluster),
            3 => Ok(StorageFormat::Column),
            4 => Ok(StorageFormat::FixedRow),
            5 => Ok(StorageFormat::FixedCluster),
            t => Err(TableError::InvalidSignature(t << FORMAT_SHIFT)),
        }
    }

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// True for the formats whose signature bits 4-1 carry width flags.
    #[inline]
    pub fn is_fixed_family(self) -> bool {
        matches!(self, StorageFormat::FixedRow | StorageFormat::FixedCluster)
    }
}

/// Varint codec selector for one field of the vbyte family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprMode {
    /// LSB-first varint (`vlong`).
    VLong,
    /// MSB-first, terminator-flagged varint (`vlong2`).
    VLong2,
}

/// The packed signature byte with named accessors. The decoded format
/// tag rides alongside the raw bits, so `format()` never re-validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    bits: u8,
    format: StorageFormat,
}

impl Signature {
    /// A fresh signature for `format` with all option bits clear, i.e.
    /// delta applied, vlong on both fields, not aggregated, 1-byte widths.
    pub fn new(format: StorageFormat) -> Self {
        Signature {
            bits: format.tag() << FORMAT_SHIFT,
            format,
        }
    }

    /// Wrap a raw byte read from disk, validating the format tag.
    pub fn from_byte(b: u8) -> Result<Self> {
        let format = StorageFormat::from_tag(b >> FORMAT_SHIFT)?;
        Ok(Signature { bits: b, format })
    }

    /// Same format, different option bits.
    #[inline]
    fn with_bits(self, bits: u8) -> Self {
        Signature {
            bits,
            format: self.format,
        }
    }

    #[inline]
    pub fn as_byte(self) -> u8 {
        self.bits
    }

    #[inline]
    pub fn format(self) -> StorageFormat {
        self.format
    }

    // ==================== vbyte family ====================

    /// Whether field 1 is delta-coded against the previous row. The bit
    /// stores the negation (set means no delta).
    #[inline]
    pub fn delta_applied(self) -> bool {
        self.bits & NO_DELTA_BIT == 0
    }

    pub fn with_delta(self, applied: bool) -> Self {
        if applied {
            self.with_bits(self.bits & !NO_DELTA_BIT)
        } else {
            self.with_bits(self.bits | NO_DELTA_BIT)
        }
    }

    #[inline]
    pub fn compr1(self) -> ComprMode {
        if self.bits & COMPR1_BIT != 0 {
            ComprMode::VLong2
        } else {
            ComprMode::VLong
        }
    }

    pub fn with_compr1(self, mode: ComprMode) -> Self {
        match mode {
            ComprMode::VLong => self.with_bits(self.bits & !COMPR1_BIT),
            ComprMode::VLong2 => self.with_bits(self.bits | COMPR1_BIT),
        }
    }

    #[inline]
    pub fn compr2(self) -> ComprMode {
        if self.bits & COMPR2_BIT != 0 {
            ComprMode::VLong2
        } else {
            ComprMode::VLong
        }
    }

    pub fn with_compr2(self, mode: ComprMode) -> Self {
        match mode {
            ComprMode::VLong => self.with_bits(self.bits & !COMPR2_BIT),
            ComprMode::VLong2 => self.with_bits(self.bits | COMPR2_BIT),
        }
    }

    // ==================== fixed family ====================

    /// Field-1 byte width (fixed family), from bits 4-3.
    #[inline]
    pub fn width1(self) -> u8 {
        width_for_flag((self.bits >> 3) & 3)
    }

    /// Field-2 byte width (fixed family), from bits 2-1.
    #[inline]
    pub fn width2(self) -> u8 {
        width_for_flag((self.bits >> 1) & 3)
    }

    pub fn with_widths(self, w1: u8, w2: u8) -> Self {
        let cleared = self.bits & !(0x1E);
        self.with_bits(cleared | (flag_for_width(w1) << 3) | (flag_for_width(w2) << 1))
    }

    /// Index into the 16-entry field-pair codec table:
    /// `(width_flag1 << 2) | width_flag2`.
    #[inline]
    pub fn width_pair_index(self) -> usize {
        ((((self.bits >> 3) & 3) << 2) | ((self.bits >> 1) & 3)) as usize
    }

    /// Group-count byte width for FixedCluster: 1 or 4.
    #[inline]
    pub fn count_width(self) -> u8 {
        if self.bits & AGGREGATED_BIT != 0 {
            4
        } else {
            1
        }
    }

    pub fn with_count_width(self, width: u8) -> Self {
        if width == 4 {
            self.with_bits(self.bits | AGGREGATED_BIT)
        } else {
            self.with_bits(self.bits & !AGGREGATED_BIT)
        }
    }

    // ==================== shared ====================

    /// Whether the table stores distinct pairs with duplicate counts.
    /// FixedCluster recycles bit 0 for its count width and therefore
    /// never reports aggregated.
    #[inline]
    pub fn is_aggregated(self) -> bool {
        self.bits & AGGREGATED_BIT != 0 && self.format != StorageFormat::FixedCluster
    }

    pub fn with_aggregated(self, aggregated: bool) -> Self {
        if aggregated {
            self.with_bits(self.bits | AGGREGATED_BIT)
        } else {
            self.with_bits(self.bits & !AGGREGATED_BIT)
        }
    }
}
