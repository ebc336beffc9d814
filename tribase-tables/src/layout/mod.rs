//! The physical byte layouts a signature selects, behind one cursor type.
//!
//! Encoders consume a [`Group`] (the two parallel in-memory columns of
//! one key's records plus duplicate counts) and append bytes to an output
//! buffer. Decoding goes through [`TableCursor`], which wraps the
//! per-format cursors with the shared contract: forward-only `move_to`,
//! optional sub-key constraints, `mark`/`reset`, and distinct-first-term
//! iteration (`set_ignore_second_column`).
//!
//! Cursors never read past the element count recorded in the key's
//! coordinates, so a table does not need a terminator and may be followed
//! immediately by the next key's bytes.

pub mod cluster;
pub mod column;
pub mod fixed_cluster;
pub mod fixed_row;
pub mod row;

use crate::error::Result;
use crate::signature::{ComprMode, Signature, StorageFormat};
use std::io;
use tribase_core::varint::{read_vlong, read_vlong2, write_vlong, write_vlong2};

/// One decoded entry: `(value1, value2, duplicate count)`. The count is 1
/// unless the table is aggregated.
pub type Entry = (i64, i64, u64);

/// One key's record-group, ready to encode. All three slices have equal
/// length; `col1` is sorted ascending and pairs `(col1[i], col2[i])` are
/// sorted ascending. `counts` is all ones unless the group was
/// pre-aggregated.
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    pub col1: &'a [i64],
    pub col2: &'a [i64],
    pub counts: &'a [u64],
}

impl<'a> Group<'a> {
    pub fn new(col1: &'a [i64], col2: &'a [i64], counts: &'a [u64]) -> Self {
        debug_assert_eq!(col1.len(), col2.len());
        debug_assert_eq!(col1.len(), counts.len());
        Self { col1, col2, counts }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.col1.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.col1.is_empty()
    }
}

/// Write one vbyte-family field under the given compression mode.
#[inline]
pub(crate) fn write_vfield(out: &mut Vec<u8>, v: u64, mode: ComprMode) {
    match mode {
        ComprMode::VLong => write_vlong(out, v),
        ComprMode::VLong2 => write_vlong2(out, v),
    }
}

/// Read one vbyte-family field under the given compression mode.
#[inline]
pub(crate) fn read_vfield(buf: &[u8], pos: &mut usize, mode: ComprMode) -> io::Result<u64> {
    match mode {
        ComprMode::VLong => read_vlong(buf, pos),
        ComprMode::VLong2 => read_vlong2(buf, pos),
    }
}

// ==================== encoding ====================

/// A reusable per-format encoder. Instances are checked out of an
/// [`EncoderPool`](crate::pool::EncoderPool) so their scratch state
/// survives across millions of per-key encode cycles.
#[derive(Debug)]
pub enum TableEncoder {
    Row(row::RowEncoder),
    Cluster(cluster::ClusterEncoder),
    Column(column::ColumnEncoder),
    FixedRow(fixed_row::FixedRowEncoder),
    FixedCluster(fixed_cluster::FixedClusterEncoder),
}

impl TableEncoder {
    pub fn for_format(format: StorageFormat) -> Self {
        match format {
            StorageFormat::Row => TableEncoder::Row(row::RowEncoder),
            StorageFormat::Cluster => TableEncoder::Cluster(cluster::ClusterEncoder),
            StorageFormat::Column => TableEncoder::Column(column::ColumnEncoder::default()),
            StorageFormat::FixedRow => TableEncoder::FixedRow(fixed_row::FixedRowEncoder),
            StorageFormat::FixedCluster => {
                TableEncoder::FixedCluster(fixed_cluster::FixedClusterEncoder)
            }
        }
    }

    pub fn format(&self) -> StorageFormat {
        match self {
            TableEncoder::Row(_) => StorageFormat::Row,
            TableEncoder::Cluster(_) => StorageFormat::Cluster,
            TableEncoder::Column(_) => StorageFormat::Column,
            TableEncoder::FixedRow(_) => StorageFormat::FixedRow,
            TableEncoder::FixedCluster(_) => StorageFormat::FixedCluster,
        }
    }

    /// Serialize `group` under `sig`, appending to `out`. The signature's
    /// format tag must match this encoder's format.
    pub fn encode(&mut self, sig: Signature, group: &Group<'_>, out: &mut Vec<u8>) -> Result<()> {
        debug_assert_eq!(sig.format(), self.format());
        match self {
            TableEncoder::Row(e) => e.encode(sig, group, out),
            TableEncoder::Cluster(e) => e.encode(sig, group, out),
            TableEncoder::Column(e) => e.encode(sig, group, out),
            TableEncoder::FixedRow(e) => e.encode(sig, group, out),
            TableEncoder::FixedCluster(e) => e.encode(sig, group, out),
        }
        Ok(())
    }
}

// ==================== decoding ====================

#[derive(Debug, Clone)]
enum CursorKind<'a> {
    Row(row::RowCursor<'a>),
    Cluster(cluster::ClusterCursor<'a>),
    Column(column::ColumnCursor<'a>),
    FixedRow(fixed_row::FixedRowCursor<'a>),
    FixedCluster(fixed_cluster::FixedClusterCursor<'a>),
    /// A reference-only coordinate's single pair, no backing bytes.
    Inline(Option<Entry>),
}

impl<'a> CursorKind<'a> {
    fn next_raw(&mut self) -> io::Result<Option<Entry>> {
        match self {
            CursorKind::Row(c) => c.next_raw(),
            CursorKind::Cluster(c) => c.next_raw(),
            CursorKind::Column(c) => c.next_raw(),
            CursorKind::FixedRow(c) => c.next_raw(),
            CursorKind::FixedCluster(c) => c.next_raw(),
            CursorKind::Inline(e) => Ok(e.take()),
        }
    }

    /// Jump the underlying position so the next entry has `field1 >= v1`,
    /// where the format affords a sub-linear path. Formats without one
    /// fall back to the wrapper's consume loop.
    fn skip_to(&mut self, v1: i64) {
        match self {
            CursorKind::Column(c) => c.skip_to(v1),
            CursorKind::FixedRow(c) => c.skip_to(v1),
            CursorKind::FixedCluster(c) => c.skip_to(v1),
            _ => {}
        }
    }
}

/// Decoder over one encoded record-group.
#[derive(Debug, Clone)]
pub struct TableCursor<'a> {
    kind: CursorKind<'a>,
    pending: Option<Entry>,
    constraint: Option<(i64, Option<i64>)>,
    ignore_second: bool,
    saved: Option<(CursorKind<'a>, Option<Entry>)>,
}

impl<'a> TableCursor<'a> {
    /// Bind a cursor to the byte span of a table encoded under `sig`
    /// holding `n_elements` entries.
    pub fn new(sig: Signature, bytes: &'a [u8], n_elements: u64) -> Result<Self> {
        let kind = match sig.format() {
            StorageFormat::Row => CursorKind::Row(row::RowCursor::new(sig, bytes, n_elements)),
            StorageFormat::Cluster => {
                CursorKind::Cluster(cluster::ClusterCursor::new(sig, bytes, n_elements))
            }
            StorageFormat::Column => CursorKind::Column(column::ColumnCursor::new(bytes)?),
            StorageFormat::FixedRow => {
                CursorKind::FixedRow(fixed_row::FixedRowCursor::new(sig, bytes, n_elements))
            }
            StorageFormat::FixedCluster => CursorKind::FixedCluster(
                fixed_cluster::FixedClusterCursor::new(sig, bytes, n_elements),
            ),
        };
        Ok(Self {
            kind,
            pending: None,
            constraint: None,
            ignore_second: false,
            saved: None,
        })
    }

    /// Cursor over a reference-only coordinate's inline pair.
    pub fn inline(v1: i64, v2: i64) -> TableCursor<'static> {
        TableCursor {
            kind: CursorKind::Inline(Some((v1, v2, 1))),
            pending: None,
            constraint: None,
            ignore_second: false,
            saved: None,
        }
    }

    /// An exhausted cursor, for lookups that resolve to nothing.
    pub fn empty() -> TableCursor<'static> {
        TableCursor {
            kind: CursorKind::Inline(None),
            pending: None,
            constraint: None,
            ignore_second: false,
            saved: None,
        }
    }

    /// Bind and pre-seek to the sub-key `c1` (and optionally `c2`);
    /// iteration then ends when the constraint no longer matches.
    pub fn with_constraint(
        sig: Signature,
        bytes: &'a [u8],
        n_elements: u64,
        c1: i64,
        c2: Option<i64>,
    ) -> Result<Self> {
        let mut cursor = Self::new(sig, bytes, n_elements)?;
        cursor.kind.skip_to(c1);
        cursor.move_to(c1, c2.unwrap_or(i64::MIN))?;
        cursor.constraint = Some((c1, c2));
        Ok(cursor)
    }

    /// Distinct-first-term mode: `next()` yields one entry per distinct
    /// `value1` with the group's summed count and `value2` of its first
    /// pair.
    pub fn set_ignore_second_column(&mut self, ignore: bool) {
        self.ignore_second = ignore;
    }

    fn peek(&mut self) -> Result<Option<Entry>> {
        if self.pending.is_none() {
            self.pending = self.kind.next_raw()?;
        }
        Ok(self.pending)
    }

    fn matches_constraint(&self, e: Entry) -> bool {
        match self.constraint {
            None => true,
            Some((c1, None)) => e.0 == c1,
            Some((c1, Some(c2))) => e.0 == c1 && (self.ignore_second || e.1 == c2),
        }
    }

    /// The next entry, or `None` when exhausted (or past the constraint).
    pub fn next(&mut self) -> Result<Option<Entry>> {
        let first = match self.peek()? {
            Some(e) if self.matches_constraint(e) => e,
            _ => return Ok(None),
        };
        self.pending = None;
        if !self.ignore_second {
            return Ok(Some(first));
        }
        // fold the rest of this value1 group into one entry
        let mut total = first.2;
        while let Some(e) = self.peek()? {
            if e.0 != first.0 {
                break;
            }
            total += e.2;
            self.pending = None;
        }
        Ok(Some((first.0, first.1, total)))
    }

    /// Seek forward to the first entry `>= (v1, v2)`. Never moves the
    /// position backward; seeking to an already-passed pair is a no-op.
    pub fn move_to(&mut self, v1: i64, v2: i64) -> Result<()> {
        while let Some(e) = self.peek()? {
            if (e.0, e.1) >= (v1, v2) {
                break;
            }
            self.pending = None;
        }
        Ok(())
    }

    /// Remember the current position for one later [`reset`](Self::reset).
    pub fn mark(&mut self) {
        self.saved = Some((self.kind.clone(), self.pending));
    }

    /// Return to the last [`mark`](Self::mark)ed position.
    pub fn reset(&mut self) {
        if let Some((kind, pending)) = self.saved.take() {
            self.kind = kind;
            self.pending = pending;
        }
    }

    /// Drain the cursor, summing duplicate counts.
    pub fn remaining_count(&mut self) -> Result<u64> {
        let mut total = 0;
        while let Some(e) = self.next()? {
            total += e.2;
        }
        Ok(total)
    }
}
