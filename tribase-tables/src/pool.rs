//! Per-format encoder pools.
//!
//! The writer encodes millions of key-groups back to back; encoders that
//! carry scratch buffers (the column encoder's block directory) would
//! otherwise reallocate on every key. The pool keeps released encoders
//! keyed by format tag and hands them back on the next acquire.

use crate::layout::TableEncoder;
use crate::signature::StorageFormat;

const FORMAT_SLOTS: [StorageFormat; 5] = [
    StorageFormat::Row,
    StorageFormat::Cluster,
    StorageFormat::Column,
    StorageFormat::FixedRow,
    StorageFormat::FixedCluster,
];

fn slot(format: StorageFormat) -> usize {
    match format {
        StorageFormat::Row => 0,
        StorageFormat::Cluster => 1,
        StorageFormat::Column => 2,
        StorageFormat::FixedRow => 3,
        StorageFormat::FixedCluster => 4,
    }
}

#[derive(Debug, Default)]
pub struct EncoderPool {
    free: [Vec<TableEncoder>; 5],
}

impl EncoderPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check out an encoder for `format`, reusing a released one when
    /// available.
    pub fn acquire(&mut self, format: StorageFormat) -> TableEncoder {
        self.free[slot(format)]
            .pop()
            .unwrap_or_else(|| TableEncoder::for_format(format))
    }

    /// Return an encoder to its format's free list.
    pub fn release(&mut self, encoder: TableEncoder) {
        self.free[slot(encoder.format())].push(encoder);
    }

    /// Number of idle encoders held for `format`.
    pub fn idle(&self, format: StorageFormat) -> usize {
        self.free[slot(format)].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_reuses() {
        let mut pool = EncoderPool::new();
        for format in FORMAT_SLOTS {
            assert_eq!(pool.idle(format), 0);
            let enc = pool.acquire(format);
            assert_eq!(enc.format(), format);
            pool.release(enc);
            assert_eq!(pool.idle(format), 1);
            let again = pool.acquire(format);
            assert_eq!(again.format(), format);
            assert_eq!(pool.idle(format), 0);
            pool.release(again);
        }
    }
}
