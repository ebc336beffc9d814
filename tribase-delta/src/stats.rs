//! Per-ordering statistics header.
//!
//! Each ordering directory carries a `stats` file of exactly seven
//! little-endian `u64` counters (56 bytes):
//!
//! ```text
//! [0]  valid_triples    records stored after deduplication
//! [1]  total_keys       distinct keys in this ordering
//! [2]  crossed_unique1  unique (key, first-term) pairs of projection 0
//! [3]  total_count1     records in projection 0
//! [4]  crossed_unique2  unique (key, first-term) pairs of projection 1
//! [5]  total_count2     records in projection 1
//! [6]  new_keys         keys absent from the base store
//! ```
//!
//! The two `crossed_unique` counters are not computed by the ordering's
//! own build thread: they arrive from the paired orderings during the
//! sequential post-pass, which sorts and deduplicates the inverted pair
//! lists the other builds collected.

use crate::error::Result;
use std::fs;
use std::path::Path;

pub const STATS_FILE_NAME: &str = "stats";
pub const STATS_WIRE_SIZE: usize = 7 * 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderingStats {
    pub valid_triples: u64,
    pub total_keys: u64,
    pub crossed_unique1: u64,
    pub total_count1: u64,
    pub crossed_unique2: u64,
    pub total_count2: u64,
    pub new_keys: u64,
}

impl OrderingStats {
    fn to_words(self) -> [u64; 7] {
        [
            self.valid_triples,
            self.total_keys,
            self.crossed_unique1,
            self.total_count1,
            self.crossed_unique2,
            self.total_count2,
            self.new_keys,
        ]
    }

    fn from_words(w: [u64; 7]) -> Self {
        Self {
            valid_triples: w[0],
            total_keys: w[1],
            crossed_unique1: w[2],
            total_count1: w[3],
            crossed_unique2: w[4],
            total_count2: w[5],
            new_keys: w[6],
        }
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let mut out = Vec::with_capacity(STATS_WIRE_SIZE);
        for word in self.to_words() {
            out.extend_from_slice(&word.to_le_bytes());
        }
        fs::write(dir.join(STATS_FILE_NAME), out)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let bytes = fs::read(dir.join(STATS_FILE_NAME))?;
        if bytes.len() != STATS_WIRE_SIZE {
            return Err(crate::error::DeltaError::Decode(format!(
                "stats file is {} bytes, expected {}",
                bytes.len(),
                STATS_WIRE_SIZE
            )));
        }
        let mut words = [0u64; 7];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut b = [0u8; 8];
            b.copy_from_slice(chunk);
            words[i] = u64::from_le_bytes(b);
        }
        Ok(Self::from_words(words))
    }
}
