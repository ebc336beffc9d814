//! The key → coordinate-record map contract, plus a file-backed
//! reference implementation.
//!
//! The production deployment keeps coordinates in a persistent ordered
//! map maintained elsewhere; this subsystem only relies on the three
//! operations below. [`FileCoordinateIndex`] implements them over a
//! sorted in-memory vector with a flat on-disk form, which is what the
//! differential index and the test suites use.

use crate::error::{Result, TableError};
use std::fs;
use std::path::Path;
use tribase_core::{CoordinateRecord, COORD_WIRE_SIZE};

const ENTRY_WIRE_SIZE: usize = 8 + COORD_WIRE_SIZE;

/// Ordered map from key to six-slot coordinate record.
pub trait CoordinateIndex {
    /// Missing keys are a normal outcome, not an error.
    fn get(&self, key: i64) -> Option<&CoordinateRecord>;

    /// Bulk-load path: keys must arrive strictly increasing.
    fn append(&mut self, key: i64, record: CoordinateRecord) -> Result<()>;

    /// Lazy in-order walk over all entries.
    fn iter(&self) -> Box<dyn Iterator<Item = (i64, &CoordinateRecord)> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sorted-vector coordinate index with a flat file form: `len × (key:
/// i64 LE, record: 115 bytes)`.
#[derive(Debug, Default)]
pub struct FileCoordinateIndex {
    entries: Vec<(i64, CoordinateRecord)>,
}

impl FileCoordinateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        if bytes.len() % ENTRY_WIRE_SIZE != 0 {
            return Err(TableError::Decode(format!(
                "coordinate index size {} is not a multiple of {}",
                bytes.len(),
                ENTRY_WIRE_SIZE
            )));
        }
        let mut entries = Vec::with_capacity(bytes.len() / ENTRY_WIRE_SIZE);
        let mut prev: Option<i64> = None;
        for chunk in bytes.chunks_exact(ENTRY_WIRE_SIZE) {
            let key = i64::from_le_bytes(chunk[..8].try_into().map_err(|_| {
                TableError::Decode("coordinate index entry truncated".to_string())
            })?);
            if let Some(p) = prev {
                if key <= p {
                    return Err(TableError::Decode(format!(
                        "coordinate index keys out of order: {} after {}",
                        key, p
                    )));
                }
            }
            prev = Some(key);
            let record = CoordinateRecord::read_le(&chunk[8..])?;
            entries.push((key, record));
        }
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = Vec::with_capacity(self.entries.len() * ENTRY_WIRE_SIZE);
        let mut buf = [0u8; COORD_WIRE_SIZE];
        for (key, record) in &self.entries {
            out.extend_from_slice(&key.to_le_bytes());
            record.write_le(&mut buf);
            out.extend_from_slice(&buf);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Mutable access for the differential index's sequential post-pass,
    /// which patches cross-ordering counters into existing records.
    pub fn get_mut(&mut self, key: i64) -> Option<&mut CoordinateRecord> {
        match self.entries.binary_search_by_key(&key, |e| e.0) {
            Ok(i) => Some(&mut self.entries[i].1),
            Err(_) => None,
        }
    }
}

impl CoordinateIndex for FileCoordinateIndex {
    fn get(&self, key: i64) -> Option<&CoordinateRecord> {
        match self.entries.binary_search_by_key(&key, |e| e.0) {
            Ok(i) => Some(&self.entries[i].1),
            Err(_) => None,
        }
    }

    fn append(&mut self, key: i64, record: CoordinateRecord) -> Result<()> {
        if let Some(&(prev, _)) = self.entries.last() {
            if key <= prev {
                return Err(TableError::UnsortedAppend { prev, got: key });
            }
        }
        self.entries.push((key, record));
        Ok(())
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (i64, &CoordinateRecord)> + '_> {
        Box::new(self.entries.iter().map(|(k, r)| (*k, r)))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
