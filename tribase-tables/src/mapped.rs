//! Append-only growable mapped file.
//!
//! One writer owns the mapping exclusively and appends through a logical
//! cursor; when an append would overrun the reserved space the file is
//! extended by at least the growth step and remapped. Readers never see
//! the mapping — they open their own read-only maps after
//! [`finalize`](AppendFile::finalize) truncates the reservation down to
//! the bytes actually written.

use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default file growth step. Growing in large steps keeps the
/// remap-and-extend cycle rare even for multi-gigabyte builds.
pub const DEFAULT_GROWTH_STEP: usize = 64 * 1024 * 1024;

pub struct AppendFile {
    path: PathBuf,
    file: File,
    map: MmapMut,
    len: usize,
    growth_step: usize,
}

impl std::fmt::Debug for AppendFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppendFile")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("reserved", &self.map.len())
            .finish()
    }
}

impl AppendFile {
    /// Create (or truncate) the file at `path` with the given growth
    /// step, reserving one step up front.
    pub fn create(path: &Path, growth_step: usize) -> io::Result<Self> {
        let step = growth_step.max(4096);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(step as u64)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self {
            path: path.to_path_buf(),
            file,
            map,
            len: 0,
            growth_step: step,
        })
    }

    /// Logical bytes written so far; the offset the next append lands at.
    #[inline]
    pub fn current_offset(&self) -> u64 {
        self.len as u64
    }

    /// The written prefix of the mapping.
    pub fn as_slice(&self) -> &[u8] {
        &self.map[..self.len]
    }

    /// Make room for `additional` bytes, growing and remapping if the
    /// reservation is exhausted.
    pub fn reserve(&mut self, additional: usize) -> io::Result<()> {
        let needed = self.len + additional;
        if needed <= self.map.len() {
            return Ok(());
        }
        let new_cap = self.map.len() + self.growth_step.max(needed - self.map.len());
        self.map.flush()?;
        self.file.set_len(new_cap as u64)?;
        self.map = unsafe { MmapMut::map_mut(&self.file)? };
        debug!(
            path = %self.path.display(),
            reserved = new_cap,
            written = self.len,
            "grew append file"
        );
        Ok(())
    }

    /// Append `bytes`, returning the offset they start at.
    pub fn append(&mut self, bytes: &[u8]) -> io::Result<u64> {
        self.reserve(bytes.len())?;
        let offset = self.len;
        self.map[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.len = offset + bytes.len();
        Ok(offset as u64)
    }

    /// Flush, drop the reservation tail and close. The file on disk ends
    /// exactly at the last written byte.
    pub fn finalize(self) -> io::Result<()> {
        self.map.flush()?;
        let len = self.len as u64;
        drop(self.map);
        self.file.set_len(len)?;
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_finalize_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        let mut f = AppendFile::create(&path, 4096).unwrap();
        assert_eq!(f.append(b"hello").unwrap(), 0);
        assert_eq!(f.append(b" world").unwrap(), 5);
        assert_eq!(f.current_offset(), 11);
        assert_eq!(f.as_slice(), b"hello world");
        f.finalize().unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, b"hello world");
    }

    #[test]
    fn test_growth_across_reservation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        let mut f = AppendFile::create(&path, 4096).unwrap();
        let chunk = vec![0xA5u8; 3000];
        for _ in 0..5 {
            f.append(&chunk).unwrap();
        }
        assert_eq!(f.current_offset(), 15_000);
        assert!(f.as_slice().iter().all(|&b| b == 0xA5));
        f.finalize().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 15_000);
    }

    #[test]
    fn test_single_append_larger_than_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        let mut f = AppendFile::create(&path, 4096).unwrap();
        let big = vec![1u8; 20_000];
        f.append(&big).unwrap();
        assert_eq!(f.as_slice(), &big[..]);
    }
}
