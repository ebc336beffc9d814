//! Per-permutation table storage: one append-only file per permutation,
//! living in `<root>/<permutation>/table`.
//!
//! A key's coordinates address its group as `(file_id, mark)`; the base
//! store writes everything into file 0, the `file_id` width exists for
//! the block-structured stores layered on top.

use crate::error::Result;
use crate::mapped::AppendFile;
use std::fs;
use std::path::{Path, PathBuf};
use tribase_core::Permutation;

pub const TABLE_FILE_NAME: &str = "table";

#[derive(Debug)]
pub struct TableStorage {
    perm: Permutation,
    file: AppendFile,
}

impl TableStorage {
    /// Path of a permutation's table file under `root`.
    pub fn file_path(root: &Path, perm: Permutation) -> PathBuf {
        root.join(perm.dir_name()).join(TABLE_FILE_NAME)
    }

    pub fn create(root: &Path, perm: Permutation, growth_step: usize) -> Result<Self> {
        let dir = root.join(perm.dir_name());
        fs::create_dir_all(&dir)?;
        let file = AppendFile::create(&dir.join(TABLE_FILE_NAME), growth_step)?;
        Ok(Self { perm, file })
    }

    pub fn permutation(&self) -> Permutation {
        self.perm
    }

    /// Append one encoded group, returning its `(file_id, mark)`.
    pub fn append_group(&mut self, bytes: &[u8]) -> Result<(u16, u64)> {
        let mark = self.file.append(bytes)?;
        Ok((0, mark))
    }

    pub fn bytes_written(&self) -> u64 {
        self.file.current_offset()
    }

    /// The written bytes, for same-process reads before finalization.
    pub fn as_slice(&self) -> &[u8] {
        self.file.as_slice()
    }

    pub fn finalize(self) -> Result<()> {
        self.file.finalize()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_are_contiguous() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = TableStorage::create(dir.path(), Permutation::Pos, 4096).unwrap();
        let (f1, m1) = storage.append_group(&[1, 2, 3]).unwrap();
        let (f2, m2) = storage.append_group(&[4, 5]).unwrap();
        assert_eq!((f1, m1), (0, 0));
        assert_eq!((f2, m2), (0, 3));
        assert_eq!(storage.as_slice(), &[1, 2, 3, 4, 5]);
        storage.finalize().unwrap();
        let path = TableStorage::file_path(dir.path(), Permutation::Pos);
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3, 4, 5]);
    }
}
