//! Error types for the table codec and writer.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid signature byte {0:#04x}")]
    InvalidSignature(u8),

    /// The upstream sorter handed a single key more records than the
    /// configured in-memory buffer holds. Precondition violation, fatal.
    #[error("group for key {key} exceeds writer buffer capacity {capacity}")]
    BufferOverflow { key: i64, capacity: usize },

    /// Records must arrive key-grouped and pair-sorted.
    #[error("records out of order: ({key}, {v1}, {v2}) after ({prev_key}, {prev_v1}, {prev_v2})")]
    UnsortedInput {
        prev_key: i64,
        prev_v1: i64,
        prev_v2: i64,
        key: i64,
        v1: i64,
        v2: i64,
    },

    /// Coordinate-index appends require strictly increasing keys.
    #[error("coordinate append out of order: key {got} after {prev}")]
    UnsortedAppend { prev: i64, got: i64 },

    #[error("decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, TableError>;
