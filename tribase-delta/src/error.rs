//! Error types for the differential index.

use std::io;
use thiserror::Error;
use tribase_tables::TableError;

#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("build thread for ordering {0} panicked")]
    BuildThread(&'static str),

    #[error("projection file position {0} exceeds the packed address space")]
    AddressOverflow(u64),

    #[error("decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, DeltaError>;
