//! Shared vocabulary for the tribase storage layer.
//!
//! Everything here is permutation- and layout-agnostic: the six sort
//! orders, the triple record that flows through the writers, the
//! coordinate records stored in the key indexes, and the low-level byte
//! codecs (fixed-width and variable-length) every table format builds on.

pub mod bytes;
pub mod coord;
pub mod permutation;
pub mod record;
pub mod varint;

pub use coord::{CoordinateRecord, CoordinateSlot, COORD_WIRE_SIZE, SKIP_FILE_ID};
pub use permutation::Permutation;
pub use record::TripleRecord;
