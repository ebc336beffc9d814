//! Adaptive binary table codec for the tribase storage layer.
//!
//! Persists key-grouped pairs under six sort-order permutations, picking
//! the cheapest physical layout per key-group through an exact byte-cost
//! model before anything hits disk.
//!
//! - [`signature`]: the 1-byte strategy descriptor.
//! - [`layout`]: the row / cluster / column byte formats and the shared
//!   [`TableCursor`](layout::TableCursor) decode contract.
//! - [`strategy`]: the cost-based [`StrategySelector`](strategy::StrategySelector).
//! - [`inserter`]: the streaming [`TableWriter`](inserter::TableWriter).
//! - [`coord_index`]: the key → coordinates map contract.
//! - [`resolve`]: the read path from coordinates back to decoded pairs.

pub mod coord_index;
pub mod error;
pub mod inserter;
pub mod layout;
pub mod mapped;
pub mod pool;
pub mod resolve;
pub mod signature;
pub mod storage;
pub mod strategy;

pub use coord_index::{CoordinateIndex, FileCoordinateIndex};
pub use error::{Result, TableError};
pub use inserter::{CoordinateSink, TableWriter, WriterConfig};
pub use layout::{Entry, Group, TableCursor, TableEncoder};
pub use pool::EncoderPool;
pub use resolve::TableReader;
pub use signature::{ComprMode, Signature, StorageFormat};
pub use strategy::{SelectorConfig, Strategy, StrategySelector, RATE_LIST};
