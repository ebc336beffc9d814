//! Differential index over the tribase base store.
//!
//! The base store rebuilds are expensive, so incremental additions and
//! removals land in small differential batches instead. A batch keeps
//! three shared ordering directories rather than six permutation
//! indexes: the two permutations with the same leading term share one
//! key index, with each key's group encoded once per permutation into
//! the ordering's `p0`/`p1` projection files.
//!
//! - [`ordering`]: the three orderings and the permutation ↔ ordering map.
//! - [`builder`]: threaded construction plus the sequential post-pass.
//! - [`sampler`]: the row-versus-column probing heuristic.
//! - [`store`]: projection files and packed block addresses.
//! - [`stats`]: the per-ordering statistics header.
//! - [`index`]: the read path.

pub mod builder;
pub mod error;
pub mod index;
pub mod ordering;
pub mod sampler;
pub mod stats;
pub mod store;
pub mod update;

pub use builder::{build_delta, DeltaConfig, KEYS_FILE_NAME};
pub use error::{DeltaError, Result};
pub use index::{DeltaIndex, StoreView};
pub use ordering::{TermOrdering, ALL_ORDERINGS};
pub use sampler::SamplerConfig;
pub use stats::OrderingStats;
pub use update::{BaseKeyProbe, DeltaKind, UpdateStats};
