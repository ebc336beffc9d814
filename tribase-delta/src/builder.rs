//! Differential index construction.
//!
//! A sorted-and-deduplicated batch of triples becomes three ordering
//! directories. Each ordering is built by its own thread: the batch is
//! reordered under the ordering's first permutation, grouped by key,
//! and every group is encoded twice (once per served permutation) into
//! the `p0`/`p1` projection files. The layout of each table is chosen
//! by the sampling heuristic, not the base writer's exact cost model.
//!
//! While encoding, each thread collects the unique `(first-term, key)`
//! pairs of its projections. Those lists belong to *other* orderings:
//! grouping the pairs of one projection by first term yields the
//! unique-first-term counters of the ordering that is keyed by that
//! term. The sequential post-pass run after all threads join sorts the
//! lists, patches the counters into the paired orderings' key records
//! through their idle coordinate slots, fills the crossed counters of
//! the stats headers and seals every directory.

use crate::error::{DeltaError, Result};
use crate::index::DeltaIndex;
use crate::ordering::{auxiliary_slot, TermOrdering, ALL_ORDERINGS};
use crate::sampler::{prefers_column, SamplerConfig};
use crate::store::ProjectionFiles;
use crate::update::{BaseKeyProbe, DeltaKind, UpdateStats};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::thread;
use tracing::{debug, info};
use tribase_core::bytes::width_for;
use tribase_core::{CoordinateRecord, Permutation};
use tribase_tables::layout::Group;
use tribase_tables::{
    CoordinateIndex, FileCoordinateIndex, Signature, StorageFormat, TableEncoder,
};

/// Key-index file name inside each ordering directory.
pub const KEYS_FILE_NAME: &str = "keys";

#[derive(Debug, Clone)]
pub struct DeltaConfig {
    /// Growth step for the projection append files. Delta batches are
    /// small next to base builds, so the default is modest.
    pub growth_step: usize,
    pub sampler: SamplerConfig,
    /// Fixed seed for the sampling probes; `None` draws from the OS.
    pub sampling_seed: Option<u64>,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            growth_step: 4 * 1024 * 1024,
            sampler: SamplerConfig::default(),
            sampling_seed: None,
        }
    }
}

struct OrderingBuild {
    ordering: TermOrdering,
    index: FileCoordinateIndex,
    tally: UpdateStats,
    /// Unique `(first-term, key)` pairs per projection, in key order.
    inverted: [Vec<(i64, i64)>; 2],
}

/// Build a differential index for `triples` under `root`, one directory
/// per ordering. `base` is probed for key novelty when present.
/// Duplicate triples in the batch are dropped.
pub fn build_delta(
    root: &Path,
    kind: DeltaKind,
    triples: &[(i64, i64, i64)],
    base: Option<&(dyn BaseKeyProbe + Sync)>,
    cfg: &DeltaConfig,
) -> Result<DeltaIndex> {
    info!(
        kind = kind.label(),
        triples = triples.len(),
        root = %root.display(),
        "building differential index"
    );
    let mut builds = thread::scope(|scope| -> Result<Vec<OrderingBuild>> {
        let mut handles = Vec::with_capacity(3);
        for ordering in ALL_ORDERINGS {
            let dir = root.join(ordering.dir_name());
            let handle = thread::Builder::new()
                .name(format!("delta-{}-{}", kind.label(), ordering.dir_name()))
                .spawn_scoped(scope, move || {
                    build_ordering(&dir, ordering, kind, triples, base, cfg)
                })?;
            handles.push((ordering, handle));
        }
        let mut builds = Vec::with_capacity(3);
        for (ordering, handle) in handles {
            builds.push(
                handle
                    .join()
                    .map_err(|_| DeltaError::BuildThread(ordering.dir_name()))??,
            );
        }
        Ok(builds)
    })?;
    cross_pass(root, &mut builds)?;
    DeltaIndex::open(root, kind)
}

fn build_ordering(
    dir: &Path,
    ordering: TermOrdering,
    kind: DeltaKind,
    triples: &[(i64, i64, i64)],
    base: Option<&(dyn BaseKeyProbe + Sync)>,
    cfg: &DeltaConfig,
) -> Result<OrderingBuild> {
    let [perm0, perm1] = ordering.permutations();
    let mut rows: Vec<(i64, i64, i64)> = triples
        .iter()
        .map(|&(s, p, o)| perm0.reorder(s, p, o))
        .collect();
    rows.sort_unstable();
    rows.dedup();

    let mut rng = match cfg.sampling_seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ ordering as u64),
        None => StdRng::from_entropy(),
    };
    let mut files = ProjectionFiles::create(dir, cfg.growth_step)?;
    let mut index = FileCoordinateIndex::new();
    let mut tally = UpdateStats::new(kind);
    let mut inverted = [Vec::new(), Vec::new()];
    let mut row_encoder = TableEncoder::for_format(StorageFormat::FixedRow);
    let mut column_encoder = TableEncoder::for_format(StorageFormat::Column);
    let mut encode_buf = Vec::new();
    let mut swapped: Vec<(i64, i64)> = Vec::new();
    let mut col1: Vec<i64> = Vec::new();
    let mut col2: Vec<i64> = Vec::new();
    let mut counts: Vec<u64> = Vec::new();

    let mut start = 0;
    while start < rows.len() {
        let key = rows[start].0;
        let mut end = start + 1;
        while end < rows.len() && rows[end].0 == key {
            end += 1;
        }
        let group_rows = &rows[start..end];
        start = end;

        let affects_key_count = match base {
            None => true,
            Some(b) => match kind {
                DeltaKind::Addition => !b.contains_key(perm0, key),
                // a removal retires the key only if it covers the
                // key's whole stored group
                DeltaKind::Removal => b.group_size(perm0, key) == Some(group_rows.len() as u64),
            },
        };
        tally.record_key(affects_key_count);
        tally.record_group(group_rows.len() as u64);

        let mut record = CoordinateRecord::new();
        for (proj, perm) in [perm0, perm1].into_iter().enumerate() {
            col1.clear();
            col2.clear();
            counts.clear();
            if proj == 0 {
                col1.extend(group_rows.iter().map(|r| r.1));
                col2.extend(group_rows.iter().map(|r| r.2));
            } else {
                swapped.clear();
                swapped.extend(group_rows.iter().map(|r| (r.2, r.1)));
                swapped.sort_unstable();
                col1.extend(swapped.iter().map(|r| r.0));
                col2.extend(swapped.iter().map(|r| r.1));
            }
            counts.resize(col1.len(), 1);

            let use_column = prefers_column(&col1, &cfg.sampler, &mut rng);
            let sig = if use_column {
                Signature::new(StorageFormat::Column)
            } else {
                // col1 is sorted, so its last entry is the maximum
                let w1 = width_for(col1.last().copied().unwrap_or(0) as u64);
                let w2 = width_for(col2.iter().copied().max().unwrap_or(0) as u64);
                Signature::new(StorageFormat::FixedRow).with_widths(w1, w2)
            };
            encode_buf.clear();
            let encoder = if use_column {
                &mut column_encoder
            } else {
                &mut row_encoder
            };
            encoder.encode(sig, &Group::new(&col1, &col2, &counts), &mut encode_buf)?;
            let addr = files.append(proj, &encode_buf)?;
            record.set(
                perm.wire_id() as usize,
                addr.to_slot(sig.as_byte(), col1.len() as u64),
            );

            let inv = &mut inverted[proj];
            for (i, &v) in col1.iter().enumerate() {
                if i == 0 || col1[i - 1] != v {
                    inv.push((v, key));
                }
            }
        }
        index.append(key, record)?;
    }
    files.finalize()?;
    debug!(
        ordering = ordering.dir_name(),
        keys = index.len(),
        "ordering build finished"
    );
    Ok(OrderingBuild {
        ordering,
        index,
        tally,
        inverted,
    })
}

/// The permutation whose key is `perm`'s first value term and whose
/// first value is `perm`'s key term. Its unique `(first-term, key)`
/// pairs, regrouped by first term, are exactly `perm`'s per-key
/// unique-first-term counters.
fn crossed_source(perm: Permutation) -> Permutation {
    match perm {
        Permutation::Spo => Permutation::Pso,
        Permutation::Pso => Permutation::Spo,
        Permutation::Sop => Permutation::Osp,
        Permutation::Osp => Permutation::Sop,
        Permutation::Pos => Permutation::Ops,
        Permutation::Ops => Permutation::Pos,
    }
}

/// Sequential post-pass: route every inverted pair list to the ordering
/// it describes, patch per-key counters into idle slots, then write the
/// key index and stats header of each directory.
fn cross_pass(root: &Path, builds: &mut [OrderingBuild]) -> Result<()> {
    for (i, build) in builds.iter().enumerate() {
        debug_assert_eq!(build.ordering as usize, i);
    }
    let mut lists: Vec<[Vec<(i64, i64)>; 2]> = builds
        .iter_mut()
        .map(|b| std::mem::take(&mut b.inverted))
        .collect();
    for pair in &mut lists {
        for list in pair.iter_mut() {
            list.sort_unstable();
        }
    }

    for target in 0..builds.len() {
        let perms = builds[target].ordering.permutations();
        let mut crossed = [0u64; 2];
        for (proj, perm) in perms.into_iter().enumerate() {
            let (src_ord, src_proj) = TermOrdering::of_permutation(crossed_source(perm));
            let list = &lists[src_ord as usize][src_proj];
            crossed[proj] = list.len() as u64;

            let aux = auxiliary_slot(perm.wire_id() as usize);
            let index = &mut builds[target].index;
            let mut i = 0;
            while i < list.len() {
                let term = list[i].0;
                let mut j = i + 1;
                while j < list.len() && list[j].0 == term {
                    j += 1;
                }
                if let Some(record) = index.get_mut(term) {
                    record.set_auxiliary_first_term_count(aux, (j - i) as u64);
                }
                i = j;
            }
        }

        let build = &builds[target];
        let dir = root.join(build.ordering.dir_name());
        build.index.save(&dir.join(KEYS_FILE_NAME))?;
        let stats = build.tally.into_stats(crossed[0], crossed[1]);
        stats.save(&dir)?;
        info!(
            kind = build.tally.kind().label(),
            ordering = build.ordering.dir_name(),
            keys = stats.total_keys,
            triples = stats.valid_triples,
            new_keys = stats.new_keys,
            "ordering sealed"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribase_core::permutation::ALL_PERMUTATIONS;

    #[test]
    fn test_crossed_source_swaps_key_and_first_value() {
        for perm in ALL_PERMUTATIONS {
            let src = crossed_source(perm);
            let (k, v1, _) = perm.reorder(1, 2, 3);
            let (sk, sv1, _) = src.reorder(1, 2, 3);
            assert_eq!((k, v1), (sv1, sk), "{}", perm.dir_name());
            assert_eq!(crossed_source(src), perm);
        }
    }
}
