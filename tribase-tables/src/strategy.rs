//! Cost-based strategy selection: pick the cheapest signature for one
//! key's record-group before any byte is written.
//!
//! One pass over the group accumulates, for every varint mode
//! combination, the exact byte cost a row or cluster encoding would
//! produce, alongside the closed-form costs of the fixed-width layouts.
//! The selector then takes the global minimum with a deliberate thumb on
//! the scale: row layouts decode cheaper, so a row encoding within
//! [`RATE_LIST`] of the minimum wins anyway.
//!
//! Groups whose distinct-first-value count reaches the configured column
//! breakpoint skip the cost model and go straight to the column layout,
//! as do oversized groups on the approximate path.

use crate::layout::Group;
use crate::signature::{ComprMode, Signature, StorageFormat};
use tribase_core::bytes::width_for;
use tribase_core::varint::{vlong2_len, vlong_len};

/// Row-preference tolerance: a row encoding within this factor of the
/// cheapest candidate is selected over it.
pub const RATE_LIST: f64 = 1.05;

/// Default in-memory group threshold separating the exact cost model
/// from the approximate large-table path.
pub const DEFAULT_IN_MEMORY_THRESHOLD: usize = 1_024_000;

/// Default distinct-first-value count at which a group goes straight to
/// the column layout.
pub const DEFAULT_COLUMN_BREAKPOINT: u64 = 1_000_000;

/// Default divisor for the aggregation pre-decision: aggregate when
/// distinct first values ≤ group size / ratio.
pub const DEFAULT_AGGREGATION_RATIO: u64 = 10;

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub in_memory_threshold: usize,
    pub column_breakpoint: u64,
    pub row_preference_rate: f64,
    pub use_row_for_large_tables: bool,
    pub aggregation_ratio: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            in_memory_threshold: DEFAULT_IN_MEMORY_THRESHOLD,
            column_breakpoint: DEFAULT_COLUMN_BREAKPOINT,
            row_preference_rate: RATE_LIST,
            use_row_for_large_tables: false,
            aggregation_ratio: DEFAULT_AGGREGATION_RATIO,
        }
    }
}

/// The selector's verdict for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub signature: Signature,
    /// Estimated encoded size in bytes; `None` on the approximate path,
    /// where no exact model is run.
    pub estimated_size: Option<u64>,
}

/// Per-group statistics and cost accumulators, computed in one pass.
///
/// Indexing: `[delta applied as usize][vlong2 as usize]` for field-1
/// accumulators, `[vlong2 as usize]` for field-2.
#[derive(Debug, Default)]
struct GroupStats {
    n: u64,
    max1: u64,
    max2: u64,
    n_groups: u64,
    max_group: u64,
    row1: [[u64; 2]; 2],
    row2: [u64; 2],
    grp1: [[u64; 2]; 2],
    grp2: [u64; 2],
    grp_count_bytes: u64,
    agg_count_bytes: u64,
}

impl GroupStats {
    fn compute(group: &Group<'_>) -> Self {
        let mut s = GroupStats::default();
        let n = group.len();
        s.n = n as u64;
        let mut prev1: i64 = 0;
        let mut prev_group: i64 = 0;
        let mut group_start = 0usize;
        for i in 0..n {
            let f1 = group.col1[i];
            let f2 = group.col2[i] as u64;
            s.max1 = s.max1.max(f1 as u64);
            s.max2 = s.max2.max(f2);
            s.agg_count_bytes += vlong_len(group.counts[i]) as u64;

            // row costs: field1 absolute and delta-coded, field2 absolute
            let d1 = (f1 - prev1) as u64;
            s.row1[1][0] += vlong_len(d1) as u64;
            s.row1[1][1] += vlong2_len(d1) as u64;
            s.row1[0][0] += vlong_len(f1 as u64) as u64;
            s.row1[0][1] += vlong2_len(f1 as u64) as u64;
            s.row2[0] += vlong_len(f2) as u64;
            s.row2[1] += vlong2_len(f2) as u64;
            prev1 = f1;

            let group_boundary = i == 0 || group.col1[i - 1] != f1;
            if group_boundary {
                if i > 0 {
                    let len = (i - group_start) as u64;
                    s.max_group = s.max_group.max(len);
                    s.grp_count_bytes += vlong_len(len) as u64;
                    group_start = i;
                }
                s.n_groups += 1;
                let dg = (f1 - prev_group) as u64;
                s.grp1[1][0] += vlong_len(dg) as u64;
                s.grp1[1][1] += vlong2_len(dg) as u64;
                s.grp1[0][0] += vlong_len(f1 as u64) as u64;
                s.grp1[0][1] += vlong2_len(f1 as u64) as u64;
                prev_group = f1;
                // first in-group value2 is absolute
                s.grp2[0] += vlong_len(f2) as u64;
                s.grp2[1] += vlong2_len(f2) as u64;
            } else {
                let d2 = (group.col2[i] - group.col2[i - 1]) as u64;
                s.grp2[0] += vlong_len(d2) as u64;
                s.grp2[1] += vlong2_len(d2) as u64;
            }
        }
        if n > 0 {
            let len = (n - group_start) as u64;
            s.max_group = s.max_group.max(len);
            s.grp_count_bytes += vlong_len(len) as u64;
        }
        s
    }
}

/// Cost-based selection of a signature plus a pooled encoder. Stateless
/// aside from its configuration; total over all inputs.
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    cfg: SelectorConfig,
}

impl StrategySelector {
    pub fn new(cfg: SelectorConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.cfg
    }

    /// Should this group be stored as distinct pairs with counts?
    /// Decided before layout selection, independently per permutation.
    pub fn determine_aggregated(&self, col1: &[i64]) -> bool {
        let n = col1.len() as u64;
        if n == 0 {
            return false;
        }
        let mut distinct = 0u64;
        for i in 0..col1.len() {
            if i == 0 || col1[i - 1] != col1[i] {
                distinct += 1;
            }
        }
        distinct <= n / self.cfg.aggregation_ratio
    }

    /// Pick the signature for `group`. `aggregated` reflects the
    /// [`determine_aggregated`](Self::determine_aggregated) pre-decision;
    /// aggregated groups only consider the row layouts, which are the
    /// ones that carry per-row counts.
    pub fn determine(&self, group: &Group<'_>, aggregated: bool) -> Strategy {
        if group.len() >= self.cfg.in_memory_threshold {
            // approximate path: the group never sat fully in memory, so
            // no per-element statistics exist
            let signature = if self.cfg.use_row_for_large_tables || aggregated {
                // only the row layouts can carry per-row counts
                Signature::new(StorageFormat::FixedRow)
                    .with_widths(8, 8)
                    .with_aggregated(aggregated)
            } else {
                Signature::new(StorageFormat::Column)
            };
            return Strategy {
                signature,
                estimated_size: None,
            };
        }

        let stats = GroupStats::compute(group);
        if !aggregated && stats.n_groups >= self.cfg.column_breakpoint {
            return Strategy {
                signature: Signature::new(StorageFormat::Column),
                estimated_size: None,
            };
        }

        let candidates = self.candidates(&stats, aggregated);
        let min_cost = candidates.iter().map(|c| c.cost).min().unwrap_or(0);
        let tolerated = (min_cost as f64 * self.cfg.row_preference_rate) as u64;
        // cheapest row inside the tolerance; list order resolves ties
        let mut preferred_row: Option<&Candidate> = None;
        for c in &candidates {
            if c.is_row && c.cost <= tolerated {
                match preferred_row {
                    Some(p) if p.cost <= c.cost => {}
                    _ => preferred_row = Some(c),
                }
            }
        }
        let chosen = match preferred_row {
            Some(c) => c,
            None => candidates
                .iter()
                .find(|c| c.cost == min_cost)
                .unwrap_or(&candidates[0]),
        };
        Strategy {
            signature: chosen.signature,
            estimated_size: Some(chosen.cost),
        }
    }

    /// All candidate signatures with estimated costs, in tie-break
    /// preference order (earlier wins on equal cost).
    fn candidates(&self, stats: &GroupStats, aggregated: bool) -> Vec<Candidate> {
        let mut out = Vec::with_capacity(18);
        let w1 = width_for(stats.max1);
        let w2 = width_for(stats.max2);

        // vbyte rows: no-delta before delta, vlong before vlong2
        for delta in [false, true] {
            for c1 in [ComprMode::VLong, ComprMode::VLong2] {
                for c2 in [ComprMode::VLong, ComprMode::VLong2] {
                    let mut cost = stats.row1[delta as usize][vlong2_idx(c1)]
                        + stats.row2[vlong2_idx(c2)];
                    if aggregated {
                        cost += stats.agg_count_bytes;
                    }
                    out.push(Candidate {
                        cost,
                        signature: Signature::new(StorageFormat::Row)
                            .with_delta(delta)
                            .with_compr1(c1)
                            .with_compr2(c2)
                            .with_aggregated(aggregated),
                        is_row: true,
                    });
                }
            }
        }

        // fixed row
        let mut fixed_row_cost = stats.n * (w1 as u64 + w2 as u64);
        if aggregated {
            fixed_row_cost += 4 * stats.n;
        }
        out.push(Candidate {
            cost: fixed_row_cost,
            signature: Signature::new(StorageFormat::FixedRow)
                .with_widths(w1, w2)
                .with_aggregated(aggregated),
            is_row: true,
        });

        if aggregated {
            // cluster layouts have nowhere to put per-pair counts
            return out;
        }

        for delta in [false, true] {
            for c1 in [ComprMode::VLong, ComprMode::VLong2] {
                for c2 in [ComprMode::VLong, ComprMode::VLong2] {
                    let cost = stats.grp1[delta as usize][vlong2_idx(c1)]
                        + stats.grp2[vlong2_idx(c2)]
                        + stats.grp_count_bytes;
                    out.push(Candidate {
                        cost,
                        signature: Signature::new(StorageFormat::Cluster)
                            .with_delta(delta)
                            .with_compr1(c1)
                            .with_compr2(c2),
                        is_row: false,
                    });
                }
            }
        }

        let cw: u8 = if stats.max_group <= 255 { 1 } else { 4 };
        out.push(Candidate {
            cost: stats.n_groups * (w1 as u64 + cw as u64) + stats.n * w2 as u64,
            signature: Signature::new(StorageFormat::FixedCluster)
                .with_widths(w1, w2)
                .with_count_width(cw),
            is_row: false,
        });

        out
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: u64,
    signature: Signature,
    is_row: bool,
}

#[inline]
fn vlong2_idx(mode: ComprMode) -> usize {
    match mode {
        ComprMode::VLong => 0,
        ComprMode::VLong2 => 1,
    }
}
