//! Row-versus-column sampling heuristic.
//!
//! Delta groups are too small to justify the base writer's exact cost
//! model, so the layout choice is made by probing: a handful of random
//! positions in the sorted first column, each scanning forward to
//! measure its run length. Long average runs mean the column layout's
//! per-distinct-value blocks amortize well; short runs favor plain
//! fixed-width rows. Tiny groups always take rows, where the column
//! header alone would dominate.

use rand::Rng;

/// Positions probed per decision.
pub const SAMPLING_PROBES: usize = 5;
/// Average run length above which the column layout wins.
pub const SAMPLING_RUN_THRESHOLD: f64 = 3.0;
/// Groups at or below this size always take the row layout.
pub const SAMPLING_ROW_MAX: usize = 64;
/// Cap on how far one probe scans forward.
const PROBE_SCAN_MAX: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct SamplerConfig {
    pub probes: usize,
    pub run_threshold: f64,
    pub row_max: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            probes: SAMPLING_PROBES,
            run_threshold: SAMPLING_RUN_THRESHOLD,
            row_max: SAMPLING_ROW_MAX,
        }
    }
}

/// Decide whether `col1` (sorted ascending) should be stored in the
/// column layout. Returns false for the row layout.
pub fn prefers_column<R: Rng>(col1: &[i64], cfg: &SamplerConfig, rng: &mut R) -> bool {
    if col1.len() <= cfg.row_max || cfg.probes == 0 {
        return false;
    }
    let mut sampled = 0usize;
    for _ in 0..cfg.probes {
        let start = rng.gen_range(0..col1.len());
        let v = col1[start];
        let mut run = 1;
        while run < PROBE_SCAN_MAX && start + run < col1.len() && col1[start + run] == v {
            run += 1;
        }
        sampled += run;
    }
    sampled as f64 / cfg.probes as f64 > cfg.run_threshold
}
