//! Streaming writer: consumes a sorted, key-grouped record stream per
//! permutation and turns each key's group into an encoded table plus one
//! coordinate emission.
//!
//! Six partitions, one per permutation, each fully independent: own
//! buffers, own output file, own stats. Within a partition the writer is
//! strictly sequential and assumes the upstream sorter's ordering
//! guarantees; violations are fatal, never corrected.
//!
//! Non-aggregated layouts store raw rows and drop incoming duplicate
//! counts; the sorter only annotates counts > 1 on streams headed for
//! aggregation.

use crate::coord_index::CoordinateIndex;
use crate::error::{Result, TableError};
use crate::layout::Group;
use crate::pool::EncoderPool;
use crate::storage::TableStorage;
use crate::strategy::{SelectorConfig, StrategySelector, DEFAULT_IN_MEMORY_THRESHOLD};
use std::path::Path;
use tracing::info;
use tribase_core::varint::vlong_len;
use tribase_core::{CoordinateSlot, Permutation, TripleRecord};
use tribase_core::permutation::ALL_PERMUTATIONS;

/// Receives one coordinate per flushed key. The bulk loader points this
/// at its tree writer; tests and the reference pipeline point it at a
/// [`CoordinateIndex`].
pub trait CoordinateSink {
    fn emit(&mut self, perm: Permutation, key: i64, slot: CoordinateSlot) -> Result<()>;
}

impl<T: CoordinateIndex> CoordinateSink for [T; 6] {
    fn emit(&mut self, perm: Permutation, key: i64, slot: CoordinateSlot) -> Result<()> {
        let mut record = tribase_core::CoordinateRecord::new();
        record.set(perm.wire_id() as usize, slot);
        self[perm.wire_id() as usize].append(key, record)
    }
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Fixed buffer capacity per partition; a single key exceeding it is
    /// a precondition violation by the upstream sorter.
    pub buffer_capacity: usize,
    /// Single-pair groups whose estimated encoding fits this many bytes
    /// are not written at all, only referenced from the coordinate.
    /// 0 disables the skip-table optimization.
    pub skip_table_threshold: usize,
    /// Growth step for the append-only output files.
    pub growth_step: usize,
    pub selector: SelectorConfig,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_IN_MEMORY_THRESHOLD,
            skip_table_threshold: 16,
            growth_step: crate::mapped::DEFAULT_GROWTH_STEP,
            selector: SelectorConfig::default(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PartitionStats {
    pub records: u64,
    pub groups: u64,
    pub skipped_groups: u64,
    pub aggregated_groups: u64,
    pub bytes_written: u64,
}

struct Partition {
    perm: Permutation,
    storage: Option<TableStorage>,
    key: Option<i64>,
    col1: Vec<i64>,
    col2: Vec<i64>,
    counts: Vec<u64>,
    encode_buf: Vec<u8>,
    stats: PartitionStats,
}

/// The streaming writer over all six permutations.
pub struct TableWriter<S: CoordinateSink> {
    partitions: Vec<Partition>,
    selector: StrategySelector,
    pool: EncoderPool,
    cfg: WriterConfig,
    sink: S,
}

impl<S: CoordinateSink> TableWriter<S> {
    pub fn create(root: &Path, cfg: WriterConfig, sink: S) -> Result<Self> {
        let mut partitions = Vec::with_capacity(6);
        for perm in ALL_PERMUTATIONS {
            partitions.push(Partition {
                perm,
                storage: Some(TableStorage::create(root, perm, cfg.growth_step)?),
                key: None,
                col1: Vec::new(),
                col2: Vec::new(),
                counts: Vec::new(),
                encode_buf: Vec::new(),
                stats: PartitionStats::default(),
            });
        }
        Ok(Self {
            partitions,
            selector: StrategySelector::new(cfg.selector.clone()),
            pool: EncoderPool::new(),
            cfg,
            sink,
        })
    }

    /// Feed the next record of `perm`'s sorted stream.
    pub fn insert(&mut self, perm: Permutation, record: TripleRecord) -> Result<()> {
        let idx = perm.wire_id() as usize;
        match self.partitions[idx].key {
            Some(k) if k == record.key => {
                let p = &self.partitions[idx];
                let n = p.col1.len();
                let last = (p.col1[n - 1], p.col2[n - 1]);
                if (record.v1, record.v2) < last {
                    return Err(TableError::UnsortedInput {
                        prev_key: k,
                        prev_v1: last.0,
                        prev_v2: last.1,
                        key: record.key,
                        v1: record.v1,
                        v2: record.v2,
                    });
                }
                if n >= self.cfg.buffer_capacity {
                    return Err(TableError::BufferOverflow {
                        key: k,
                        capacity: self.cfg.buffer_capacity,
                    });
                }
            }
            Some(k) => {
                if record.key < k {
                    return Err(TableError::UnsortedInput {
                        prev_key: k,
                        prev_v1: 0,
                        prev_v2: 0,
                        key: record.key,
                        v1: record.v1,
                        v2: record.v2,
                    });
                }
                self.flush_partition(idx)?;
            }
            None => {}
        }
        let p = &mut self.partitions[idx];
        p.key = Some(record.key);
        p.col1.push(record.v1);
        p.col2.push(record.v2);
        p.counts.push(record.count);
        p.stats.records += 1;
        Ok(())
    }

    /// Force out any partially accumulated group for `perm`.
    pub fn flush(&mut self, perm: Permutation) -> Result<()> {
        self.flush_partition(perm.wire_id() as usize)
    }

    /// Flush and finalize `perm`'s output file.
    pub fn stop(&mut self, perm: Permutation) -> Result<()> {
        let idx = perm.wire_id() as usize;
        self.flush_partition(idx)?;
        if let Some(storage) = self.partitions[idx].storage.take() {
            storage.finalize()?;
        }
        let stats = self.partitions[idx].stats;
        info!(
            perm = perm.dir_name(),
            records = stats.records,
            groups = stats.groups,
            skipped = stats.skipped_groups,
            aggregated = stats.aggregated_groups,
            bytes = stats.bytes_written,
            "partition finalized"
        );
        Ok(())
    }

    /// Stop every partition and hand back the coordinate sink.
    pub fn stop_all(mut self) -> Result<S> {
        for perm in ALL_PERMUTATIONS {
            self.stop(perm)?;
        }
        Ok(self.sink)
    }

    pub fn stats(&self, perm: Permutation) -> PartitionStats {
        self.partitions[perm.wire_id() as usize].stats
    }

    /// Read access to a partition's written bytes before finalization
    /// (same-process decode paths and tests).
    pub fn storage_slice(&self, perm: Permutation) -> Option<&[u8]> {
        self.partitions[perm.wire_id() as usize]
            .storage
            .as_ref()
            .map(|s| s.as_slice())
    }

    fn flush_partition(&mut self, idx: usize) -> Result<()> {
        let p = &mut self.partitions[idx];
        let key = match p.key.take() {
            Some(k) => k,
            None => return Ok(()),
        };
        if p.col1.is_empty() {
            return Ok(());
        }
        p.stats.groups += 1;

        // skip-table: a lone small pair lives in the coordinate itself
        if p.col1.len() == 1 && self.cfg.skip_table_threshold > 0 {
            let est = vlong_len(p.col1[0] as u64) + vlong_len(p.col2[0] as u64);
            if est <= self.cfg.skip_table_threshold && p.counts[0] == 1 {
                let slot = CoordinateSlot::reference_only(p.col1[0], p.col2[0]);
                p.stats.skipped_groups += 1;
                p.col1.clear();
                p.col2.clear();
                p.counts.clear();
                let perm = p.perm;
                return self.sink.emit(perm, key, slot);
            }
        }

        let aggregated = self.selector.determine_aggregated(&p.col1);
        if aggregated {
            aggregate_in_place(&mut p.col1, &mut p.col2, &mut p.counts);
            p.stats.aggregated_groups += 1;
        }
        let group = Group::new(&p.col1, &p.col2, &p.counts);
        let strategy = self.selector.determine(&group, aggregated);

        let mut encoder = self.pool.acquire(strategy.signature.format());
        p.encode_buf.clear();
        encoder.encode(strategy.signature, &group, &mut p.encode_buf)?;
        self.pool.release(encoder);

        let storage = p
            .storage
            .as_mut()
            .ok_or_else(|| TableError::Decode("partition already stopped".to_string()))?;
        let (file_id, mark) = storage.append_group(&p.encode_buf)?;
        let slot = CoordinateSlot {
            file_id,
            mark,
            n_elements: p.col1.len() as u64,
            signature: strategy.signature.as_byte(),
        };
        p.stats.bytes_written += p.encode_buf.len() as u64;
        p.col1.clear();
        p.col2.clear();
        p.counts.clear();
        let perm = p.perm;
        self.sink.emit(perm, key, slot)
    }
}

/// Collapse equal `(v1, v2)` pairs in place, summing duplicate counts.
fn aggregate_in_place(col1: &mut Vec<i64>, col2: &mut Vec<i64>, counts: &mut Vec<u64>) {
    let n = col1.len();
    let mut w = 0usize;
    for r in 0..n {
        if w > 0 && col1[r] == col1[w - 1] && col2[r] == col2[w - 1] {
            counts[w - 1] += counts[r];
        } else {
            col1[w] = col1[r];
            col2[w] = col2[r];
            counts[w] = counts[r];
            w += 1;
        }
    }
    col1.truncate(w);
    col2.truncate(w);
    counts.truncate(w);
}
