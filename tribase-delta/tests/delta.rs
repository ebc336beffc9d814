//! End-to-end coverage of differential index builds: all six served
//! permutations, the cross-ordering counters, the stats headers and
//! cardinality against brute-force recomputation.

use std::collections::BTreeSet;
use std::path::Path;
use tribase_core::permutation::ALL_PERMUTATIONS;
use tribase_core::{Permutation, TripleRecord};
use tribase_delta::{
    build_delta, DeltaConfig, DeltaIndex, DeltaKind, StoreView, TermOrdering, ALL_ORDERINGS,
};
use tribase_tables::{
    FileCoordinateIndex, Signature, StorageFormat, TableReader, TableWriter, WriterConfig,
};

fn cfg() -> DeltaConfig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    DeltaConfig {
        sampling_seed: Some(7),
        ..Default::default()
    }
}

fn sample_triples() -> Vec<(i64, i64, i64)> {
    let mut triples = Vec::new();
    for s in 0..30i64 {
        for p in 0..(1 + s % 4) {
            for o in 0..(1 + (s + p) % 5) {
                triples.push((s, 100 + p, 1_000 + o * 7));
            }
        }
    }
    triples
}

fn build(dir: &Path, kind: DeltaKind, triples: &[(i64, i64, i64)]) -> DeltaIndex {
    build_delta(dir, kind, triples, None, &cfg()).unwrap()
}

#[test]
fn test_all_permutations_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let triples = sample_triples();
    let index = build(dir.path(), DeltaKind::Addition, &triples);

    let expect: BTreeSet<(i64, i64, i64)> = triples.iter().copied().collect();
    for perm in ALL_PERMUTATIONS {
        let mut seen = BTreeSet::new();
        let keys: BTreeSet<i64> = triples
            .iter()
            .map(|&(s, p, o)| perm.reorder(s, p, o).0)
            .collect();
        for key in keys {
            let mut cursor = index.iterator(perm, key, None, None).unwrap().unwrap();
            let mut prev = None;
            while let Some(e) = cursor.next().unwrap() {
                assert!(prev < Some((e.0, e.1)), "{} unsorted", perm.dir_name());
                prev = Some((e.0, e.1));
                assert_eq!(e.2, 1);
                seen.insert(perm.restore(key, e.0, e.1));
            }
        }
        assert_eq!(seen, expect, "{} diverged", perm.dir_name());
    }
}

#[test]
fn test_missing_key_and_constraints() {
    let dir = tempfile::tempdir().unwrap();
    let index = build(dir.path(), DeltaKind::Addition, &sample_triples());

    assert!(index
        .iterator(Permutation::Spo, 9_999, None, None)
        .unwrap()
        .is_none());
    assert_eq!(
        index
            .cardinality(Permutation::Spo, 9_999, None, None)
            .unwrap(),
        0
    );

    // s=5 has p in {100, 101}; constrain to one predicate
    let mut cursor = index
        .iterator(Permutation::Spo, 5, Some(101), None)
        .unwrap()
        .unwrap();
    while let Some(e) = cursor.next().unwrap() {
        assert_eq!(e.0, 101);
    }
    assert_eq!(
        index
            .cardinality(Permutation::Spo, 5, Some(777), None)
            .unwrap(),
        0
    );
}

#[test]
fn test_first_term_counters_cross_copied() {
    let dir = tempfile::tempdir().unwrap();
    let triples = sample_triples();
    let index = build(dir.path(), DeltaKind::Addition, &triples);

    for perm in ALL_PERMUTATIONS {
        let mut pairs: Vec<(i64, i64)> = triples
            .iter()
            .map(|&(s, p, o)| {
                let (k, v1, _) = perm.reorder(s, p, o);
                (k, v1)
            })
            .collect();
        pairs.sort_unstable();
        pairs.dedup();
        let keys: BTreeSet<i64> = pairs.iter().map(|&(k, _)| k).collect();
        for key in keys {
            let expect = pairs.iter().filter(|&&(k, _)| k == key).count() as u64;
            assert_eq!(
                index.first_term_count(perm, key),
                Some(expect),
                "{} key {}",
                perm.dir_name(),
                key
            );
        }
    }
}

#[test]
fn test_stats_headers() {
    let dir = tempfile::tempdir().unwrap();
    let mut triples = sample_triples();
    triples.push(triples[0]); // duplicate must be dropped
    let index = build(dir.path(), DeltaKind::Addition, &triples);

    let dedup: BTreeSet<(i64, i64, i64)> = triples.iter().copied().collect();
    for ordering in ALL_ORDERINGS {
        let [perm0, perm1] = ordering.permutations();
        let stats = index.stats(ordering);
        assert_eq!(stats.valid_triples, dedup.len() as u64);
        assert_eq!(stats.total_count1, dedup.len() as u64);
        assert_eq!(stats.total_count2, dedup.len() as u64);
        assert_eq!(
            stats.total_keys,
            index.unique_first_term_count(perm0),
            "{}",
            ordering.dir_name()
        );
        // no base store was consulted: every key is new
        assert_eq!(stats.new_keys, stats.total_keys);

        for (perm, crossed) in [
            (perm0, stats.crossed_unique1),
            (perm1, stats.crossed_unique2),
        ] {
            let unique: BTreeSet<(i64, i64)> = dedup
                .iter()
                .map(|&(s, p, o)| {
                    let (k, v1, _) = perm.reorder(s, p, o);
                    (k, v1)
                })
                .collect();
            assert_eq!(crossed, unique.len() as u64, "{}", perm.dir_name());
        }
    }
}

#[test]
fn test_new_keys_against_base_store() {
    let dir = tempfile::tempdir().unwrap();
    let base_dir = dir.path().join("base");
    let mut writer = TableWriter::create(
        &base_dir,
        WriterConfig::default(),
        <[FileCoordinateIndex; 6]>::default(),
    )
    .unwrap();
    // base knows subjects 0..10
    for perm in ALL_PERMUTATIONS {
        let mut records: Vec<TripleRecord> = (0..10i64)
            .map(|s| TripleRecord::from_spo(perm, s, 100, 1_000 + s))
            .collect();
        records.sort_by(|a, b| a.cmp_fields(b));
        for r in records {
            writer.insert(perm, r).unwrap();
        }
    }
    let reader = TableReader::open(&base_dir, writer.stop_all().unwrap()).unwrap();

    // batch touches subjects 5..15: five known, five new
    let batch: Vec<(i64, i64, i64)> = (5..15i64).map(|s| (s, 200, 2_000)).collect();
    let index = build_delta(
        &dir.path().join("add"),
        DeltaKind::Addition,
        &batch,
        Some(&reader),
        &cfg(),
    )
    .unwrap();
    assert_eq!(index.stats(TermOrdering::ByFirst).new_keys, 5);
    assert_eq!(index.stats(TermOrdering::ByFirst).total_keys, 10);
    // predicate 200 and object 2000 are new everywhere
    assert_eq!(index.stats(TermOrdering::BySecond).new_keys, 1);
    assert_eq!(index.stats(TermOrdering::ByThird).new_keys, 1);
}

#[test]
fn test_unique_first_term_count_adjusted_by_registered_batches() {
    let dir = tempfile::tempdir().unwrap();
    let base_dir = dir.path().join("base");
    let mut writer = TableWriter::create(
        &base_dir,
        WriterConfig::default(),
        <[FileCoordinateIndex; 6]>::default(),
    )
    .unwrap();
    // base: subjects 0..10, two triples each
    let base_triples: Vec<(i64, i64, i64)> = (0..10i64)
        .flat_map(|s| [(s, 100, 1_000), (s, 101, 1_001)])
        .collect();
    for perm in ALL_PERMUTATIONS {
        let mut records: Vec<TripleRecord> = base_triples
            .iter()
            .map(|&(s, p, o)| TripleRecord::from_spo(perm, s, p, o))
            .collect();
        records.sort_by(|a, b| a.cmp_fields(b));
        for r in records {
            writer.insert(perm, r).unwrap();
        }
    }
    let reader = TableReader::open(&base_dir, writer.stop_all().unwrap()).unwrap();

    // two brand-new subjects plus a new predicate under a known one
    let added = vec![(20i64, 100i64, 1_000i64), (21, 100, 1_000), (5, 200, 2_000)];
    let add = build_delta(
        &dir.path().join("add"),
        DeltaKind::Addition,
        &added,
        Some(&reader),
        &cfg(),
    )
    .unwrap();
    // subject 0 loses its whole group, subject 1 only half of it
    let removed = vec![(0i64, 100i64, 1_000i64), (0, 101, 1_001), (1, 100, 1_000)];
    let rm = build_delta(
        &dir.path().join("rm"),
        DeltaKind::Removal,
        &removed,
        Some(&reader),
        &cfg(),
    )
    .unwrap();

    assert_eq!(add.new_key_count(Permutation::Spo), 2);
    assert_eq!(rm.new_key_count(Permutation::Spo), 1);

    let mut view = StoreView::new(&reader);
    assert_eq!(view.unique_first_term_count(Permutation::Spo), 10);
    view.register(&add);
    assert_eq!(view.unique_first_term_count(Permutation::Spo), 12);
    view.register(&rm);
    assert_eq!(view.unique_first_term_count(Permutation::Spo), 11);
    // Sop shares the subject-keyed ordering
    assert_eq!(view.unique_first_term_count(Permutation::Sop), 11);

    // predicates: base {100, 101}, 200 added, nothing fully removed
    assert_eq!(view.unique_first_term_count(Permutation::Pos), 3);
    // objects: base {1000, 1001}, 2000 added, removals only partial
    assert_eq!(view.unique_first_term_count(Permutation::Ops), 3);
}

#[test]
fn test_sampling_picks_column_for_runs_and_rows_for_unique() {
    let dir = tempfile::tempdir().unwrap();
    let mut triples = Vec::new();
    // key 1: 500 pairs sharing one first term -> long runs -> column
    for o in 0..500i64 {
        triples.push((1, 7, 10_000 + o));
    }
    // key 2: 500 pairs with distinct first terms -> rows
    for p in 0..500i64 {
        triples.push((2, 100 + p, 5));
    }
    let index = build(dir.path(), DeltaKind::Addition, &triples);

    let runs = index.lookup(Permutation::Spo, 1).unwrap();
    assert_eq!(
        Signature::from_byte(runs.signature).unwrap().format(),
        StorageFormat::Column
    );
    let unique = index.lookup(Permutation::Spo, 2).unwrap();
    assert_eq!(
        Signature::from_byte(unique.signature).unwrap().format(),
        StorageFormat::FixedRow
    );
    // both decode back intact
    assert_eq!(index.cardinality(Permutation::Spo, 1, None, None).unwrap(), 500);
    assert_eq!(index.cardinality(Permutation::Spo, 2, None, None).unwrap(), 500);
}

#[test]
fn test_addition_and_removal_batches() {
    let dir = tempfile::tempdir().unwrap();
    let mut added = Vec::new();
    for i in 0..500i64 {
        added.push((i % 40, 100 + i % 9, 10_000 + i));
    }
    // removals over a disjoint key range
    let mut removed = Vec::new();
    for i in 0..200i64 {
        removed.push((1_000 + i % 25, 100 + i % 7, 10_000 + i));
    }

    let add = build(&dir.path().join("add"), DeltaKind::Addition, &added);
    let rm = build(&dir.path().join("rm"), DeltaKind::Removal, &removed);
    assert_eq!(add.kind(), DeltaKind::Addition);
    assert_eq!(rm.kind(), DeltaKind::Removal);

    for perm in ALL_PERMUTATIONS {
        for (index, raw) in [(&add, &added), (&rm, &removed)] {
            let rows: BTreeSet<(i64, i64, i64)> = raw
                .iter()
                .map(|&(s, p, o)| perm.reorder(s, p, o))
                .collect();
            let keys: Vec<i64> = rows.iter().map(|r| r.0).collect();
            for &key in keys.iter().take(50) {
                let expect = rows.iter().filter(|r| r.0 == key).count() as u64;
                assert_eq!(
                    index.cardinality(perm, key, None, None).unwrap(),
                    expect,
                    "{} key {}",
                    perm.dir_name(),
                    key
                );
                let (_, v1, _) = *rows.iter().find(|r| r.0 == key).unwrap();
                let expect_v1 = rows.iter().filter(|r| r.0 == key && r.1 == v1).count() as u64;
                assert_eq!(
                    index.cardinality(perm, key, Some(v1), None).unwrap(),
                    expect_v1
                );
            }
        }
        // the two batches never share a key
        for &(s, p, o) in &removed {
            let (k, _, _) = perm.reorder(s, p, o);
            if matches!(perm, Permutation::Spo | Permutation::Sop) {
                assert!(add.lookup(perm, k).is_none());
            }
        }
    }
}
