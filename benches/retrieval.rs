//! Retrieval benchmarks over a synthetic clustered index.
//!
//! Run with: cargo bench

use anyk::index::build::{build_index, BuildParams, ClusterSpec};
use anyk::index::{InvertedIndex, WandData};
use anyk::query::{Query, QueryExecutor, Scorer, ScorerParams, Strategy, Tunables};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const NUM_DOCS: u32 = 20_000;
const NUM_TERMS: u32 = 64;
const NUM_CLUSTERS: u32 = 16;

/// Build a deterministic synthetic index for benchmarking
fn build_benchmark_index() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("failed to create temp dir");

    let mut collection = String::new();
    for doc in 0..NUM_DOCS {
        let mut first = true;
        for term in 0..NUM_TERMS {
            let h = doc
                .wrapping_mul(2654435761)
                .wrapping_add(term.wrapping_mul(40503))
                >> 7;
            if h % 5 == 0 {
                for _ in 0..(h % 4 + 1) {
                    if !first {
                        collection.push(' ');
                    }
                    write!(collection, "{}", term).unwrap();
                    first = false;
                }
            }
        }
        collection.push('\n');
    }
    // A final document holding every term keeps all term ids resolvable
    for term in 0..NUM_TERMS {
        if term > 0 {
            collection.push(' ');
        }
        write!(collection, "{}", term).unwrap();
    }
    collection.push('\n');

    let collection_path = dir.path().join("collection.txt");
    fs::write(&collection_path, collection).expect("failed to write collection");

    let index_path = dir.path().join("index");
    let params = BuildParams {
        clusters: ClusterSpec::Even(NUM_CLUSTERS),
        scorer: ScorerParams::default(),
        ..Default::default()
    };
    build_index(&collection_path, &index_path, &params).expect("failed to build index");

    (dir, index_path)
}

fn bench_strategies(c: &mut Criterion) {
    let (_dir, index_path) = build_benchmark_index();
    let index = InvertedIndex::open(&index_path).unwrap();
    let wand = WandData::open(&index_path.join("wand.bin")).unwrap();

    let query = Query {
        id: "bench".to_string(),
        terms: vec![3, 17, 42],
    };

    let strategies = [
        Strategy::RankedOr,
        Strategy::Wand,
        Strategy::BlockMaxWand,
        Strategy::Maxscore,
        Strategy::BlockMaxMaxscore,
        Strategy::WandBoundsum,
        Strategy::BlockMaxWandBoundsum,
        Strategy::MaxscoreBoundsum,
    ];

    let mut group = c.benchmark_group("top10");
    for strategy in strategies {
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy.name()),
            &strategy,
            |bench, &strategy| {
                let scorer = Scorer::from_index(ScorerParams::default(), &index);
                let mut executor = QueryExecutor::new(
                    &index,
                    Some(&wand),
                    scorer,
                    strategy,
                    Tunables {
                        k: 10,
                        ..Default::default()
                    },
                )
                .unwrap();
                bench.iter(|| black_box(executor.execute(&query, 0.0, &[]).unwrap()));
            },
        );
    }
    group.finish();
}

fn bench_cluster_budget(c: &mut Criterion) {
    let (_dir, index_path) = build_benchmark_index();
    let index = InvertedIndex::open(&index_path).unwrap();
    let wand = WandData::open(&index_path.join("wand.bin")).unwrap();

    let query = Query {
        id: "bench".to_string(),
        terms: vec![3, 17, 42],
    };

    let mut group = c.benchmark_group("boundsum_budget");
    for budget in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(budget), &budget, |bench, &budget| {
            let scorer = Scorer::from_index(ScorerParams::default(), &index);
            let mut executor = QueryExecutor::new(
                &index,
                Some(&wand),
                scorer,
                Strategy::BlockMaxWandBoundsum,
                Tunables {
                    k: 10,
                    max_clusters: budget,
                    ..Default::default()
                },
            )
            .unwrap();
            bench.iter(|| black_box(executor.execute(&query, 0.0, &[]).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_strategies, bench_cluster_budget);
criterion_main!(benches);
