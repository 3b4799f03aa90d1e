//! End-to-end retrieval tests over a real on-disk index: scenario coverage
//! for the exhaustive traversals, range restriction, boundsum ordering, and
//! the timeout variant.

mod common;

use anyk::index::{InvertedIndex, WandData};
use anyk::query::{
    Query, QueryExecutor, QueryOutput, Scorer, ScorerParams, Strategy, Tunables,
};
use common::{build_fixture, quantized, run_query, two_term_corpus};

fn tunables(k: usize) -> Tunables {
    Tunables {
        k,
        ..Default::default()
    }
}

#[test]
fn test_two_term_wand_correctness() {
    let (_dir, index) = build_fixture(&two_term_corpus(), 1, quantized());

    for strategy in [Strategy::Wand, Strategy::BlockMaxWand, Strategy::Maxscore] {
        let results = run_query(&index, strategy, quantized(), &[1, 2], tunables(3), 0.0, &[]);

        assert_eq!(results.len(), 3, "{:?}", strategy);
        assert_eq!(results[0], (2.0, 2), "{:?}", strategy);
        assert_eq!(results[1], (2.0, 8), "{:?}", strategy);
        assert_eq!(results[2].0, 1.0, "{:?}", strategy);
        assert!([0, 3, 5, 7].contains(&results[2].1), "{:?}", strategy);
    }
}

#[test]
fn test_range_restriction_visits_one_cluster() {
    // Clusters c0=[0,5), c1=[5,10); selection [c0] with a budget of one:
    // docs 5..10 must never appear
    let (_dir, index) = build_fixture(&two_term_corpus(), 2, quantized());

    for strategy in [
        Strategy::WandOrderedRange,
        Strategy::BlockMaxWandOrderedRange,
        Strategy::MaxscoreOrderedRange,
    ] {
        let results = run_query(
            &index,
            strategy,
            quantized(),
            &[1, 2],
            Tunables {
                k: 3,
                max_clusters: 1,
                ..Default::default()
            },
            0.0,
            &[0],
        );

        assert_eq!(results, vec![(2.0, 2), (1.0, 0), (1.0, 3)], "{:?}", strategy);
    }
}

#[test]
fn test_cluster_budget_respected() {
    // Selection names both clusters but the budget only allows the first
    let (_dir, index) = build_fixture(&two_term_corpus(), 2, quantized());

    let results = run_query(
        &index,
        Strategy::WandOrderedRange,
        quantized(),
        &[1, 2],
        Tunables {
            k: 10,
            max_clusters: 1,
            ..Default::default()
        },
        0.0,
        &[0, 1],
    );

    assert!(results.iter().all(|&(_, docid)| docid < 5));
    assert_eq!(results.len(), 3);
}

#[test]
fn test_ordered_range_full_selection_matches_exhaustive() {
    let (_dir, index) = build_fixture(&two_term_corpus(), 2, quantized());

    let exhaustive = run_query(&index, Strategy::Wand, quantized(), &[1, 2], tunables(5), 0.0, &[]);
    let ranged = run_query(
        &index,
        Strategy::WandOrderedRange,
        quantized(),
        &[1, 2],
        tunables(5),
        0.0,
        &[0, 1],
    );

    assert_eq!(exhaustive, ranged);
}

#[test]
fn test_boundsum_matches_exhaustive() {
    let (_dir, index) = build_fixture(&two_term_corpus(), 2, quantized());

    for strategy in [
        Strategy::WandBoundsum,
        Strategy::BlockMaxWandBoundsum,
        Strategy::MaxscoreBoundsum,
    ] {
        let results = run_query(&index, strategy, quantized(), &[1, 2], tunables(3), 0.0, &[]);

        assert_eq!(results[0], (2.0, 2), "{:?}", strategy);
        assert_eq!(results[1], (2.0, 8), "{:?}", strategy);
        assert_eq!(results[2].0, 1.0, "{:?}", strategy);
    }
}

#[test]
fn test_timeout_processes_exactly_one_cluster() {
    // Three clusters of 10000 docs each. The middle cluster carries the
    // highest impacts, so boundsum visits it first; a zero timeout then
    // stops before any second cluster.
    let mut docs = Vec::new();
    for doc in 0u32..30000 {
        let freq = match doc / 10000 {
            0 => 2,
            1 => 3,
            _ => 1,
        };
        docs.push(vec![1u32; freq]);
    }
    let (_dir, index) = build_fixture(&docs, 3, quantized());

    let results = run_query(
        &index,
        Strategy::WandBoundsumTimeout,
        quantized(),
        &[1],
        Tunables {
            k: 15000,
            timeout_micros: 0,
            ..Default::default()
        },
        0.0,
        &[],
    );

    // exactly the middle cluster's documents
    assert_eq!(results.len(), 10000);
    assert!(results.iter().all(|&(score, docid)| {
        score == 3.0 && (10000..20000).contains(&docid)
    }));
}

#[test]
fn test_unbounded_timeout_matches_exhaustive() {
    let (_dir, index) = build_fixture(&two_term_corpus(), 2, quantized());

    let exhaustive = run_query(&index, Strategy::Wand, quantized(), &[1, 2], tunables(4), 0.0, &[]);
    for strategy in [
        Strategy::WandBoundsumTimeout,
        Strategy::BlockMaxWandBoundsumTimeout,
        Strategy::MaxscoreBoundsumTimeout,
    ] {
        let results = run_query(
            &index,
            strategy,
            quantized(),
            &[1, 2],
            Tunables {
                k: 4,
                timeout_micros: u64::MAX,
                ..Default::default()
            },
            0.0,
            &[],
        );
        let scores: Vec<f32> = results.iter().map(|r| r.0).collect();
        let expected: Vec<f32> = exhaustive.iter().map(|r| r.0).collect();
        assert_eq!(scores, expected, "{:?}", strategy);
    }
}

#[test]
fn test_seeded_threshold_and_safe_rerun() {
    let (_dir, index) = build_fixture(&two_term_corpus(), 1, quantized());

    // A threshold above every singleton score: only the two 2.0 docs survive
    let pruned = run_query(&index, Strategy::Wand, quantized(), &[1, 2], tunables(3), 1.5, &[]);
    assert_eq!(pruned, vec![(2.0, 2), (2.0, 8)]);

    // Safe mode reruns with threshold 0 and fills the ranking back up
    let safe = run_query(
        &index,
        Strategy::Wand,
        quantized(),
        &[1, 2],
        Tunables {
            k: 3,
            safe: true,
            ..Default::default()
        },
        1.5,
        &[],
    );
    assert_eq!(safe.len(), 3);
    assert_eq!(safe[0], (2.0, 2));
}

#[test]
fn test_unranked_counts() {
    let (_dir, index) = build_fixture(&two_term_corpus(), 1, quantized());
    let inverted = InvertedIndex::open(&index).unwrap();
    let wand = WandData::open(&index.join("wand.bin")).unwrap();
    let query = Query {
        id: "q".to_string(),
        terms: vec![1, 2],
    };

    for (strategy, expected) in [
        (Strategy::And, 2),
        (Strategy::Or, 6),
        (Strategy::OrFreq, 6),
    ] {
        let scorer = Scorer::from_index(quantized(), &inverted);
        let mut executor = QueryExecutor::new(
            &inverted,
            Some(&wand),
            scorer,
            strategy,
            Tunables::default(),
        )
        .unwrap();
        match executor.execute(&query, 0.0, &[]).unwrap() {
            QueryOutput::Count(count) => assert_eq!(count, expected, "{:?}", strategy),
            QueryOutput::Ranked(_) => panic!("expected count output"),
        }
    }
}

#[test]
fn test_bm25_ranking_on_disk() {
    // Under BM25 the doc matching both terms outranks single-term docs,
    // and rarer terms contribute more. Equal doc lengths (term 3 as filler)
    // keep length normalization out of the comparison.
    let docs = vec![
        vec![1, 2, 3, 3],
        vec![1, 3, 3, 3],
        vec![1, 3, 3, 3],
        vec![1, 3, 3, 3],
        vec![2, 3, 3, 3],
        vec![1, 3, 3, 3],
        vec![1, 3, 3, 3],
        vec![1, 3, 3, 3],
    ];
    let (_dir, index) = build_fixture(&docs, 1, ScorerParams::default());

    let results = run_query(
        &index,
        Strategy::BlockMaxWand,
        ScorerParams::default(),
        &[1, 2],
        tunables(3),
        0.0,
        &[],
    );

    assert_eq!(results[0].1, 0);
    // doc 4 holds the rare term alone and beats the common-term docs
    assert_eq!(results[1].1, 4);
    assert!(results[0].0 > results[1].0);
    assert!(results[1].0 > results[2].0);
}

#[test]
fn test_idempotent_across_runs() {
    let (_dir, index) = build_fixture(&two_term_corpus(), 2, quantized());

    let first = run_query(&index, Strategy::MaxscoreBoundsum, quantized(), &[1, 2], tunables(3), 0.0, &[]);
    for _ in 0..3 {
        let again =
            run_query(&index, Strategy::MaxscoreBoundsum, quantized(), &[1, 2], tunables(3), 0.0, &[]);
        assert_eq!(first, again);
    }
}
