//! Shared fixtures: build a real on-disk index from an in-memory collection
//! and run queries against it.
#![allow(dead_code)]

use anyk::index::build::{build_index, BuildParams, ClusterSpec};
use anyk::index::types::{ClusterId, DocId, TermId};
use anyk::index::{InvertedIndex, WandData};
use anyk::query::{
    Query, QueryExecutor, QueryOutput, Scorer, ScorerKind, ScorerParams, Strategy, Tunables,
};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub fn quantized() -> ScorerParams {
    ScorerParams {
        kind: ScorerKind::Quantized,
        ..Default::default()
    }
}

/// Write `docs` (term occurrences per document) as a collection file and
/// build an index over it, split into `num_clusters` even clusters
pub fn build_fixture(docs: &[Vec<TermId>], num_clusters: u32, scorer: ScorerParams) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("failed to create temp dir");

    let mut collection = String::new();
    for doc in docs {
        for (i, term) in doc.iter().enumerate() {
            if i > 0 {
                collection.push(' ');
            }
            write!(collection, "{}", term).unwrap();
        }
        collection.push('\n');
    }
    let collection_path = dir.path().join("collection.txt");
    fs::write(&collection_path, collection).expect("failed to write collection");

    let index_path = dir.path().join("index");
    let params = BuildParams {
        clusters: ClusterSpec::Even(num_clusters),
        scorer,
        ..Default::default()
    };
    build_index(&collection_path, &index_path, &params).expect("failed to build index");

    (dir, index_path)
}

/// Run one query with the given strategy and return (score, docid) pairs
#[allow(clippy::too_many_arguments)]
pub fn run_query(
    index_path: &PathBuf,
    strategy: Strategy,
    scorer: ScorerParams,
    terms: &[TermId],
    tunables: Tunables,
    threshold: f32,
    selection: &[ClusterId],
) -> Vec<(f32, DocId)> {
    let index = InvertedIndex::open(index_path).expect("failed to open index");
    let wand = WandData::open(&index_path.join("wand.bin")).expect("failed to open wand data");
    let scorer = Scorer::from_index(scorer, &index);

    let mut executor =
        QueryExecutor::new(&index, Some(&wand), scorer, strategy, tunables).unwrap();
    let query = Query {
        id: "q".to_string(),
        terms: terms.to_vec(),
    };

    match executor.execute(&query, threshold, selection).unwrap() {
        QueryOutput::Ranked(results) => results.iter().map(|e| (e.score, e.docid)).collect(),
        QueryOutput::Count(_) => panic!("expected ranked output"),
    }
}

/// The ten-document two-term corpus used across scenario tests:
/// term 1 matches docs {0, 2, 5, 8}, term 2 matches docs {2, 3, 7, 8},
/// every posting scoring 1.0 under the quantized scorer
pub fn two_term_corpus() -> Vec<Vec<TermId>> {
    vec![
        vec![1],
        vec![],
        vec![1, 2],
        vec![2],
        vec![],
        vec![1],
        vec![],
        vec![2],
        vec![1, 2],
        vec![],
    ]
}
