//! Query processing: cursors, scoring, the top-k queue, and the traversal
//! strategies.
//!
//! ## Pipeline
//!
//! ```text
//! queries file → Query → cursors (index + scorer + wand data)
//!              → traversal (WAND / BMW / MaxScore / …) → top-k
//! ```
//!
//! ## Modules
//!
//! - [`cursor`] - Capability traits and the scored cursor stack
//! - [`scorer`] - BM25 and quantized term scoring
//! - [`topk`] - Bounded min-heap with threshold pruning
//! - [`wand`], [`block_max_wand`], [`maxscore`] - Dynamic-pruning traversals
//!   and their anytime (cluster-at-a-time) variants
//! - [`boolean`], [`taat`] - Conjunctive/disjunctive baselines
//! - [`anytime`] - Cluster ordering and timeout scaffolding
//! - [`executor`] - Strategy dispatch

pub mod anytime;
pub mod block_max_wand;
pub mod boolean;
pub mod cursor;
pub mod executor;
pub mod maxscore;
pub mod scorer;
pub mod taat;
pub mod topk;
pub mod wand;

#[cfg(test)]
pub(crate) mod test_support;

use crate::index::types::TermId;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// Re-exports for public API
pub use executor::{QueryExecutor, QueryOutput, Strategy, Tunables};
pub use scorer::{Scorer, ScorerKind, ScorerParams};
pub use topk::{TopKEntry, TopKQueue};

/// A parsed query: an identifier plus the term ids to match
#[derive(Debug, Clone)]
pub struct Query {
    pub id: String,
    pub terms: Vec<TermId>,
}

/// Parse one query line: `query_id<TAB>term term …`
pub fn parse_query_line(line: &str) -> Result<Query> {
    let (id, rest) = line
        .split_once('\t')
        .with_context(|| format!("missing tab separator in query line `{}`", line))?;

    let mut terms = Vec::new();
    for token in rest.split_whitespace() {
        let term: TermId = token
            .parse()
            .with_context(|| format!("bad term id `{}` in query {}", token, id))?;
        terms.push(term);
    }

    Ok(Query {
        id: id.to_string(),
        terms,
    })
}

/// Read a queries file, one query per line
pub fn read_queries(path: &Path) -> Result<Vec<Query>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut queries = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        queries.push(parse_query_line(&line)?);
    }

    Ok(queries)
}

/// Read a thresholds file: one float per line, positionally aligned with the
/// queries. A length mismatch is fatal.
pub fn read_thresholds(path: &Path, num_queries: usize) -> Result<Vec<f32>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut thresholds = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let threshold: f32 = line
            .trim()
            .parse()
            .with_context(|| format!("bad threshold `{}`", line))?;
        thresholds.push(threshold);
    }

    if thresholds.len() != num_queries {
        anyhow::bail!(
            "thresholds file has {} entries for {} queries",
            thresholds.len(),
            num_queries
        );
    }
    Ok(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_line() {
        let query = parse_query_line("42\t10 7 10").unwrap();
        assert_eq!(query.id, "42");
        assert_eq!(query.terms, vec![10, 7, 10]);
    }

    #[test]
    fn test_parse_query_line_no_terms() {
        let query = parse_query_line("empty\t").unwrap();
        assert_eq!(query.id, "empty");
        assert!(query.terms.is_empty());
    }

    #[test]
    fn test_parse_query_line_rejects_junk() {
        assert!(parse_query_line("no tab here").is_err());
        assert!(parse_query_line("q1\t1 two 3").is_err());
    }
}
