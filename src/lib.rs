//! # anyk - Anytime top-k ranked retrieval
//!
//! anyk is a disjunctive top-k retrieval engine over a memory-mapped
//! inverted index, built around dynamic pruning (WAND, Block-Max WAND,
//! MaxScore) and *anytime* early termination: the docid space is partitioned
//! into contiguous clusters, and a query can stop at any cluster boundary —
//! after a fixed cluster budget, when the per-cluster bound heuristic goes
//! dead, or when a latency budget is about to run out — while still
//! returning a valid top-k.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`index`] - Index building and reading (postings, wand data, clusters)
//! - [`query`] - Cursors, scoring, traversal strategies, execution
//! - [`output`] - Result formatting
//! - [`utils`] - Codecs and progress reporting
//!
//! ## Quick Start
//!
//! ```ignore
//! use anyk::index::{InvertedIndex, WandData};
//! use anyk::query::{read_queries, QueryExecutor, Scorer, ScorerParams, Strategy, Tunables};
//! use std::path::Path;
//!
//! let dir = Path::new("/path/to/index");
//! let index = InvertedIndex::open(dir)?;
//! let wand = WandData::open(&dir.join("wand.bin"))?;
//!
//! let scorer = Scorer::from_index(ScorerParams::default(), &index);
//! let mut executor = QueryExecutor::new(
//!     &index,
//!     Some(&wand),
//!     scorer,
//!     Strategy::BlockMaxWand,
//!     Tunables { k: 10, ..Default::default() },
//! )?;
//!
//! for query in read_queries(Path::new("queries.tsv"))? {
//!     let output = executor.execute(&query, 0.0, &[])?;
//!     // ...
//! }
//! # anyhow::Ok(())
//! ```
//!
//! ## Execution model
//!
//! Queries are processed one at a time on the calling thread. The index and
//! wand data are immutable, memory-mapped, and freely shareable across
//! threads by reference; all mutable state (cursors, the top-k queue) is
//! per-query. Timeouts are only polled between clusters, so a traversal
//! never abandons a cluster mid-scan.

pub mod index;
pub mod output;
pub mod query;
pub mod utils;
