//! Inverted index storage: building, reading, and the pruning metadata.
//!
//! - [`build`] - Collection ingestion, postings and wand-data construction
//! - [`reader`] - Memory-mapped index reading
//! - [`postings`] - Block-compressed posting lists and cursors
//! - [`wand_data`] - Per-term block and range score upper bounds
//! - [`clusters`] - Docid cluster map and per-query cluster selections
//! - [`stats`] - Index statistics
//! - [`types`] - Shared id types and format constants
//!
//! ## Index layout
//!
//! ```text
//! <index-dir>/
//! ├── meta.json       # Index metadata
//! ├── postings.bin    # Doc lengths + posting lists + dictionary (mmap'd)
//! └── wand.bin        # Cluster table + per-term score bounds (mmap'd)
//! ```
//!
//! Everything under the index directory is immutable once built; readers
//! memory-map it and share it freely across queries.

pub mod build;
pub mod clusters;
pub mod postings;
pub mod reader;
pub mod stats;
pub mod types;
pub mod wand_data;

// Re-exports for public API
pub use clusters::ClusterMap;
pub use reader::InvertedIndex;
pub use types::*;
pub use wand_data::WandData;
