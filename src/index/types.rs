use serde::{Deserialize, Serialize};

/// Unique identifier for a document in the index
pub type DocId = u32;

/// Unique identifier for a posting list (term)
pub type TermId = u32;

/// Identifier of a docid cluster (contiguous range of the docid space)
pub type ClusterId = u32;

/// On-disk format version
pub const FORMAT_VERSION: u32 = 1;

/// Magic tag at the start of postings.bin
pub const POSTINGS_MAGIC: &[u8; 8] = b"ANYKPOST";

/// Magic tag at the start of wand.bin
pub const WAND_MAGIC: &[u8; 8] = b"ANYKWAND";

/// Maximum number of postings per compressed block
pub const POSTING_BLOCK_LEN: usize = 128;

/// Index metadata stored in meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub num_docs: u32,
    pub num_terms: u32,
    pub num_clusters: u32,
    pub avg_doc_len: f32,
    pub total_postings: u64,
}

impl Default for IndexMeta {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            num_docs: 0,
            num_terms: 0,
            num_clusters: 0,
            avg_doc_len: 0.0,
            total_postings: 0,
        }
    }
}

/// Dictionary entry mapping a term to its posting-list bytes
#[derive(Debug, Clone, Copy)]
pub struct DictEntry {
    pub offset: u64,
    pub length: u32,
    pub doc_freq: u32,
}
