use crate::index::postings::PostingCursor;
use crate::index::types::*;
use crate::utils::{read_u32_at, read_u64_at};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Memory-mapped inverted index reader.
///
/// The postings file is mapped once at open and shared read-only for the
/// process lifetime; per-query cursors borrow slices out of it. All
/// structural validation happens here — query-time code assumes a
/// well-formed index.
pub struct InvertedIndex {
    pub meta: IndexMeta,
    postings: Mmap,
    dict: Vec<DictEntry>,
    doc_lens: Vec<u32>,
    avg_doc_len: f32,
}

/// Fixed byte sizes of the postings.bin layout
const HEADER_LEN: usize = 8 + 4 + 4 + 4 + 8;
const DICT_ENTRY_LEN: usize = 8 + 4 + 4;

impl InvertedIndex {
    /// Open an index directory (meta.json + postings.bin)
    pub fn open(dir: &Path) -> Result<Self> {
        let meta_path = dir.join("meta.json");
        let meta_file = File::open(&meta_path)
            .with_context(|| format!("failed to open {}", meta_path.display()))?;
        let meta: IndexMeta = serde_json::from_reader(meta_file).context("corrupt meta.json")?;

        if meta.version != FORMAT_VERSION {
            anyhow::bail!(
                "unsupported index version {} (expected {})",
                meta.version,
                FORMAT_VERSION
            );
        }

        let postings_path = dir.join("postings.bin");
        let file = File::open(&postings_path)
            .with_context(|| format!("failed to open {}", postings_path.display()))?;
        let postings = unsafe { Mmap::map(&file)? };

        if postings.len() < HEADER_LEN || &postings[..8] != POSTINGS_MAGIC {
            anyhow::bail!("{} is not a postings file", postings_path.display());
        }
        if read_u32_at(&postings, 8) != FORMAT_VERSION {
            anyhow::bail!("postings file version mismatch");
        }

        let num_docs = read_u32_at(&postings, 12);
        let num_terms = read_u32_at(&postings, 16);
        let dict_offset = read_u64_at(&postings, 20) as usize;

        if num_docs != meta.num_docs || num_terms != meta.num_terms {
            anyhow::bail!("postings file disagrees with meta.json");
        }
        if dict_offset + num_terms as usize * DICT_ENTRY_LEN > postings.len() {
            anyhow::bail!("postings dictionary out of bounds");
        }

        let mut doc_lens = Vec::with_capacity(num_docs as usize);
        let mut pos = HEADER_LEN;
        for _ in 0..num_docs {
            doc_lens.push(read_u32_at(&postings, pos));
            pos += 4;
        }

        let mut dict = Vec::with_capacity(num_terms as usize);
        let mut pos = dict_offset;
        for _ in 0..num_terms {
            let entry = DictEntry {
                offset: read_u64_at(&postings, pos),
                length: read_u32_at(&postings, pos + 8),
                doc_freq: read_u32_at(&postings, pos + 12),
            };
            if entry.offset as usize + entry.length as usize > postings.len() {
                anyhow::bail!("posting list out of bounds");
            }
            dict.push(entry);
            pos += DICT_ENTRY_LEN;
        }

        let total: u64 = doc_lens.iter().map(|&l| l as u64).sum();
        let avg_doc_len = if num_docs == 0 {
            0.0
        } else {
            total as f32 / num_docs as f32
        };

        Ok(Self {
            meta,
            postings,
            dict,
            doc_lens,
            avg_doc_len,
        })
    }

    /// Corpus size; also the exhausted-cursor sentinel docid
    #[inline]
    pub fn num_docs(&self) -> DocId {
        self.meta.num_docs
    }

    #[inline]
    pub fn num_terms(&self) -> u32 {
        self.meta.num_terms
    }

    /// Number of documents containing `term`
    pub fn doc_freq(&self, term: TermId) -> u32 {
        self.dict[term as usize].doc_freq
    }

    pub fn doc_lens(&self) -> &[u32] {
        &self.doc_lens
    }

    #[inline]
    pub fn avg_doc_len(&self) -> f32 {
        self.avg_doc_len
    }

    /// Whether `term` has a posting list in this index
    pub fn has_term(&self, term: TermId) -> bool {
        (term as usize) < self.dict.len()
    }

    /// Open a cursor over one term's postings
    pub fn postings(&self, term: TermId) -> PostingCursor<'_> {
        let entry = &self.dict[term as usize];
        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        PostingCursor::new(&self.postings[start..end], self.num_docs())
    }
}
