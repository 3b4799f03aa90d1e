//! Term scoring.
//!
//! The traversals treat scoring as an opaque `(docid, freq) -> f32`; this
//! module provides the two concrete functions behind that contract. Scores
//! must be finite and non-negative — pruning arithmetic relies on it.

use crate::index::reader::InvertedIndex;
use crate::index::types::DocId;

/// Which scoring function to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorerKind {
    /// Okapi BM25 over raw term frequencies
    #[default]
    Bm25,
    /// Frequencies are precomputed quantized impacts; score = freq
    Quantized,
}

impl ScorerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bm25" => Some(Self::Bm25),
            "quantized" => Some(Self::Quantized),
            _ => None,
        }
    }
}

/// Scoring configuration shared by the builder and the query pipeline.
/// Both sides must agree or the precomputed bounds are meaningless.
#[derive(Debug, Clone, Copy)]
pub struct ScorerParams {
    pub kind: ScorerKind,
    pub k1: f32,
    pub b: f32,
}

impl Default for ScorerParams {
    fn default() -> Self {
        Self {
            kind: ScorerKind::Bm25,
            k1: 0.9,
            b: 0.4,
        }
    }
}

/// Per-corpus scorer state; hands out a [`TermScorer`] per query term
pub struct Scorer<'a> {
    params: ScorerParams,
    num_docs: u32,
    avg_doc_len: f32,
    doc_lens: &'a [u32],
}

impl<'a> Scorer<'a> {
    pub fn new(
        params: ScorerParams,
        num_docs: u32,
        avg_doc_len: f32,
        doc_lens: &'a [u32],
    ) -> Self {
        Self {
            params,
            num_docs,
            avg_doc_len,
            doc_lens,
        }
    }

    pub fn from_index(params: ScorerParams, index: &'a InvertedIndex) -> Self {
        Self::new(
            params,
            index.num_docs(),
            index.avg_doc_len(),
            index.doc_lens(),
        )
    }

    /// Scorer for one term, given its document frequency
    pub fn term_scorer(&self, doc_freq: u32) -> TermScorer<'a> {
        match self.params.kind {
            ScorerKind::Bm25 => {
                let n = self.num_docs as f32;
                let df = doc_freq as f32;
                let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                TermScorer::Bm25 {
                    idf,
                    k1: self.params.k1,
                    b: self.params.b,
                    avg_doc_len: self.avg_doc_len,
                    doc_lens: self.doc_lens,
                }
            }
            ScorerKind::Quantized => TermScorer::Quantized,
        }
    }

}

/// The `(docid, freq) -> f32` contract consumed by scored cursors
pub enum TermScorer<'a> {
    Bm25 {
        idf: f32,
        k1: f32,
        b: f32,
        avg_doc_len: f32,
        doc_lens: &'a [u32],
    },
    Quantized,
}

impl TermScorer<'_> {
    #[inline]
    pub fn score(&self, docid: DocId, freq: u32) -> f32 {
        match self {
            TermScorer::Bm25 {
                idf,
                k1,
                b,
                avg_doc_len,
                doc_lens,
            } => {
                let tf = freq as f32;
                let norm = if *avg_doc_len > 0.0 {
                    doc_lens[docid as usize] as f32 / avg_doc_len
                } else {
                    0.0
                };
                idf * tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * norm))
            }
            TermScorer::Quantized => freq as f32,
        }
    }
}
