//! Query-time cursors and the capability traits traversals are written
//! against.
//!
//! Each traversal only demands the capabilities it uses: conjunctions and
//! unions need a bare [`Cursor`], exhaustive ranked traversal needs
//! [`Scored`], WAND and MaxScore need [`MaxScored`], and Block-Max WAND
//! needs [`BlockMaxScored`]. The anytime variants lean on the range
//! operations of [`MaxScored`] (`global_geq`, `update_range_max_score`,
//! `get_range_max_score`).
//!
//! `max_score()` is always query-weighted; the weight is applied exactly
//! once, on the update path. `block_max_score()` is *not* weighted — the
//! traversals multiply it by `query_weight()` themselves.

use crate::index::postings::PostingCursor;
use crate::index::reader::InvertedIndex;
use crate::index::types::{ClusterId, DocId};
use crate::index::wand_data::{WandData, WandDataEnumerator};
use crate::query::scorer::{Scorer, TermScorer};
use crate::query::Query;

/// Monotone docid iteration over one term's postings
pub trait Cursor {
    fn docid(&self) -> DocId;
    fn freq(&self) -> u32;
    fn next(&mut self);
    fn next_geq(&mut self, docid: DocId);
}

/// A cursor that can score its current posting
pub trait Scored: Cursor {
    fn score(&self) -> f32;
    fn query_weight(&self) -> f32;
}

/// A scored cursor carrying list-level and per-cluster score upper bounds
pub trait MaxScored: Scored {
    /// Currently-active upper bound for this term, query-weighted
    fn max_score(&self) -> f32;
    /// Query-weighted upper bound inside one cluster (0 if the term has no
    /// posting there)
    fn get_range_max_score(&self, range: ClusterId) -> f32;
    /// Replace `max_score()` with the bound for `range`
    fn update_range_max_score(&mut self, range: ClusterId);
    /// Rewind, then advance to the first posting with docid >= `docid`
    fn global_geq(&mut self, docid: DocId);
}

/// A max-scored cursor that additionally exposes per-block bounds
pub trait BlockMaxScored: MaxScored {
    fn block_max_docid(&self) -> DocId;
    fn block_max_score(&self) -> f32;
    fn block_max_next_geq(&mut self, docid: DocId);
    fn block_max_global_geq(&mut self, docid: DocId);
}

impl Cursor for PostingCursor<'_> {
    #[inline]
    fn docid(&self) -> DocId {
        PostingCursor::docid(self)
    }

    #[inline]
    fn freq(&self) -> u32 {
        PostingCursor::freq(self)
    }

    fn next(&mut self) {
        PostingCursor::next(self)
    }

    fn next_geq(&mut self, docid: DocId) {
        PostingCursor::next_geq(self, docid)
    }
}

/// Posting cursor paired with a term scorer and the term's query weight
pub struct ScoredCursor<'a> {
    postings: PostingCursor<'a>,
    scorer: TermScorer<'a>,
    query_weight: f32,
}

impl Cursor for ScoredCursor<'_> {
    #[inline]
    fn docid(&self) -> DocId {
        self.postings.docid()
    }

    #[inline]
    fn freq(&self) -> u32 {
        self.postings.freq()
    }

    fn next(&mut self) {
        self.postings.next()
    }

    fn next_geq(&mut self, docid: DocId) {
        self.postings.next_geq(docid)
    }
}

impl Scored for ScoredCursor<'_> {
    #[inline]
    fn score(&self) -> f32 {
        self.query_weight * self.scorer.score(self.postings.docid(), self.postings.freq())
    }

    #[inline]
    fn query_weight(&self) -> f32 {
        self.query_weight
    }
}

/// Scored cursor extended with the term's wand data
pub struct MaxScoredCursor<'a> {
    scored: ScoredCursor<'a>,
    max_score: f32,
    wdata: WandDataEnumerator<'a>,
}

impl Cursor for MaxScoredCursor<'_> {
    #[inline]
    fn docid(&self) -> DocId {
        self.scored.docid()
    }

    #[inline]
    fn freq(&self) -> u32 {
        self.scored.freq()
    }

    fn next(&mut self) {
        self.scored.next()
    }

    fn next_geq(&mut self, docid: DocId) {
        self.scored.next_geq(docid)
    }
}

impl Scored for MaxScoredCursor<'_> {
    #[inline]
    fn score(&self) -> f32 {
        self.scored.score()
    }

    #[inline]
    fn query_weight(&self) -> f32 {
        self.scored.query_weight()
    }
}

impl MaxScored for MaxScoredCursor<'_> {
    #[inline]
    fn max_score(&self) -> f32 {
        self.max_score
    }

    fn get_range_max_score(&self, range: ClusterId) -> f32 {
        self.query_weight() * self.wdata.range_score(range)
    }

    fn update_range_max_score(&mut self, range: ClusterId) {
        self.max_score = self.get_range_max_score(range);
    }

    fn global_geq(&mut self, docid: DocId) {
        self.scored.postings.global_geq(docid);
    }
}

/// Max-scored cursor whose wand enumerator is also walked block-wise
pub struct BlockMaxScoredCursor<'a> {
    inner: MaxScoredCursor<'a>,
}

impl Cursor for BlockMaxScoredCursor<'_> {
    #[inline]
    fn docid(&self) -> DocId {
        self.inner.docid()
    }

    #[inline]
    fn freq(&self) -> u32 {
        self.inner.freq()
    }

    fn next(&mut self) {
        self.inner.next()
    }

    fn next_geq(&mut self, docid: DocId) {
        self.inner.next_geq(docid)
    }
}

impl Scored for BlockMaxScoredCursor<'_> {
    #[inline]
    fn score(&self) -> f32 {
        self.inner.score()
    }

    #[inline]
    fn query_weight(&self) -> f32 {
        self.inner.query_weight()
    }
}

impl MaxScored for BlockMaxScoredCursor<'_> {
    #[inline]
    fn max_score(&self) -> f32 {
        self.inner.max_score()
    }

    fn get_range_max_score(&self, range: ClusterId) -> f32 {
        self.inner.get_range_max_score(range)
    }

    fn update_range_max_score(&mut self, range: ClusterId) {
        self.inner.update_range_max_score(range)
    }

    fn global_geq(&mut self, docid: DocId) {
        self.inner.global_geq(docid)
    }
}

impl BlockMaxScored for BlockMaxScoredCursor<'_> {
    #[inline]
    fn block_max_docid(&self) -> DocId {
        self.inner.wdata.docid()
    }

    #[inline]
    fn block_max_score(&self) -> f32 {
        self.inner.wdata.score()
    }

    fn block_max_next_geq(&mut self, docid: DocId) {
        self.inner.wdata.next_geq(docid)
    }

    fn block_max_global_geq(&mut self, docid: DocId) {
        self.inner.wdata.global_geq(docid)
    }
}

/// Collapse duplicate query terms into (term, weight) pairs, preserving
/// first-occurrence order
pub fn query_freqs(query: &Query) -> Vec<(u32, f32)> {
    let mut freqs: Vec<(u32, f32)> = Vec::new();
    for &term in &query.terms {
        match freqs.iter_mut().find(|(t, _)| *t == term) {
            Some((_, weight)) => *weight += 1.0,
            None => freqs.push((term, 1.0)),
        }
    }
    freqs
}

/// Plain posting cursors, one per distinct query term
pub fn make_cursors<'a>(index: &'a InvertedIndex, query: &Query) -> Vec<PostingCursor<'a>> {
    query_freqs(query)
        .into_iter()
        .map(|(term, _)| index.postings(term))
        .collect()
}

/// Scored cursors for exhaustive ranked traversal
pub fn make_scored_cursors<'a>(
    index: &'a InvertedIndex,
    scorer: &Scorer<'a>,
    query: &Query,
) -> Vec<ScoredCursor<'a>> {
    query_freqs(query)
        .into_iter()
        .map(|(term, query_weight)| ScoredCursor {
            postings: index.postings(term),
            scorer: scorer.term_scorer(index.doc_freq(term)),
            query_weight,
        })
        .collect()
}

/// Max-scored cursors for WAND and MaxScore
pub fn make_max_scored_cursors<'a>(
    index: &'a InvertedIndex,
    wdata: &'a WandData,
    scorer: &Scorer<'a>,
    query: &Query,
) -> Vec<MaxScoredCursor<'a>> {
    query_freqs(query)
        .into_iter()
        .map(|(term, query_weight)| MaxScoredCursor {
            scored: ScoredCursor {
                postings: index.postings(term),
                scorer: scorer.term_scorer(index.doc_freq(term)),
                query_weight,
            },
            max_score: query_weight * wdata.max_term_score(term),
            wdata: wdata.enumerator(term),
        })
        .collect()
}

/// Block-max-scored cursors for Block-Max WAND
pub fn make_block_max_scored_cursors<'a>(
    index: &'a InvertedIndex,
    wdata: &'a WandData,
    scorer: &Scorer<'a>,
    query: &Query,
) -> Vec<BlockMaxScoredCursor<'a>> {
    query_freqs(query)
        .into_iter()
        .map(|(term, query_weight)| BlockMaxScoredCursor {
            inner: MaxScoredCursor {
                scored: ScoredCursor {
                    postings: index.postings(term),
                    scorer: scorer.term_scorer(index.doc_freq(term)),
                    query_weight,
                },
                max_score: query_weight * wdata.max_term_score(term),
                wdata: wdata.enumerator(term),
            },
        })
        .collect()
}
