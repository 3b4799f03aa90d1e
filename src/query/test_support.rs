//! Hand-built in-memory cursors for traversal unit tests.
//!
//! `TestCursor` implements the full capability stack over explicit
//! (docid, score) postings with configurable block and range bounds, and
//! counts `score()` invocations so tests can assert that pruning really
//! skipped evaluation.

use crate::index::types::{ClusterId, DocId};
use crate::query::cursor::{BlockMaxScored, Cursor, MaxScored, Scored};
use std::cell::Cell;

pub struct TestCursor {
    postings: Vec<(DocId, f32)>,
    pos: usize,
    sentinel: DocId,
    query_weight: f32,
    list_max: f32,
    max_score: f32,
    blocks: Vec<(DocId, f32)>,
    block_pos: usize,
    ranges: Vec<(ClusterId, f32)>,
    score_calls: Cell<usize>,
}

impl TestCursor {
    /// Cursor over explicit (docid, unweighted score) postings, with a
    /// single block spanning the whole list
    pub fn new(postings: &[(DocId, f32)], sentinel: DocId) -> Self {
        let list_max = postings.iter().map(|p| p.1).fold(0.0, f32::max);
        let blocks = match postings.last() {
            Some(&(last, _)) => vec![(last, list_max)],
            None => Vec::new(),
        };
        Self {
            postings: postings.to_vec(),
            pos: 0,
            sentinel,
            query_weight: 1.0,
            list_max,
            max_score: list_max,
            blocks,
            block_pos: 0,
            ranges: Vec::new(),
            score_calls: Cell::new(0),
        }
    }

    /// Override the per-cluster (range id, unweighted max) table
    pub fn with_ranges(mut self, ranges: &[(ClusterId, f32)]) -> Self {
        self.ranges = ranges.to_vec();
        self
    }

    /// Override the per-block (last docid, unweighted max) table
    pub fn with_blocks(mut self, blocks: &[(DocId, f32)]) -> Self {
        self.blocks = blocks.to_vec();
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.query_weight = weight;
        self.max_score = weight * self.list_max;
        self
    }

    /// How many times `score()` has been invoked
    pub fn score_calls(&self) -> usize {
        self.score_calls.get()
    }
}

/// One cursor per list, every posting scoring 1.0
pub fn unit_cursors(lists: &[&[DocId]], sentinel: DocId) -> Vec<TestCursor> {
    lists
        .iter()
        .map(|docs| {
            let postings: Vec<(DocId, f32)> = docs.iter().map(|&d| (d, 1.0)).collect();
            TestCursor::new(&postings, sentinel)
        })
        .collect()
}

impl Cursor for TestCursor {
    fn docid(&self) -> DocId {
        if self.pos < self.postings.len() {
            self.postings[self.pos].0
        } else {
            self.sentinel
        }
    }

    fn freq(&self) -> u32 {
        1
    }

    fn next(&mut self) {
        if self.pos < self.postings.len() {
            self.pos += 1;
        }
    }

    fn next_geq(&mut self, docid: DocId) {
        while self.pos < self.postings.len() && self.postings[self.pos].0 < docid {
            self.pos += 1;
        }
    }
}

impl Scored for TestCursor {
    fn score(&self) -> f32 {
        self.score_calls.set(self.score_calls.get() + 1);
        self.query_weight * self.postings[self.pos].1
    }

    fn query_weight(&self) -> f32 {
        self.query_weight
    }
}

impl MaxScored for TestCursor {
    fn max_score(&self) -> f32 {
        self.max_score
    }

    fn get_range_max_score(&self, range: ClusterId) -> f32 {
        let unweighted = self
            .ranges
            .iter()
            .find(|&&(id, _)| id == range)
            .map(|&(_, score)| score)
            .unwrap_or(0.0);
        self.query_weight * unweighted
    }

    fn update_range_max_score(&mut self, range: ClusterId) {
        self.max_score = self.get_range_max_score(range);
    }

    fn global_geq(&mut self, docid: DocId) {
        self.pos = 0;
        self.next_geq(docid);
    }
}

impl BlockMaxScored for TestCursor {
    fn block_max_docid(&self) -> DocId {
        if self.blocks.is_empty() {
            return DocId::MAX;
        }
        self.blocks[self.block_pos].0
    }

    fn block_max_score(&self) -> f32 {
        if self.blocks.is_empty() {
            return 0.0;
        }
        self.blocks[self.block_pos].1
    }

    fn block_max_next_geq(&mut self, docid: DocId) {
        while self.block_pos + 1 < self.blocks.len() && self.blocks[self.block_pos].0 < docid {
            self.block_pos += 1;
        }
    }

    fn block_max_global_geq(&mut self, docid: DocId) {
        self.block_pos = 0;
        self.block_max_next_geq(docid);
    }
}
