//! Term-at-a-time scoring into a dense accumulator, then a sweep into the
//! top-k queue.

use crate::index::types::DocId;
use crate::query::cursor::Scored;
use crate::query::topk::TopKQueue;

/// Accumulator contract for TAAT traversal
pub trait Accumulate {
    /// Prepare for a fresh query
    fn init(&mut self);
    fn accumulate(&mut self, docid: DocId, score: f32);
    /// Sweep non-zero accumulators into the queue
    fn aggregate(&self, topk: &mut TopKQueue);
}

/// One f32 per document, cleared in full before every query
pub struct SimpleAccumulator {
    scores: Vec<f32>,
}

impl SimpleAccumulator {
    pub fn new(num_docs: DocId) -> Self {
        Self {
            scores: vec![0.0; num_docs as usize],
        }
    }
}

impl Accumulate for SimpleAccumulator {
    fn init(&mut self) {
        self.scores.fill(0.0);
    }

    fn accumulate(&mut self, docid: DocId, score: f32) {
        self.scores[docid as usize] += score;
    }

    fn aggregate(&self, topk: &mut TopKQueue) {
        for (docid, &score) in self.scores.iter().enumerate() {
            if score > 0.0 {
                topk.insert(score, docid as DocId);
            }
        }
    }
}

/// Number of accumulators sharing one generation descriptor
const LAZY_BLOCK_LEN: usize = 32;
/// Generations per full reset cycle
const LAZY_CYCLE: u32 = 16;

/// Accumulator that avoids the O(N) clear between queries: each block of
/// accumulators carries the generation that last wrote it, and a block is
/// zeroed lazily the first time a new generation touches it. A full reset
/// still happens once per generation-counter wraparound.
pub struct LazyAccumulator {
    generation: u32,
    descriptors: Vec<u32>,
    scores: Vec<f32>,
}

impl LazyAccumulator {
    pub fn new(num_docs: DocId) -> Self {
        let blocks = (num_docs as usize).div_ceil(LAZY_BLOCK_LEN);
        Self {
            // Starts one below the first generation so init() lands on 1
            // and the zeroed descriptors read as stale
            generation: 0,
            descriptors: vec![0; blocks],
            scores: vec![0.0; num_docs as usize],
        }
    }

    fn block_range(&self, block: usize) -> std::ops::Range<usize> {
        let start = block * LAZY_BLOCK_LEN;
        start..(start + LAZY_BLOCK_LEN).min(self.scores.len())
    }
}

impl Accumulate for LazyAccumulator {
    fn init(&mut self) {
        self.generation += 1;
        if self.generation == LAZY_CYCLE {
            self.generation = 1;
            self.scores.fill(0.0);
            self.descriptors.fill(0);
        }
    }

    fn accumulate(&mut self, docid: DocId, score: f32) {
        let block = docid as usize / LAZY_BLOCK_LEN;
        if self.descriptors[block] != self.generation {
            self.descriptors[block] = self.generation;
            let range = self.block_range(block);
            self.scores[range].fill(0.0);
        }
        self.scores[docid as usize] += score;
    }

    fn aggregate(&self, topk: &mut TopKQueue) {
        for (block, &descriptor) in self.descriptors.iter().enumerate() {
            if descriptor != self.generation {
                continue;
            }
            for docid in self.block_range(block) {
                let score = self.scores[docid];
                if score > 0.0 {
                    topk.insert(score, docid as DocId);
                }
            }
        }
    }
}

/// Ranked disjunction, term at a time
pub struct RankedOrTaatQuery<'a> {
    topk: &'a mut TopKQueue,
}

impl<'a> RankedOrTaatQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue) -> Self {
        Self { topk }
    }

    pub fn run<C: Scored, A: Accumulate>(
        &mut self,
        cursors: &mut [C],
        max_docid: DocId,
        accumulator: &mut A,
    ) {
        accumulator.init();

        for cursor in cursors.iter_mut() {
            while cursor.docid() < max_docid {
                accumulator.accumulate(cursor.docid(), cursor.score());
                cursor.next();
            }
        }

        accumulator.aggregate(self.topk);
    }
}
