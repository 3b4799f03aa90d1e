//! Conjunctive and exhaustive disjunctive strategies: the unranked
//! intersection/union baselines plus their ranked counterparts.

use crate::index::types::DocId;
use crate::query::cursor::{BlockMaxScored, Cursor, Scored};
use crate::query::topk::TopKQueue;

/// Conjunctive docid intersection by leapfrogging.
/// Callers get the best skip behavior by ordering cursors rarest-first.
pub fn and_query<C: Cursor>(cursors: &mut [C], max_docid: DocId) -> Vec<DocId> {
    let mut results = Vec::new();
    if cursors.is_empty() {
        return results;
    }

    let mut candidate = cursors[0].docid();
    let mut i = 1;
    while candidate < max_docid {
        while i < cursors.len() {
            cursors[i].next_geq(candidate);
            if cursors[i].docid() != candidate {
                candidate = cursors[i].docid();
                i = 0;
                break;
            }
            i += 1;
        }
        if i == cursors.len() {
            results.push(candidate);
            cursors[0].next();
            candidate = cursors[0].docid();
            i = 1;
        }
    }
    results
}

/// Disjunctive union size. With `with_freqs` every posting's frequency is
/// also read, matching the cost of a scoring pass without the scorer.
pub fn or_query<C: Cursor>(cursors: &mut [C], max_docid: DocId, with_freqs: bool) -> u64 {
    if cursors.is_empty() {
        return 0;
    }

    let mut count: u64 = 0;
    let mut cur_doc = cursors.iter().map(|c| c.docid()).min().unwrap();

    while cur_doc < max_docid {
        count += 1;
        let mut next_doc = max_docid;
        for cursor in cursors.iter_mut() {
            if cursor.docid() == cur_doc {
                if with_freqs {
                    std::hint::black_box(cursor.freq());
                }
                cursor.next();
            }
            if cursor.docid() < next_doc {
                next_doc = cursor.docid();
            }
        }
        cur_doc = next_doc;
    }
    count
}

/// Exhaustive ranked disjunction: score every matching document
pub struct RankedOrQuery<'a> {
    topk: &'a mut TopKQueue,
}

impl<'a> RankedOrQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue) -> Self {
        Self { topk }
    }

    pub fn run<C: Scored>(&mut self, cursors: &mut [C], max_docid: DocId) {
        if cursors.is_empty() {
            return;
        }

        let mut cur_doc = cursors.iter().map(|c| c.docid()).min().unwrap();
        while cur_doc < max_docid {
            let mut score = 0.0;
            let mut next_doc = max_docid;
            for cursor in cursors.iter_mut() {
                if cursor.docid() == cur_doc {
                    score += cursor.score();
                    cursor.next();
                }
                if cursor.docid() < next_doc {
                    next_doc = cursor.docid();
                }
            }
            self.topk.insert(score, cur_doc);
            cur_doc = next_doc;
        }
    }
}

/// Ranked conjunction: score only documents matching every term
pub struct RankedAndQuery<'a> {
    topk: &'a mut TopKQueue,
}

impl<'a> RankedAndQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue) -> Self {
        Self { topk }
    }

    pub fn run<C: Scored>(&mut self, cursors: &mut [C], max_docid: DocId) {
        if cursors.is_empty() {
            return;
        }

        let mut candidate = cursors[0].docid();
        let mut i = 1;
        while candidate < max_docid {
            while i < cursors.len() {
                cursors[i].next_geq(candidate);
                if cursors[i].docid() != candidate {
                    candidate = cursors[i].docid();
                    i = 0;
                    break;
                }
                i += 1;
            }
            if i == cursors.len() {
                let score = cursors.iter().map(|c| c.score()).sum();
                self.topk.insert(score, candidate);
                cursors[0].next();
                candidate = cursors[0].docid();
                i = 1;
            }
        }
    }
}

/// Ranked conjunction with a per-document block-max check before scoring
pub struct BlockMaxRankedAndQuery<'a> {
    topk: &'a mut TopKQueue,
}

impl<'a> BlockMaxRankedAndQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue) -> Self {
        Self { topk }
    }

    pub fn run<C: BlockMaxScored>(&mut self, cursors: &mut [C], max_docid: DocId) {
        if cursors.is_empty() {
            return;
        }

        let mut candidate = cursors[0].docid();
        let mut i = 1;
        while candidate < max_docid {
            while i < cursors.len() {
                cursors[i].next_geq(candidate);
                if cursors[i].docid() != candidate {
                    candidate = cursors[i].docid();
                    i = 0;
                    break;
                }
                i += 1;
            }
            if i == cursors.len() {
                let mut block_upper_bound = 0.0;
                for cursor in cursors.iter_mut() {
                    cursor.block_max_next_geq(candidate);
                    block_upper_bound += cursor.block_max_score() * cursor.query_weight();
                }
                if self.topk.would_enter(block_upper_bound) {
                    let score = cursors.iter().map(|c| c.score()).sum();
                    self.topk.insert(score, candidate);
                }
                cursors[0].next();
                candidate = cursors[0].docid();
                i = 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{unit_cursors, TestCursor};

    #[test]
    fn test_and_query_intersection() {
        let mut cursors = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        assert_eq!(and_query(&mut cursors, 10), vec![2, 8]);
    }

    #[test]
    fn test_and_query_disjoint() {
        let mut cursors = unit_cursors(&[&[0, 2], &[3, 7]], 10);
        assert!(and_query(&mut cursors, 10).is_empty());
    }

    #[test]
    fn test_and_query_three_lists() {
        let mut cursors = unit_cursors(&[&[1, 4, 6, 9], &[0, 4, 9], &[4, 5, 9]], 12);
        assert_eq!(and_query(&mut cursors, 12), vec![4, 9]);
    }

    #[test]
    fn test_or_query_union_count() {
        let mut cursors = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        assert_eq!(or_query(&mut cursors, 10, false), 6);

        let mut cursors = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        assert_eq!(or_query(&mut cursors, 10, true), 6);
    }

    #[test]
    fn test_ranked_or_scores_union() {
        let mut cursors = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        let mut topk = TopKQueue::new(3);
        RankedOrQuery::new(&mut topk).run(&mut cursors, 10);

        let results = topk.finalize();
        assert_eq!((results[0].score, results[0].docid), (2.0, 2));
        assert_eq!((results[1].score, results[1].docid), (2.0, 8));
        assert_eq!(results[2].score, 1.0);
    }

    #[test]
    fn test_ranked_and_scores_intersection() {
        let mut cursors = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        let mut topk = TopKQueue::new(10);
        RankedAndQuery::new(&mut topk).run(&mut cursors, 10);

        let results = topk.finalize();
        let docids: Vec<DocId> = results.iter().map(|e| e.docid).collect();
        assert_eq!(docids, vec![2, 8]);
        assert!(results.iter().all(|e| e.score == 2.0));
    }

    #[test]
    fn test_block_max_ranked_and_skips_scoring() {
        // Threshold above the block bound: the match at 4 is never scored
        let c1 = TestCursor::new(&[(4, 1.0)], 10);
        let c2 = TestCursor::new(&[(4, 1.0)], 10);
        let mut cursors = vec![c1, c2];

        let mut topk = TopKQueue::new(1);
        topk.set_threshold(3.0);
        BlockMaxRankedAndQuery::new(&mut topk).run(&mut cursors, 10);

        assert!(topk.is_empty());
        assert_eq!(cursors[0].score_calls(), 0);
        assert_eq!(cursors[1].score_calls(), 0);
    }
}
