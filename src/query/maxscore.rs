//! MaxScore: document-at-a-time traversal that splits the cursors into
//! essential lists (which drive candidates) and lookup lists (probed only
//! when a candidate might still enter), plus the anytime variants and the
//! block-max refinement.

use crate::index::clusters::ClusterMap;
use crate::index::types::{ClusterId, DocId};
use crate::query::anytime::{boundsum_order, cluster_budget, TimeoutClock};
use crate::query::cursor::{BlockMaxScored, MaxScored};
use crate::query::topk::TopKQueue;
use std::cmp::Ordering;

pub struct MaxScoreQuery<'a> {
    topk: &'a mut TopKQueue,
    clusters: &'a ClusterMap,
}

impl<'a> MaxScoreQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue, clusters: &'a ClusterMap) -> Self {
        Self { topk, clusters }
    }

    /// Exhaustive MaxScore over `[0, max_docid)`
    pub fn run<C: MaxScored>(&mut self, cursors: &mut [C], max_docid: DocId) {
        if cursors.is_empty() {
            return;
        }
        sort_by_max_score(cursors);
        let upper_bounds = calc_upper_bounds(cursors);
        run_range(self.topk, cursors, max_docid, &upper_bounds);
    }

    /// Visit the given clusters in order, stopping after `max_clusters`
    /// (0 = unlimited)
    pub fn ordered_range<C: MaxScored>(
        &mut self,
        cursors: &mut [C],
        selected: &[ClusterId],
        max_clusters: usize,
    ) {
        if cursors.is_empty() {
            return;
        }
        sort_by_max_score(cursors);
        let mut upper_bounds = vec![0.0; cursors.len()];
        let budget = cluster_budget(max_clusters);
        let mut processed = 0;

        for &cluster in selected {
            if processed == budget {
                return;
            }
            processed += 1;

            let (start, end) = self.clusters.get(cluster);
            let range_bound = enter_cluster(cursors, cluster, start, &mut upper_bounds);

            // Skip ranges that are dead
            if !self.topk.would_enter(range_bound) {
                continue;
            }

            run_range(self.topk, cursors, end, &upper_bounds);
        }
    }

    /// Visit clusters in descending boundsum order, stopping when the next
    /// boundsum cannot enter the top k or the budget runs out
    pub fn boundsum<C: MaxScored>(&mut self, cursors: &mut [C], max_clusters: usize) {
        if cursors.is_empty() {
            return;
        }
        sort_by_max_score(cursors);
        let mut upper_bounds = vec![0.0; cursors.len()];
        let budget = cluster_budget(max_clusters);
        let ranked = boundsum_order(cursors, self.clusters);
        let mut processed = 0;

        for &(cluster, bound_sum) in &ranked {
            if processed == budget || !self.topk.would_enter(bound_sum) {
                return;
            }
            processed += 1;

            let (start, end) = self.clusters.get(cluster);
            enter_cluster(cursors, cluster, start, &mut upper_bounds);
            run_range(self.topk, cursors, end, &upper_bounds);
        }
    }

    /// Boundsum order with a latency budget, checked between clusters only
    pub fn boundsum_timeout<C: MaxScored>(
        &mut self,
        cursors: &mut [C],
        timeout_micros: u64,
        risk_factor: f32,
    ) {
        if cursors.is_empty() {
            return;
        }
        sort_by_max_score(cursors);
        let mut upper_bounds = vec![0.0; cursors.len()];
        let mut clock = TimeoutClock::start(timeout_micros, risk_factor);
        let ranked = boundsum_order(cursors, self.clusters);

        for &(cluster, bound_sum) in &ranked {
            if clock.expired() || !self.topk.would_enter(bound_sum) {
                return;
            }

            let (start, end) = self.clusters.get(cluster);
            enter_cluster(cursors, cluster, start, &mut upper_bounds);
            run_range(self.topk, cursors, end, &upper_bounds);
            clock.cluster_done();
        }
    }
}

/// Order cursors by descending max score; the split point scans from the
/// tail, so the cheapest lists become lookups first
fn sort_by_max_score<C: MaxScored>(cursors: &mut [C]) {
    cursors.sort_by(|l, r| {
        r.max_score()
            .partial_cmp(&l.max_score())
            .unwrap_or(Ordering::Equal)
    });
}

/// Suffix sums of max scores: `upper_bounds[i]` bounds everything a
/// candidate can still gain from cursors `i..`
fn calc_upper_bounds<C: MaxScored>(cursors: &[C]) -> Vec<f32> {
    let mut upper_bounds = vec![0.0; cursors.len()];
    let mut bound = 0.0;
    for pos in (0..cursors.len()).rev() {
        bound += cursors[pos].max_score();
        upper_bounds[pos] = bound;
    }
    upper_bounds
}

/// Reposition every cursor at a cluster, tighten its bound to the cluster,
/// and rebuild the suffix sums from the tightened bounds. Returns the total
/// range bound. Bounds are recomputed from scratch each cluster — carrying
/// them over would leave stale values.
fn enter_cluster<C: MaxScored>(
    cursors: &mut [C],
    cluster: ClusterId,
    start: DocId,
    upper_bounds: &mut [f32],
) -> f32 {
    let mut bound = 0.0;
    for pos in (0..cursors.len()).rev() {
        let cursor = &mut cursors[pos];
        cursor.global_geq(start);
        cursor.update_range_max_score(cluster);
        bound += cursor.max_score();
        upper_bounds[pos] = bound;
    }
    bound
}

fn min_docid<C: MaxScored>(cursors: &[C]) -> DocId {
    cursors.iter().map(|c| c.docid()).min().unwrap()
}

/// Pull lists out of the essential set while the remaining suffix bound
/// cannot enter. Returns true when no essential list remains.
fn shrink_essential_set(
    topk: &TopKQueue,
    upper_bounds: &[f32],
    first_lookup: &mut usize,
) -> bool {
    while *first_lookup > 0 && !topk.would_enter(upper_bounds[*first_lookup - 1]) {
        *first_lookup -= 1;
        if *first_lookup == 0 {
            return true;
        }
    }
    false
}

/// The MaxScore candidate loop over `[current positions, end)`
fn run_range<C: MaxScored>(
    topk: &mut TopKQueue,
    cursors: &mut [C],
    end: DocId,
    upper_bounds: &[f32],
) {
    let mut first_lookup = cursors.len();
    if shrink_essential_set(topk, upper_bounds, &mut first_lookup) {
        return;
    }

    let mut next_docid = min_docid(cursors);

    loop {
        // Find the next candidate that survives the lookup bounds
        let mut current_score;
        let mut current_docid;
        loop {
            if next_docid >= end {
                return;
            }
            current_score = 0.0;
            current_docid = next_docid;
            next_docid = end;

            // Essential lists drive the candidate and the follow-up docid
            for pos in 0..first_lookup {
                let cursor = &mut cursors[pos];
                if cursor.docid() == current_docid {
                    current_score += cursor.score();
                    cursor.next();
                }
                let docid = cursor.docid();
                if docid < next_docid {
                    next_docid = docid;
                }
            }

            // Lookup lists are probed while the candidate can still enter
            let mut skip = false;
            for pos in first_lookup..cursors.len() {
                if !topk.would_enter(current_score + upper_bounds[pos]) {
                    skip = true;
                    break;
                }
                let cursor = &mut cursors[pos];
                cursor.next_geq(current_docid);
                if cursor.docid() == current_docid {
                    current_score += cursor.score();
                }
            }
            if !skip {
                break;
            }
        }

        if topk.insert(current_score, current_docid)
            && shrink_essential_set(topk, upper_bounds, &mut first_lookup)
        {
            return;
        }
    }
}

/// MaxScore with the lookup probes refined by per-block maxima: before a
/// lookup list is decoded at a candidate, its list-level bound is replaced
/// with the bound of the block covering the candidate.
pub struct BlockMaxMaxScoreQuery<'a> {
    topk: &'a mut TopKQueue,
}

impl<'a> BlockMaxMaxScoreQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue) -> Self {
        Self { topk }
    }

    pub fn run<C: BlockMaxScored>(&mut self, cursors: &mut [C], max_docid: DocId) {
        if cursors.is_empty() {
            return;
        }
        sort_by_max_score(cursors);
        let upper_bounds = calc_upper_bounds(cursors);

        let mut first_lookup = cursors.len();
        if shrink_essential_set(self.topk, &upper_bounds, &mut first_lookup) {
            return;
        }

        let mut next_docid = min_docid(cursors);

        loop {
            let mut current_score;
            let mut current_docid;
            loop {
                if next_docid >= max_docid {
                    return;
                }
                current_score = 0.0;
                current_docid = next_docid;
                next_docid = max_docid;

                for pos in 0..first_lookup {
                    let cursor = &mut cursors[pos];
                    if cursor.docid() == current_docid {
                        current_score += cursor.score();
                        cursor.next();
                    }
                    let docid = cursor.docid();
                    if docid < next_docid {
                        next_docid = docid;
                    }
                }

                let mut skip = false;
                for pos in first_lookup..cursors.len() {
                    if !self.topk.would_enter(current_score + upper_bounds[pos]) {
                        skip = true;
                        break;
                    }
                    let cursor = &mut cursors[pos];

                    // Swap the list bound for the tighter block bound; if
                    // even that cannot enter, the candidate is dead
                    cursor.block_max_next_geq(current_docid);
                    let refined = current_score + upper_bounds[pos] - cursor.max_score()
                        + cursor.block_max_score() * cursor.query_weight();
                    if !self.topk.would_enter(refined) {
                        skip = true;
                        break;
                    }

                    cursor.next_geq(current_docid);
                    if cursor.docid() == current_docid {
                        current_score += cursor.score();
                    }
                }
                if !skip {
                    break;
                }
            }

            if self.topk.insert(current_score, current_docid)
                && shrink_essential_set(self.topk, &upper_bounds, &mut first_lookup)
            {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::{unit_cursors, TestCursor};

    fn run_maxscore(cursors: &mut [TestCursor], k: usize, max_docid: DocId) -> Vec<(f32, DocId)> {
        let clusters = ClusterMap::from_ranges(max_docid, vec![(0, max_docid)]).unwrap();
        let mut topk = TopKQueue::new(k);
        MaxScoreQuery::new(&mut topk, &clusters).run(cursors, max_docid);
        topk.finalize().iter().map(|e| (e.score, e.docid)).collect()
    }

    #[test]
    fn test_two_term_disjunction() {
        let mut cursors = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        let results = run_maxscore(&mut cursors, 3, 10);

        assert_eq!(results[0], (2.0, 2));
        assert_eq!(results[1], (2.0, 8));
        assert_eq!(results[2].0, 1.0);
    }

    #[test]
    fn test_lookup_list_never_drives_candidates() {
        // With the seeded threshold above its suffix bound, the weak list is
        // a lookup from the start: its own docids never become candidates
        // and it is never scored
        let strong = TestCursor::new(&[(1, 5.0), (4, 5.0), (7, 5.0)], 10);
        let weak = TestCursor::new(&[(2, 0.2), (5, 0.2)], 10);
        let mut cursors = vec![strong, weak];

        let clusters = ClusterMap::from_ranges(10, vec![(0, 10)]).unwrap();
        let mut topk = TopKQueue::new(2);
        topk.set_threshold(1.0);
        MaxScoreQuery::new(&mut topk, &clusters).run(&mut cursors, 10);

        let results = topk.finalize();
        assert_eq!(results.len(), 2);
        assert_eq!((results[0].score, results[0].docid), (5.0, 1));
        assert_eq!((results[1].score, results[1].docid), (5.0, 4));

        // after sorting, cursors[1] is the weak list
        assert_eq!(cursors[1].score_calls(), 0);
    }

    #[test]
    fn test_upper_bounds_are_suffix_sums() {
        let cursors = vec![
            TestCursor::new(&[(0, 3.0)], 10),
            TestCursor::new(&[(1, 2.0)], 10),
            TestCursor::new(&[(2, 1.0)], 10),
        ];
        assert_eq!(calc_upper_bounds(&cursors), vec![6.0, 3.0, 1.0]);
    }

    #[test]
    fn test_block_max_maxscore_agrees() {
        let mut plain = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        let expected = run_maxscore(&mut plain, 3, 10);

        let mut cursors = unit_cursors(&[&[0, 2, 5, 8], &[2, 3, 7, 8]], 10);
        let mut topk = TopKQueue::new(3);
        BlockMaxMaxScoreQuery::new(&mut topk).run(&mut cursors, 10);
        let results: Vec<(f32, DocId)> =
            topk.finalize().iter().map(|e| (e.score, e.docid)).collect();

        assert_eq!(results, expected);
    }
}
