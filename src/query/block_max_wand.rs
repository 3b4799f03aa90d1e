//! Block-Max WAND: the WAND outer loop refined with per-block score upper
//! bounds, so whole blocks can be skipped without touching their postings.

use crate::index::clusters::ClusterMap;
use crate::index::types::{ClusterId, DocId};
use crate::query::anytime::{boundsum_order, cluster_budget, TimeoutClock};
use crate::query::cursor::BlockMaxScored;
use crate::query::topk::TopKQueue;

pub struct BlockMaxWandQuery<'a> {
    topk: &'a mut TopKQueue,
    clusters: &'a ClusterMap,
}

impl<'a> BlockMaxWandQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue, clusters: &'a ClusterMap) -> Self {
        Self { topk, clusters }
    }

    /// Exhaustive Block-Max WAND over `[0, max_docid)`
    pub fn run<C: BlockMaxScored>(&mut self, cursors: &mut [C], max_docid: DocId) {
        if cursors.is_empty() {
            return;
        }
        let mut order: Vec<usize> = (0..cursors.len()).collect();
        traverse(self.topk, cursors, &mut order, max_docid);
    }

    /// Visit the given clusters in order, stopping after `max_clusters`
    /// (0 = unlimited)
    pub fn ordered_range<C: BlockMaxScored>(
        &mut self,
        cursors: &mut [C],
        selected: &[ClusterId],
        max_clusters: usize,
    ) {
        if cursors.is_empty() {
            return;
        }
        let budget = cluster_budget(max_clusters);
        let mut order: Vec<usize> = (0..cursors.len()).collect();
        let mut processed = 0;

        for &cluster in selected {
            if processed == budget {
                return;
            }
            processed += 1;

            let (start, end) = self.clusters.get(cluster);

            // Reposition posting and block pointers, tighten bounds
            let mut range_max_score = 0.0;
            for cursor in cursors.iter_mut() {
                cursor.global_geq(start);
                cursor.block_max_global_geq(start);
                cursor.update_range_max_score(cluster);
                range_max_score += cursor.max_score();
            }

            // Skip ranges that are dead
            if !self.topk.would_enter(range_max_score) {
                continue;
            }

            traverse(self.topk, cursors, &mut order, end);
        }
    }

    /// Visit clusters in descending boundsum order, stopping when the next
    /// boundsum cannot enter the top k or the budget runs out
    pub fn boundsum<C: BlockMaxScored>(&mut self, cursors: &mut [C], max_clusters: usize) {
        if cursors.is_empty() {
            return;
        }
        let budget = cluster_budget(max_clusters);
        let ranked = boundsum_order(cursors, self.clusters);
        let mut order: Vec<usize> = (0..cursors.len()).collect();
        let mut processed = 0;

        for &(cluster, bound_sum) in &ranked {
            if processed == budget || !self.topk.would_enter(bound_sum) {
                return;
            }
            processed += 1;

            let (start, end) = self.clusters.get(cluster);
            for cursor in cursors.iter_mut() {
                cursor.global_geq(start);
                cursor.block_max_global_geq(start);
                cursor.update_range_max_score(cluster);
            }

            traverse(self.topk, cursors, &mut order, end);
        }
    }

    /// Boundsum order with a latency budget, checked between clusters only
    pub fn boundsum_timeout<C: BlockMaxScored>(
        &mut self,
        cursors: &mut [C],
        timeout_micros: u64,
        risk_factor: f32,
    ) {
        if cursors.is_empty() {
            return;
        }
        let mut clock = TimeoutClock::start(timeout_micros, risk_factor);
        let ranked = boundsum_order(cursors, self.clusters);
        let mut order: Vec<usize> = (0..cursors.len()).collect();

        for &(cluster, bound_sum) in &ranked {
            if clock.expired() || !self.topk.would_enter(bound_sum) {
                return;
            }

            let (start, end) = self.clusters.get(cluster);
            for cursor in cursors.iter_mut() {
                cursor.global_geq(start);
                cursor.block_max_global_geq(start);
                cursor.update_range_max_score(cluster);
            }

            traverse(self.topk, cursors, &mut order, end);
            clock.cluster_done();
        }
    }
}

/// The Block-Max WAND inner loop over `[current positions, end)`
fn traverse<C: BlockMaxScored>(
    topk: &mut TopKQueue,
    cursors: &mut [C],
    order: &mut [usize],
    end: DocId,
) {
    order.sort_by_key(|&i| cursors[i].docid());

    loop {
        // Pivot selection, extended across cursors tied on the pivot docid
        let mut upper_bound = 0.0f32;
        let mut found_pivot = None;

        let mut pivot = 0;
        while pivot < order.len() {
            let docid = cursors[order[pivot]].docid();
            if docid >= end {
                break;
            }
            upper_bound += cursors[order[pivot]].max_score();
            if topk.would_enter(upper_bound) {
                while pivot + 1 < order.len() && cursors[order[pivot + 1]].docid() == docid {
                    pivot += 1;
                }
                found_pivot = Some((pivot, docid));
                break;
            }
            pivot += 1;
        }
        let Some((pivot, pivot_id)) = found_pivot else {
            return;
        };

        // Refine the list-level bound with per-block maxima
        let mut block_upper_bound = 0.0f64;
        for pos in 0..=pivot {
            let cursor = &mut cursors[order[pos]];
            if cursor.block_max_docid() < pivot_id {
                cursor.block_max_next_geq(pivot_id);
            }
            block_upper_bound += (cursor.block_max_score() * cursor.query_weight()) as f64;
        }

        if topk.would_enter(block_upper_bound as f32) {
            if pivot_id == cursors[order[0]].docid() {
                // Score the pivot, abandoning early once the shrinking block
                // bound falls under the threshold
                let mut score = 0.0f32;
                for &i in order.iter() {
                    let cursor = &cursors[i];
                    if cursor.docid() != pivot_id {
                        break;
                    }
                    let part_score = cursor.score();
                    score += part_score;
                    block_upper_bound -=
                        (cursor.block_max_score() * cursor.query_weight() - part_score) as f64;
                    if !topk.would_enter(block_upper_bound as f32) {
                        break;
                    }
                }
                for &i in order.iter() {
                    if cursors[i].docid() != pivot_id {
                        break;
                    }
                    cursors[i].next();
                }

                topk.insert(score, pivot_id);
                order.sort_by_key(|&i| cursors[i].docid());
            } else {
                let mut next_list = pivot;
                while cursors[order[next_list]].docid() == pivot_id {
                    next_list -= 1;
                }
                cursors[order[next_list]].next_geq(pivot_id);

                for i in next_list + 1..order.len() {
                    if cursors[order[i]].docid() <= cursors[order[i - 1]].docid() {
                        order.swap(i, i - 1);
                    } else {
                        break;
                    }
                }
            }
        } else {
            // Block bound failed: jump past the shallowest block boundary,
            // advancing the strongest list among the leading ones
            let mut next_list = pivot;
            let mut max_weight = cursors[order[next_list]].max_score();
            for pos in 0..pivot {
                if cursors[order[pos]].max_score() > max_weight {
                    next_list = pos;
                    max_weight = cursors[order[pos]].max_score();
                }
            }

            let mut next = end;
            for pos in 0..=pivot {
                let block_docid = cursors[order[pos]].block_max_docid();
                if block_docid < next {
                    next = block_docid;
                }
            }

            next += 1;
            if pivot + 1 < order.len() && cursors[order[pivot + 1]].docid() < next {
                next = cursors[order[pivot + 1]].docid();
            }
            if next <= pivot_id {
                next = pivot_id + 1;
            }

            cursors[order[next_list]].next_geq(next);

            for i in next_list + 1..order.len() {
                if cursors[order[i]].docid() < cursors[order[i - 1]].docid() {
                    order.swap(i, i - 1);
                } else {
                    break;
                }
            }
        }
    }
}
