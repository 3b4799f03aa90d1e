//! WAND: pivot-based document-at-a-time traversal pruned by list-level
//! score upper bounds, plus its cluster-restricted anytime variants.

use crate::index::clusters::ClusterMap;
use crate::index::types::{ClusterId, DocId};
use crate::query::anytime::{boundsum_order, cluster_budget, TimeoutClock};
use crate::query::cursor::MaxScored;
use crate::query::topk::TopKQueue;

pub struct WandQuery<'a> {
    topk: &'a mut TopKQueue,
    clusters: &'a ClusterMap,
}

impl<'a> WandQuery<'a> {
    pub fn new(topk: &'a mut TopKQueue, clusters: &'a ClusterMap) -> Self {
        Self { topk, clusters }
    }

    /// Exhaustive WAND over `[0, max_docid)`
    pub fn run<C: MaxScored>(&mut self, cursors: &mut [C], max_docid: DocId) {
        if cursors.is_empty() {
            return;
        }
        let mut order: Vec<usize> = (0..cursors.len()).collect();
        traverse(self.topk, cursors, &mut order, max_docid);
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
        let budget = cluster_budget(max_clusters);
        let mut order: Vec<usize> = (0..cursors.len()).collect();
        let mut processed = 0;

        for &cluster in selected {
            if processed == budget {
                return;
            }
            processed += 1;

            let (start, end) = self.clusters.get(cluster);

            // Reposition every cursor at the cluster and tighten its bound
            let mut range_max_score = 0.0;
            for cursor in cursors.iter_mut() {
                cursor.global_geq(start);
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
    pub fn boundsum<C: MaxScored>(&mut self, cursors: &mut [C], max_clusters: usize) {
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
                cursor.update_range_max_score(cluster);
            }

            traverse(self.topk, cursors, &mut order, end);
        }
    }

    /// Boundsum order with a latency budget: before each cluster, stop if the
    /// elapsed time plus a risk-weighted mean per-cluster latency would
    /// exceed the timeout. Clusters are never abandoned mid-scan.
    pub fn boundsum_timeout<C: MaxScored>(
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
                cursor.update_range_max_score(cluster);
            }

            traverse(self.topk, cursors, &mut order, end);
            clock.cluster_done();
        }
    }
}

/// The WAND inner loop over `[current positions, end)`.
///
/// `order` holds cursor indices sorted by current docid; the sort is
/// re-established on entry so the same vector can be reused across clusters.
fn traverse<C: MaxScored>(
    topk: &mut TopKQueue,
    cursors: &mut [C],
    order: &mut [usize],
    end: DocId,
) {
    order.sort_by_key(|&i| cursors[i].docid());

    loop {
        // Pivot selection: accumulate max scores until one could enter
        let mut upper_bound = 0.0;
        let mut found_pivot = None;
        for (pos, &i) in order.iter().enumerate() {
            if cursors[i].docid() >= end {
                break;
            }
            upper_bound += cursors[i].max_score();
            if topk.would_enter(upper_bound) {
                found_pivot = Some(pos);
                break;
            }
        }
        let Some(pivot) = found_pivot else {
            return;
        };

        let pivot_id = cursors[order[pivot]].docid();
        if pivot_id == cursors[order[0]].docid() {
            // Every leading cursor sits on the pivot: score it fully
            let mut score = 0.0;
            for &i in order.iter() {
                if cursors[i].docid() != pivot_id {
                    break;
                }
                score += cursors[i].score();
                cursors[i].next();
            }

            topk.insert(score, pivot_id);
            order.sort_by_key(|&i| cursors[i].docid());
        } else {
            // No match yet: move the last list still behind the pivot up
            let mut next_list = pivot;
            while cursors[order[next_list]].docid() == pivot_id {
                next_list -= 1;
            }
            cursors[order[next_list]].next_geq(pivot_id);

            // Bubble the advanced list back into docid order
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
