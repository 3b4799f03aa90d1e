//! Shared scaffolding for the anytime (cluster-at-a-time) traversal
//! variants.

use crate::index::clusters::ClusterMap;
use crate::index::types::ClusterId;
use crate::query::cursor::MaxScored;
use std::cmp::Ordering;
use std::time::Instant;

/// A `max_clusters` of 0 means unlimited
pub fn cluster_budget(max_clusters: usize) -> usize {
    if max_clusters == 0 {
        usize::MAX
    } else {
        max_clusters
    }
}

/// Rank every cluster by the sum of per-term range upper bounds, highest
/// first. The sort is stable, so equal boundsums keep cluster-id order.
pub fn boundsum_order<C: MaxScored>(
    cursors: &[C],
    clusters: &ClusterMap,
) -> Vec<(ClusterId, f32)> {
    let mut ranked: Vec<(ClusterId, f32)> = (0..clusters.len() as ClusterId)
        .map(|cluster| {
            let bound_sum = cursors
                .iter()
                .map(|cursor| cursor.get_range_max_score(cluster))
                .sum();
            (cluster, bound_sum)
        })
        .collect();

    ranked.sort_by(|l, r| r.1.partial_cmp(&l.1).unwrap_or(Ordering::Equal));
    ranked
}

/// Latency budget for timeout queries.
///
/// The prediction is `elapsed + risk_factor * mean_per_cluster_latency`;
/// it is evaluated only between clusters, so a started cluster always
/// finishes.
pub struct TimeoutClock {
    started: Instant,
    timeout_micros: u64,
    risk_factor: f32,
    processed: usize,
    elapsed_micros: u64,
    mean_micros: f32,
}

impl TimeoutClock {
    pub fn start(timeout_micros: u64, risk_factor: f32) -> Self {
        Self {
            started: Instant::now(),
            timeout_micros,
            risk_factor,
            processed: 0,
            elapsed_micros: 0,
            mean_micros: 0.0,
        }
    }

    /// Would starting another cluster be predicted to blow the budget?
    pub fn expired(&self) -> bool {
        self.elapsed_micros as f32 + self.risk_factor * self.mean_micros
            > self.timeout_micros as f32
    }

    /// Record a finished cluster and refresh the latency estimate
    pub fn cluster_done(&mut self) {
        self.processed += 1;
        self.elapsed_micros = self.started.elapsed().as_micros() as u64;
        self.mean_micros = self.elapsed_micros as f32 / self.processed as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::TestCursor;

    #[test]
    fn test_cluster_budget() {
        assert_eq!(cluster_budget(0), usize::MAX);
        assert_eq!(cluster_budget(3), 3);
    }

    #[test]
    fn test_boundsum_order_sorts_high_to_low() {
        let clusters = ClusterMap::from_ranges(12, vec![(0, 4), (4, 8), (8, 12)]).unwrap();
        let cursors = vec![
            TestCursor::new(&[(0, 1.0)], 12).with_ranges(&[(0, 1.0), (1, 3.0), (2, 2.0)]),
            TestCursor::new(&[(4, 1.0)], 12).with_ranges(&[(1, 0.5)]),
        ];

        let ranked = boundsum_order(&cursors, &clusters);
        assert_eq!(ranked, vec![(1, 3.5), (2, 2.0), (0, 1.0)]);
    }

    #[test]
    fn test_boundsum_order_stable_on_ties() {
        let clusters = ClusterMap::from_ranges(10, vec![(0, 5), (5, 10)]).unwrap();
        let cursors = vec![
            TestCursor::new(&[(0, 1.0)], 10).with_ranges(&[(0, 1.0), (1, 1.0)]),
            TestCursor::new(&[(5, 1.0)], 10).with_ranges(&[(0, 1.0), (1, 1.0)]),
        ];

        let ranked = boundsum_order(&cursors, &clusters);
        assert_eq!(ranked, vec![(0, 2.0), (1, 2.0)]);
    }

    #[test]
    fn test_timeout_clock_fresh_budget() {
        let clock = TimeoutClock::start(1_000_000, 1.0);
        assert!(!clock.expired());

        let exhausted = TimeoutClock::start(0, 1.0);
        // zero elapsed, zero mean: 0 > 0 is false, first cluster always runs
        assert!(!exhausted.expired());
    }

    #[test]
    fn test_timeout_clock_predicts_overrun() {
        let mut clock = TimeoutClock::start(0, 1.0);
        std::thread::sleep(std::time::Duration::from_millis(2));
        clock.cluster_done();
        assert!(clock.expired());
    }
}
