//! Strategy selection and per-query execution.
//!
//! The executor owns everything that outlives a single query (index, wand
//! data, scorer, tunables, TAAT accumulators) and builds the per-query
//! state — cursors and the top-k queue — fresh for every call.

use crate::index::clusters::ClusterMap;
use crate::index::reader::InvertedIndex;
use crate::index::types::ClusterId;
use crate::index::wand_data::WandData;
use crate::query::block_max_wand::BlockMaxWandQuery;
use crate::query::boolean::{
    and_query, or_query, BlockMaxRankedAndQuery, RankedAndQuery, RankedOrQuery,
};
use crate::query::cursor::{
    make_block_max_scored_cursors, make_cursors, make_max_scored_cursors, make_scored_cursors,
};
use crate::query::maxscore::{BlockMaxMaxScoreQuery, MaxScoreQuery};
use crate::query::scorer::Scorer;
use crate::query::taat::{LazyAccumulator, RankedOrTaatQuery, SimpleAccumulator};
use crate::query::topk::{TopKEntry, TopKQueue};
use crate::query::wand::WandQuery;
use crate::query::Query;
use anyhow::Result;

/// Every supported retrieval strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    And,
    Or,
    OrFreq,
    Wand,
    WandOrderedRange,
    WandBoundsum,
    WandBoundsumTimeout,
    BlockMaxWand,
    BlockMaxWandOrderedRange,
    BlockMaxWandBoundsum,
    BlockMaxWandBoundsumTimeout,
    BlockMaxMaxscore,
    Maxscore,
    MaxscoreOrderedRange,
    MaxscoreBoundsum,
    MaxscoreBoundsumTimeout,
    RankedAnd,
    BlockMaxRankedAnd,
    RankedOr,
    RankedOrTaat,
    RankedOrTaatLazy,
}

impl Strategy {
    pub const ALL: &'static [(&'static str, Strategy)] = &[
        ("and", Strategy::And),
        ("or", Strategy::Or),
        ("or_freq", Strategy::OrFreq),
        ("wand", Strategy::Wand),
        ("wand_ordered_range", Strategy::WandOrderedRange),
        ("wand_boundsum", Strategy::WandBoundsum),
        ("wand_boundsum_timeout", Strategy::WandBoundsumTimeout),
        ("block_max_wand", Strategy::BlockMaxWand),
        ("block_max_wand_ordered_range", Strategy::BlockMaxWandOrderedRange),
        ("block_max_wand_boundsum", Strategy::BlockMaxWandBoundsum),
        ("block_max_wand_boundsum_timeout", Strategy::BlockMaxWandBoundsumTimeout),
        ("block_max_maxscore", Strategy::BlockMaxMaxscore),
        ("maxscore", Strategy::Maxscore),
        ("maxscore_ordered_range", Strategy::MaxscoreOrderedRange),
        ("maxscore_boundsum", Strategy::MaxscoreBoundsum),
        ("maxscore_boundsum_timeout", Strategy::MaxscoreBoundsumTimeout),
        ("ranked_and", Strategy::RankedAnd),
        ("block_max_ranked_and", Strategy::BlockMaxRankedAnd),
        ("ranked_or", Strategy::RankedOr),
        ("ranked_or_taat", Strategy::RankedOrTaat),
        ("ranked_or_taat_lazy", Strategy::RankedOrTaatLazy),
    ];

    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, s)| s)
            .ok_or_else(|| anyhow::anyhow!("unsupported query strategy: {}", name))
    }

    pub fn name(self) -> &'static str {
        Self::ALL.iter().find(|&&(_, s)| s == self).unwrap().0
    }

    /// Strategies that consume precomputed score bounds
    pub fn needs_wand_data(self) -> bool {
        !matches!(
            self,
            Strategy::And
                | Strategy::Or
                | Strategy::OrFreq
                | Strategy::RankedAnd
                | Strategy::RankedOr
                | Strategy::RankedOrTaat
                | Strategy::RankedOrTaatLazy
        )
    }

    /// Strategies driven by an externally supplied cluster sequence
    pub fn takes_cluster_selection(self) -> bool {
        matches!(
            self,
            Strategy::WandOrderedRange
                | Strategy::BlockMaxWandOrderedRange
                | Strategy::MaxscoreOrderedRange
        )
    }

    /// Unranked strategies report a match count instead of a top-k
    pub fn is_ranked(self) -> bool {
        !matches!(self, Strategy::And | Strategy::Or | Strategy::OrFreq)
    }
}

/// What a query run produced
#[derive(Debug)]
pub enum QueryOutput {
    /// Match count from an unranked strategy
    Count(u64),
    /// Top-k results, sorted by descending score
    Ranked(Vec<TopKEntry>),
}

/// Per-invocation tunables shared by every query
#[derive(Debug, Clone, Copy)]
pub struct Tunables {
    pub k: usize,
    pub max_clusters: usize,
    pub timeout_micros: u64,
    pub risk_factor: f32,
    /// Rerun with threshold 0 when pruning left fewer than k results
    pub safe: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            k: 10,
            max_clusters: 0,
            timeout_micros: 0,
            risk_factor: 1.0,
            safe: false,
        }
    }
}

pub struct QueryExecutor<'a> {
    index: &'a InvertedIndex,
    wand: Option<&'a WandData>,
    scorer: Scorer<'a>,
    strategy: Strategy,
    tunables: Tunables,
    simple_acc: Option<SimpleAccumulator>,
    lazy_acc: Option<LazyAccumulator>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(
        index: &'a InvertedIndex,
        wand: Option<&'a WandData>,
        scorer: Scorer<'a>,
        strategy: Strategy,
        tunables: Tunables,
    ) -> Result<Self> {
        if strategy.needs_wand_data() && wand.is_none() {
            anyhow::bail!("strategy {} requires wand data", strategy.name());
        }
        if let Some(wand) = wand {
            if wand.num_docs() != index.num_docs() {
                anyhow::bail!(
                    "wand data covers {} documents but the index has {}",
                    wand.num_docs(),
                    index.num_docs()
                );
            }
        }
        Ok(Self {
            index,
            wand,
            scorer,
            strategy,
            tunables,
            simple_acc: None,
            lazy_acc: None,
        })
    }

    /// Run one query. `threshold` seeds the top-k queue; `selected` is the
    /// cluster sequence for ordered-range strategies (ignored by others).
    pub fn execute(
        &mut self,
        query: &Query,
        threshold: f32,
        selected: &[ClusterId],
    ) -> Result<QueryOutput> {
        for &term in &query.terms {
            if !self.index.has_term(term) {
                anyhow::bail!("query {} references unknown term {}", query.id, term);
            }
        }

        match self.strategy {
            Strategy::And => {
                let mut cursors = make_cursors(self.index, query);
                cursors.sort_by_key(|c| c.len());
                let matches = and_query(&mut cursors, self.index.num_docs());
                Ok(QueryOutput::Count(matches.len() as u64))
            }
            Strategy::Or => {
                let mut cursors = make_cursors(self.index, query);
                Ok(QueryOutput::Count(or_query(
                    &mut cursors,
                    self.index.num_docs(),
                    false,
                )))
            }
            Strategy::OrFreq => {
                let mut cursors = make_cursors(self.index, query);
                Ok(QueryOutput::Count(or_query(
                    &mut cursors,
                    self.index.num_docs(),
                    true,
                )))
            }
            _ => {
                let mut results = self.run_ranked(query, threshold, selected);
                if self.tunables.safe && threshold > 0.0 && results.len() < self.tunables.k {
                    results = self.run_ranked(query, 0.0, selected);
                }
                Ok(QueryOutput::Ranked(results))
            }
        }
    }

    /// Conjunctive strategies leapfrog fastest when driven rarest-first
    fn rarest_first(&self, query: &Query) -> Query {
        let mut terms = query.terms.clone();
        terms.sort_by_key(|&term| self.index.doc_freq(term));
        Query {
            id: query.id.clone(),
            terms,
        }
    }

    fn run_ranked(&mut self, query: &Query, threshold: f32, selected: &[ClusterId]) -> Vec<TopKEntry> {
        let mut topk = TopKQueue::new(self.tunables.k);
        topk.set_threshold(threshold);

        let index = self.index;
        let num_docs = index.num_docs();
        let t = self.tunables;

        match self.strategy {
            Strategy::Wand => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                WandQuery::new(&mut topk, clusters).run(&mut cursors, num_docs);
            }
            Strategy::WandOrderedRange => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                WandQuery::new(&mut topk, clusters).ordered_range(
                    &mut cursors,
                    selected,
                    t.max_clusters,
                );
            }
            Strategy::WandBoundsum => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                WandQuery::new(&mut topk, clusters).boundsum(&mut cursors, t.max_clusters);
            }
            Strategy::WandBoundsumTimeout => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                WandQuery::new(&mut topk, clusters).boundsum_timeout(
                    &mut cursors,
                    t.timeout_micros,
                    t.risk_factor,
                );
            }
            Strategy::BlockMaxWand => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_block_max_scored_cursors(index, wand, &self.scorer, query);
                BlockMaxWandQuery::new(&mut topk, clusters).run(&mut cursors, num_docs);
            }
            Strategy::BlockMaxWandOrderedRange => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_block_max_scored_cursors(index, wand, &self.scorer, query);
                BlockMaxWandQuery::new(&mut topk, clusters).ordered_range(
                    &mut cursors,
                    selected,
                    t.max_clusters,
                );
            }
            Strategy::BlockMaxWandBoundsum => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_block_max_scored_cursors(index, wand, &self.scorer, query);
                BlockMaxWandQuery::new(&mut topk, clusters).boundsum(&mut cursors, t.max_clusters);
            }
            Strategy::BlockMaxWandBoundsumTimeout => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_block_max_scored_cursors(index, wand, &self.scorer, query);
                BlockMaxWandQuery::new(&mut topk, clusters).boundsum_timeout(
                    &mut cursors,
                    t.timeout_micros,
                    t.risk_factor,
                );
            }
            Strategy::BlockMaxMaxscore => {
                let (wand, _) = self.wand_and_clusters();
                let mut cursors = make_block_max_scored_cursors(index, wand, &self.scorer, query);
                BlockMaxMaxScoreQuery::new(&mut topk).run(&mut cursors, num_docs);
            }
            Strategy::Maxscore => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                MaxScoreQuery::new(&mut topk, clusters).run(&mut cursors, num_docs);
            }
            Strategy::MaxscoreOrderedRange => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                MaxScoreQuery::new(&mut topk, clusters).ordered_range(
                    &mut cursors,
                    selected,
                    t.max_clusters,
                );
            }
            Strategy::MaxscoreBoundsum => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                MaxScoreQuery::new(&mut topk, clusters).boundsum(&mut cursors, t.max_clusters);
            }
            Strategy::MaxscoreBoundsumTimeout => {
                let (wand, clusters) = self.wand_and_clusters();
                let mut cursors = make_max_scored_cursors(index, wand, &self.scorer, query);
                MaxScoreQuery::new(&mut topk, clusters).boundsum_timeout(
                    &mut cursors,
                    t.timeout_micros,
                    t.risk_factor,
                );
            }
            Strategy::RankedAnd => {
                let mut cursors =
                    make_scored_cursors(index, &self.scorer, &self.rarest_first(query));
                RankedAndQuery::new(&mut topk).run(&mut cursors, num_docs);
            }
            Strategy::BlockMaxRankedAnd => {
                let (wand, _) = self.wand_and_clusters();
                let mut cursors =
                    make_block_max_scored_cursors(index, wand, &self.scorer, &self.rarest_first(query));
                BlockMaxRankedAndQuery::new(&mut topk).run(&mut cursors, num_docs);
            }
            Strategy::RankedOr => {
                let mut cursors = make_scored_cursors(index, &self.scorer, query);
                RankedOrQuery::new(&mut topk).run(&mut cursors, num_docs);
            }
            Strategy::RankedOrTaat => {
                let mut cursors = make_scored_cursors(index, &self.scorer, query);
                let accumulator = self
                    .simple_acc
                    .get_or_insert_with(|| SimpleAccumulator::new(num_docs));
                RankedOrTaatQuery::new(&mut topk).run(&mut cursors, num_docs, accumulator);
            }
            Strategy::RankedOrTaatLazy => {
                let mut cursors = make_scored_cursors(index, &self.scorer, query);
                let accumulator = self
                    .lazy_acc
                    .get_or_insert_with(|| LazyAccumulator::new(num_docs));
                RankedOrTaatQuery::new(&mut topk).run(&mut cursors, num_docs, accumulator);
            }
            Strategy::And | Strategy::Or | Strategy::OrFreq => unreachable!(),
        }

        topk.finalize()
    }

    /// Only called for strategies where `new` enforced wand data presence
    fn wand_and_clusters(&self) -> (&'a WandData, &'a ClusterMap) {
        let wand = self.wand.expect("strategy requires wand data");
        (wand, wand.clusters())
    }
}
