//! Docid clusters: contiguous ranges used as early-termination units.

use crate::index::types::{ClusterId, DocId};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Mapping cluster id -> `[start, end)` docid range.
///
/// The ranges are disjoint and their union covers the whole docid space;
/// this is validated once at load, never on the query path.
#[derive(Debug, Clone)]
pub struct ClusterMap {
    ranges: Vec<(DocId, DocId)>,
}

impl ClusterMap {
    /// Build a cluster map, validating that `ranges` partition `[0, num_docs)`
    pub fn from_ranges(num_docs: DocId, ranges: Vec<(DocId, DocId)>) -> Result<Self> {
        if ranges.is_empty() {
            anyhow::bail!("cluster table is empty");
        }

        for (id, &(start, end)) in ranges.iter().enumerate() {
            if start >= end || end > num_docs {
                anyhow::bail!("cluster {} has invalid range [{}, {})", id, start, end);
            }
        }

        let mut sorted = ranges.clone();
        sorted.sort_by_key(|r| r.0);
        let mut expected = 0;
        for &(start, end) in &sorted {
            if start != expected {
                anyhow::bail!("cluster table leaves a gap or overlap at docid {}", start);
            }
            expected = end;
        }
        if expected != num_docs {
            anyhow::bail!(
                "cluster table covers [0, {}) but the corpus has {} documents",
                expected,
                num_docs
            );
        }

        Ok(Self { ranges })
    }

    /// Partition `[0, num_docs)` into `count` clusters of near-equal size
    pub fn even_partition(num_docs: DocId, count: u32) -> Result<Self> {
        if count == 0 || count > num_docs {
            anyhow::bail!("cannot split {} documents into {} clusters", num_docs, count);
        }
        let base = num_docs / count;
        let remainder = num_docs % count;
        let mut ranges = Vec::with_capacity(count as usize);
        let mut start = 0;
        for i in 0..count {
            let size = base + if i < remainder { 1 } else { 0 };
            ranges.push((start, start + size));
            start += size;
        }
        Self::from_ranges(num_docs, ranges)
    }

    #[inline]
    pub fn get(&self, cluster: ClusterId) -> (DocId, DocId) {
        self.ranges[cluster as usize]
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, DocId)> + '_ {
        self.ranges.iter().copied()
    }
}

/// Parse one line of a cluster-selection file: `query_id : c1 c2 c3`.
/// Cluster ids may be separated by any mix of whitespace and commas.
pub fn parse_cluster_line(line: &str) -> Result<(String, Vec<ClusterId>)> {
    let (id, rest) = line
        .split_once(':')
        .with_context(|| format!("missing ':' in cluster line `{}`", line))?;

    let mut clusters = Vec::new();
    for token in rest.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        let cluster: ClusterId = token
            .parse()
            .with_context(|| format!("could not parse cluster identifiers of query `{}`", rest))?;
        clusters.push(cluster);
    }

    Ok((id.trim().to_string(), clusters))
}

/// Read a file of per-query cluster selections.
/// Queries absent from the file get an empty selection.
pub fn read_selected_clusters(path: &Path) -> Result<FxHashMap<String, Vec<ClusterId>>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut selected = FxHashMap::default();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (id, clusters) = parse_cluster_line(&line)?;
        selected.insert(id, clusters);
    }

    Ok(selected)
}
