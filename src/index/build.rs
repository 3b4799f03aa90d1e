//! Index and wand-data construction.
//!
//! The builder ingests a plain-text collection (one document per line,
//! whitespace-separated term ids), partitions the docid space into clusters,
//! and writes the three index artifacts: `postings.bin`, `wand.bin`, and
//! `meta.json`. The per-term score maxima baked into `wand.bin` are computed
//! with the same scorer configuration the query pipeline will use; the two
//! must agree or every pruning decision is unsound.

use crate::index::clusters::ClusterMap;
use crate::index::postings::encode_posting_list;
use crate::index::types::*;
use crate::query::scorer::{Scorer, ScorerParams};
use crate::utils::progress::{ProgressBar, ProgressStyle};
use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Default number of postings per wand-data block
pub const DEFAULT_WAND_BLOCK_SIZE: usize = 64;

/// How to partition the docid space into clusters
#[derive(Debug, Clone)]
pub enum ClusterSpec {
    /// Split into this many near-equal contiguous ranges
    Even(u32),
    /// Read `start end` lines from a file
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct BuildParams {
    pub wand_block_size: usize,
    pub clusters: ClusterSpec,
    pub scorer: ScorerParams,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            wand_block_size: DEFAULT_WAND_BLOCK_SIZE,
            clusters: ClusterSpec::Even(1),
            scorer: ScorerParams::default(),
        }
    }
}

/// Per-term precomputed bounds, in wand.bin order
struct TermBounds {
    list_max: f32,
    blocks: Vec<(DocId, f32)>,
    ranges: Vec<(ClusterId, f32)>,
}

/// Build an index directory from a collection file
pub fn build_index(collection: &Path, out_dir: &Path, params: &BuildParams) -> Result<IndexMeta> {
    let (postings, doc_lens) = read_collection(collection)?;
    let num_docs = doc_lens.len() as u32;
    let num_terms = postings.len() as u32;
    anyhow::ensure!(num_docs > 0, "collection {} is empty", collection.display());

    let clusters = match &params.clusters {
        ClusterSpec::Even(count) => ClusterMap::even_partition(num_docs, *count)?,
        ClusterSpec::File(path) => read_cluster_ranges(path, num_docs)?,
    };

    let total_postings: u64 = postings.iter().map(|p| p.len() as u64).sum();
    let avg_doc_len = doc_lens.iter().map(|&l| l as u64).sum::<u64>() as f32 / num_docs as f32;

    // Per-docid cluster lookup for the single pass over each posting list
    let mut doc_to_cluster = vec![0 as ClusterId; num_docs as usize];
    for (cluster, (start, end)) in clusters.iter().enumerate() {
        for doc in start..end {
            doc_to_cluster[doc as usize] = cluster as ClusterId;
        }
    }

    let scorer = Scorer::new(params.scorer, num_docs, avg_doc_len, &doc_lens);

    let pb = ProgressBar::new(num_terms as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("computing bounds {bar:30} {pos}/{len}")
            .unwrap()
            .progress_chars("=> "),
    );

    let bounds: Vec<TermBounds> = postings
        .par_iter()
        .map(|list| {
            let b = term_bounds(list, &scorer, &doc_to_cluster, params.wand_block_size);
            pb.inc(1);
            b
        })
        .collect();
    pb.finish_and_clear();

    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    write_postings_file(&out_dir.join("postings.bin"), &postings, &doc_lens)?;
    write_wand_file(&out_dir.join("wand.bin"), num_docs, &clusters, &bounds)?;

    let meta = IndexMeta {
        version: FORMAT_VERSION,
        num_docs,
        num_terms,
        num_clusters: clusters.len() as u32,
        avg_doc_len,
        total_postings,
    };
    let meta_file = File::create(out_dir.join("meta.json"))?;
    serde_json::to_writer_pretty(meta_file, &meta)?;

    Ok(meta)
}

/// Parse the collection into dense per-term posting lists plus doc lengths
fn read_collection(path: &Path) -> Result<(Vec<Vec<(DocId, u32)>>, Vec<u32>)> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let mut doc_lens = Vec::new();
    let mut term_postings: Vec<Vec<(DocId, u32)>> = Vec::new();
    let mut freqs: FxHashMap<TermId, u32> = FxHashMap::default();

    for (doc, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let doc = doc as DocId;

        freqs.clear();
        let mut len = 0u32;
        for token in line.split_whitespace() {
            let term: TermId = token
                .parse()
                .with_context(|| format!("bad term id `{}` in document {}", token, doc))?;
            *freqs.entry(term).or_insert(0) += 1;
            len += 1;
        }
        doc_lens.push(len);

        for (&term, &freq) in &freqs {
            if term as usize >= term_postings.len() {
                term_postings.resize_with(term as usize + 1, Vec::new);
            }
            term_postings[term as usize].push((doc, freq));
        }
    }

    // Documents were visited in docid order; each list only needs sorting
    // because the per-doc hash map iterates unordered
    for list in &mut term_postings {
        list.sort_unstable_by_key(|p| p.0);
    }

    Ok((term_postings, doc_lens))
}

/// Read `start end` lines into a validated cluster map
fn read_cluster_ranges(path: &Path, num_docs: DocId) -> Result<ClusterMap> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut ranges = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let start: DocId = parts
            .next()
            .and_then(|t| t.parse().ok())
            .with_context(|| format!("bad cluster range line `{}`", line))?;
        let end: DocId = parts
            .next()
            .and_then(|t| t.parse().ok())
            .with_context(|| format!("bad cluster range line `{}`", line))?;
        ranges.push((start, end));
    }

    ClusterMap::from_ranges(num_docs, ranges)
}

/// One pass over a posting list, tracking list, block, and range maxima.
///
/// A block's recorded docid is one less than the first docid of the next
/// block (the final block records its actual last docid), so a block-max
/// skip lands exactly on the next block's first posting.
fn term_bounds(
    postings: &[(DocId, u32)],
    scorer: &Scorer,
    doc_to_cluster: &[ClusterId],
    block_size: usize,
) -> TermBounds {
    let mut bounds = TermBounds {
        list_max: 0.0,
        blocks: Vec::new(),
        ranges: Vec::new(),
    };
    if postings.is_empty() {
        return bounds;
    }

    let term_scorer = scorer.term_scorer(postings.len() as u32);

    let mut current_block = 0;
    let mut block_max = 0.0f32;
    let mut current_range = doc_to_cluster[postings[0].0 as usize];
    let mut range_max = 0.0f32;

    for (i, &(doc, freq)) in postings.iter().enumerate() {
        let score = term_scorer.score(doc, freq);
        bounds.list_max = bounds.list_max.max(score);

        if i == 0 || i / block_size == current_block {
            block_max = block_max.max(score);
        } else {
            bounds.blocks.push((doc - 1, block_max));
            current_block = i / block_size;
            block_max = score;
        }

        let range = doc_to_cluster[doc as usize];
        if range != current_range {
            bounds.ranges.push((current_range, range_max));
            current_range = range;
            range_max = score;
        } else {
            range_max = range_max.max(score);
        }
    }

    bounds.blocks.push((postings[postings.len() - 1].0, block_max));
    bounds.ranges.push((current_range, range_max));
    bounds
}

fn write_postings_file(
    path: &Path,
    postings: &[Vec<(DocId, u32)>],
    doc_lens: &[u32],
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(POSTINGS_MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(doc_lens.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(postings.len() as u32).to_le_bytes());
    let dict_offset_pos = buf.len();
    buf.extend_from_slice(&0u64.to_le_bytes());

    for &len in doc_lens {
        buf.extend_from_slice(&len.to_le_bytes());
    }

    let mut dict = Vec::with_capacity(postings.len());
    for list in postings {
        let offset = buf.len() as u64;
        encode_posting_list(list, &mut buf);
        dict.push(DictEntry {
            offset,
            length: (buf.len() as u64 - offset) as u32,
            doc_freq: list.len() as u32,
        });
    }

    let dict_offset = buf.len() as u64;
    buf[dict_offset_pos..dict_offset_pos + 8].copy_from_slice(&dict_offset.to_le_bytes());
    for entry in dict {
        buf.extend_from_slice(&entry.offset.to_le_bytes());
        buf.extend_from_slice(&entry.length.to_le_bytes());
        buf.extend_from_slice(&entry.doc_freq.to_le_bytes());
    }

    fs::write(path, buf).with_context(|| format!("failed to write {}", path.display()))
}

fn write_wand_file(
    path: &Path,
    num_docs: DocId,
    clusters: &ClusterMap,
    bounds: &[TermBounds],
) -> Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(WAND_MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&num_docs.to_le_bytes());
    buf.extend_from_slice(&(bounds.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(clusters.len() as u32).to_le_bytes());
    let dir_offset_pos = buf.len();
    buf.extend_from_slice(&0u64.to_le_bytes());

    for (start, end) in clusters.iter() {
        buf.extend_from_slice(&start.to_le_bytes());
        buf.extend_from_slice(&end.to_le_bytes());
    }

    let mut dir = Vec::with_capacity(bounds.len());
    for term in bounds {
        dir.push(buf.len() as u64);
        buf.extend_from_slice(&term.list_max.to_le_bytes());
        buf.extend_from_slice(&(term.blocks.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(term.ranges.len() as u32).to_le_bytes());
        for &(doc, score) in &term.blocks {
            buf.extend_from_slice(&doc.to_le_bytes());
            buf.extend_from_slice(&score.to_le_bytes());
        }
        for &(range, score) in &term.ranges {
            buf.extend_from_slice(&range.to_le_bytes());
            buf.extend_from_slice(&score.to_le_bytes());
        }
    }

    let dir_offset = buf.len() as u64;
    buf[dir_offset_pos..dir_offset_pos + 8].copy_from_slice(&dir_offset.to_le_bytes());
    for offset in dir {
        buf.extend_from_slice(&offset.to_le_bytes());
    }

    fs::write(path, buf).with_context(|| format!("failed to write {}", path.display()))
}
