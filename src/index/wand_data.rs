//! Precomputed score upper bounds ("wand data") for dynamic pruning.
//!
//! For every term the wand file stores the list-wide max score, a sequence of
//! per-block (last docid, max score) pairs, and a sequence of per-cluster
//! (range id, max score) pairs. The file also carries the cluster table that
//! partitions the docid space. Traversals consume all of this through
//! [`WandDataEnumerator`].

use crate::index::clusters::ClusterMap;
use crate::index::types::*;
use crate::utils::{read_f32_at, read_u32_at, read_u64_at};
use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// Fixed byte sizes of the wand.bin layout
const HEADER_LEN: usize = 8 + 4 + 4 + 4 + 4 + 8;
const PAIR_LEN: usize = 8;

/// Memory-mapped wand data reader
pub struct WandData {
    mmap: Mmap,
    dir: Vec<u64>,
    clusters: ClusterMap,
    num_docs: u32,
    num_terms: u32,
}

impl WandData {
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < HEADER_LEN || &mmap[..8] != WAND_MAGIC {
            anyhow::bail!("{} is not a wand data file", path.display());
        }
        if read_u32_at(&mmap, 8) != FORMAT_VERSION {
            anyhow::bail!("wand data version mismatch");
        }

        let num_docs = read_u32_at(&mmap, 12);
        let num_terms = read_u32_at(&mmap, 16);
        let num_clusters = read_u32_at(&mmap, 20);
        let dir_offset = read_u64_at(&mmap, 24) as usize;

        if HEADER_LEN + num_clusters as usize * 8 > mmap.len() {
            anyhow::bail!("wand data cluster table out of bounds");
        }

        let mut ranges = Vec::with_capacity(num_clusters as usize);
        let mut pos = HEADER_LEN;
        for _ in 0..num_clusters {
            let start = read_u32_at(&mmap, pos);
            let end = read_u32_at(&mmap, pos + 4);
            ranges.push((start, end));
            pos += 8;
        }
        let clusters = ClusterMap::from_ranges(num_docs, ranges)
            .with_context(|| format!("invalid cluster table in {}", path.display()))?;

        if dir_offset + num_terms as usize * 8 > mmap.len() {
            anyhow::bail!("wand data directory out of bounds");
        }
        let mut dir = Vec::with_capacity(num_terms as usize);
        for t in 0..num_terms as usize {
            let offset = read_u64_at(&mmap, dir_offset + t * 8);
            if offset as usize + 12 > mmap.len() {
                anyhow::bail!("wand data entry for term {} out of bounds", t);
            }
            dir.push(offset);
        }

        Ok(Self {
            mmap,
            dir,
            clusters,
            num_docs,
            num_terms,
        })
    }

    #[inline]
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    #[inline]
    pub fn num_terms(&self) -> u32 {
        self.num_terms
    }

    pub fn clusters(&self) -> &ClusterMap {
        &self.clusters
    }

    /// List-wide score upper bound for `term`
    pub fn max_term_score(&self, term: TermId) -> f32 {
        read_f32_at(&self.mmap, self.dir[term as usize] as usize)
    }

    /// Open a block/range enumerator over `term`'s bounds
    pub fn enumerator(&self, term: TermId) -> WandDataEnumerator<'_> {
        let base = self.dir[term as usize] as usize;
        let block_count = read_u32_at(&self.mmap, base + 4) as usize;
        let range_count = read_u32_at(&self.mmap, base + 8) as usize;
        let blocks_start = base + 12;
        let ranges_start = blocks_start + block_count * PAIR_LEN;

        WandDataEnumerator {
            blocks: &self.mmap[blocks_start..ranges_start],
            ranges: &self.mmap[ranges_start..ranges_start + range_count * PAIR_LEN],
            block_count,
            range_count,
            cur: 0,
        }
    }
}

/// Per-term walker over block bounds plus random access to range bounds.
///
/// The block pointer is advanced monotonically by `next_geq`; `global_geq`
/// rewinds it first, which is what lets anytime traversals re-enter an
/// earlier cluster.
pub struct WandDataEnumerator<'a> {
    blocks: &'a [u8],
    ranges: &'a [u8],
    block_count: usize,
    range_count: usize,
    cur: usize,
}

impl WandDataEnumerator<'_> {
    /// Last docid bounded by the current block
    #[inline]
    pub fn docid(&self) -> DocId {
        if self.block_count == 0 {
            return DocId::MAX;
        }
        read_u32_at(self.blocks, self.cur * PAIR_LEN)
    }

    /// Score upper bound of the current block
    #[inline]
    pub fn score(&self) -> f32 {
        if self.block_count == 0 {
            return 0.0;
        }
        read_f32_at(self.blocks, self.cur * PAIR_LEN + 4)
    }

    /// Advance the block pointer to the first block covering docid >= `target`
    pub fn next_geq(&mut self, target: DocId) {
        while self.cur + 1 < self.block_count
            && read_u32_at(self.blocks, self.cur * PAIR_LEN) < target
        {
            self.cur += 1;
        }
    }

    /// Rewind the block pointer and advance to the block covering `target`
    pub fn global_geq(&mut self, target: DocId) {
        self.cur = 0;
        self.next_geq(target);
    }

    /// Upper bound on this term's score inside cluster `range`.
    /// Returns 0 when the term has no posting in that cluster.
    pub fn range_score(&self, range: ClusterId) -> f32 {
        if self.range_count == 0 {
            return 0.0;
        }
        let mut i = 0;
        while i + 1 < self.range_count && read_u32_at(self.ranges, i * PAIR_LEN) < range {
            i += 1;
        }
        if read_u32_at(self.ranges, i * PAIR_LEN) == range {
            read_f32_at(self.ranges, i * PAIR_LEN + 4)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an enumerator over hand-rolled block and range byte tables
    fn make_tables(
        blocks: &[(u32, f32)],
        ranges: &[(u32, f32)],
    ) -> (Vec<u8>, Vec<u8>, usize, usize) {
        let mut b = Vec::new();
        for &(doc, score) in blocks {
            b.extend_from_slice(&doc.to_le_bytes());
            b.extend_from_slice(&score.to_le_bytes());
        }
        let mut r = Vec::new();
        for &(id, score) in ranges {
            r.extend_from_slice(&id.to_le_bytes());
            r.extend_from_slice(&score.to_le_bytes());
        }
        (b, r, blocks.len(), ranges.len())
    }

    #[test]
    fn test_block_walk() {
        let (b, r, bc, rc) = make_tables(&[(9, 1.5), (19, 0.5), (31, 2.0)], &[]);
        let mut e = WandDataEnumerator {
            blocks: &b,
            ranges: &r,
            block_count: bc,
            range_count: rc,
            cur: 0,
        };

        assert_eq!(e.docid(), 9);
        assert_eq!(e.score(), 1.5);

        e.next_geq(10);
        assert_eq!(e.docid(), 19);
        assert_eq!(e.score(), 0.5);

        // stays parked on the final block
        e.next_geq(100);
        assert_eq!(e.docid(), 31);

        e.global_geq(0);
        assert_eq!(e.docid(), 9);
    }

    #[test]
    fn test_range_score_lookup() {
        let (b, r, bc, rc) = make_tables(&[(5, 1.0)], &[(0, 0.5), (2, 1.25), (5, 0.75)]);
        let e = WandDataEnumerator {
            blocks: &b,
            ranges: &r,
            block_count: bc,
            range_count: rc,
            cur: 0,
        };

        assert_eq!(e.range_score(0), 0.5);
        assert_eq!(e.range_score(2), 1.25);
        assert_eq!(e.range_score(5), 0.75);
        // clusters the term never touches bound nothing
        assert_eq!(e.range_score(1), 0.0);
        assert_eq!(e.range_score(9), 0.0);
    }
}
