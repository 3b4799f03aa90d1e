//! Block-compressed posting lists and the cursor that walks them.
//!
//! A posting list is laid out as a u32 posting count followed by blocks of up
//! to [`POSTING_BLOCK_LEN`] postings. Each block carries a 12-byte header
//! (last docid, docid bytes, freq bytes) so `next_geq` can skip whole blocks
//! without decoding them. Docids are delta-varint encoded against the
//! previous block's last docid; frequencies are plain varints.

use crate::index::types::{DocId, POSTING_BLOCK_LEN};
use crate::utils::{
    delta_decode_into, delta_encode, encode_varint, read_u32_at, varint_decode_into,
};

/// Serialize one posting list into `buf`
pub fn encode_posting_list(postings: &[(DocId, u32)], buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(postings.len() as u32).to_le_bytes());

    let mut base: DocId = 0;
    let mut doc_bytes = Vec::new();
    let mut freq_bytes = Vec::new();

    for block in postings.chunks(POSTING_BLOCK_LEN) {
        doc_bytes.clear();
        freq_bytes.clear();

        let docs: Vec<DocId> = block.iter().map(|p| p.0).collect();
        delta_encode(base, &docs, &mut doc_bytes);
        for &(_, freq) in block {
            encode_varint(freq, &mut freq_bytes);
        }

        let last = docs[docs.len() - 1];
        buf.extend_from_slice(&last.to_le_bytes());
        buf.extend_from_slice(&(doc_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(freq_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&doc_bytes);
        buf.extend_from_slice(&freq_bytes);

        base = last;
    }
}

/// Cursor over one term's postings.
///
/// Produces (docid, freq) pairs in strictly increasing docid order and
/// reports the sentinel docid (corpus size) once exhausted. All advance
/// operations are monotone; `global_geq` is the only way to move backwards.
pub struct PostingCursor<'a> {
    data: &'a [u8],
    count: usize,
    sentinel: DocId,

    /// Byte offset of the next unread block header
    pos: usize,
    /// Postings contained in all blocks before `pos`
    consumed: usize,
    /// Delta base for the block at `pos`
    base: DocId,

    docs: Vec<DocId>,
    freqs: Vec<u32>,
    cur: usize,
    exhausted: bool,
}

impl<'a> PostingCursor<'a> {
    /// Open a cursor over the raw bytes of one posting list.
    /// `sentinel` is the corpus size, reported by `docid()` after exhaustion.
    pub fn new(data: &'a [u8], sentinel: DocId) -> Self {
        let count = read_u32_at(data, 0) as usize;
        let mut cursor = Self {
            data,
            count,
            sentinel,
            pos: 4,
            consumed: 0,
            base: 0,
            docs: Vec::with_capacity(POSTING_BLOCK_LEN),
            freqs: Vec::with_capacity(POSTING_BLOCK_LEN),
            cur: 0,
            exhausted: false,
        };
        cursor.advance_to_block(0);
        cursor
    }

    /// Number of postings in the list
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn docid(&self) -> DocId {
        if self.exhausted {
            self.sentinel
        } else {
            self.docs[self.cur]
        }
    }

    #[inline]
    pub fn freq(&self) -> u32 {
        if self.exhausted { 0 } else { self.freqs[self.cur] }
    }

    /// Advance one posting
    pub fn next(&mut self) {
        if self.exhausted {
            return;
        }
        self.cur += 1;
        if self.cur == self.docs.len() {
            self.advance_to_block(0);
        }
    }

    /// Advance to the first posting with docid >= `target`.
    /// A no-op when the current docid already satisfies the bound.
    pub fn next_geq(&mut self, target: DocId) {
        if self.exhausted || self.docid() >= target {
            return;
        }
        if *self.docs.last().unwrap() < target {
            self.advance_to_block(target);
            if self.exhausted {
                return;
            }
        }
        while self.docs[self.cur] < target {
            self.cur += 1;
        }
    }

    /// Rewind to the start of the list, then advance to the first posting
    /// with docid >= `target`. Used when a traversal re-enters an earlier
    /// docid range.
    pub fn global_geq(&mut self, target: DocId) {
        self.pos = 4;
        self.consumed = 0;
        self.base = 0;
        self.cur = 0;
        self.exhausted = false;
        self.advance_to_block(target);
        if self.exhausted {
            return;
        }
        while self.docs[self.cur] < target {
            self.cur += 1;
        }
    }

    /// Skip block headers until one with last docid >= `target`, then decode
    /// it. Leaves the cursor exhausted when no such block remains.
    fn advance_to_block(&mut self, target: DocId) {
        loop {
            if self.consumed == self.count {
                self.exhausted = true;
                self.docs.clear();
                self.freqs.clear();
                self.cur = 0;
                return;
            }

            let block_len = POSTING_BLOCK_LEN.min(self.count - self.consumed);
            let last = read_u32_at(self.data, self.pos);
            let doc_bytes = read_u32_at(self.data, self.pos + 4) as usize;
            let freq_bytes = read_u32_at(self.data, self.pos + 8) as usize;
            let body = self.pos + 12;

            if last < target {
                // Skip the block without decoding
                self.pos = body + doc_bytes + freq_bytes;
                self.consumed += block_len;
                self.base = last;
                continue;
            }

            self.docs.clear();
            self.freqs.clear();
            delta_decode_into(
                self.base,
                block_len,
                &self.data[body..body + doc_bytes],
                &mut self.docs,
            )
            .expect("corrupt posting block");
            varint_decode_into(
                block_len,
                &self.data[body + doc_bytes..body + doc_bytes + freq_bytes],
                &mut self.freqs,
            )
            .expect("corrupt posting block");

            self.pos = body + doc_bytes + freq_bytes;
            self.consumed += block_len;
            self.base = last;
            self.cur = 0;
            return;
        }
    }
}
