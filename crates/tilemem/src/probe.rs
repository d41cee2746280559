//! Free-run probing over the inline block chain.
//!
//! `probe` measures how much contiguous free capacity starts at a block by
//! walking forward through adjacent free blocks. It only reads the arena.
//! Recording the merged span in the first block's header is a separate
//! step, `commit`, which only the allocation path performs.

use crate::header::{to_size, BlockHeader, HEADER_SIZE};

/// A maximal sequence of adjacent free blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeRun {
    /// Header offset of the first block in the run.
    pub offset: usize,
    /// Payload bytes available if the run were a single block.
    pub capacity: usize,
    /// Number of blocks the run spans.
    pub blocks: usize,
}

impl FreeRun {
    /// Bytes covered by the run, its first header included.
    pub fn span(&self) -> usize {
        HEADER_SIZE + self.capacity
    }

    /// Offset one past the last byte of the run.
    pub fn end(&self) -> usize {
        self.offset + self.span()
    }
}

/// Measure the free run starting at the header at `start`.
///
/// Walks while the cursor is inside the arena and the block under it is
/// free. A block whose declared span would pass the arena end stops the
/// walk without being counted. Returns a run with `blocks == 0` and
/// `capacity == 0` if the block at `start` is not free.
pub(crate) fn probe(buf: &[u8], start: usize) -> FreeRun {
    let mut cursor = start;
    let mut span = 0usize;
    let mut blocks = 0usize;

    while cursor < buf.len() {
        let header = match BlockHeader::read(buf, cursor) {
            Some(h) if h.is_free => h,
            _ => break,
        };
        let next = cursor + header.span();
        if next > buf.len() {
            break;
        }
        span += header.span();
        blocks += 1;
        cursor = next;
    }

    FreeRun {
        offset: start,
        capacity: span.saturating_sub(HEADER_SIZE),
        blocks,
    }
}

/// Record a probed run as one free block.
///
/// Rewrites only the first header. The interior headers stay in the
/// payload bytes, unreachable from the chain, until they are overwritten.
pub(crate) fn commit(buf: &mut [u8], run: &FreeRun) {
    BlockHeader::free(to_size(run.capacity)).write(buf, run.offset);
}

/// Offset of the header following the block at `offset`.
///
/// Uses the block's current size. Returns `None` at the arena end or if
/// no valid header is stored at `offset`.
pub(crate) fn next_block(buf: &[u8], offset: usize) -> Option<usize> {
    let header = BlockHeader::read(buf, offset)?;
    let next = offset + header.span();
    (next < buf.len()).then_some(next)
}
