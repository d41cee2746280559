//! Test utilities for tilemem development.
//!
//! - [`assert_tiled`] checks the block-chain invariants of a [`Heap`].
//! - [`assert_disjoint`] checks that live payload ranges never overlap.
//! - [`LiveSet`] tracks live allocations and stamps each payload with a
//!   byte pattern so corruption shows up on [`LiveSet::verify`].
//! - [`workload`] generates and replays seeded allocate/free sequences.
//! - [`fixtures`] holds the scripted report scenario.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod workload;

use indexmap::IndexMap;
use tilemem::{BlockHandle, Heap, HeapError, HEADER_SIZE};

/// Panic unless the heap's blocks tile its arena exactly.
///
/// Checks that the chain starts at 0, that each block begins where the
/// previous one ended, that the last block ends on the arena end, and that
/// the survey figures agree with the chain.
pub fn assert_tiled(heap: &Heap) {
    let mut expected_offset = 0;
    let mut free_sum = 0;
    for block in heap.blocks() {
        assert_eq!(
            block.offset, expected_offset,
            "block chain drifted: expected header at {expected_offset}, found {}",
            block.offset
        );
        if block.is_free {
            free_sum += block.size;
        }
        expected_offset += block.span();
    }
    assert_eq!(
        expected_offset,
        heap.capacity(),
        "blocks cover {expected_offset} bytes of a {}-byte arena",
        heap.capacity()
    );
    assert_eq!(heap.free_remaining(), free_sum);
    assert!(heap.largest_free() <= heap.capacity() - HEADER_SIZE);
    assert!(heap.smallest_free() <= heap.largest_free());
}

/// Panic if any two handles' payload ranges overlap.
pub fn assert_disjoint<'a>(handles: impl IntoIterator<Item = &'a BlockHandle>) {
    let mut ranges: Vec<_> = handles
        .into_iter()
        .filter(|h| !h.is_empty())
        .map(|h| h.range())
        .collect();
    ranges.sort_by_key(|r| r.start);
    for pair in ranges.windows(2) {
        assert!(
            pair[0].end <= pair[1].start,
            "payloads overlap: {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
}

/// Live allocations keyed by a monotonically increasing id.
///
/// Insertion order is preserved, so "free the n-th live allocation" is
/// deterministic for a given sequence of calls.
#[derive(Default)]
pub struct LiveSet {
    live: IndexMap<u64, BlockHandle>,
    next_id: u64,
}

impl LiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte every payload of allocation `id` is filled with.
    pub fn pattern(id: u64) -> u8 {
        (id % 251) as u8 + 1
    }

    /// Allocate `size` bytes and stamp the payload.
    pub fn allocate(&mut self, heap: &mut Heap, size: usize) -> Result<u64, HeapError> {
        let handle = heap.allocate(size)?;
        let id = self.next_id;
        self.next_id += 1;
        heap.payload_mut(handle)?.fill(Self::pattern(id));
        self.live.insert(id, handle);
        Ok(id)
    }

    /// Free the live allocation at position `index` in insertion order.
    ///
    /// Returns `None` if `index` is out of range.
    pub fn free_nth(&mut self, heap: &mut Heap, index: usize) -> Option<Result<(), HeapError>> {
        let (_, handle) = self.live.shift_remove_index(index)?;
        Some(heap.deallocate(handle))
    }

    /// Free the allocation with the given id.
    pub fn free(&mut self, heap: &mut Heap, id: u64) -> Option<Result<(), HeapError>> {
        let handle = self.live.shift_remove(&id)?;
        Some(heap.deallocate(handle))
    }

    /// Panic if any live payload lost its stamp or ranges overlap.
    pub fn verify(&self, heap: &Heap) {
        for (&id, &handle) in &self.live {
            let payload = heap
                .payload(handle)
                .unwrap_or_else(|e| panic!("live allocation {id} unreadable: {e}"));
            let pattern = Self::pattern(id);
            assert!(
                payload.iter().all(|&b| b == pattern),
                "payload of allocation {id} ({handle}) was overwritten"
            );
        }
        assert_disjoint(self.live.values());
    }

    pub fn handle(&self, id: u64) -> Option<BlockHandle> {
        self.live.get(&id).copied()
    }

    pub fn handles(&self) -> impl Iterator<Item = &BlockHandle> {
        self.live.values()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
