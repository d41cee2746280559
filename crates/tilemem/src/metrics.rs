//! Cumulative heap counters.
//!
//! [`HeapMetrics`] is updated in place by every mutating heap call and
//! read through [`Heap::metrics`](crate::Heap::metrics). Counters survive
//! [`Heap::reset`](crate::Heap::reset); `bytes_in_use` does not.

/// Counters collected over the lifetime of a heap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapMetrics {
    /// Successful `allocate` calls.
    pub allocations: u64,
    /// Successful `deallocate` calls.
    pub deallocations: u64,
    /// `allocate` calls that returned `OutOfMemory`.
    pub failed_allocations: u64,
    /// Handles rejected by `deallocate` or payload access.
    pub rejected_handles: u64,
    /// Allocations that carved a free remainder block.
    pub splits: u64,
    /// Free blocks absorbed into a preceding block when a run was committed.
    pub coalesced_blocks: u64,
    /// Number of `reset` calls.
    pub resets: u64,
    /// Payload bytes held by used blocks, including split slack.
    pub bytes_in_use: usize,
}
