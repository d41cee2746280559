//! Benchmark profiles for tilemem.
//!
//! Pre-built heaps in known shapes for benchmarks and examples:
//!
//! - [`fresh_profile`]: one free block spanning a 1 MiB arena
//! - [`fragmented_profile`]: 1 MiB arena with every other block freed
//! - [`churned_profile`]: 256 KiB arena after a seeded random workload

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tilemem::{Heap, HeapConfig};
use tilemem_test_utils::workload::{random_ops, replay};

/// Arena size for the fresh and fragmented profiles.
pub const PROFILE_ARENA_SIZE: usize = 1024 * 1024;

/// An empty 1 MiB heap.
pub fn fresh_profile() -> Heap {
    Heap::new(HeapConfig::new(PROFILE_ARENA_SIZE)).expect("1 MiB is a valid arena")
}

/// A 1 MiB heap holding `blocks` allocations of `block_size` bytes, with
/// every even-indexed one freed.
///
/// Leaves `blocks / 2` isolated free runs in front of the tail, which is
/// the worst case for a first-fit scan that has to skip them.
pub fn fragmented_profile(blocks: usize, block_size: usize) -> Heap {
    let mut heap = fresh_profile();
    let handles: Vec<_> = (0..blocks)
        .map_while(|_| heap.allocate(block_size).ok())
        .collect();
    for handle in handles.into_iter().step_by(2) {
        heap.deallocate(handle).expect("handle was just allocated");
    }
    heap
}

/// A 256 KiB heap after `steps` seeded random operations.
pub fn churned_profile(seed: u64, steps: usize) -> Heap {
    let mut heap = Heap::new(HeapConfig::new(256 * 1024)).expect("256 KiB is a valid arena");
    replay(&mut heap, &random_ops(seed, steps, 1024));
    heap
}
