//! The scripted report scenario.
//!
//! A fixed sequence over a 64 KiB arena: ten 10-byte allocations, one of
//! 100 bytes, one of 200 bytes, then freeing the first five small blocks,
//! the 100-byte block, and the ninth small block. Callers observe the heap
//! after every step through a callback.

use tilemem::{BlockHandle, Heap, HeapConfig, HeapError};

/// Arena size used by the scenario.
pub const REPORT_ARENA_SIZE: usize = 65_536;

/// Handles still live at the end of [`run_report_scenario`].
pub struct ReportHandles {
    pub small: Vec<BlockHandle>,
    pub medium: BlockHandle,
    pub large: BlockHandle,
}

/// A heap configured for the report scenario.
pub fn report_heap() -> Heap {
    Heap::new(HeapConfig::new(REPORT_ARENA_SIZE)).expect("64 KiB is a valid arena")
}

/// Run the scenario, calling `observe(label, heap)` after each step.
pub fn run_report_scenario(
    heap: &mut Heap,
    mut observe: impl FnMut(&str, &Heap),
) -> Result<ReportHandles, HeapError> {
    observe("Initialized", heap);

    let small = (0..10)
        .map(|_| heap.allocate(10))
        .collect::<Result<Vec<_>, _>>()?;
    observe("Allocate 10 x 10", heap);

    let medium = heap.allocate(100)?;
    observe("Allocate 100", heap);

    let large = heap.allocate(200)?;
    observe("Allocate 200", heap);

    for &handle in &small[..5] {
        heap.deallocate(handle)?;
    }
    observe("Deallocate 10x5", heap);

    heap.deallocate(medium)?;
    observe("Deallocate 100", heap);

    heap.deallocate(small[8])?;
    observe("Deallocate 10x1", heap);

    Ok(ReportHandles {
        small,
        medium,
        large,
    })
}
