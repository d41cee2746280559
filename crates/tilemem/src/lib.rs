//! Implicit free-list heap allocation over a single contiguous arena.
//!
//! A [`Heap`] is handed one byte buffer at construction and never asks the
//! system allocator for more. Block metadata lives inline: every block is
//! an 8-byte header followed by its payload, and blocks tile the arena
//! with no gaps. Adjacency in the buffer is the only free-list structure.
//!
//! # Architecture
//!
//! ```text
//! Heap (owner of the arena, Vec<u8>)
//! ├── header   BlockHeader encode/decode, HEADER_SIZE
//! ├── probe    FreeRun: pure measurement of adjacent free blocks + commit
//! ├── survey   Blocks / FreeRuns iterators, free_remaining, smallest/largest
//! ├── handle   BlockHandle: payload offset + length + epoch, no pointers
//! ├── config   HeapConfig, FitPolicy
//! ├── metrics  HeapMetrics counters
//! └── shared   SharedHeap: Arc<Mutex<Heap>>
//! ```
//!
//! # Operations
//!
//! - **Allocate:** first-fit scan over free runs. The chosen run is merged
//!   into one block, marked used, and split when the leftover can hold a
//!   header plus a minimum payload.
//! - **Deallocate:** flips one status byte. Adjacent free blocks are
//!   merged lazily by the next allocation that walks over them.
//! - **Survey:** `free_remaining` sums free blocks individually;
//!   `smallest_free` and `largest_free` look at merged free runs. All
//!   surveys take `&self`.
//!
//! # Example
//!
//! ```
//! use tilemem::{Heap, HeapConfig};
//!
//! let mut heap = Heap::new(HeapConfig::new(1024)).unwrap();
//! let block = heap.allocate(100).unwrap();
//! heap.payload_mut(block).unwrap().fill(0xAB);
//! assert_eq!(heap.largest_free(), 1024 - 2 * tilemem::HEADER_SIZE - 100);
//! heap.deallocate(block).unwrap();
//! assert_eq!(heap.largest_free(), 1024 - tilemem::HEADER_SIZE);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod handle;
pub mod header;
pub mod heap;
pub mod metrics;
pub mod probe;
pub mod shared;
pub mod survey;

// Public re-exports for the primary API surface.
pub use config::{FitPolicy, HeapConfig};
pub use error::HeapError;
pub use handle::BlockHandle;
pub use header::HEADER_SIZE;
pub use heap::Heap;
pub use metrics::HeapMetrics;
pub use probe::FreeRun;
pub use shared::SharedHeap;
pub use survey::{BlockInfo, Blocks, FreeRuns, HeapStats};
