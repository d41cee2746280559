//! The arena allocator.
//!
//! [`Heap`] owns one contiguous byte buffer and tiles it with blocks, each
//! prefixed by an inline [header](crate::header). Allocation is a first-fit
//! scan over free runs; release flips a single status byte and leaves
//! coalescing to the next allocation that walks over the block.

use std::fmt;

use log::{debug, trace, warn};

use crate::config::HeapConfig;
use crate::error::HeapError;
use crate::handle::BlockHandle;
use crate::header::{to_size, BlockHeader, HEADER_SIZE};
use crate::metrics::HeapMetrics;
use crate::probe::{self, FreeRun};
use crate::survey::FreeRuns;

/// A heap allocator over a single pre-allocated arena.
///
/// # Invariants
///
/// - Blocks tile the arena: the sum of `HEADER_SIZE + size` over every
///   block on the chain equals [`capacity`](Heap::capacity).
/// - Walking from offset 0 by each block's span lands exactly on another
///   header or exactly on the arena end.
/// - Survey methods take `&self` and never rewrite headers.
///
/// `Heap` has no interior mutability. Wrap it in a
/// [`SharedHeap`](crate::SharedHeap) to use it from several threads.
pub struct Heap {
    /// The arena. Length is fixed at construction.
    data: Vec<u8>,
    config: HeapConfig,
    /// Bumped by [`reset`](Heap::reset); stamped into every handle.
    epoch: u32,
    metrics: HeapMetrics,
}

impl Heap {
    /// Create a heap over a freshly zeroed arena of `config.capacity` bytes.
    pub fn new(config: HeapConfig) -> Result<Self, HeapError> {
        config.validate()?;
        let data = vec![0u8; config.capacity];
        Ok(Self::install(data, config))
    }

    /// Create a heap over a caller-provided buffer.
    ///
    /// The buffer's length overrides `config.capacity`. Existing contents
    /// are ignored apart from the first header, which is overwritten.
    pub fn with_buffer(buffer: Vec<u8>, config: HeapConfig) -> Result<Self, HeapError> {
        let config = HeapConfig {
            capacity: buffer.len(),
            ..config
        };
        config.validate()?;
        Ok(Self::install(buffer, config))
    }

    fn install(mut data: Vec<u8>, config: HeapConfig) -> Self {
        BlockHeader::free(to_size(data.len() - HEADER_SIZE)).write(&mut data, 0);
        debug!(
            "heap initialised: {} bytes, {:?} fit, min split remainder {}",
            data.len(),
            config.fit_policy,
            config.min_split_remainder
        );
        Self {
            data,
            config,
            epoch: 0,
            metrics: HeapMetrics::default(),
        }
    }

    /// Discard every block and start over with one free block.
    ///
    /// Live allocations are dropped without cleanup. Handles issued before
    /// the reset are rejected with [`HeapError::StaleHandle`].
    pub fn reset(&mut self) {
        let payload = self.data.len() - HEADER_SIZE;
        BlockHeader::free(to_size(payload)).write(&mut self.data, 0);
        self.epoch = self.epoch.wrapping_add(1);
        self.metrics.resets += 1;
        self.metrics.bytes_in_use = 0;
        debug!("heap reset to epoch {}", self.epoch);
    }

    /// Give the arena buffer back, ending the heap's lifetime.
    pub fn into_buffer(self) -> Vec<u8> {
        self.data
    }

    /// Total arena size in bytes, headers included.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Current epoch. Starts at 0 and increments on every reset.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> &HeapMetrics {
        &self.metrics
    }

    pub(crate) fn arena(&self) -> &[u8] {
        &self.data
    }

    /// Allocate `size` payload bytes.
    ///
    /// Scans free runs from the start of the arena and takes the first one
    /// the [fit policy](crate::FitPolicy) accepts. The run is coalesced
    /// into one block, marked used, and split if the leftover can hold a
    /// header plus `min_split_remainder` bytes.
    ///
    /// On failure the heap is left untouched.
    pub fn allocate(&mut self, size: usize) -> Result<BlockHandle, HeapError> {
        let policy = self.config.fit_policy;
        let mut largest_free = 0;
        let found = FreeRuns::new(&self.data).find(|run| {
            largest_free = largest_free.max(run.capacity);
            policy.accepts(run.capacity, size)
        });

        let Some(run) = found else {
            self.metrics.failed_allocations += 1;
            warn!("allocate({size}) failed: largest free run is {largest_free} bytes");
            return Err(HeapError::OutOfMemory {
                requested: size,
                largest_free,
            });
        };

        Ok(self.claim(run, size))
    }

    /// Turn a free run that fits `size` into a used block.
    fn claim(&mut self, run: FreeRun, size: usize) -> BlockHandle {
        if run.blocks > 1 {
            probe::commit(&mut self.data, &run);
            self.metrics.coalesced_blocks += (run.blocks - 1) as u64;
        }

        let mut block = BlockHeader::used(to_size(run.capacity));
        let split_at = run.offset + HEADER_SIZE + size;
        let remainder = run
            .capacity
            .checked_sub(size)
            .and_then(|r| r.checked_sub(HEADER_SIZE));
        if let Some(remainder) = remainder {
            if remainder >= self.config.min_split_remainder
                && split_at + HEADER_SIZE <= self.data.len()
            {
                BlockHeader::free(to_size(remainder)).write(&mut self.data, split_at);
                block.size = to_size(size);
                self.metrics.splits += 1;
            }
        }
        block.write(&mut self.data, run.offset);

        self.metrics.allocations += 1;
        self.metrics.bytes_in_use += block.size as usize;

        let payload = run.offset + HEADER_SIZE;
        trace!(
            "allocate({size}) -> block at {} (size {}, run of {} blocks)",
            run.offset,
            block.size,
            run.blocks
        );
        BlockHandle::new(self.epoch, to_size(payload), to_size(size))
    }

    /// Return an allocation to the heap.
    ///
    /// Only the block's status changes; adjacent free blocks are merged by
    /// a later [`allocate`](Heap::allocate).
    pub fn deallocate(&mut self, handle: BlockHandle) -> Result<(), HeapError> {
        let (offset, mut header) = match self.locate(handle) {
            Ok(found) => found,
            Err(err) => return Err(self.reject(err)),
        };
        if header.is_free {
            return Err(self.reject(HeapError::DoubleFree {
                offset: handle.offset(),
            }));
        }

        header.is_free = true;
        header.write(&mut self.data, offset);
        self.metrics.deallocations += 1;
        self.metrics.bytes_in_use = self
            .metrics
            .bytes_in_use
            .saturating_sub(header.size as usize);
        trace!("deallocate block at {offset} (size {})", header.size);
        Ok(())
    }

    /// Read the payload of a live allocation.
    pub fn payload(&self, handle: BlockHandle) -> Result<&[u8], HeapError> {
        let (_, header) = self.locate(handle)?;
        if header.is_free {
            return Err(HeapError::UseAfterFree {
                offset: handle.offset(),
            });
        }
        Ok(&self.data[handle.range()])
    }

    /// Write access to the payload of a live allocation.
    pub fn payload_mut(&mut self, handle: BlockHandle) -> Result<&mut [u8], HeapError> {
        let header = match self.locate(handle) {
            Ok((_, header)) => header,
            Err(err) => return Err(self.reject(err)),
        };
        if header.is_free {
            return Err(self.reject(HeapError::UseAfterFree {
                offset: handle.offset(),
            }));
        }
        Ok(&mut self.data[handle.range()])
    }

    /// Find the header a handle refers to.
    ///
    /// The handle must match the current epoch, and its header offset must
    /// be a block boundary reached by walking the chain from the start.
    fn locate(&self, handle: BlockHandle) -> Result<(usize, BlockHeader), HeapError> {
        if handle.epoch != self.epoch {
            return Err(HeapError::StaleHandle {
                handle_epoch: handle.epoch,
                current_epoch: self.epoch,
            });
        }

        let invalid = HeapError::InvalidHandle {
            offset: handle.offset(),
        };
        let Some(target) = handle.offset().checked_sub(HEADER_SIZE) else {
            return Err(invalid);
        };
        if handle.range().end > self.data.len() {
            return Err(invalid);
        }

        let on_chain = self
            .blocks()
            .take_while(|b| b.offset <= target)
            .any(|b| b.offset == target);
        match BlockHeader::read(&self.data, target) {
            Some(header) if on_chain && header.size as usize >= handle.len() => {
                Ok((target, header))
            }
            _ => Err(invalid),
        }
    }

    fn reject(&mut self, err: HeapError) -> HeapError {
        self.metrics.rejected_handles += 1;
        warn!("rejected handle: {err}");
        err
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("capacity", &self.data.len())
            .field("epoch", &self.epoch)
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FitPolicy;

    const H: usize = HEADER_SIZE;

    fn heap(capacity: usize) -> Heap {
        Heap::new(HeapConfig::new(capacity)).unwrap()
    }

    #[test]
    fn new_heap_is_one_free_block() {
        let heap = heap(65_536);
        assert_eq!(heap.free_remaining(), 65_536 - H);
        assert_eq!(heap.largest_free(), 65_536 - H);
        assert_eq!(heap.smallest_free(), 65_536 - H);
        assert_eq!(heap.blocks().count(), 1);
    }

    #[test]
    fn new_rejects_capacity_below_header() {
        let result = Heap::new(HeapConfig::new(H - 1));
        assert!(matches!(result, Err(HeapError::Misconfigured { .. })));
    }

    #[test]
    fn with_buffer_takes_capacity_from_buffer() {
        let heap = Heap::with_buffer(vec![0xAA; 256], HeapConfig::default()).unwrap();
        assert_eq!(heap.capacity(), 256);
        assert_eq!(heap.config().capacity, 256);
        assert_eq!(heap.free_remaining(), 256 - H);
    }

    #[test]
    fn header_only_arena_serves_zero_byte_requests() {
        let mut heap = heap(H);
        assert_eq!(heap.largest_free(), 0);
        let h = heap.allocate(0).unwrap();
        assert!(h.is_empty());
        assert!(heap.allocate(0).is_err());
    }

    #[test]
    fn sequential_allocations_are_adjacent() {
        let mut heap = heap(1024);
        let a = heap.allocate(10).unwrap();
        let b = heap.allocate(20).unwrap();
        assert_eq!(a.offset(), H);
        assert_eq!(b.offset(), H + 10 + H);
        assert_eq!(heap.metrics().splits, 2);
    }

    #[test]
    fn ten_small_allocations_match_expected_accounting() {
        let mut heap = heap(65_536);
        let mut last_largest = heap.largest_free();
        for _ in 0..10 {
            heap.allocate(10).unwrap();
            let largest = heap.largest_free();
            assert!(largest < last_largest);
            last_largest = largest;
        }
        assert_eq!(heap.free_remaining(), 65_536 - H - 10 * (10 + H));
    }

    #[test]
    fn exact_fit_takes_whole_run_without_split() {
        let mut heap = heap(64);
        let h = heap.allocate(64 - H).unwrap();
        assert_eq!(h.len(), 64 - H);
        assert_eq!(heap.largest_free(), 0);
        assert_eq!(heap.smallest_free(), 0);
        assert_eq!(heap.metrics().splits, 0);
    }

    #[test]
    fn headroom_policy_rejects_exact_fit() {
        let config = HeapConfig::new(64).with_fit_policy(FitPolicy::Headroom);
        let mut heap = Heap::new(config).unwrap();
        let err = heap.allocate(64 - H).unwrap_err();
        assert_eq!(
            err,
            HeapError::OutOfMemory {
                requested: 64 - H,
                largest_free: 64 - H,
            }
        );
        assert!(heap.allocate(64 - H - 1).is_ok());
    }

    #[test]
    fn leftover_too_small_for_header_stays_in_block() {
        let mut heap = heap(64);
        // 56 free; 50 requested leaves 6, not enough for a header.
        heap.allocate(50).unwrap();
        assert_eq!(heap.blocks().count(), 1);
        assert_eq!(heap.metrics().bytes_in_use, 56);
    }

    #[test]
    fn leftover_of_exactly_one_header_is_not_split() {
        let mut heap = heap(64);
        heap.allocate(64 - 2 * H).unwrap();
        assert_eq!(heap.blocks().count(), 1);
    }

    #[test]
    fn min_split_remainder_controls_splitting() {
        let config = HeapConfig::new(64).with_min_split_remainder(16);
        let mut heap = Heap::new(config.clone()).unwrap();
        heap.allocate(30).unwrap(); // leaves 18
        assert_eq!(heap.blocks().count(), 2);

        let mut heap = Heap::new(config).unwrap();
        heap.allocate(40).unwrap(); // leaves 8
        assert_eq!(heap.blocks().count(), 1);
        assert_eq!(heap.metrics().bytes_in_use, 56);
    }

    #[test]
    fn out_of_memory_leaves_heap_untouched() {
        let mut heap = heap(128);
        let a = heap.allocate(40).unwrap();
        heap.payload_mut(a).unwrap().fill(7);
        let before: Vec<_> = heap.blocks().collect();

        let err = heap.allocate(1000).unwrap_err();
        assert!(matches!(err, HeapError::OutOfMemory { requested: 1000, .. }));
        assert_eq!(heap.blocks().collect::<Vec<_>>(), before);
        assert!(heap.payload(a).unwrap().iter().all(|&b| b == 7));
        assert_eq!(heap.metrics().failed_allocations, 1);
    }

    #[test]
    fn freed_neighbours_are_coalesced_on_allocate() {
        let mut heap = heap(64);
        let a = heap.allocate(8).unwrap();
        let b = heap.allocate(8).unwrap();
        let _c = heap.allocate(24).unwrap();
        assert_eq!(heap.largest_free(), 0);

        heap.deallocate(a).unwrap();
        heap.deallocate(b).unwrap();
        assert_eq!(heap.free_remaining(), 16);
        assert_eq!(heap.largest_free(), 8 + H + 8);

        let d = heap.allocate(24).unwrap();
        assert_eq!(d.offset(), H);
        assert_eq!(heap.metrics().coalesced_blocks, 1);
        assert_eq!(heap.blocks().count(), 2);
    }

    #[test]
    fn deallocate_does_not_merge_eagerly() {
        let mut heap = heap(256);
        let a = heap.allocate(10).unwrap();
        let b = heap.allocate(10).unwrap();
        heap.deallocate(a).unwrap();
        heap.deallocate(b).unwrap();
        // Two freed blocks plus the trailing remainder stay separate headers.
        assert_eq!(heap.blocks().count(), 3);
        assert_eq!(heap.free_runs().count(), 1);
    }

    #[test]
    fn double_free_is_reported() {
        let mut heap = heap(256);
        let a = heap.allocate(10).unwrap();
        heap.deallocate(a).unwrap();
        assert_eq!(
            heap.deallocate(a),
            Err(HeapError::DoubleFree { offset: a.offset() })
        );
        assert_eq!(heap.metrics().rejected_handles, 1);
    }

    #[test]
    fn handle_off_block_boundary_is_invalid() {
        let mut heap = heap(256);
        let a = heap.allocate(32).unwrap();
        let forged = BlockHandle::new(a.epoch, a.offset + 4, 4);
        assert_eq!(
            heap.deallocate(forged),
            Err(HeapError::InvalidHandle {
                offset: forged.offset()
            })
        );
    }

    #[test]
    fn handle_outside_arena_is_invalid() {
        let mut heap = heap(256);
        let forged = BlockHandle::new(0, 4096, 1);
        assert!(matches!(
            heap.deallocate(forged),
            Err(HeapError::InvalidHandle { offset: 4096 })
        ));
        let below_header = BlockHandle::new(0, 2, 0);
        assert!(matches!(
            heap.deallocate(below_header),
            Err(HeapError::InvalidHandle { offset: 2 })
        ));
    }

    #[test]
    fn handle_longer_than_block_is_invalid() {
        let mut heap = heap(256);
        let a = heap.allocate(16).unwrap();
        let forged = BlockHandle::new(a.epoch, a.offset, 32);
        assert!(matches!(
            heap.payload(forged),
            Err(HeapError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn absorbed_header_is_no_longer_a_block() {
        let mut heap = heap(64);
        let a = heap.allocate(8).unwrap();
        let b = heap.allocate(8).unwrap();
        let _c = heap.allocate(24).unwrap();
        heap.deallocate(a).unwrap();
        heap.deallocate(b).unwrap();
        let _d = heap.allocate(24).unwrap();
        // `b`'s header now sits inside `d`'s payload.
        assert!(matches!(
            heap.deallocate(b),
            Err(HeapError::InvalidHandle { .. })
        ));
    }

    #[test]
    fn reset_invalidates_old_handles() {
        let mut heap = heap(256);
        let a = heap.allocate(10).unwrap();
        heap.reset();
        assert_eq!(heap.epoch(), 1);
        assert_eq!(heap.free_remaining(), 256 - H);
        assert_eq!(heap.metrics().bytes_in_use, 0);
        assert_eq!(
            heap.deallocate(a),
            Err(HeapError::StaleHandle {
                handle_epoch: 0,
                current_epoch: 1,
            })
        );
        let b = heap.allocate(10).unwrap();
        assert_eq!(b.epoch(), 1);
        assert_eq!(b.offset(), a.offset());
    }

    #[test]
    fn payload_round_trips_bytes() {
        let mut heap = heap(256);
        let a = heap.allocate(4).unwrap();
        heap.payload_mut(a).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(heap.payload(a).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn payload_of_freed_block_is_use_after_free() {
        let mut heap = heap(256);
        let a = heap.allocate(4).unwrap();
        heap.deallocate(a).unwrap();
        assert_eq!(
            heap.payload(a),
            Err(HeapError::UseAfterFree { offset: a.offset() })
        );
        assert!(heap.payload_mut(a).is_err());
        assert_eq!(heap.metrics().rejected_handles, 1);
    }

    #[test]
    fn metrics_track_live_bytes() {
        let mut heap = heap(256);
        let a = heap.allocate(10).unwrap();
        let b = heap.allocate(20).unwrap();
        assert_eq!(heap.metrics().allocations, 2);
        assert_eq!(heap.metrics().bytes_in_use, 30);
        heap.deallocate(a).unwrap();
        heap.deallocate(b).unwrap();
        assert_eq!(heap.metrics().deallocations, 2);
        assert_eq!(heap.metrics().bytes_in_use, 0);
    }

    #[test]
    fn into_buffer_returns_arena() {
        let heap = heap(128);
        let buf = heap.into_buffer();
        assert_eq!(buf.len(), 128);
    }
}
