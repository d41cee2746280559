//! Read-only walks over the block chain.
//!
//! Everything here borrows the heap immutably. [`Blocks`] visits every
//! block as laid out in the arena; [`FreeRuns`] visits each maximal run of
//! adjacent free blocks once, probing it and jumping past it.

use std::fmt;

use crate::header::{BlockHeader, HEADER_SIZE};
use crate::heap::Heap;
use crate::probe::{self, FreeRun};

/// One block on the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Header offset within the arena.
    pub offset: usize,
    /// Payload size in bytes.
    pub size: usize,
    /// Whether the block is free.
    pub is_free: bool,
}

impl BlockInfo {
    /// Offset of the first payload byte.
    pub fn payload_offset(&self) -> usize {
        self.offset + HEADER_SIZE
    }

    /// Bytes covered by the block, header included.
    pub fn span(&self) -> usize {
        HEADER_SIZE + self.size
    }
}

/// Iterator over every block, in arena order.
pub struct Blocks<'a> {
    data: &'a [u8],
    cursor: Option<usize>,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: Some(0),
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<BlockInfo> {
        let offset = self.cursor.take()?;
        let header = BlockHeader::read(self.data, offset)?;
        self.cursor = probe::next_block(self.data, offset);
        Some(BlockInfo {
            offset,
            size: header.size as usize,
            is_free: header.is_free,
        })
    }
}

/// Iterator over maximal free runs, in arena order.
pub struct FreeRuns<'a> {
    data: &'a [u8],
    cursor: Option<usize>,
}

impl<'a> FreeRuns<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: Some(0),
        }
    }
}

impl Iterator for FreeRuns<'_> {
    type Item = FreeRun;

    fn next(&mut self) -> Option<FreeRun> {
        loop {
            let offset = self.cursor.take()?;
            let run = probe::probe(self.data, offset);
            if run.blocks > 0 {
                self.cursor = (run.end() < self.data.len()).then_some(run.end());
                return Some(run);
            }
            self.cursor = probe::next_block(self.data, offset);
        }
    }
}

/// Point-in-time summary of a heap's free space.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Arena size in bytes.
    pub capacity: usize,
    /// Sum of free block sizes, without merging adjacent blocks.
    pub free_remaining: usize,
    /// Sum of free run capacities. Counts the headers that merging
    /// adjacent free blocks would reclaim.
    pub free_capacity: usize,
    /// Smallest free run capacity, 0 if there is none.
    pub smallest_free: usize,
    /// Largest free run capacity, 0 if there is none.
    pub largest_free: usize,
    /// Number of free blocks on the chain.
    pub free_blocks: usize,
    /// Number of used blocks on the chain.
    pub used_blocks: usize,
    /// Number of maximal free runs.
    pub free_runs: usize,
}

impl fmt::Display for HeapStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Free: {}", self.free_remaining)?;
        writeln!(f, "Smallest: {}", self.smallest_free)?;
        write!(f, "Largest: {}", self.largest_free)
    }
}

impl Heap {
    /// Every block on the chain, in arena order.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks::new(self.arena())
    }

    /// Every maximal run of adjacent free blocks, in arena order.
    pub fn free_runs(&self) -> FreeRuns<'_> {
        FreeRuns::new(self.arena())
    }

    /// Total payload bytes in free blocks, each block counted on its own.
    pub fn free_remaining(&self) -> usize {
        self.blocks().filter(|b| b.is_free).map(|b| b.size).sum()
    }

    /// Total capacity of all free runs, as if each run were merged.
    pub fn free_capacity(&self) -> usize {
        self.free_runs().map(|r| r.capacity).sum()
    }

    /// Capacity of the smallest free run, or 0 if nothing is free.
    pub fn smallest_free(&self) -> usize {
        self.free_runs().map(|r| r.capacity).min().unwrap_or(0)
    }

    /// Capacity of the largest free run, or 0 if nothing is free.
    ///
    /// This is the largest request an exact-fit heap can currently serve.
    pub fn largest_free(&self) -> usize {
        self.free_runs().map(|r| r.capacity).max().unwrap_or(0)
    }

    /// Collect all survey figures in one pass over blocks and one over runs.
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            capacity: self.capacity(),
            ..HeapStats::default()
        };
        for block in self.blocks() {
            if block.is_free {
                stats.free_blocks += 1;
                stats.free_remaining += block.size;
            } else {
                stats.used_blocks += 1;
            }
        }
        let mut smallest = None;
        for run in self.free_runs() {
            stats.free_runs += 1;
            stats.free_capacity += run.capacity;
            stats.largest_free = stats.largest_free.max(run.capacity);
            smallest = Some(smallest.map_or(run.capacity, |s: usize| s.min(run.capacity)));
        }
        stats.smallest_free = smallest.unwrap_or(0);
        stats
    }
}
