//! Heap error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during heap operations.
///
/// Every variant is recoverable: a failed call leaves the block chain
/// exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeapError {
    /// No free run in the arena can hold the request.
    OutOfMemory {
        /// Number of payload bytes requested.
        requested: usize,
        /// Largest contiguous free capacity seen during the search.
        largest_free: usize,
    },
    /// The handle does not name a block boundary inside this arena.
    InvalidHandle {
        /// Payload offset encoded in the handle.
        offset: usize,
    },
    /// The handle names a block that is already free.
    DoubleFree {
        /// Payload offset encoded in the handle.
        offset: usize,
    },
    /// Payload access through a handle whose block has been freed.
    UseAfterFree {
        /// Payload offset encoded in the handle.
        offset: usize,
    },
    /// The handle was issued before the heap was last reset.
    StaleHandle {
        /// The epoch encoded in the handle.
        handle_epoch: u32,
        /// The heap's current epoch.
        current_epoch: u32,
    },
    /// The heap configuration cannot describe a usable arena.
    Misconfigured {
        /// Which constraint was violated.
        reason: String,
    },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                largest_free,
            } => {
                write!(
                    f,
                    "out of memory: requested {requested} bytes, largest free run {largest_free} bytes"
                )
            }
            Self::InvalidHandle { offset } => {
                write!(f, "invalid handle: offset {offset} is not a block in this arena")
            }
            Self::DoubleFree { offset } => {
                write!(f, "double free of block at offset {offset}")
            }
            Self::UseAfterFree { offset } => {
                write!(f, "access to freed block at offset {offset}")
            }
            Self::StaleHandle {
                handle_epoch,
                current_epoch,
            } => {
                write!(
                    f,
                    "stale handle: epoch {handle_epoch}, heap epoch {current_epoch}"
                )
            }
            Self::Misconfigured { reason } => {
                write!(f, "invalid heap configuration: {reason}")
            }
        }
    }
}

impl Error for HeapError {}
