//! Block handles.
//!
//! A [`BlockHandle`] is what [`Heap::allocate`](crate::Heap::allocate) hands
//! out instead of a pointer: an arena-relative payload offset plus the
//! requested length and the heap epoch it was issued in. The epoch allows
//! O(1) rejection of handles that predate a [`Heap::reset`](crate::Heap::reset).

use std::fmt;

/// Opaque reference to a live allocation.
///
/// Handles carry no ownership. Returning a handle to
/// [`Heap::deallocate`](crate::Heap::deallocate) twice is reported as an
/// error, but a handle whose block was freed and then handed out again at
/// the same offset cannot be told apart from the new allocation's handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[must_use]
pub struct BlockHandle {
    /// Heap epoch when this allocation was made.
    pub(crate) epoch: u32,
    /// Byte offset of the payload within the arena.
    pub(crate) offset: u32,
    /// Requested payload length in bytes.
    pub(crate) len: u32,
}

impl BlockHandle {
    pub(crate) fn new(epoch: u32, offset: u32, len: u32) -> Self {
        Self { epoch, offset, len }
    }

    /// The heap epoch this handle belongs to.
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Byte offset of the payload within the arena.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// Requested payload length in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this is a zero-length allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload byte range within the arena.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset()..self.offset() + self.len()
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockHandle(epoch={}, off={}, len={})",
            self.epoch, self.offset, self.len
        )
    }
}
