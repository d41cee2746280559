//! Mutex-guarded heap for cross-thread use.
//!
//! A [`Heap`] mutates headers in place and has no internal locking.
//! [`SharedHeap`] puts one `Mutex` around the whole heap and hands out
//! cheap `Arc` clones, so every operation is serialised.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::HeapError;
use crate::handle::BlockHandle;
use crate::heap::Heap;
use crate::survey::HeapStats;

/// A [`Heap`] behind a single mutex.
///
/// Cloning shares the same heap. A panic while the lock is held does not
/// make the heap unusable: no heap method can panic between two header
/// writes of the same operation, so the chain stays consistent and the
/// poisoned lock is recovered.
#[derive(Clone)]
pub struct SharedHeap {
    inner: Arc<Mutex<Heap>>,
}

impl SharedHeap {
    /// Wrap an existing heap.
    pub fn new(heap: Heap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(heap)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Heap> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`Heap::allocate`].
    pub fn allocate(&self, size: usize) -> Result<BlockHandle, HeapError> {
        self.lock().allocate(size)
    }

    /// See [`Heap::deallocate`].
    pub fn deallocate(&self, handle: BlockHandle) -> Result<(), HeapError> {
        self.lock().deallocate(handle)
    }

    /// See [`Heap::free_remaining`].
    pub fn free_remaining(&self) -> usize {
        self.lock().free_remaining()
    }

    /// See [`Heap::smallest_free`].
    pub fn smallest_free(&self) -> usize {
        self.lock().smallest_free()
    }

    /// See [`Heap::largest_free`].
    pub fn largest_free(&self) -> usize {
        self.lock().largest_free()
    }

    /// See [`Heap::stats`].
    pub fn stats(&self) -> HeapStats {
        self.lock().stats()
    }

    /// Run `f` with exclusive access to the heap.
    ///
    /// Use this for payload access, which borrows from the heap.
    pub fn with<R>(&self, f: impl FnOnce(&mut Heap) -> R) -> R {
        f(&mut self.lock())
    }

    /// Recover the heap if this is the last handle to it.
    pub fn try_into_inner(self) -> Result<Heap, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}
