//! Fixed-capacity binary min-heap.
//!
//! Array-backed heap with parent/child index arithmetic. Storage for the full
//! capacity is reserved when the heap is built, so `push` and `replace_min`
//! never touch the allocator and are safe to call from probe context.

use alloc::collections::TryReserveError;
use alloc::vec::Vec;

/// Binary min-heap that never grows past the capacity it was created with.
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    data: Vec<T>,
    capacity: usize,
}

impl<T: Ord + Copy> MinHeap<T> {
    /// Create an empty heap with room for `capacity` elements.
    ///
    /// Fails instead of aborting when the backing storage cannot be
    /// allocated.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)?;
        Ok(Self { data, capacity })
    }

    /// Number of elements currently stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Maximum number of elements this heap holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Smallest element, in O(1).
    #[inline]
    pub fn peek_min(&self) -> Option<&T> {
        self.data.first()
    }

    /// Elements in heap order (not sorted).
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Insert `value`, handing it back when the heap is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        // Within the reserved capacity: no reallocation.
        self.data.push(value);
        self.sift_up(self.data.len() - 1);
        Ok(())
    }

    /// Replace the minimum with `value` and restore ordering.
    ///
    /// Returns the evicted minimum, or `None` (and stores nothing) when the
    /// heap is empty.
    pub fn replace_min(&mut self, value: T) -> Option<T> {
        let root = self.data.first_mut()?;
        let old = core::mem::replace(root, value);
        self.sift_down(0);
        Some(old)
    }

    /// Remove and return the minimum.
    pub fn pop_min(&mut self) -> Option<T> {
        let last = self.data.pop()?;
        if self.data.is_empty() {
            return Some(last);
        }
        let min = core::mem::replace(&mut self.data[0], last);
        self.sift_down(0);
        Some(min)
    }

    /// Drop all elements, keeping the storage.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.data[idx] >= self.data[parent] {
                break;
            }
            self.data.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut smallest = idx;

            if left < len && self.data[left] < self.data[smallest] {
                smallest = left;
            }
            if right < len && self.data[right] < self.data[smallest] {
                smallest = right;
            }
            if smallest == idx {
                break;
            }
            self.data.swap(idx, smallest);
            idx = smallest;
        }
    }
}
