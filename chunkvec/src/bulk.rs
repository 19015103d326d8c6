//! Ranged read/write and whole-buffer copies.

use alloc::vec::Vec;
use core::ptr;

use crate::allocator::ChunkAllocator;
use crate::chunk_vec::ChunkVec;
use crate::error::ChunkError;

impl<A: ChunkAllocator> ChunkVec<A> {
    /// Copies chunks starting at `index` into `dest`.
    ///
    /// Reads `min(dest.len() / width, len - index)` chunks and returns that
    /// count, so a result smaller than requested means the end was reached.
    /// Returns 0 without touching `dest` when `index >= len`.
    pub fn read(&self, index: usize, dest: &mut [u8]) -> usize {
        let requested = dest.len() / self.width;
        let count = requested.min(self.len.saturating_sub(index));
        if count == 0 {
            return 0;
        }
        let start = index * self.width;
        let bytes = count * self.width;
        dest[..bytes].copy_from_slice(&self.as_bytes()[start..start + bytes]);
        count
    }

    /// Writes the chunks of `src` starting at `index`, extending `len` if needed.
    ///
    /// Occupied chunks that get overwritten are finalized first. Writing past
    /// the end zero-fills the chunks between the old `len` and `index`. When
    /// more capacity is needed, one reallocation to
    /// `max(2 * capacity + 1, index + count)` happens before anything is
    /// finalized or copied, so a failed write leaves the vector untouched.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if growing fails.
    ///
    /// # Panics
    ///
    /// Panics if `src.len()` is not a multiple of `width`.
    pub fn write(&mut self, index: usize, src: &[u8]) -> Result<(), ChunkError> {
        assert!(
            src.len() % self.width == 0,
            "Source of {} bytes is not a whole number of {}-byte chunks",
            src.len(),
            self.width
        );
        let count = src.len() / self.width;
        if count == 0 {
            return Ok(());
        }
        let end = index
            .checked_add(count)
            .ok_or_else(|| ChunkError::allocation(usize::MAX, self.width))?;
        if end > self.cap {
            self.grow_to(end)?;
        }

        for displaced in index..end.min(self.len) {
            self.finalize_at(displaced);
        }
        if index > self.len {
            let gap = (index - self.len) * self.width;
            // SAFETY: len < index <= cap.
            unsafe { ptr::write_bytes(self.slot(self.len), 0, gap) };
        }
        // SAFETY: end <= cap; `src` cannot alias our buffer.
        unsafe { ptr::copy_nonoverlapping(src.as_ptr(), self.slot(index), src.len()) };
        self.len = self.len.max(end);
        Ok(())
    }

    /// Copies the occupied bytes into a fresh allocation of exactly
    /// `max(len * width, 1)` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if the copy cannot be allocated.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ChunkError> {
        let bytes = self.as_bytes();
        let mut copy = Vec::new();
        copy.try_reserve_exact(bytes.len().max(1))
            .map_err(|_| ChunkError::allocation(self.len, self.width))?;
        copy.extend_from_slice(bytes);
        Ok(copy)
    }

    /// Creates a vector with the same width, capacity and chunks.
    ///
    /// Finalizer, resize handler and context are not copied.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if the copy cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, ChunkError>
    where
        A: Clone,
    {
        let mut copy = Self::with_capacity_in(self.width, self.cap, self.alloc.clone())?;
        let bytes = self.as_bytes();
        // SAFETY: both buffers hold `cap * width` bytes and are distinct.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), copy.ptr.as_ptr(), bytes.len()) };
        copy.len = self.len;
        Ok(copy)
    }
}
