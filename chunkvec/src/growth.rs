//! Capacity management and the rebase notification.
//!
//! Every successful capacity change ends by reporting the old-to-new
//! address offset to the resize handler. The
//! handler fires even when the allocator resized in place, so holders of raw
//! pointers never have to guess whether the buffer moved.

use core::alloc::Layout;
use core::ptr::{self, NonNull};

use crate::allocator::ChunkAllocator;
use crate::chunk_vec::{ChunkVec, BUFFER_ALIGN};
use crate::error::ChunkError;
use crate::hooks::Rebase;

pub(crate) fn buffer_layout(capacity: usize, width: usize) -> Result<Layout, ChunkError> {
    capacity
        .checked_mul(width)
        .and_then(|size| Layout::from_size_align(size, BUFFER_ALIGN).ok())
        .ok_or_else(|| ChunkError::allocation(capacity, width))
}

impl<A: ChunkAllocator> ChunkVec<A> {
    /// Sets the capacity to `capacity` chunks (at least 1).
    ///
    /// Requesting the current capacity does nothing and does not notify the
    /// resize handler. Shrinking below `len` discards the chunks that no
    /// longer fit, finalizing them last-to-first once the new buffer exists.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if the allocator fails. The
    /// vector is then unchanged and no finalizer has run.
    pub fn resize(&mut self, capacity: usize) -> Result<(), ChunkError> {
        let capacity = capacity.max(1);
        if capacity == self.cap {
            return Ok(());
        }
        if capacity < self.len {
            return self.truncate_into(capacity);
        }
        self.reallocate(capacity)
    }

    /// Ensures room for at least `additional` more chunks, growing by
    /// doubling when that is larger than the exact requirement.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if growing fails.
    pub fn reserve(&mut self, additional: usize) -> Result<(), ChunkError> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or_else(|| ChunkError::allocation(usize::MAX, self.width))?;
        if required <= self.cap {
            return Ok(());
        }
        self.grow_to(required)
    }

    /// Shrinks the capacity to `max(len, 1)`.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if the allocator fails.
    pub fn shrink_to_fit(&mut self) -> Result<(), ChunkError> {
        self.resize(self.len)
    }

    /// Grows to `max(2 * capacity + 1, required)` in a single reallocation.
    pub(crate) fn grow_to(&mut self, required: usize) -> Result<(), ChunkError> {
        let doubled = self
            .cap
            .checked_mul(2)
            .and_then(|cap| cap.checked_add(1))
            .unwrap_or(usize::MAX);
        self.reallocate(doubled.max(required))
    }

    fn reallocate(&mut self, capacity: usize) -> Result<(), ChunkError> {
        let new_layout = buffer_layout(capacity, self.width)?;
        let old_layout = self.layout();
        let old_base = self.ptr;

        // SAFETY: `old_base` was allocated by `self.alloc` with `old_layout`,
        // and `new_layout` is a valid non-zero layout with the same alignment.
        let base = unsafe {
            self.alloc
                .reallocate(old_base, old_layout, new_layout.size())
        }
        .ok_or_else(|| ChunkError::allocation(capacity, self.width))?;

        let old_capacity = self.cap;
        self.ptr = base;
        self.cap = capacity;
        self.announce(old_base, old_capacity);
        Ok(())
    }

    /// Moves the first `capacity` chunks into a fresh block, then finalizes
    /// the rest in the old one. Nothing is finalized if allocation fails.
    fn truncate_into(&mut self, capacity: usize) -> Result<(), ChunkError> {
        let new_layout = buffer_layout(capacity, self.width)?;
        let base = self
            .alloc
            .allocate(new_layout)
            .ok_or_else(|| ChunkError::allocation(capacity, self.width))?;
        // SAFETY: capacity < len, so the first `capacity` chunks are
        // initialized, and the two blocks are distinct.
        unsafe { ptr::copy_nonoverlapping(self.ptr.as_ptr(), base.as_ptr(), new_layout.size()) };

        self.discard(self.len - capacity);

        let old_layout = self.layout();
        let old_base = self.ptr;
        let old_capacity = self.cap;
        // SAFETY: `old_base` was allocated by `self.alloc` with `old_layout`.
        unsafe { self.alloc.deallocate(old_base, old_layout) };
        self.ptr = base;
        self.cap = capacity;
        self.announce(old_base, old_capacity);
        Ok(())
    }

    fn announce(&mut self, old_base: NonNull<u8>, old_capacity: usize) {
        let rebase = Rebase::new(
            old_base,
            self.ptr,
            old_capacity,
            self.cap,
            self.len,
            self.width,
        );
        tracing::trace!(
            old_capacity,
            new_capacity = self.cap,
            offset = rebase.offset,
            moved = rebase.moved(),
            "chunk buffer resized"
        );
        self.hooks.notify_resize(&rebase);
    }
}
