//! Detaching a buffer from its `ChunkVec` and reattaching it.

use core::alloc::Layout;
use core::mem::{self, ManuallyDrop};
use core::ptr::{self, NonNull};
use core::slice;

use crate::allocator::{ChunkAllocator, Global};
use crate::chunk_vec::{ChunkVec, BUFFER_ALIGN};
use crate::hooks::Hooks;

/// A chunk buffer owned directly by the caller.
///
/// Produced by [`ChunkVec::into_raw_parts`]. The caller releases it with the
/// allocator returned alongside, using [`RawChunks::layout`], or turns it
/// back into a vector with [`ChunkVec::from_raw_parts_in`].
#[derive(Debug)]
pub struct RawChunks {
    ptr: NonNull<u8>,
    len: usize,
    capacity: usize,
    width: usize,
}

impl RawChunks {
    #[must_use]
    pub fn as_ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Number of initialized chunks at the start of the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Layout the buffer was allocated with.
    #[must_use]
    pub fn layout(&self) -> Layout {
        // SAFETY: taken from a live `ChunkVec`, whose layout was validated.
        unsafe { Layout::from_size_align_unchecked(self.capacity * self.width, BUFFER_ALIGN) }
    }

    /// The initialized `len * width` bytes.
    ///
    /// # Safety
    ///
    /// The buffer must not have been released yet.
    #[must_use]
    pub unsafe fn as_bytes(&self) -> &[u8] {
        // SAFETY: forwarded from the caller's contract.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len * self.width) }
    }
}

impl<A: ChunkAllocator> ChunkVec<A> {
    /// Gives up the buffer without finalizing anything.
    ///
    /// The hooks and context are dropped; the buffer and the allocator that
    /// must release it are returned to the caller.
    #[must_use]
    pub fn into_raw_parts(self) -> (RawChunks, A) {
        let mut this = ManuallyDrop::new(self);
        drop(mem::take(&mut this.hooks));
        let raw = RawChunks {
            ptr: this.ptr,
            len: this.len,
            capacity: this.cap,
            width: this.width,
        };
        // SAFETY: `this` is never dropped, so the allocator is moved out once.
        let alloc = unsafe { ptr::read(&this.alloc) };
        tracing::trace!(
            len = raw.len,
            capacity = raw.capacity,
            width = raw.width,
            "chunk buffer detached"
        );
        (raw, alloc)
    }

    /// Rebuilds a vector from a detached buffer.
    ///
    /// # Safety
    ///
    /// `raw` must come from [`ChunkVec::into_raw_parts`] and `alloc` must be
    /// the allocator returned with it (or one able to release its blocks).
    pub unsafe fn from_raw_parts_in(raw: RawChunks, alloc: A) -> Self {
        Self {
            ptr: raw.ptr,
            len: raw.len,
            cap: raw.capacity,
            width: raw.width,
            hooks: Hooks::default(),
            alloc,
        }
    }
}

impl ChunkVec<Global> {
    /// Rebuilds a vector from a buffer detached from a `ChunkVec<Global>`.
    ///
    /// # Safety
    ///
    /// `raw` must come from [`ChunkVec::into_raw_parts`] on a `ChunkVec<Global>`.
    pub unsafe fn from_raw_parts(raw: RawChunks) -> Self {
        // SAFETY: forwarded from the caller's contract.
        unsafe { Self::from_raw_parts_in(raw, Global) }
    }
}
