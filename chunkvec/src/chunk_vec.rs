use core::alloc::Layout;
use core::fmt;
use core::ptr::{self, NonNull};
use core::slice;

use crate::allocator::{ChunkAllocator, Global};
use crate::error::ChunkError;
use crate::growth::buffer_layout;
use crate::hooks::{Context, Hooks};

/// Capacity used by [`ChunkVec::new`].
pub const DEFAULT_CAPACITY: usize = 8;
/// Alignment of every chunk buffer.
pub const BUFFER_ALIGN: usize = 16;
/// Size of the stack buffer used by [`ChunkVec::swap`].
pub const SWAP_CHUNK: usize = 16;

/// A growable vector of fixed-width byte chunks stored in one contiguous buffer.
///
/// Invariants: `1 <= width`, `1 <= capacity`, `len <= capacity`, and the
/// buffer holds exactly `capacity * width` bytes.
pub struct ChunkVec<A: ChunkAllocator = Global> {
    pub(crate) ptr: NonNull<u8>,
    pub(crate) len: usize,
    pub(crate) cap: usize,
    pub(crate) width: usize,
    pub(crate) hooks: Hooks,
    pub(crate) alloc: A,
}

impl ChunkVec<Global> {
    /// Creates an empty `ChunkVec` with the default capacity (8).
    ///
    /// A `width` of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if the buffer cannot be allocated.
    pub fn new(width: usize) -> Result<Self, ChunkError> {
        Self::new_in(width, Global)
    }

    /// Creates an empty `ChunkVec` able to hold `capacity` chunks.
    ///
    /// A `width` or `capacity` of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if the buffer cannot be allocated.
    pub fn with_capacity(width: usize, capacity: usize) -> Result<Self, ChunkError> {
        Self::with_capacity_in(width, capacity, Global)
    }
}

impl<A: ChunkAllocator> ChunkVec<A> {
    /// Like [`ChunkVec::new`], with the buffer provided by `alloc`.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if the buffer cannot be allocated.
    pub fn new_in(width: usize, alloc: A) -> Result<Self, ChunkError> {
        Self::with_capacity_in(width, DEFAULT_CAPACITY, alloc)
    }

    /// Like [`ChunkVec::with_capacity`], with the buffer provided by `alloc`.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if `capacity * width` overflows
    /// or the allocator fails.
    pub fn with_capacity_in(width: usize, capacity: usize, alloc: A) -> Result<Self, ChunkError> {
        let width = width.max(1);
        let capacity = capacity.max(1);
        let layout = buffer_layout(capacity, width)?;
        let ptr = alloc
            .allocate(layout)
            .ok_or_else(|| ChunkError::allocation(capacity, width))?;

        Ok(Self {
            ptr,
            len: 0,
            cap: capacity,
            width,
            hooks: Hooks::default(),
            alloc,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Length as a signed integer.
    #[must_use]
    pub fn len_signed(&self) -> isize {
        // The buffer never exceeds `isize::MAX` bytes, so neither does `len`.
        self.len as isize
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Capacity as a signed integer.
    #[must_use]
    pub fn capacity_signed(&self) -> isize {
        self.cap as isize
    }

    /// Number of chunks that can still be pushed without reallocating.
    #[must_use]
    pub fn room_left(&self) -> usize {
        self.cap - self.len
    }

    /// Size of one chunk in bytes.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Raw pointer to the start of the buffer.
    ///
    /// The pointer is invalidated by any operation that reallocates; register
    /// a resize handler to be told when that happens.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Mutable raw pointer to the start of the buffer.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Pointer to the chunk at `index`, or `None` if `index` is out of range.
    #[must_use]
    pub fn chunk_ptr(&self, index: usize) -> Option<NonNull<u8>> {
        if index >= self.len {
            return None;
        }
        // SAFETY: index < len <= cap, so the offset stays inside the buffer.
        Some(unsafe { NonNull::new_unchecked(self.slot(index)) })
    }

    /// The occupied part of the buffer, `len * width` bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the first `len` chunks are initialized.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len * self.width) }
    }

    #[must_use]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: the first `len` chunks are initialized.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len * self.width) }
    }

    /// Gets the chunk at the specified index.
    ///
    /// Returns `None` if the index is out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let start = index * self.width;
        self.as_bytes().get(start..start + self.width)
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        if index >= self.len {
            return None;
        }
        let start = index * self.width;
        let width = self.width;
        self.as_bytes_mut().get_mut(start..start + width)
    }

    /// Copies the chunk at `index` into the front of `dest`.
    ///
    /// Returns `false` and leaves `dest` untouched if `index` is out of range.
    ///
    /// # Panics
    ///
    /// Panics if the chunk exists and `dest` is shorter than `width`.
    pub fn get_into(&self, index: usize, dest: &mut [u8]) -> bool {
        match self.get(index) {
            Some(chunk) => {
                dest[..chunk.len()].copy_from_slice(chunk);
                true
            }
            None => false,
        }
    }

    /// The last chunk, or `None` if the vector is empty.
    #[must_use]
    pub fn top(&self) -> Option<&[u8]> {
        self.get(self.len.checked_sub(1)?)
    }

    /// Copies the last chunk into the front of `dest` without removing it.
    ///
    /// # Panics
    ///
    /// Panics if the vector is not empty and `dest` is shorter than `width`.
    pub fn top_into(&self, dest: &mut [u8]) -> bool {
        match self.top() {
            Some(chunk) => {
                dest[..chunk.len()].copy_from_slice(chunk);
                true
            }
            None => false,
        }
    }

    /// Pushes a chunk, growing the buffer to `2 * capacity + 1` when full.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::AllocationFailed` if growing fails; nothing is
    /// pushed in that case.
    ///
    /// # Panics
    ///
    /// Panics if `item` is not exactly `width` bytes long.
    pub fn push(&mut self, item: &[u8]) -> Result<(), ChunkError> {
        self.check_chunk(item);
        if self.len == self.cap {
            self.grow_to(self.cap + 1)?;
        }
        // SAFETY: len < cap after growing; `item` cannot alias our buffer.
        unsafe { ptr::copy_nonoverlapping(item.as_ptr(), self.slot(self.len), self.width) };
        self.len += 1;
        Ok(())
    }

    /// Removes the last chunk, copying it into the front of `dest` first.
    ///
    /// The finalizer, if any, runs on the vacated slot after the copy.
    /// Returns `false` and leaves `dest` untouched if the vector is empty.
    ///
    /// # Panics
    ///
    /// Panics if the vector is not empty and `dest` is shorter than `width`.
    pub fn pop_into(&mut self, dest: &mut [u8]) -> bool {
        if !self.top_into(dest) {
            return false;
        }
        self.len -= 1;
        self.finalize_at(self.len);
        true
    }

    /// Sets the chunk at `index`.
    ///
    /// `index == len` pushes; `index < len` finalizes the old chunk and
    /// overwrites it in place.
    ///
    /// # Errors
    ///
    /// Returns `ChunkError::IndexOutOfRange` if `index > len`, or
    /// `ChunkError::AllocationFailed` if a push needed to grow and failed.
    ///
    /// # Panics
    ///
    /// Panics if `item` is not exactly `width` bytes long.
    pub fn set(&mut self, index: usize, item: &[u8]) -> Result<(), ChunkError> {
        if index > self.len {
            return Err(ChunkError::IndexOutOfRange {
                index,
                length: self.len,
            });
        }
        if index == self.len {
            return self.push(item);
        }
        self.check_chunk(item);
        self.finalize_at(index);
        // SAFETY: index < len; `item` cannot alias our buffer.
        unsafe { ptr::copy_nonoverlapping(item.as_ptr(), self.slot(index), self.width) };
        Ok(())
    }

    /// Exchanges two chunks through a `SWAP_CHUNK`-byte stack buffer.
    ///
    /// Does nothing if the indices are equal or either is out of range.
    pub fn swap(&mut self, i1: usize, i2: usize) {
        if i1 == i2 || i1 >= self.len || i2 >= self.len {
            return;
        }
        let (lo, hi) = if i1 < i2 { (i1, i2) } else { (i2, i1) };
        let width = self.width;
        let (head, tail) = self.as_bytes_mut().split_at_mut(hi * width);
        let first = &mut head[lo * width..(lo + 1) * width];
        let second = &mut tail[..width];

        let mut buf = [0u8; SWAP_CHUNK];
        for (a, b) in first
            .chunks_mut(SWAP_CHUNK)
            .zip(second.chunks_mut(SWAP_CHUNK))
        {
            let tmp = &mut buf[..a.len()];
            tmp.copy_from_slice(a);
            a.copy_from_slice(b);
            b.copy_from_slice(tmp);
        }
    }

    /// Finalizes every chunk first-to-last, releases the buffer and hands
    /// back the stored context.
    pub fn destroy(mut self) -> Option<Context> {
        let context = self.hooks.context.take();
        drop(self);
        context
    }

    pub(crate) fn layout(&self) -> Layout {
        // SAFETY: validated by `buffer_layout` when the buffer was sized.
        unsafe { Layout::from_size_align_unchecked(self.cap * self.width, BUFFER_ALIGN) }
    }

    pub(crate) fn slot(&self, index: usize) -> *mut u8 {
        // SAFETY: callers keep index <= cap.
        unsafe { self.ptr.as_ptr().add(index * self.width) }
    }

    pub(crate) fn check_chunk(&self, item: &[u8]) {
        assert!(
            item.len() == self.width,
            "Chunk of {} bytes does not match width {}",
            item.len(),
            self.width
        );
    }

    pub(crate) fn finalize_at(&mut self, index: usize) {
        if let Some(finalizer) = self.hooks.finalizer.as_mut() {
            // SAFETY: callers pass an index of a chunk that is still initialized.
            let chunk = unsafe {
                slice::from_raw_parts_mut(self.ptr.as_ptr().add(index * self.width), self.width)
            };
            finalizer(chunk);
        }
    }
}

impl<A: ChunkAllocator> Drop for ChunkVec<A> {
    fn drop(&mut self) {
        let len = core::mem::replace(&mut self.len, 0);
        if self.hooks.finalizer.is_some() {
            for index in 0..len {
                self.finalize_at(index);
            }
        }
        // SAFETY: the buffer was allocated by `self.alloc` with this layout.
        unsafe { self.alloc.deallocate(self.ptr, self.layout()) }
    }
}

impl<A: ChunkAllocator> fmt::Debug for ChunkVec<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkVec")
            .field("len", &self.len)
            .field("capacity", &self.cap)
            .field("width", &self.width)
            .field("finalizer", &self.hooks.finalizer.is_some())
            .field("resize_handler", &self.hooks.resize_handler.is_some())
            .finish_non_exhaustive()
    }
}
