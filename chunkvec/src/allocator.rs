//! Allocator binding for chunk buffers.
//!
//! Every `ChunkVec` owns the allocator it was created with and uses it for
//! the whole lifetime of its buffer, so changing allocators for new vectors
//! never affects vectors that already exist.

use core::alloc::Layout;
use core::ptr::NonNull;

/// The allocate/reallocate/free triple used by a `ChunkVec` for its buffer.
///
/// # Safety
///
/// Implementations must behave like a memory allocator:
/// - `allocate` returns memory valid for reads and writes of `layout.size()`
///   bytes, aligned to `layout.align()`, or `None`.
/// - `reallocate` either returns a block of `new_size` bytes (same alignment)
///   holding the first `min(old.size(), new_size)` bytes of the old block and
///   invalidates the old pointer, or returns `None` and leaves the old block
///   untouched.
/// - `deallocate` releases a block previously returned by this allocator.
pub unsafe trait ChunkAllocator {
    /// Allocates a block for `layout`. `layout.size()` is never zero.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Grows or shrinks a block to `new_size` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator with layout `old`, and `new_size`
    /// must be non-zero and not overflow `isize` when rounded to `old.align()`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator with layout `layout`, and must not
    /// be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator of the `alloc` crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

unsafe impl ChunkAllocator for Global {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: callers never request zero-sized layouts.
        NonNull::new(unsafe { alloc::alloc::alloc(layout) })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded from the caller's contract.
        NonNull::new(unsafe { alloc::alloc::realloc(ptr.as_ptr(), old, new_size) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller's contract.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

unsafe impl<A: ChunkAllocator + ?Sized> ChunkAllocator for &A {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarding.
        unsafe { (**self).reallocate(ptr, old, new_size) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarding.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// `malloc`-style allocation function: size in bytes, null on failure.
pub type AllocateFn = unsafe fn(usize) -> *mut u8;
/// `realloc`-style function: old block and new size in bytes, null on failure.
pub type ReallocateFn = unsafe fn(*mut u8, usize) -> *mut u8;
/// `free`-style function.
pub type FreeFn = unsafe fn(*mut u8);

/// An allocator assembled from a plain function triple.
///
/// The functions receive sizes only, so they must return blocks aligned to
/// at least [`BUFFER_ALIGN`](crate::BUFFER_ALIGN) bytes.
#[derive(Clone, Copy, Debug)]
pub struct FnAllocator {
    allocate: AllocateFn,
    reallocate: ReallocateFn,
    free: FreeFn,
}

impl FnAllocator {
    /// Binds an allocate/reallocate/free triple.
    ///
    /// # Safety
    ///
    /// The three functions must form one allocator: blocks from `allocate` or
    /// `reallocate` are accepted by the other two, `reallocate` preserves
    /// contents and leaves the old block valid when it returns null, and all
    /// blocks are aligned to at least `BUFFER_ALIGN` bytes.
    pub const unsafe fn new(allocate: AllocateFn, reallocate: ReallocateFn, free: FreeFn) -> Self {
        Self {
            allocate,
            reallocate,
            free,
        }
    }
}

unsafe impl ChunkAllocator for FnAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        // SAFETY: guaranteed by the contract of `FnAllocator::new`.
        NonNull::new(unsafe { (self.allocate)(layout.size()) })
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        _old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: guaranteed by the contract of `FnAllocator::new`.
        NonNull::new(unsafe { (self.reallocate)(ptr.as_ptr(), new_size) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
        // SAFETY: guaranteed by the contract of `FnAllocator::new`.
        unsafe { (self.free)(ptr.as_ptr()) }
    }
}
