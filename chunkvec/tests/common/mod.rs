#![allow(dead_code)]

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::Rc;

use chunkvec::{ChunkAllocator, ChunkVec, Global};

/// Allocator that counts calls, can be told to fail, and can force every
/// reallocation to move the buffer.
#[derive(Default)]
pub struct TestAllocator {
    pub allocations: Cell<usize>,
    pub reallocations: Cell<usize>,
    pub frees: Cell<usize>,
    pub fail: Cell<bool>,
    pub always_move: Cell<bool>,
}

impl TestAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moving() -> Self {
        let alloc = Self::default();
        alloc.always_move.set(true);
        alloc
    }

    pub fn live_blocks(&self) -> usize {
        self.allocations.get() - self.frees.get()
    }
}

unsafe impl ChunkAllocator for TestAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if self.fail.get() {
            return None;
        }
        self.allocations.set(self.allocations.get() + 1);
        Global.allocate(layout)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if self.fail.get() {
            return None;
        }
        self.reallocations.set(self.reallocations.get() + 1);
        if !self.always_move.get() {
            return unsafe { Global.reallocate(ptr, old, new_size) };
        }
        let new_layout = Layout::from_size_align(new_size, old.align()).ok()?;
        let fresh = Global.allocate(new_layout)?;
        unsafe {
            std::ptr::copy_nonoverlapping(
                ptr.as_ptr(),
                fresh.as_ptr(),
                old.size().min(new_size),
            );
            Global.deallocate(ptr, old);
        }
        Some(fresh)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.frees.set(self.frees.get() + 1);
        unsafe { Global.deallocate(ptr, layout) }
    }
}

/// Shared log of the first byte of every finalized chunk.
pub type FinalizeLog = Rc<RefCell<Vec<u8>>>;

pub fn record_finalized<A: ChunkAllocator>(vec: &mut ChunkVec<A>) -> FinalizeLog {
    let log = FinalizeLog::default();
    let sink = Rc::clone(&log);
    vec.set_finalizer(move |chunk| sink.borrow_mut().push(chunk[0]));
    log
}

/// A chunk of `width` bytes, all equal to `value`.
pub fn chunk(width: usize, value: u8) -> Vec<u8> {
    vec![value; width]
}
