mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chunkvec::{ChunkError, ChunkVec, FnAllocator, Rebase, BUFFER_ALIGN};
use common::{chunk, record_finalized, TestAllocator};

fn record_rebases<A: chunkvec::ChunkAllocator>(vec: &mut ChunkVec<A>) -> Rc<RefCell<Vec<Rebase>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    vec.set_resize_handler(move |rebase, _context| sink.borrow_mut().push(*rebase));
    events
}

#[test]
fn test_handler_called_once_per_capacity_change() {
    let alloc = TestAllocator::moving();
    let mut vec = ChunkVec::with_capacity_in(4, 2, &alloc).unwrap();
    let events = record_rebases(&mut vec);

    let before = vec.as_ptr() as isize;
    vec.resize(10).unwrap();
    let after = vec.as_ptr() as isize;

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].offset, after - before);
    assert!(events[0].moved());
    assert_eq!(events[0].old_capacity, 2);
    assert_eq!(events[0].new_capacity, 10);
    assert_eq!(events[0].width, 4);
}

#[test]
fn test_same_capacity_resize_is_silent() {
    let alloc = TestAllocator::new();
    let mut vec = ChunkVec::with_capacity_in(4, 6, &alloc).unwrap();
    let events = record_rebases(&mut vec);

    vec.resize(6).unwrap();
    assert!(events.borrow().is_empty());
    assert_eq!(alloc.reallocations.get(), 0);

    // 0 is coerced to 1, which differs from 6
    vec.resize(0).unwrap();
    assert_eq!(vec.capacity(), 1);
    assert_eq!(events.borrow().len(), 1);
}

#[test]
fn test_handler_called_even_without_move() {
    let mut vec = ChunkVec::with_capacity(1, 64).unwrap();
    let events = record_rebases(&mut vec);

    let before = vec.as_ptr() as isize;
    vec.resize(32).unwrap();
    let after = vec.as_ptr() as isize;

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].offset, after - before);
}

#[test]
fn test_push_growth_notifies_and_rebases() {
    let alloc = TestAllocator::moving();
    let mut vec = ChunkVec::with_capacity_in(8, 1, &alloc).unwrap();
    vec.push(&chunk(8, 1)).unwrap();

    let held = Rc::new(RefCell::new(vec.chunk_ptr(0).unwrap().as_ptr()));
    let holder = Rc::clone(&held);
    vec.set_resize_handler(move |rebase, _| {
        let mut ptr = holder.borrow_mut();
        *ptr = rebase.apply(*ptr);
    });

    for value in 2..=20 {
        vec.push(&chunk(8, value)).unwrap();
    }
    assert_eq!(*held.borrow(), vec.chunk_ptr(0).unwrap().as_ptr());
    assert_eq!(unsafe { *held.borrow().add(7) }, 1);
}

#[test]
fn test_failed_resize_leaves_vector_unchanged() {
    let alloc = TestAllocator::new();
    let mut vec = ChunkVec::with_capacity_in(2, 2, &alloc).unwrap();
    vec.write(0, &[1, 2, 3, 4]).unwrap();
    let events = record_rebases(&mut vec);
    let base = vec.as_ptr();

    alloc.fail.set(true);
    assert_eq!(
        vec.resize(50),
        Err(ChunkError::AllocationFailed {
            capacity: 50,
            width: 2
        })
    );
    assert_eq!(vec.capacity(), 2);
    assert_eq!(vec.as_ptr(), base);
    assert_eq!(vec.as_bytes(), &[1, 2, 3, 4]);
    assert!(events.borrow().is_empty());
}

#[test]
fn test_failed_shrink_below_len_finalizes_nothing() {
    let alloc = TestAllocator::new();
    let mut vec = ChunkVec::with_capacity_in(1, 8, &alloc).unwrap();
    vec.write(0, &[1, 2, 3, 4, 5]).unwrap();
    let log = record_finalized(&mut vec);
    let events = record_rebases(&mut vec);
    let base = vec.as_ptr();

    alloc.fail.set(true);
    assert_eq!(
        vec.resize(2),
        Err(ChunkError::AllocationFailed {
            capacity: 2,
            width: 1
        })
    );
    assert_eq!(vec.len(), 5);
    assert_eq!(vec.capacity(), 8);
    assert_eq!(vec.as_ptr(), base);
    assert_eq!(vec.as_bytes(), &[1, 2, 3, 4, 5]);
    assert!(log.borrow().is_empty());
    assert!(events.borrow().is_empty());
}

#[test]
fn test_shrink_below_len_finalizes_tail_and_rebases() {
    let alloc = TestAllocator::new();
    let mut vec = ChunkVec::with_capacity_in(1, 8, &alloc).unwrap();
    vec.write(0, &[1, 2, 3, 4, 5]).unwrap();
    let log = record_finalized(&mut vec);
    let events = record_rebases(&mut vec);
    let before = vec.as_ptr() as isize;

    vec.resize(2).unwrap();
    let after = vec.as_ptr() as isize;

    assert_eq!(vec.len(), 2);
    assert_eq!(vec.capacity(), 2);
    assert_eq!(vec.as_bytes(), &[1, 2]);
    assert_eq!(*log.borrow(), [5, 4, 3]);
    assert_eq!(alloc.live_blocks(), 1);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].offset, after - before);
    assert_eq!(events[0].old_capacity, 8);
    assert_eq!(events[0].new_capacity, 2);
    assert_eq!(events[0].len, 2);
}

#[test]
fn test_failed_push_pushes_nothing() {
    let alloc = TestAllocator::new();
    let mut vec = ChunkVec::with_capacity_in(1, 1, &alloc).unwrap();
    vec.push(&[1]).unwrap();

    alloc.fail.set(true);
    assert!(vec.push(&[2]).is_err());
    assert_eq!(vec.as_bytes(), &[1]);

    alloc.fail.set(false);
    vec.push(&[2]).unwrap();
    assert_eq!(vec.as_bytes(), &[1, 2]);
}

#[test]
fn test_failed_write_finalizes_nothing() {
    let alloc = TestAllocator::new();
    let mut vec = ChunkVec::with_capacity_in(1, 3, &alloc).unwrap();
    vec.write(0, &[1, 2, 3]).unwrap();
    let log = record_finalized(&mut vec);

    alloc.fail.set(true);
    assert!(vec.write(1, &[7, 8, 9, 10]).is_err());
    assert!(log.borrow().is_empty());
    assert_eq!(vec.as_bytes(), &[1, 2, 3]);
}

#[test]
fn test_write_requests_single_resize() {
    let alloc = TestAllocator::new();
    let mut vec = ChunkVec::with_capacity_in(1, 2, &alloc).unwrap();
    let events = record_rebases(&mut vec);

    vec.write(0, &[0; 100]).unwrap();
    assert_eq!(alloc.reallocations.get(), 1);
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(vec.capacity(), 100);
}

#[test]
fn test_failed_construction() {
    let alloc = TestAllocator::new();
    alloc.fail.set(true);
    assert!(ChunkVec::new_in(4, &alloc).is_err());
    assert_eq!(alloc.live_blocks(), 0);
}

#[test]
fn test_drop_releases_buffer() {
    let alloc = TestAllocator::new();
    {
        let mut vec = ChunkVec::new_in(4, &alloc).unwrap();
        for value in 0..50 {
            vec.push(&chunk(4, value)).unwrap();
        }
    }
    assert_eq!(alloc.allocations.get(), 1);
    assert_eq!(alloc.live_blocks(), 0);
}

static TRIPLE_ALLOCS: AtomicUsize = AtomicUsize::new(0);
static TRIPLE_FREES: AtomicUsize = AtomicUsize::new(0);

const HEADER: usize = 16;

fn header_layout(size: usize) -> std::alloc::Layout {
    std::alloc::Layout::from_size_align(size + HEADER, BUFFER_ALIGN).unwrap()
}

unsafe fn triple_allocate(size: usize) -> *mut u8 {
    TRIPLE_ALLOCS.fetch_add(1, Ordering::SeqCst);
    unsafe {
        let base = std::alloc::alloc(header_layout(size));
        if base.is_null() {
            return base;
        }
        base.cast::<usize>().write(size);
        base.add(HEADER)
    }
}

unsafe fn triple_reallocate(ptr: *mut u8, size: usize) -> *mut u8 {
    unsafe {
        let base = ptr.sub(HEADER);
        let old = base.cast::<usize>().read();
        let grown = std::alloc::realloc(base, header_layout(old), size + HEADER);
        if grown.is_null() {
            return grown;
        }
        grown.cast::<usize>().write(size);
        grown.add(HEADER)
    }
}

unsafe fn triple_free(ptr: *mut u8) {
    TRIPLE_FREES.fetch_add(1, Ordering::SeqCst);
    unsafe {
        let base = ptr.sub(HEADER);
        let size = base.cast::<usize>().read();
        std::alloc::dealloc(base, header_layout(size));
    }
}

#[test]
fn test_function_triple_allocator() {
    let alloc = unsafe { FnAllocator::new(triple_allocate, triple_reallocate, triple_free) };
    {
        let mut vec = ChunkVec::with_capacity_in(3, 1, alloc).unwrap();
        for value in 0..10 {
            vec.push(&chunk(3, value)).unwrap();
        }
        assert_eq!(vec.get(9).unwrap(), &[9, 9, 9]);
        assert_eq!(vec.as_ptr() as usize % BUFFER_ALIGN, 0);
    }
    assert_eq!(TRIPLE_ALLOCS.load(Ordering::SeqCst), 1);
    assert_eq!(TRIPLE_FREES.load(Ordering::SeqCst), 1);
}
