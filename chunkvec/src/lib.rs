#![no_std]

//! `ChunkVec`: a growable vector of fixed-width byte chunks.
//!
//! Elements ("chunks") are stored inline, back to back, in one contiguous
//! buffer of `capacity * width` bytes. There is no per-element allocation;
//! the caller decides what the bytes of a chunk mean.
//!
//! This crate is `no_std` compatible and only needs the `alloc` crate.
//!
//! # Performance Characteristics
//!
//! ## Time Complexity
//! - `push()`: amortized O(1), growing to `2 * capacity + 1` when full
//! - `get()`, `set()`, `pop_into()`, `swap()`: O(1)
//! - `read()`, `write()`: O(count)
//! - `filter()`, `for_each_until()`, `clear()`: O(n) single pass
//!
//! ## Space Complexity
//! - No per-chunk overhead: chunk `i` lives at byte offset `i * width`
//! - `filter()` compacts in place with O(1) extra space
//! - `swap()` uses a 16-byte stack buffer whatever the width
//!
//! # Stack Interface
//!
//! ```
//! # use chunkvec::ChunkVec;
//! let mut vec = ChunkVec::new(4).unwrap();
//!
//! vec.push(&1u32.to_le_bytes()).unwrap();
//! vec.push(&2u32.to_le_bytes()).unwrap();
//!
//! assert_eq!(vec.top(), Some(&2u32.to_le_bytes()[..]));
//!
//! let mut out = [0u8; 4];
//! assert!(vec.pop_into(&mut out));
//! assert_eq!(u32::from_le_bytes(out), 2);
//! assert_eq!(vec.len(), 1);
//!
//! // Out-of-range access is a silent no-op
//! assert!(!vec.get_into(5, &mut out));
//! assert_eq!(u32::from_le_bytes(out), 2);
//! ```
//!
//! # Bulk IO
//!
//! `read()` reports how many chunks it actually copied; `write()` may extend
//! the vector and zero-fills any gap it jumps over.
//!
//! ```
//! # use chunkvec::ChunkVec;
//! let mut vec = ChunkVec::new(2).unwrap();
//! vec.write(0, &[1, 1, 2, 2, 3, 3]).unwrap();
//!
//! let mut dest = [0u8; 8];
//! assert_eq!(vec.read(1, &mut dest), 2); // short read near the end
//! assert_eq!(&dest[..4], &[2, 2, 3, 3]);
//!
//! vec.write(4, &[5, 5]).unwrap();
//! assert_eq!(vec.as_bytes(), &[1, 1, 2, 2, 3, 3, 0, 0, 5, 5]);
//! ```
//!
//! # Finalizers
//!
//! A finalizer runs on every chunk that is removed or overwritten (`pop`,
//! `set`, `write`, `discard`, `clear`, `filter`, drop). Chunks that are only
//! moved around are never finalized.
//!
//! ```
//! # use chunkvec::ChunkVec;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let dropped = Rc::new(RefCell::new(Vec::new()));
//! let mut vec = ChunkVec::new(1).unwrap();
//! let sink = Rc::clone(&dropped);
//! vec.set_finalizer(move |chunk| sink.borrow_mut().push(chunk[0]));
//!
//! vec.write(0, &[1, 2, 3, 4]).unwrap();
//! vec.filter(|chunk| chunk[0] % 2 == 0);
//! assert_eq!(vec.as_bytes(), &[2, 4]);
//! assert_eq!(*dropped.borrow(), [1, 3]);
//! ```
//!
//! # Rebasing Raw Pointers
//!
//! Growth may move the buffer. The resize handler is told about every
//! capacity change, with the byte offset between old and new addresses:
//!
//! ```
//! # use chunkvec::ChunkVec;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut vec = ChunkVec::with_capacity(8, 1).unwrap();
//! vec.push(&[0; 8]).unwrap();
//!
//! let held = Rc::new(Cell::new(vec.chunk_ptr(0).unwrap().as_ptr()));
//! let holder = Rc::clone(&held);
//! vec.set_resize_handler(move |rebase, _context| holder.set(rebase.apply(holder.get())));
//!
//! vec.push(&[1; 8]).unwrap(); // grows to capacity 3
//! assert_eq!(held.get(), vec.chunk_ptr(0).unwrap().as_ptr());
//! ```

extern crate alloc;

mod allocator;
mod bulk;
mod chunk_vec;
mod error;
mod growth;
mod hooks;
mod iter;
mod raw;

// Re-export public types and traits
pub use allocator::{AllocateFn, ChunkAllocator, FnAllocator, FreeFn, Global, ReallocateFn};
pub use chunk_vec::{ChunkVec, BUFFER_ALIGN, DEFAULT_CAPACITY, SWAP_CHUNK};
pub use error::ChunkError;
pub use hooks::{Context, Finalizer, Rebase, ResizeHandler};
pub use iter::{ChunkIter, ChunkIterMut, ChunkRevIter};
pub use raw::RawChunks;
