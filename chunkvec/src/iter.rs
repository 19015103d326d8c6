use core::mem;
use core::ops::ControlFlow;
use core::ptr;
use core::slice::{self, ChunksExact, ChunksExactMut};

use crate::allocator::ChunkAllocator;
use crate::chunk_vec::ChunkVec;

/// Iterator over chunks in a `ChunkVec`
///
/// This iterator implements `Clone`.
#[derive(Clone)]
pub struct ChunkIter<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl DoubleEndedIterator for ChunkIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.chunks.next_back()
    }
}

impl ExactSizeIterator for ChunkIter<'_> {}

impl<'a, A: ChunkAllocator> IntoIterator for &'a ChunkVec<A> {
    type Item = &'a [u8];
    type IntoIter = ChunkIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        ChunkIter {
            chunks: self.as_bytes().chunks_exact(self.width),
        }
    }
}

/// Reverse iterator over chunks in a `ChunkVec`
///
/// This iterator implements `Clone`.
#[derive(Clone)]
pub struct ChunkRevIter<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl<'a> Iterator for ChunkRevIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next_back()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for ChunkRevIter<'_> {}

/// Mutable iterator over chunks in a `ChunkVec`
pub struct ChunkIterMut<'a> {
    chunks: ChunksExactMut<'a, u8>,
}

impl<'a> Iterator for ChunkIterMut<'a> {
    type Item = &'a mut [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl DoubleEndedIterator for ChunkIterMut<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.chunks.next_back()
    }
}

impl ExactSizeIterator for ChunkIterMut<'_> {}

/// Restores `len` when a filter pass ends, including by unwinding.
///
/// Chunks not yet visited are shifted down behind the survivors so that
/// every initialized chunk stays reachable.
struct Compaction<'a> {
    len: &'a mut usize,
    base: *mut u8,
    width: usize,
    original: usize,
    processed: usize,
    kept: usize,
}

impl Drop for Compaction<'_> {
    fn drop(&mut self) {
        let tail = self.original - self.processed;
        if tail > 0 && self.kept != self.processed {
            // SAFETY: chunks [processed, original) are initialized and
            // kept < processed, so the destination stays inside the buffer.
            unsafe {
                ptr::copy(
                    self.base.add(self.processed * self.width),
                    self.base.add(self.kept * self.width),
                    tail * self.width,
                );
            }
        }
        *self.len = self.kept + tail;
    }
}

impl<A: ChunkAllocator> ChunkVec<A> {
    /// Returns an iterator over the chunks, first to last.
    #[must_use]
    pub fn iter(&self) -> ChunkIter<'_> {
        self.into_iter()
    }

    /// Returns a reverse iterator over the chunks.
    #[must_use]
    pub fn iter_rev(&self) -> ChunkRevIter<'_> {
        ChunkRevIter {
            chunks: self.as_bytes().chunks_exact(self.width),
        }
    }

    pub fn iter_mut(&mut self) -> ChunkIterMut<'_> {
        let width = self.width;
        ChunkIterMut {
            chunks: self.as_bytes_mut().chunks_exact_mut(width),
        }
    }

    /// Visits chunks first-to-last until `f` breaks.
    ///
    /// Returns the break value, or `None` if every chunk was visited.
    pub fn for_each_until<B, F>(&mut self, mut f: F) -> Option<B>
    where
        F: FnMut(&mut [u8]) -> ControlFlow<B>,
    {
        for chunk in self.iter_mut() {
            if let ControlFlow::Break(value) = f(chunk) {
                return Some(value);
            }
        }
        None
    }

    /// Keeps only the chunks for which `keep` returns `true`.
    ///
    /// Single left-to-right pass; survivors keep their relative order and
    /// rejected chunks are finalized in their original order. Capacity is
    /// unchanged.
    ///
    /// If `keep` or the finalizer panics, the chunks not yet visited stay in
    /// the vector after the survivors.
    pub fn filter<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[u8]) -> bool,
    {
        let width = self.width;
        let base = self.ptr.as_ptr();
        let original = mem::replace(&mut self.len, 0);
        let mut pass = Compaction {
            len: &mut self.len,
            base,
            width,
            original,
            processed: 0,
            kept: 0,
        };

        while pass.processed < original {
            let index = pass.processed;
            // SAFETY: index < original, and the chunk is initialized.
            let chunk = unsafe { slice::from_raw_parts_mut(base.add(index * width), width) };
            if keep(&*chunk) {
                if pass.kept != index {
                    // SAFETY: kept < index, so the two slots are disjoint.
                    unsafe {
                        ptr::copy_nonoverlapping(
                            base.add(index * width),
                            base.add(pass.kept * width),
                            width,
                        );
                    }
                }
                pass.kept += 1;
                pass.processed += 1;
            } else {
                // Counted before finalizing so a panicking finalizer never
                // sees the chunk twice.
                pass.processed += 1;
                if let Some(finalizer) = self.hooks.finalizer.as_mut() {
                    finalizer(chunk);
                }
            }
        }
    }

    /// Removes the last `min(n, len)` chunks, finalizing them last-to-first.
    pub fn discard(&mut self, n: usize) {
        let keep = self.len - n.min(self.len);
        while self.len > keep {
            self.len -= 1;
            self.finalize_at(self.len);
        }
    }

    /// Removes all chunks; same as `discard(len)`.
    pub fn clear(&mut self) {
        self.discard(self.len);
    }
}
