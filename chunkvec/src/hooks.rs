//! Lifecycle hooks: per-chunk finalizer, resize handler and opaque context.

use alloc::boxed::Box;
use core::any::Any;
use core::ptr::NonNull;

use crate::allocator::ChunkAllocator;
use crate::chunk_vec::ChunkVec;

/// Finalizer invoked on every chunk that is removed or overwritten.
///
/// It receives the chunk's bytes in place, just before the slot is released
/// or reused. Chunks that are only moved (swap, filter compaction, buffer
/// growth) are never finalized.
pub type Finalizer = Box<dyn FnMut(&mut [u8])>;

/// Opaque caller-owned value stored next to the resize handler.
pub type Context = Box<dyn Any>;

/// Callback notified after every successful capacity change.
pub type ResizeHandler = Box<dyn FnMut(&Rebase, Option<&mut (dyn Any + 'static)>)>;

/// Description of a buffer relocation, passed to the resize handler.
///
/// Code holding raw addresses into the buffer rebases them with
/// [`Rebase::apply`]. The handler runs even when `offset` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rebase {
    /// Address of the buffer after the change.
    pub base: NonNull<u8>,
    /// `new address - old address`, in bytes.
    pub offset: isize,
    /// Capacity before the change, in chunks.
    pub old_capacity: usize,
    /// Capacity after the change, in chunks.
    pub new_capacity: usize,
    /// Number of occupied chunks after the change.
    pub len: usize,
    /// Width of one chunk in bytes.
    pub width: usize,
}

impl Rebase {
    pub(crate) fn new(
        old_base: NonNull<u8>,
        base: NonNull<u8>,
        old_capacity: usize,
        new_capacity: usize,
        len: usize,
        width: usize,
    ) -> Self {
        let offset = (base.as_ptr() as isize).wrapping_sub(old_base.as_ptr() as isize);
        Self {
            base,
            offset,
            old_capacity,
            new_capacity,
            len,
            width,
        }
    }

    /// Whether the buffer changed address.
    #[must_use]
    pub fn moved(&self) -> bool {
        self.offset != 0
    }

    /// Moves a pointer into the old buffer to the same position in the new one.
    ///
    /// The result is only meaningful for pointers that pointed into the
    /// occupied part of the old buffer.
    #[must_use]
    pub fn apply<T>(&self, ptr: *mut T) -> *mut T {
        ptr.cast::<u8>().wrapping_offset(self.offset).cast::<T>()
    }
}

#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) finalizer: Option<Finalizer>,
    pub(crate) resize_handler: Option<ResizeHandler>,
    pub(crate) context: Option<Context>,
}

impl Hooks {
    pub(crate) fn notify_resize(&mut self, rebase: &Rebase) {
        if let Some(handler) = self.resize_handler.as_mut() {
            handler(rebase, self.context.as_deref_mut());
        }
    }
}

impl<A: ChunkAllocator> ChunkVec<A> {
    /// Installs the finalizer, returning the previous one.
    pub fn set_finalizer<F>(&mut self, finalizer: F) -> Option<Finalizer>
    where
        F: FnMut(&mut [u8]) + 'static,
    {
        self.hooks.finalizer.replace(Box::new(finalizer))
    }

    /// Removes the finalizer; later removals no longer finalize chunks.
    pub fn take_finalizer(&mut self) -> Option<Finalizer> {
        self.hooks.finalizer.take()
    }

    #[must_use]
    pub fn has_finalizer(&self) -> bool {
        self.hooks.finalizer.is_some()
    }

    /// Installs the resize handler, returning the previous one.
    ///
    /// The handler gets the relocation details and the stored context.
    pub fn set_resize_handler<F>(&mut self, handler: F) -> Option<ResizeHandler>
    where
        F: FnMut(&Rebase, Option<&mut (dyn Any + 'static)>) + 'static,
    {
        self.hooks.resize_handler.replace(Box::new(handler))
    }

    pub fn take_resize_handler(&mut self) -> Option<ResizeHandler> {
        self.hooks.resize_handler.take()
    }

    #[must_use]
    pub fn has_resize_handler(&self) -> bool {
        self.hooks.resize_handler.is_some()
    }

    /// Stores the context passed to the resize handler, returning the previous one.
    pub fn set_context<T: Any>(&mut self, context: T) -> Option<Context> {
        self.hooks.context.replace(Box::new(context))
    }

    #[must_use]
    pub fn context(&self) -> Option<&(dyn Any + 'static)> {
        self.hooks.context.as_deref()
    }

    pub fn context_mut(&mut self) -> Option<&mut (dyn Any + 'static)> {
        self.hooks.context.as_deref_mut()
    }

    pub fn take_context(&mut self) -> Option<Context> {
        self.hooks.context.take()
    }
}
