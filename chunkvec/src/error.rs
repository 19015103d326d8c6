use thiserror::Error;

/// Error types for `ChunkVec` operations
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ChunkError {
    /// The allocator refused the request, or `capacity * width` bytes do not
    /// form a valid buffer layout
    #[error("Allocation failed: could not provide {capacity} chunks of {width} bytes")]
    AllocationFailed {
        /// Number of chunks requested
        capacity: usize,
        /// Width of each chunk in bytes
        width: usize,
    },
    /// Index is beyond the current vector length
    #[error("Index out of range: index {index} is beyond vector length {length}")]
    IndexOutOfRange {
        /// Index that was accessed
        index: usize,
        /// Current length of the vector
        length: usize,
    },
}

impl ChunkError {
    pub(crate) fn allocation(capacity: usize, width: usize) -> Self {
        tracing::debug!(capacity, width, "chunk buffer allocation failed");
        ChunkError::AllocationFailed { capacity, width }
    }
}
