use std::collections::TryReserveError;

use thiserror::Error;

/// Result type for the splitting operations.
pub type Result<T> = std::result::Result<T, SplitError>;

/// Errors raised by the splitters before any label is produced.
#[derive(Error, Debug)]
pub enum SplitError {
    /// A caller supplied buffer does not cover the vertex-id universe.
    #[error("Size mismatch for {buffer}: expected at least {expected}, got {actual}")]
    SizeMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Growing a scratch buffer failed.
    #[error("Scratch allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    /// The worker pool could not be created.
    #[error("Thread pool creation failed: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A scoped worker panicked while traversing.
    #[error("Worker panicked during split")]
    WorkerPanicked,
}

/// Fail fast when `buffer` is shorter than the graph span.
pub(crate) fn ensure_len(buffer: &'static str, actual: usize, expected: usize) -> Result<()> {
    if actual < expected {
        return Err(SplitError::SizeMismatch { buffer, expected, actual });
    }
    Ok(())
}
