//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum KestrelError {
    /// More transitions were requested than the buffer currently holds.
    #[error("Insufficient samples: requested {requested}, but only {available} stored")]
    InsufficientSamples {
        /// Requested batch size.
        requested: usize,
        /// Number of transitions in the buffer.
        available: usize,
    },

    /// Replay buffer capacity must be positive.
    #[error("Invalid replay buffer capacity: {0}")]
    InvalidCapacity(usize),

    /// The lock of a shared replay buffer was poisoned by a panicking holder.
    #[error("Replay buffer lock poisoned")]
    LockPoisoned,

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
