#![warn(missing_docs)]
//! Core components of kestrel.
//!
//! * [`Transition`] - one environment step.
//! * [`ReplayBuffer`] - bounded FIFO history of transitions with uniform sampling.
//! * [`SharedReplayBuffer`] - a [`ReplayBuffer`] behind a mutex for concurrent use.
//! * [`record`] - key-value records and recorders for training metrics.
mod base;
mod error;
pub mod record;
pub mod replay_buffer;

pub use base::{ExperienceBufferBase, ReplayBufferBase};
pub use error::KestrelError;
pub use replay_buffer::{ReplayBuffer, ReplayBufferConfig, SharedReplayBuffer, Transition};
