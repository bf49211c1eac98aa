//! Replay buffer of environment transitions.
//!
//! [`ReplayBuffer`] keeps the most recent `capacity` transitions in a
//! fixed-size arena. Once full, each push overwrites the oldest slot, so the
//! buffer is a sliding window over the transition history. Minibatches are
//! drawn uniformly at random without replacement.
//!
//! ```rust
//! use kestrel_core::{ReplayBuffer, ReplayBufferConfig, Transition};
//!
//! let config = ReplayBufferConfig::default().capacity(3).seed(0);
//! let mut buffer = ReplayBuffer::<u8>::build(&config).unwrap();
//!
//! for (s, a) in [(0u8, 0usize), (1, 1), (2, 0), (3, 1)] {
//!     buffer.push(Transition::new(s, a, Some(s + 1), 1.0));
//! }
//! assert_eq!(buffer.len(), 3);
//!
//! let batch = buffer.sample(2).unwrap();
//! assert_eq!(batch.len(), 2);
//! assert!(buffer.sample(4).is_err());
//! ```
mod base;
mod config;
mod shared;
mod transition;
pub use base::ReplayBuffer;
pub use config::ReplayBufferConfig;
pub use shared::SharedReplayBuffer;
pub use transition::Transition;
