use super::{ReplayBuffer, ReplayBufferConfig, Transition};
use crate::{ExperienceBufferBase, KestrelError, ReplayBufferBase};
use anyhow::Result;
use log::warn;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A [`ReplayBuffer`] shared between threads.
///
/// Clones refer to the same buffer. Every operation holds the lock for its
/// whole duration, so no caller observes a partially applied push.
pub struct SharedReplayBuffer<S> {
    inner: Arc<Mutex<ReplayBuffer<S>>>,
}

impl<S> Clone for SharedReplayBuffer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SharedReplayBuffer<S> {
    /// Creates an empty shared buffer.
    pub fn build(config: &ReplayBufferConfig) -> Result<Self, KestrelError> {
        Ok(Self::from(ReplayBuffer::build(config)?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReplayBuffer<S>>, KestrelError> {
        self.inner.lock().map_err(|_| KestrelError::LockPoisoned)
    }

    /// Appends a transition, discarding the oldest one if the buffer is full.
    pub fn push(&self, tr: Transition<S>) -> Result<(), KestrelError> {
        self.lock()?.push(tr);
        Ok(())
    }

    /// Returns the number of stored transitions.
    pub fn len(&self) -> Result<usize, KestrelError> {
        Ok(self.lock()?.len())
    }

    /// Returns the maximum number of retained transitions.
    pub fn capacity(&self) -> Result<usize, KestrelError> {
        Ok(self.lock()?.capacity())
    }
}

impl<S: Clone> SharedReplayBuffer<S> {
    /// Draws `size` distinct transitions uniformly at random.
    pub fn sample(&self, size: usize) -> Result<Vec<Transition<S>>, KestrelError> {
        self.lock()?.sample(size)
    }
}

impl<S> From<ReplayBuffer<S>> for SharedReplayBuffer<S> {
    fn from(buffer: ReplayBuffer<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }
}

impl<S> ExperienceBufferBase for SharedReplayBuffer<S> {
    type Item = Transition<S>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        Ok(SharedReplayBuffer::push(self, tr)?)
    }

    /// Counts the stored transitions even if a thread panicked while holding the lock.
    ///
    /// A poisoned lock is logged here; the inherent methods return
    /// [`KestrelError::LockPoisoned`] for it.
    fn len(&self) -> usize {
        let buffer = self.inner.lock().unwrap_or_else(|e| {
            warn!("Replay buffer lock is poisoned");
            PoisonError::into_inner(e)
        });
        buffer.len()
    }
}

impl<S: Clone> ReplayBufferBase for SharedReplayBuffer<S> {
    type Config = ReplayBufferConfig;
    type Batch = Vec<Transition<S>>;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(SharedReplayBuffer::build(config)?)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        Ok(self.sample(size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_producers() -> Result<()> {
        let config = ReplayBufferConfig::default().capacity(64);
        let buffer = SharedReplayBuffer::<usize>::build(&config)?;

        let handles: Vec<_> = (0..4)
            .map(|id| {
                let buffer = buffer.clone();
                thread::spawn(move || -> Result<(), KestrelError> {
                    for s in 0..100 {
                        buffer.push(Transition::new(id * 1000 + s, id, None, 0.0))?;
                    }
                    Ok(())
                })
            })
            .collect();
        for h in handles {
            h.join().expect("producer panicked")?;
        }

        assert_eq!(buffer.len()?, 64);
        assert_eq!(buffer.sample(64)?.len(), 64);
        assert!(buffer.sample(65).is_err());
        Ok(())
    }

    #[test]
    fn test_poisoned_lock() -> Result<()> {
        let config = ReplayBufferConfig::default().capacity(8);
        let buffer = SharedReplayBuffer::<u8>::build(&config)?;
        for s in 0..3 {
            buffer.push(Transition::new(s, 0, None, 0.0))?;
        }

        let inner = Arc::clone(&buffer.inner);
        let res = thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(res.is_err());

        assert_eq!(buffer.len(), Err(KestrelError::LockPoisoned));
        assert_eq!(buffer.sample(1).err(), Some(KestrelError::LockPoisoned));
        assert_eq!(ExperienceBufferBase::len(&buffer), 3);
        assert!(!ExperienceBufferBase::is_empty(&buffer));
        Ok(())
    }
}
