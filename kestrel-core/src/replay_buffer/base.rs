use super::{ReplayBufferConfig, Transition};
use crate::{ExperienceBufferBase, KestrelError, ReplayBufferBase};
use anyhow::Result;
use log::trace;
use rand::{rngs::StdRng, seq::index, Rng, SeedableRng};

/// A bounded replay buffer with FIFO eviction.
///
/// Transitions live in an arena of at most `capacity` slots. `i` is the write
/// cursor: the slot overwritten by the next push once the arena is full, which
/// is also the slot of the oldest retained transition.
pub struct ReplayBuffer<S> {
    /// Maximum number of transitions that can be stored.
    capacity: usize,

    /// Current insertion index.
    i: usize,

    /// Storage of transitions, grows up to `capacity` and is then reused.
    slots: Vec<Transition<S>>,

    /// Random number generator for sampling.
    rng: StdRng,
}

impl<S> ReplayBuffer<S> {
    /// Creates an empty buffer.
    ///
    /// Fails with [`KestrelError::InvalidCapacity`] if `config.capacity` is zero.
    pub fn build(config: &ReplayBufferConfig) -> Result<Self, KestrelError> {
        if config.capacity == 0 {
            return Err(KestrelError::InvalidCapacity(config.capacity));
        }

        Ok(Self {
            capacity: config.capacity,
            i: 0,
            slots: Vec::with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Appends a transition, discarding the oldest one if the buffer is full.
    pub fn push(&mut self, tr: Transition<S>) {
        if self.slots.len() < self.capacity {
            self.slots.push(tr);
        } else {
            self.slots[self.i] = tr;
        }
        self.i = (self.i + 1) % self.capacity;
    }

    /// Returns the number of stored transitions.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no transition is stored.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the maximum number of retained transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if the next push evicts a transition.
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Removes all transitions. The capacity and the random state are kept.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.i = 0;
    }

    /// Iterates over the stored transitions from the oldest to the newest.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<S>> + '_ {
        // Before the first wrap the oldest slot is 0, afterwards it is the cursor.
        let start = if self.is_full() { self.i } else { 0 };
        self.slots[start..].iter().chain(self.slots[..start].iter())
    }

    /// Draws `size` distinct transitions uniformly at random with the given generator.
    ///
    /// The order of the returned transitions is unspecified.
    pub fn sample_with<R: Rng + ?Sized>(
        &self,
        size: usize,
        rng: &mut R,
    ) -> Result<Vec<&Transition<S>>, KestrelError> {
        let ixs = sample_indices(rng, self.len(), size)?;
        Ok(ixs.into_iter().map(|ix| &self.slots[ix]).collect())
    }
}

impl<S: Clone> ReplayBuffer<S> {
    /// Draws `size` distinct transitions uniformly at random.
    ///
    /// Fails with [`KestrelError::InsufficientSamples`] if `size` exceeds [`len`](Self::len).
    pub fn sample(&mut self, size: usize) -> Result<Vec<Transition<S>>, KestrelError> {
        let ixs = sample_indices(&mut self.rng, self.slots.len(), size)?;
        Ok(ixs.into_iter().map(|ix| self.slots[ix].clone()).collect())
    }
}

fn sample_indices<R: Rng + ?Sized>(
    rng: &mut R,
    len: usize,
    size: usize,
) -> Result<Vec<usize>, KestrelError> {
    if size > len {
        return Err(KestrelError::InsufficientSamples {
            requested: size,
            available: len,
        });
    }
    trace!("Sample {} of {} transitions", size, len);
    Ok(index::sample(rng, len, size).into_vec())
}

impl<S> ExperienceBufferBase for ReplayBuffer<S> {
    type Item = Transition<S>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        ReplayBuffer::push(self, tr);
        Ok(())
    }

    fn len(&self) -> usize {
        ReplayBuffer::len(self)
    }
}

impl<S: Clone> ReplayBufferBase for ReplayBuffer<S> {
    type Config = ReplayBufferConfig;
    type Batch = Vec<Transition<S>>;

    fn build(config: &Self::Config) -> Result<Self> {
        Ok(ReplayBuffer::build(config)?)
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        Ok(self.sample(size)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn buffer(capacity: usize) -> ReplayBuffer<i32> {
        let config = ReplayBufferConfig::default().capacity(capacity).seed(1);
        ReplayBuffer::build(&config).unwrap()
    }

    fn tr(s: i32) -> Transition<i32> {
        Transition::new(s, s as usize % 4, Some(s + 1), s as f32)
    }

    fn states(buffer: &ReplayBuffer<i32>) -> Vec<i32> {
        buffer.iter().map(|tr| *tr.state()).collect()
    }

    #[test]
    fn test_zero_capacity() {
        let config = ReplayBufferConfig::default().capacity(0);
        assert_eq!(
            ReplayBuffer::<i32>::build(&config).err(),
            Some(KestrelError::InvalidCapacity(0))
        );
    }

    #[test]
    fn test_push_below_capacity() {
        let mut buffer = buffer(5);
        assert!(buffer.is_empty());
        (0..3).for_each(|s| buffer.push(tr(s)));
        assert_eq!(buffer.len(), 3);
        assert!(!buffer.is_full());
        assert_eq!(states(&buffer), vec![0, 1, 2]);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = buffer(4);
        for s in 0..11 {
            buffer.push(tr(s));
            assert!(buffer.len() <= 4);
        }
        assert_eq!(buffer.len(), 4);
        assert_eq!(states(&buffer), vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_eviction_at_exact_wrap() {
        let mut buffer = buffer(3);
        (0..6).for_each(|s| buffer.push(tr(s)));
        assert_eq!(states(&buffer), vec![3, 4, 5]);
        buffer.push(tr(6));
        assert_eq!(states(&buffer), vec![4, 5, 6]);
    }

    #[test]
    fn test_sample_distinct_members() {
        let mut buffer = buffer(10);
        (0..25).for_each(|s| buffer.push(tr(s)));
        let contents: HashSet<i32> = states(&buffer).into_iter().collect();

        for _ in 0..50 {
            let batch = buffer.sample(7).unwrap();
            let sampled: HashSet<i32> = batch.iter().map(|tr| *tr.state()).collect();
            assert_eq!(batch.len(), 7);
            assert_eq!(sampled.len(), 7);
            assert!(sampled.is_subset(&contents));
        }
    }

    #[test]
    fn test_sample_whole_population() {
        let mut buffer = buffer(5);
        (0..5).for_each(|s| buffer.push(tr(s)));
        let mut sampled: Vec<i32> = buffer
            .sample(5)
            .unwrap()
            .iter()
            .map(|tr| *tr.state())
            .collect();
        sampled.sort();
        assert_eq!(sampled, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_zero() {
        let mut buffer = buffer(2);
        assert!(buffer.sample(0).unwrap().is_empty());
    }

    #[test]
    fn test_insufficient_samples() {
        let mut buffer = buffer(8);
        (0..3).for_each(|s| buffer.push(tr(s)));
        assert_eq!(
            buffer.sample(4).err(),
            Some(KestrelError::InsufficientSamples {
                requested: 4,
                available: 3
            })
        );
        // A failed sample does not change the contents.
        assert_eq!(states(&buffer), vec![0, 1, 2]);
    }

    #[test]
    fn test_sample_covers_population() {
        // Separate calls draw from the full population each time.
        let mut buffer = buffer(6);
        (0..6).for_each(|s| buffer.push(tr(s)));
        let mut seen = HashSet::new();
        for _ in 0..200 {
            for tr in buffer.sample(1).unwrap() {
                seen.insert(*tr.state());
            }
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_sample_with_external_rng() {
        let mut buffer = buffer(4);
        (0..4).for_each(|s| buffer.push(tr(s)));
        let mut rng1 = StdRng::seed_from_u64(3);
        let mut rng2 = StdRng::seed_from_u64(3);
        let b1: Vec<i32> = buffer
            .sample_with(3, &mut rng1)
            .unwrap()
            .iter()
            .map(|tr| *tr.state())
            .collect();
        let b2: Vec<i32> = buffer
            .sample_with(3, &mut rng2)
            .unwrap()
            .iter()
            .map(|tr| *tr.state())
            .collect();
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_clear() {
        let mut buffer = buffer(2);
        (0..5).for_each(|s| buffer.push(tr(s)));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 2);
        buffer.push(tr(9));
        assert_eq!(states(&buffer), vec![9]);
    }
}
