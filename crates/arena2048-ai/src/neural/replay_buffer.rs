use std::collections::VecDeque;

use rand::Rng;

/// Bounded experience memory; the oldest entry is evicted when full.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> ReplayBuffer<T> {
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// `count` entries drawn uniformly with replacement; empty if the buffer
    /// is.
    pub fn sample<'a, R>(&'a self, count: usize, rng: &mut R) -> Vec<&'a T>
    where
        R: Rng + ?Sized,
    {
        if self.entries.is_empty() {
            return Vec::new();
        }
        (0..count)
            .filter_map(|_| self.entries.get(rng.random_range(0..self.entries.len())))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
