//! Non-repeating random traversal with a back-stack.
//!
//! Each cycle is a Fisher–Yates permutation of every track index. The track
//! playing when a cycle is generated is moved to the front and skipped by the
//! second-chance rule, so it ends up last in that cycle.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

#[derive(Debug)]
pub struct ShuffleSequencer {
    queue: VecDeque<usize>,
    /// Played indices; the last entry is the index most recently returned.
    history: Vec<usize>,
    rng: StdRng,
}

impl Default for ShuffleSequencer {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl ShuffleSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            queue: VecDeque::new(),
            history: Vec::new(),
            rng,
        }
    }

    pub fn reset(&mut self) {
        self.queue.clear();
        self.history.clear();
    }

    pub fn queue(&self) -> &VecDeque<usize> {
        &self.queue
    }

    pub fn history(&self) -> &[usize] {
        &self.history
    }

    fn regenerate(&mut self, current: usize, len: usize) {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut self.rng);
        if let Some(pos) = order.iter().position(|idx| *idx == current)
            && pos > 0
        {
            order.remove(pos);
            order.insert(0, current);
        }
        tracing::debug!(?order, "Shuffle queue generated");
        self.queue = order.into();
    }

    /// Index to play after `current` in a playlist of `len` tracks.
    pub fn next(&mut self, current: usize, len: usize) -> usize {
        if len == 0 {
            return current;
        }
        if self.history.last() != Some(&current) {
            self.history.push(current);
        }
        if self.queue.is_empty() {
            self.regenerate(current, len);
        }

        let mut candidate = self.queue.pop_front().unwrap_or(current);
        if candidate == current && !self.queue.is_empty() {
            self.queue.push_back(candidate);
            candidate = self.queue.pop_front().unwrap_or(current);
        }
        self.history.push(candidate);
        let cap = len.max(2);
        if self.history.len() > cap {
            let excess = self.history.len() - cap;
            self.history.drain(..excess);
        }
        candidate
    }

    /// Index to go back to from `current`. Without history to rewind into a
    /// uniformly random index is returned.
    pub fn previous(&mut self, current: usize, len: usize) -> usize {
        if self.history.len() > 1 {
            self.history.pop();
            self.queue.push_front(current);
            if let Some(prev) = self.history.last() {
                return *prev;
            }
        }
        if len == 0 {
            return current;
        }
        self.rng.gen_range(0..len)
    }
}
