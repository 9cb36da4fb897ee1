//! Bounded kill ring.
//!
//! ## Learning: VecDeque as a Bounded Stack
//!
//! Kills are pushed at the front and yanks pop from the front, while the
//! oldest entry falls off the back once the ring is full. `VecDeque` makes
//! both ends O(1).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::fragment::Fragment;

/// One kill-ring entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clip {
    /// A whole box, reinserted as a box.
    Box(Fragment),
    /// A run of siblings held in a synthetic box, spliced back inline.
    Span(Fragment),
}

impl Clip {
    pub fn fragment(&self) -> &Fragment {
        match self {
            Clip::Box(f) | Clip::Span(f) => f,
        }
    }

    /// The fragments to insert when yanking this clip.
    pub fn into_fragments(self) -> Vec<Fragment> {
        match self {
            Clip::Box(f) => vec![f],
            Clip::Span(f) => f.into_children(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KillRing {
    entries: VecDeque<Clip>,
    capacity: usize,
}

impl KillRing {
    /// Creates a ring holding at most `capacity` clips (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, clip: Clip) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(clip);
    }

    /// Removes and returns the most recent clip.
    pub fn pop(&mut self) -> Option<Clip> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&Clip> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Clip> {
        self.entries.iter()
    }
}

impl Default for KillRing {
    fn default() -> Self {
        Self::new(32)
    }
}
