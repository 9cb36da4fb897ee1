//! Single-range selection inside one box.
//!
//! ## Learning: Range Types
//!
//! Offsets are flat positions within a box (see [`Layout`](crate::Layout)),
//! and the range is half-open like `Range<usize>`: an empty selection has
//! `start == end` and the length is a plain subtraction.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A normalized `[start, end)` range of flat offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Creates a selection; the endpoints may be given in either order.
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Selection {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_normalizes() {
        let sel = Selection::new(7, 3);
        assert_eq!(sel.start, 3);
        assert_eq!(sel.end, 7);
        assert_eq!(sel.len(), 4);
        assert!(sel.contains(3));
        assert!(!sel.contains(7));
        assert!(Selection::new(2, 2).is_empty());
    }
}
