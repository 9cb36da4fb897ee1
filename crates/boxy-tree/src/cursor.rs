//! Cursor and location types.
//!
//! ## Learning: Positions as Gaps
//!
//! The cursor is not a node in the tree. It is a *gap*: "inside box `parent`,
//! just before child `index`". `index == child_count` means "after the last
//! child". Because the cursor never occupies a slot, serialization and row
//! queries don't need to skip over it, and there is no way to end up with two
//! cursors.

use serde::{Deserialize, Serialize};

use crate::tree::NodeId;

/// A transient address inside the tree.
///
/// For a text run, `offset` counts characters. For a box, `offset` is a
/// child index (a gap between children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub node: NodeId,
    pub offset: usize,
}

impl Location {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Offset zero of `node`.
    pub fn start_of(node: NodeId) -> Self {
        Self { node, offset: 0 }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.node, self.offset)
    }
}

/// The cursor's position in the flat form handed to evaluators: the
/// enclosing box and the count of characters (boxes counting one) before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorPosition {
    pub container: NodeId,
    pub offset: usize,
}

/// Where a node inserted exactly at the cursor gap ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    /// The new node lands before the cursor (typing).
    Before,
    /// The new node lands after the cursor.
    After,
}

/// The single insertion point of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Box holding the gap.
    pub parent: NodeId,
    /// Gap index among `parent`'s children.
    pub index: usize,
    /// Column remembered across consecutive vertical moves.
    pub goal_column: Option<usize>,
    /// Selection anchor as a flat offset inside `parent`.
    pub mark: Option<usize>,
}

impl Cursor {
    pub fn new(parent: NodeId, index: usize) -> Self {
        Self {
            parent,
            index,
            goal_column: None,
            mark: None,
        }
    }

    /// The cursor as a box-gap [`Location`].
    pub fn location(&self) -> Location {
        Location::new(self.parent, self.index)
    }

    /// Moves the gap. Leaving the box drops the mark, since it is only
    /// meaningful inside one box.
    pub fn place(&mut self, parent: NodeId, index: usize) {
        if parent != self.parent {
            self.mark = None;
        }
        self.parent = parent;
        self.index = index;
    }

    pub fn reset_goal(&mut self) {
        self.goal_column = None;
    }

    pub fn set_mark(&mut self, offset: usize) {
        self.mark = Some(offset);
    }

    pub fn clear_mark(&mut self) {
        self.mark = None;
    }

    /// Keeps the gap stable after a node was inserted at `index` of `parent`.
    pub fn after_insert(&mut self, parent: NodeId, index: usize, gravity: Gravity) {
        if parent != self.parent {
            return;
        }
        if self.index > index || (self.index == index && gravity == Gravity::Before) {
            self.index += 1;
        }
    }

    /// Keeps the gap stable after child `index` of `parent` was removed.
    pub fn after_remove(&mut self, parent: NodeId, index: usize) {
        if parent == self.parent && self.index > index {
            self.index -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tree;

    #[test]
    fn test_gap_adjustment() {
        let tree = Tree::new();
        let root = tree.root();
        let mut cursor = Cursor::new(root, 2);

        cursor.after_insert(root, 2, Gravity::After);
        assert_eq!(cursor.index, 2);
        cursor.after_insert(root, 2, Gravity::Before);
        assert_eq!(cursor.index, 3);
        cursor.after_insert(root, 0, Gravity::After);
        assert_eq!(cursor.index, 4);

        cursor.after_remove(root, 4);
        assert_eq!(cursor.index, 4);
        cursor.after_remove(root, 1);
        assert_eq!(cursor.index, 3);
    }

    #[test]
    fn test_place_drops_mark_across_boxes() {
        let mut tree = Tree::new();
        let root = tree.root();
        let other = tree.new_box(Default::default());
        let mut cursor = Cursor::new(root, 0);
        cursor.set_mark(0);
        cursor.place(root, 1);
        assert_eq!(cursor.mark, Some(0));
        cursor.place(other, 0);
        assert_eq!(cursor.mark, None);
    }
}
