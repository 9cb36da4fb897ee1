//! Cursor movement.
//!
//! ## Learning: Reflecting Boundaries
//!
//! Every motion returns `bool`: `true` if the cursor moved, `false` if it was
//! already at a boundary (or the target was refused). Hitting an edge is an
//! expected user action, so it is not modelled as an error.
//!
//! Child boxes are atomic for horizontal motion: stepping forward next to a
//! box lands on its far side. Only [`Document::enter_box`] goes inside.

use boxy_tree::{Gravity, Layout, Location, NodeId};

use crate::document::Document;

impl Document {
    // ==================== Character Motion ====================

    /// Moves one character (or one whole box) forward.
    ///
    /// At the end of a box the cursor escapes outward: the nearest ancestor
    /// with a following sibling is found and that sibling is stepped over.
    /// At the end of the document this is a no-op.
    pub fn move_forward(&mut self) -> bool {
        let (parent, index) = (self.cursor.parent, self.cursor.index);
        if let Some(next) = self.tree.child(parent, index) {
            return self.step_forward(parent, index, next);
        }
        let mut node = parent;
        while let Some(grand) = self.tree.parent(node) {
            let Some(i) = self.tree.index_in_parent(node) else {
                return false;
            };
            if let Some(sibling) = self.tree.child(grand, i + 1) {
                tracing::debug!("Escaping {} forward into {}", node, grand);
                return self.step_forward(grand, i + 1, sibling);
            }
            node = grand;
        }
        false
    }

    /// Moves one character (or one whole box) backward. Mirrors
    /// [`Document::move_forward`].
    pub fn move_backward(&mut self) -> bool {
        let (parent, index) = (self.cursor.parent, self.cursor.index);
        if let Some(prev) = index.checked_sub(1).and_then(|i| self.tree.child(parent, i)) {
            return self.step_backward(parent, index, prev);
        }
        let mut node = parent;
        while let Some(grand) = self.tree.parent(node) {
            let Some(i) = self.tree.index_in_parent(node) else {
                return false;
            };
            if let Some(sibling) = i.checked_sub(1).and_then(|j| self.tree.child(grand, j)) {
                tracing::debug!("Escaping {} backward into {}", node, grand);
                return self.step_backward(grand, i, sibling);
            }
            node = grand;
        }
        false
    }

    /// Steps over `next`, which sits right after gap `index` of `parent`.
    fn step_forward(&mut self, parent: NodeId, index: usize, next: NodeId) -> bool {
        if self.tree.is_box(next) {
            self.move_cursor_to(Location::new(parent, index + 1))
        } else {
            self.move_cursor_to(Location::new(next, 1))
        }
    }

    /// Steps over `prev`, which sits right before gap `index` of `parent`.
    fn step_backward(&mut self, parent: NodeId, index: usize, prev: NodeId) -> bool {
        if self.tree.is_box(prev) {
            self.move_cursor_to(Location::new(parent, index - 1))
        } else {
            let len = self.tree.text_len(prev);
            self.move_cursor_to(Location::new(prev, len.saturating_sub(1)))
        }
    }

    // ==================== Box Motion ====================

    /// Enters the box right after the cursor, or else the one right before
    /// it, landing at its first position. Shrunken boxes are passed over.
    pub fn enter_box(&mut self) -> bool {
        let (parent, index) = (self.cursor.parent, self.cursor.index);
        let next = self.tree.child(parent, index);
        let prev = index.checked_sub(1).and_then(|i| self.tree.child(parent, i));
        match [next, prev]
            .into_iter()
            .flatten()
            .find(|&n| self.tree.flags(n).is_some_and(|f| !f.shrunken))
        {
            Some(target) => self.move_cursor_to(Location::start_of(target)),
            None => false,
        }
    }

    /// Leaves the current box, landing just before it.
    pub fn exit_box_left(&mut self) -> bool {
        match self.box_gap(self.cursor.parent) {
            Some((grand, i)) => self.move_cursor_to(Location::new(grand, i)),
            None => false,
        }
    }

    /// Leaves the current box, landing just after it.
    pub fn exit_box_right(&mut self) -> bool {
        match self.box_gap(self.cursor.parent) {
            Some((grand, i)) => self.move_cursor_to(Location::new(grand, i + 1)),
            None => false,
        }
    }

    /// Parent and index of a non-root box.
    pub(crate) fn box_gap(&self, container: NodeId) -> Option<(NodeId, usize)> {
        Some((
            self.tree.parent(container)?,
            self.tree.index_in_parent(container)?,
        ))
    }

    pub fn move_to_start_of_box(&mut self) -> bool {
        let before = self.cursor_position();
        self.move_cursor_to(Location::start_of(self.cursor.parent)) && before != self.cursor_position()
    }

    pub fn move_to_end_of_box(&mut self) -> bool {
        let before = self.cursor_position();
        let container = self.cursor.parent;
        let end = self.tree.child_count(container);
        self.move_cursor_to(Location::new(container, end)) && before != self.cursor_position()
    }

    // ==================== Line Motion ====================

    /// Moves to the first position after the previous newline, or the start
    /// of the box.
    pub fn move_to_start_of_line(&mut self) -> bool {
        let layout = Layout::of(&self.tree, self.cursor.parent);
        let offset = layout.gap_offset(self.cursor.index);
        let start = layout.line_start(offset);
        if start == offset {
            return false;
        }
        self.move_cursor_to(layout.location_at(start))
    }

    /// Moves to the next newline, or the end of the box.
    ///
    /// When no newline follows and the box ends with a child box, a single
    /// `" "` run is appended (if padding is enabled) and the cursor lands
    /// after it, so the row has a text position past its last box.
    pub fn move_to_end_of_line(&mut self) -> bool {
        let container = self.cursor.parent;
        let layout = Layout::of(&self.tree, container);
        let offset = layout.gap_offset(self.cursor.index);
        let end = layout.line_end(offset);

        let count = self.tree.child_count(container);
        let ends_with_box = count > 0
            && self
                .tree
                .child(container, count - 1)
                .is_some_and(|last| self.tree.is_box(last));
        if end == layout.len() && ends_with_box && self.pad_trailing_box {
            let pad = self.tree.new_text(" ");
            if let Err(e) = self.insert_node(container, count, pad, Gravity::After) {
                tracing::warn!("Cannot pad line end: {}", e);
                return false;
            }
            tracing::debug!("Padded trailing box in {}", container);
            return self.move_cursor_to(Location::new(container, count + 1));
        }
        if end == offset {
            return false;
        }
        self.move_cursor_to(layout.location_at(end))
    }

    // ==================== Vertical Motion ====================

    pub fn move_up(&mut self) -> bool {
        self.move_vertical(false)
    }

    pub fn move_down(&mut self) -> bool {
        self.move_vertical(true)
    }

    /// Moves to the same column of the adjacent line in the current box,
    /// clamped to that line's width. The goal column survives consecutive
    /// vertical moves.
    fn move_vertical(&mut self, down: bool) -> bool {
        let layout = Layout::of(&self.tree, self.cursor.parent);
        let offset = layout.gap_offset(self.cursor.index);
        let goal = self
            .cursor
            .goal_column
            .unwrap_or_else(|| layout.column(offset));
        self.cursor.goal_column = Some(goal);

        let lines = layout.lines();
        let current = layout.line_index(offset);
        let target = if down {
            lines.get(current + 1)
        } else {
            current.checked_sub(1).and_then(|i| lines.get(i))
        };
        let Some(line) = target else {
            self.cursor.reset_goal();
            return false;
        };
        let flat = line.start + goal.min(line.len());
        self.place_cursor(layout.location_at(flat), true)
    }
}
