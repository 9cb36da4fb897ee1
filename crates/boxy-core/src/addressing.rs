//! Cursor addressing: converting locations into cursor gaps.

use boxy_tree::{CursorPosition, Layout, Location, NodeKind};

use crate::document::Document;

impl Document {
    /// Normalizes a raw location.
    ///
    /// Offsets are clamped into range. An empty text run is deleted and the
    /// location retried as the gap it leaves behind in its parent. Dangling
    /// or detached targets fall back to the cursor's own gap.
    pub fn resolve_position(&mut self, loc: Location) -> Location {
        let mut loc = loc;
        loop {
            if !self.tree.contains(loc.node) || !self.tree.is_attached(loc.node) {
                return self.cursor.location();
            }
            if self.tree.text(loc.node).is_some_and(str::is_empty) {
                match self.remove_node(loc.node) {
                    Ok((parent, index)) => loc = Location::new(parent, index),
                    Err(_) => return self.cursor.location(),
                }
                continue;
            }
            return match self.tree.kind(loc.node) {
                Some(NodeKind::Text(_)) => {
                    Location::new(loc.node, loc.offset.min(self.tree.text_len(loc.node)))
                }
                Some(NodeKind::Box(_)) => {
                    Location::new(loc.node, loc.offset.min(self.tree.child_count(loc.node)))
                }
                None => self.cursor.location(),
            };
        }
    }

    /// Moves the cursor to `loc`, splitting a text run if the target lies
    /// inside it. Refuses targets inside shrunken boxes.
    pub fn move_cursor_to(&mut self, loc: Location) -> bool {
        self.place_cursor(loc, false)
    }

    /// Shared by every motion. Vertical moves pass `keep_goal`.
    pub(crate) fn place_cursor(&mut self, loc: Location, keep_goal: bool) -> bool {
        let loc = self.resolve_position(loc);
        let container = if self.tree.is_box(loc.node) {
            loc.node
        } else {
            match self.tree.parent(loc.node) {
                Some(parent) => parent,
                None => return false,
            }
        };
        if self.tree.is_within_shrunken(container) {
            tracing::debug!("Refusing to move into shrunken box {}", container);
            return false;
        }

        if loc.node == container {
            self.cursor.place(container, loc.offset);
        } else {
            let Some(index) = self.tree.index_in_parent(loc.node) else {
                return false;
            };
            let len = self.tree.text_len(loc.node);
            if loc.offset == 0 {
                self.cursor.place(container, index);
            } else if loc.offset >= len {
                self.cursor.place(container, index + 1);
            } else {
                if let Err(e) = self.split_run(loc.node, loc.offset) {
                    tracing::warn!("Cannot split {}: {}", loc.node, e);
                    return false;
                }
                self.cursor.place(container, index + 1);
            }
        }
        if !keep_goal {
            self.cursor.reset_goal();
        }
        true
    }

    /// The cursor as a box plus flat offset (boxes count one).
    pub fn cursor_position(&self) -> CursorPosition {
        let layout = Layout::of(&self.tree, self.cursor.parent);
        CursorPosition {
            container: self.cursor.parent,
            offset: layout.gap_offset(self.cursor.index),
        }
    }

    /// Moves the cursor to a flat position inside a box.
    pub fn set_cursor_position(&mut self, position: CursorPosition) -> bool {
        if !self.tree.is_box(position.container) {
            return false;
        }
        let loc = Layout::of(&self.tree, position.container).location_at(position.offset);
        self.move_cursor_to(loc)
    }

    /// Flat offset of the cursor inside its box.
    pub(crate) fn cursor_offset(&self) -> usize {
        self.cursor_position().offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_into_text_splits_run() {
        let mut doc = Document::from_text("hello").unwrap();
        let root = doc.tree().root();
        let run = doc.tree().children(root)[0];

        assert!(doc.move_cursor_to(Location::new(run, 2)));
        assert_eq!(doc.tree().child_count(root), 2);
        assert_eq!(doc.cursor().index, 1);
        assert_eq!(doc.text(), "hello");
        assert_eq!(doc.cursor_position().offset, 2);
    }

    #[test]
    fn test_run_edges_do_not_split() {
        let mut doc = Document::from_text("hello").unwrap();
        let root = doc.tree().root();
        let run = doc.tree().children(root)[0];

        assert!(doc.move_cursor_to(Location::new(run, 5)));
        assert_eq!(doc.tree().child_count(root), 1);
        assert_eq!(doc.cursor().index, 1);
        assert!(doc.move_cursor_to(Location::new(run, 99)));
        assert_eq!(doc.cursor().index, 1);
        assert!(doc.move_cursor_to(Location::new(run, 0)));
        assert_eq!(doc.cursor().index, 0);
    }

    #[test]
    fn test_resolve_removes_empty_run() {
        let mut doc = Document::from_text("ab[c]").unwrap();
        let root = doc.tree().root();
        let empty = doc.tree.new_text("");
        doc.tree.insert_child(root, 1, empty).unwrap();

        let resolved = doc.resolve_position(Location::new(empty, 3));
        assert_eq!(resolved, Location::new(root, 1));
        assert!(!doc.tree().contains(empty));
        assert_eq!(doc.resolve_position(resolved), resolved);
        doc.tree().validate().unwrap();
    }

    #[test]
    fn test_shrunken_target_refused() {
        let mut doc = Document::from_text("a[bc]").unwrap();
        let inner = doc.tree().children(doc.tree().root())[1];
        doc.tree.flags_mut(inner).unwrap().shrunken = true;
        let before = doc.cursor().clone();
        assert!(!doc.move_cursor_to(Location::new(inner, 0)));
        let run = doc.tree().children(inner)[0];
        assert!(!doc.move_cursor_to(Location::new(run, 1)));
        assert_eq!(doc.cursor(), &before);
    }

    #[test]
    fn test_set_cursor_position_counts_boxes_as_one() {
        let mut doc = Document::from_text("ab[xyz]cd").unwrap();
        let root = doc.tree().root();
        assert!(doc.set_cursor_position(CursorPosition {
            container: root,
            offset: 4
        }));
        assert_eq!(doc.cursor_position().offset, 4);
        assert_eq!(doc.cursor().index, 3);
    }

    #[test]
    fn test_move_resets_goal() {
        let mut doc = Document::from_text("ab").unwrap();
        doc.cursor.goal_column = Some(3);
        let root = doc.tree().root();
        assert!(doc.move_cursor_to(Location::new(root, 1)));
        assert_eq!(doc.cursor().goal_column, None);
    }
}
