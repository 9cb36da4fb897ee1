//! Row text and serialization queries.

use std::ops::Range;

use boxy_tree::{Cell, CursorPosition, Fragment, Layout, NodeId};

use crate::document::Document;
use crate::{CoreError, CoreResult};

impl Document {
    /// Text of the row holding the cursor. Child boxes contribute their
    /// serialization inline. The newline is not included.
    pub fn current_row_text(&self) -> String {
        let container = self.cursor.parent;
        let layout = Layout::of(&self.tree, container);
        let offset = layout.gap_offset(self.cursor.index);
        let range = layout.line_start(offset)..layout.line_end(offset);
        self.layout_text(&layout, range)
    }

    /// Every row of a box. A trailing newline does not open an extra row,
    /// and an empty box has no rows.
    pub fn box_rows_text(&self, container: NodeId) -> Vec<String> {
        if !self.tree.is_box(container) {
            return Vec::new();
        }
        let layout = Layout::of(&self.tree, container);
        let mut rows: Vec<String> = layout
            .lines()
            .into_iter()
            .map(|range| self.layout_text(&layout, range))
            .collect();
        if rows.last().is_some_and(String::is_empty) {
            rows.pop();
        }
        rows
    }

    /// Serialized contents of a box.
    pub fn serialize_box(&self, container: NodeId) -> CoreResult<String> {
        if !self.tree.is_box(container) {
            return Err(CoreError::NotABox(container));
        }
        Ok(self.codec.serialize(&self.tree, container))
    }

    /// Parses text with this document's dialect.
    pub fn deserialize(&self, text: &str) -> CoreResult<Fragment> {
        Ok(self.codec.deserialize(text)?)
    }

    /// Serialized text between two positions of the same box.
    pub fn text_between(&self, start: CursorPosition, end: CursorPosition) -> CoreResult<String> {
        if start.container != end.container {
            return Err(CoreError::PositionsInDifferentBoxes);
        }
        if !self.tree.is_box(start.container) {
            return Err(CoreError::NotABox(start.container));
        }
        let (from, to) = (start.offset.min(end.offset), start.offset.max(end.offset));
        Ok(self.cells_text(start.container, from..to))
    }

    /// Innermost box whose serialized contents contain `needle`.
    pub fn find_box_by_content(&self, needle: &str) -> Option<NodeId> {
        self.find_in(self.tree.root(), needle)
    }

    fn find_in(&self, container: NodeId, needle: &str) -> Option<NodeId> {
        if !self.codec.serialize(&self.tree, container).contains(needle) {
            return None;
        }
        self.tree
            .children(container)
            .iter()
            .filter(|&&c| self.tree.is_box(c))
            .find_map(|&c| self.find_in(c, needle))
            .or(Some(container))
    }

    /// Serialized text of flat cells `range` of `container`.
    pub(crate) fn cells_text(&self, container: NodeId, range: Range<usize>) -> String {
        self.layout_text(&Layout::of(&self.tree, container), range)
    }

    fn layout_text(&self, layout: &Layout, range: Range<usize>) -> String {
        let end = range.end.min(layout.len());
        let start = range.start.min(end);
        layout.cells()[start..end]
            .iter()
            .fold(String::new(), |mut out, cell| {
                match *cell {
                    Cell::Char { ch, .. } => out.push(ch),
                    Cell::Box(node) => out.push_str(&self.codec.serialize_node(&self.tree, node)),
                }
                out
            })
    }
}
