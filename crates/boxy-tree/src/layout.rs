//! Flat row layout of one box.
//!
//! ## Learning: Views Over Structure
//!
//! Line and column arithmetic is awkward on a tree: a line may span several
//! text runs and step over child boxes. `Layout` flattens the *direct*
//! children of a single box into a vector of cells (one per character, one
//! per child box) so that "start of line", "column" and "line below" become
//! simple slice scans. The layout is a throwaway view and is rebuilt after
//! every edit.

use std::ops::Range;

use crate::cursor::Location;
use crate::tree::{NodeId, NodeKind, Tree};

/// One unit of horizontal extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Char { node: NodeId, offset: usize, ch: char },
    Box(NodeId),
}

impl Cell {
    pub fn is_newline(&self) -> bool {
        matches!(self, Cell::Char { ch: '\n', .. })
    }
}

/// Cells of a box's direct children, in order.
#[derive(Debug, Clone)]
pub struct Layout {
    container: NodeId,
    cells: Vec<Cell>,
    child_starts: Vec<usize>,
}

impl Layout {
    pub fn of(tree: &Tree, container: NodeId) -> Self {
        let mut cells = Vec::new();
        let mut child_starts = Vec::with_capacity(tree.child_count(container));
        for &child in tree.children(container) {
            child_starts.push(cells.len());
            match tree.kind(child) {
                Some(NodeKind::Text(text)) => {
                    cells.extend(text.chars().enumerate().map(|(offset, ch)| Cell::Char {
                        node: child,
                        offset,
                        ch,
                    }));
                }
                Some(NodeKind::Box(_)) => cells.push(Cell::Box(child)),
                None => {}
            }
        }
        Self {
            container,
            cells,
            child_starts,
        }
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, offset: usize) -> Option<Cell> {
        self.cells.get(offset).copied()
    }

    /// Flat offset of the gap before child `index`.
    pub fn gap_offset(&self, index: usize) -> usize {
        self.child_starts
            .get(index)
            .copied()
            .unwrap_or(self.cells.len())
    }

    /// Flat offset of a location, if it addresses this box or one of its
    /// direct text runs.
    pub fn offset_of(&self, tree: &Tree, loc: Location) -> Option<usize> {
        if loc.node == self.container {
            return Some(self.gap_offset(loc.offset.min(self.child_starts.len())));
        }
        if tree.parent(loc.node) != Some(self.container) {
            return None;
        }
        let index = tree.index_in_parent(loc.node)?;
        let width = if tree.is_text(loc.node) {
            tree.text_len(loc.node)
        } else {
            1
        };
        Some(self.gap_offset(index) + loc.offset.min(width))
    }

    /// The location of a flat offset.
    ///
    /// Offsets on a child boundary come back in gap form (`container`,
    /// child index); offsets strictly inside a run come back as a text
    /// location.
    pub fn location_at(&self, offset: usize) -> Location {
        if offset >= self.cells.len() {
            return Location::new(self.container, self.child_starts.len());
        }
        match self.child_starts.binary_search(&offset) {
            Ok(index) => Location::new(self.container, index),
            Err(index) => match self.cells[offset] {
                Cell::Char { node, offset, .. } => Location::new(node, offset),
                Cell::Box(_) => Location::new(self.container, index.saturating_sub(1)),
            },
        }
    }

    /// Offset of the first cell on the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        let offset = offset.min(self.cells.len());
        self.cells[..offset]
            .iter()
            .rposition(Cell::is_newline)
            .map_or(0, |i| i + 1)
    }

    /// Offset of the newline ending the line containing `offset`, or the
    /// end of the box.
    pub fn line_end(&self, offset: usize) -> usize {
        let offset = offset.min(self.cells.len());
        self.cells[offset..]
            .iter()
            .position(Cell::is_newline)
            .map_or(self.cells.len(), |i| offset + i)
    }

    pub fn column(&self, offset: usize) -> usize {
        offset.min(self.cells.len()) - self.line_start(offset)
    }

    /// Zero-based line number of `offset`.
    pub fn line_index(&self, offset: usize) -> usize {
        let offset = offset.min(self.cells.len());
        self.cells[..offset].iter().filter(|c| c.is_newline()).count()
    }

    /// Every line as a range of cells, newline excluded. There is always at
    /// least one line.
    pub fn lines(&self) -> Vec<Range<usize>> {
        let mut lines = Vec::new();
        let mut start = 0;
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.is_newline() {
                lines.push(start..i);
                start = i + 1;
            }
        }
        lines.push(start..self.cells.len());
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxFlags, Fragment};

    fn build() -> (Tree, Layout) {
        // "ab\n" [x] "c\nde"
        let tree = Tree::from_fragment(&Fragment::plain(vec![
            "ab\n".into(),
            Fragment::plain(vec!["x".into()]),
            "c\nde".into(),
        ]));
        let layout = Layout::of(&tree, tree.root());
        (tree, layout)
    }

    #[test]
    fn test_cells_and_gaps() {
        let (tree, layout) = build();
        assert_eq!(layout.len(), 8);
        assert_eq!(layout.gap_offset(0), 0);
        assert_eq!(layout.gap_offset(1), 3);
        assert_eq!(layout.gap_offset(2), 4);
        assert_eq!(layout.gap_offset(3), 8);
        let inner = tree.children(tree.root())[1];
        assert_eq!(layout.cell(3), Some(Cell::Box(inner)));
    }

    #[test]
    fn test_location_roundtrip() {
        let (tree, layout) = build();
        let root = tree.root();
        let last = tree.children(root)[2];
        assert_eq!(layout.location_at(3), Location::new(root, 1));
        assert_eq!(layout.location_at(5), Location::new(last, 1));
        assert_eq!(layout.location_at(8), Location::new(root, 3));
        for offset in 0..=layout.len() {
            let loc = layout.location_at(offset);
            assert_eq!(layout.offset_of(&tree, loc), Some(offset));
        }
    }

    #[test]
    fn test_lines_and_columns() {
        let (_, layout) = build();
        assert_eq!(layout.lines(), vec![0..2, 3..5, 6..8]);
        assert_eq!(layout.line_start(4), 3);
        assert_eq!(layout.line_end(3), 5);
        assert_eq!(layout.column(4), 1);
        assert_eq!(layout.line_index(7), 2);
    }

    #[test]
    fn test_empty_box() {
        let mut tree = Tree::new();
        let b = tree.new_box(BoxFlags::plain());
        tree.push_child(tree.root(), b).unwrap();
        let layout = Layout::of(&tree, b);
        assert!(layout.is_empty());
        assert_eq!(layout.lines(), vec![0..0]);
        assert_eq!(layout.location_at(0), Location::new(b, 0));
    }
}
