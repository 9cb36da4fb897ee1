//! Editing commands.
//!
//! ## Learning: Returning What Was Removed
//!
//! Deleting a box or killing a line hands the removed content back to the
//! caller as an owned [`Clip`]. The document itself has no clipboard; the
//! [`Editor`](crate::Editor) decides whether a clip goes onto the kill ring.
//! That keeps `Document` free of global state and easy to test.

use boxy_tree::{BoxFlags, BoxKind, Clip, Fragment, Gravity, Layout, Location, NodeId};

use crate::document::Document;
use crate::{CoreError, CoreResult};

impl Document {
    // ==================== Insertion ====================

    pub fn insert_char(&mut self, ch: char) -> CoreResult<()> {
        let mut buf = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buf))
    }

    /// Inserts literal text before the cursor, replacing any selection.
    ///
    /// Text is appended to the run right before the cursor when there is
    /// one, so typing does not fragment the tree.
    pub fn insert_text(&mut self, text: &str) -> CoreResult<()> {
        self.delete_selection()?;
        self.cursor.reset_goal();
        if text.is_empty() {
            return Ok(());
        }
        let (parent, index) = (self.cursor.parent, self.cursor.index);
        let prev = index.checked_sub(1).and_then(|i| self.tree.child(parent, i));
        match prev.and_then(|p| self.tree.text_mut(p)) {
            Some(run) => {
                run.push_str(text);
                self.touch();
            }
            None => {
                let run = self.tree.new_text(text);
                self.insert_node(parent, index, run, Gravity::Before)?;
            }
        }
        Ok(())
    }

    pub fn insert_newline(&mut self) -> CoreResult<()> {
        self.insert_text("\n")
    }

    /// Creates an empty box before the cursor and moves inside it.
    pub fn insert_box_and_enter(&mut self, kind: BoxKind) -> CoreResult<NodeId> {
        self.delete_selection()?;
        let (parent, index) = (self.cursor.parent, self.cursor.index);
        let container = self.tree.new_box(BoxFlags {
            kind,
            ..BoxFlags::default()
        });
        self.insert_node(parent, index, container, Gravity::Before)?;
        self.move_cursor_to(Location::start_of(container));
        tracing::debug!("Inserted and entered {}", container);
        Ok(container)
    }

    /// Reinserts a kill-ring entry before the cursor.
    pub fn insert_clip(&mut self, clip: Clip) -> CoreResult<()> {
        self.delete_selection()?;
        self.cursor.reset_goal();
        self.splice_at_cursor(&clip.into_fragments())
    }

    /// Inserts a fragment before the cursor as a single node.
    pub fn insert_fragment(&mut self, fragment: &Fragment) -> CoreResult<()> {
        self.delete_selection()?;
        self.cursor.reset_goal();
        self.splice_at_cursor(std::slice::from_ref(fragment))
    }

    /// Inserts the children of a fragment inline before the cursor.
    pub fn insert_fragment_contents(&mut self, fragment: &Fragment) -> CoreResult<()> {
        self.delete_selection()?;
        self.cursor.reset_goal();
        self.splice_at_cursor(&fragment.clone().into_children())
    }

    // ==================== Deletion ====================

    /// Deletes the character or box before the cursor.
    ///
    /// A deleted box is returned so it can be yanked back; characters are
    /// not. With an active selection, the selection is deleted instead.
    pub fn delete_backward(&mut self) -> CoreResult<Option<Clip>> {
        if self.delete_selection()?.is_some() {
            return Ok(None);
        }
        self.cursor.reset_goal();
        let parent = self.cursor.parent;
        self.strip_empty_runs(parent)?;

        let Some(prev) = self
            .cursor
            .index
            .checked_sub(1)
            .and_then(|i| self.tree.child(parent, i))
        else {
            return Ok(None);
        };
        if self.tree.is_box(prev) {
            return self.cut_node(prev).map(Some);
        }
        let emptied = match self.tree.text_mut(prev) {
            Some(run) => {
                run.pop();
                run.is_empty()
            }
            None => false,
        };
        self.touch();
        if emptied {
            self.remove_node(prev)?;
        }
        Ok(None)
    }

    /// Deletes the character or box after the cursor. A leading newline is
    /// deleted like any character, joining two rows.
    pub fn delete_forward(&mut self) -> CoreResult<Option<Clip>> {
        if self.delete_selection()?.is_some() {
            return Ok(None);
        }
        self.cursor.reset_goal();
        let parent = self.cursor.parent;
        self.strip_empty_runs(parent)?;

        let Some(next) = self.tree.child(parent, self.cursor.index) else {
            return Ok(None);
        };
        if self.tree.is_box(next) {
            return self.cut_node(next).map(Some);
        }
        let emptied = match self.tree.text_mut(next) {
            Some(run) if !run.is_empty() => {
                run.remove(0);
                run.is_empty()
            }
            _ => true,
        };
        self.touch();
        if emptied {
            self.remove_node(next)?;
        }
        Ok(None)
    }

    fn cut_node(&mut self, node: NodeId) -> CoreResult<Clip> {
        let fragment = self
            .tree
            .to_fragment(node)
            .ok_or(boxy_tree::TreeError::Dangling(node))?;
        self.remove_node(node)?;
        tracing::debug!("Cut box {}", node);
        Ok(Clip::Box(fragment))
    }

    /// Deletes from the cursor to the end of the row.
    ///
    /// Right before the row's newline this joins rows instead (one forward
    /// delete). At the very end of the box nothing happens. Otherwise the
    /// removed siblings are returned, in order, as one span clip.
    pub fn kill_line(&mut self) -> CoreResult<Option<Clip>> {
        self.cursor.clear_mark();
        self.cursor.reset_goal();
        let container = self.cursor.parent;
        self.strip_empty_runs(container)?;
        let layout = Layout::of(&self.tree, container);
        let offset = layout.gap_offset(self.cursor.index);
        let end = layout.line_end(offset);

        if end == offset {
            if layout.cell(offset).is_some_and(|c| c.is_newline()) {
                return self.delete_forward();
            }
            return Ok(None);
        }
        let taken = self.detach_range(container, offset, end)?;
        tracing::debug!("Killed {} nodes from {}", taken.len(), container);
        Ok(Some(Clip::Span(Fragment::plain(taken))))
    }

    /// Removes the box holding the cursor and returns it. The cursor lands
    /// where the box used to be. Refused at the root.
    pub fn delete_current_box(&mut self) -> CoreResult<Option<Fragment>> {
        let current = self.cursor.parent;
        if current == self.tree.root() {
            tracing::debug!("Refusing to delete the root box");
            return Ok(None);
        }
        let fragment = self
            .tree
            .to_fragment(current)
            .ok_or(boxy_tree::TreeError::Dangling(current))?;
        self.remove_node(current)?;
        self.cursor.reset_goal();
        Ok(Some(fragment))
    }

    /// Replaces the box holding the cursor with its delimiters as literal
    /// text around its former children.
    pub fn explode_box(&mut self) -> CoreResult<bool> {
        let current = self.cursor.parent;
        let Some(flags) = self.tree.flags(current).cloned() else {
            return Ok(false);
        };
        let Some(fragment) = self.delete_current_box()? else {
            return Ok(false);
        };
        let (open, close) = self.codec.delimiters(&flags);
        let mut pieces = vec![Fragment::Text(open)];
        pieces.extend(fragment.into_children());
        pieces.push(Fragment::Text(close));
        self.splice_at_cursor(&pieces)?;
        Ok(true)
    }

    /// Replaces every child of `container` with the parse of `text`.
    ///
    /// The text is parsed first, so a parse error leaves the tree untouched.
    /// A cursor inside the box ends up at its end.
    pub fn set_box_content(&mut self, container: NodeId, text: &str) -> CoreResult<()> {
        if !self.tree.is_box(container) {
            return Err(CoreError::NotABox(container));
        }
        let fragment = self.codec.deserialize(text)?;

        let cursor_inside =
            self.cursor.parent == container || self.tree.is_ancestor(container, self.cursor.parent);
        if cursor_inside {
            self.cursor.place(container, 0);
        }
        let old: Vec<NodeId> = self.tree.children(container).to_vec();
        for child in old {
            self.remove_node(child)?;
        }
        for (index, child) in fragment.children().iter().enumerate() {
            let node = self.tree.materialize(child);
            self.insert_node(container, index, node, Gravity::After)?;
        }
        if cursor_inside {
            let end = self.tree.child_count(container);
            self.cursor.place(container, end);
        }
        self.cursor.reset_goal();
        self.touch();
        Ok(())
    }

    // ==================== Box Flags ====================

    /// Marks the current box shrunken and exits it to the right.
    pub fn shrink_box(&mut self) -> bool {
        let current = self.cursor.parent;
        if current == self.tree.root() {
            return false;
        }
        if let Some(flags) = self.tree.flags_mut(current) {
            flags.shrunken = true;
        }
        self.touch();
        self.exit_box_right()
    }

    /// Expands a shrunken box next to the cursor (after it, else before
    /// it). Without one, clears the flag of the current box and exits right.
    pub fn expand_box(&mut self) -> bool {
        if let Some(neighbour) = self.shrunken_neighbour() {
            if let Some(flags) = self.tree.flags_mut(neighbour) {
                flags.shrunken = false;
            }
            self.touch();
            return true;
        }
        let current = self.cursor.parent;
        if current == self.tree.root() {
            return false;
        }
        if let Some(flags) = self.tree.flags_mut(current) {
            flags.shrunken = false;
        }
        self.touch();
        self.exit_box_right()
    }

    /// Expands a shrunken neighbour if there is one, otherwise shrinks the
    /// current box.
    pub fn toggle_expand(&mut self) -> bool {
        if self.shrunken_neighbour().is_some() {
            self.expand_box()
        } else {
            self.shrink_box()
        }
    }

    fn shrunken_neighbour(&self) -> Option<NodeId> {
        let (parent, index) = (self.cursor.parent, self.cursor.index);
        let next = self.tree.child(parent, index);
        let prev = index.checked_sub(1).and_then(|i| self.tree.child(parent, i));
        [next, prev]
            .into_iter()
            .flatten()
            .find(|&n| self.tree.flags(n).is_some_and(|f| f.shrunken))
    }

    // ==================== Selection ====================

    /// Anchors a selection at the cursor.
    pub fn set_mark(&mut self) {
        let offset = self.cursor_offset();
        self.cursor.set_mark(offset);
    }

    pub fn clear_mark(&mut self) {
        self.cursor.clear_mark();
    }

    pub fn has_selection(&self) -> bool {
        self.cursor
            .mark
            .is_some_and(|mark| mark != self.cursor_offset())
    }

    /// The selection between mark and cursor, if non-empty.
    pub fn selection(&self) -> Option<boxy_tree::Selection> {
        let mark = self.cursor.mark?;
        let sel = boxy_tree::Selection::new(mark, self.cursor_offset());
        (!sel.is_empty()).then_some(sel)
    }

    pub fn selected_text(&self) -> Option<String> {
        self.selection()
            .map(|sel| self.cells_text(self.cursor.parent, sel.range()))
    }

    /// Removes the selection and returns what it held. Always clears the
    /// mark.
    pub fn delete_selection(&mut self) -> CoreResult<Option<Vec<Fragment>>> {
        let selection = self.selection();
        self.cursor.clear_mark();
        let Some(sel) = selection else {
            return Ok(None);
        };
        let container = self.cursor.parent;
        let len = Layout::of(&self.tree, container).len();
        let taken = self.detach_range(container, sel.start.min(len), sel.end.min(len))?;
        self.cursor.reset_goal();
        Ok(Some(taken))
    }
}
