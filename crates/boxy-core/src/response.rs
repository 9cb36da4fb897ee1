//! Evaluator responses written into rows.
//!
//! A row holding a question and its answer reads `question | answer`. The
//! answer may be plain text or a box. These helpers strip an old answer,
//! append a new one and turn a box of such rows into a chat transcript.

use boxy_tree::{Cell, Gravity, Layout, RenderMode};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::CoreResult;

/// Separator between a question and its answer.
pub const RESPONSE_SEPARATOR: char = '|';

/// Who said a line of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Builds a transcript from rows: `a | b` is a user turn `a` followed by
/// an assistant turn `b`; rows without a separator are user turns.
pub fn chat_history<S: AsRef<str>>(rows: &[S]) -> Vec<ChatMessage> {
    let mut history = Vec::with_capacity(rows.len());
    for row in rows {
        let row = row.as_ref();
        match row.split_once(RESPONSE_SEPARATOR) {
            Some((question, answer)) => {
                let answer = answer.split(RESPONSE_SEPARATOR).next().unwrap_or(answer);
                history.push(ChatMessage::new(Role::User, question.trim()));
                history.push(ChatMessage::new(Role::Assistant, answer.trim()));
            }
            None => history.push(ChatMessage::new(Role::User, row.trim())),
        }
    }
    history
}

impl Document {
    /// Flat offset of the first separator on the cursor's row, looking only
    /// at text directly in the current box.
    fn response_separator(&self, layout: &Layout) -> Option<usize> {
        let offset = layout.gap_offset(self.cursor.index);
        let (start, end) = (layout.line_start(offset), layout.line_end(offset));
        (start..end).find(|&i| {
            matches!(layout.cell(i), Some(Cell::Char { ch, .. }) if ch == RESPONSE_SEPARATOR)
        })
    }

    /// True when the cell just before the cursor is whitespace on the same
    /// row.
    fn row_ends_with_space(&self) -> bool {
        let layout = Layout::of(&self.tree, self.cursor.parent);
        let offset = layout.gap_offset(self.cursor.index);
        offset > layout.line_start(offset)
            && matches!(layout.cell(offset - 1), Some(Cell::Char { ch, .. }) if ch.is_whitespace())
    }

    /// The current row without its answer: everything before the first
    /// separator, with trailing spaces removed.
    pub fn current_row_prompt(&self) -> String {
        let container = self.cursor.parent;
        let layout = Layout::of(&self.tree, container);
        let offset = layout.gap_offset(self.cursor.index);
        let start = layout.line_start(offset);
        let end = self
            .response_separator(&layout)
            .unwrap_or_else(|| layout.line_end(offset));
        self.cells_text(container, start..end).trim_end().to_string()
    }

    /// Deletes the answer on the current row, from the first separator to
    /// the end of the row, along with the spaces around the cut. Returns
    /// false when the row has no answer.
    pub fn kill_response(&mut self) -> CoreResult<bool> {
        let container = self.cursor.parent;
        let layout = Layout::of(&self.tree, container);
        let Some(pipe) = self.response_separator(&layout) else {
            return Ok(false);
        };
        let end = layout.line_end(pipe);
        self.cursor.clear_mark();
        self.detach_range(container, pipe, end)?;
        let gap = self.gap_at(container, pipe)?;
        self.cursor.place(container, gap);

        let layout = Layout::of(&self.tree, container);
        let is_space = |i: usize| matches!(layout.cell(i), Some(Cell::Char { ch: ' ', .. }));
        let mut left = pipe;
        while left > 0 && is_space(left - 1) {
            left -= 1;
        }
        let mut right = pipe;
        while is_space(right) {
            right += 1;
        }
        if left < right {
            self.detach_range(container, left, right)?;
        }
        let gap = self.gap_at(container, left)?;
        self.cursor.place(container, gap);
        self.cursor.reset_goal();
        tracing::debug!("Killed response in {}", container);
        Ok(true)
    }

    /// Appends `" | "` and a response to the current row.
    ///
    /// The response is trimmed and parsed first, so a malformed response
    /// changes nothing. A multi-line response is inserted as a box (shown as
    /// rendered markdown when `markdown` is set); a single line is spliced
    /// inline.
    pub fn insert_response(&mut self, response: &str, markdown: bool) -> CoreResult<()> {
        let raw = response.trim();
        let parsed = self.codec.deserialize(raw)?;

        self.move_to_end_of_line();
        let separator = if self.row_ends_with_space() { "| " } else { " | " };
        self.insert_text(separator)?;
        if raw.contains('\n') {
            let node = self.tree.materialize(&parsed);
            let (parent, index) = (self.cursor.parent, self.cursor.index);
            self.insert_node(parent, index, node, Gravity::Before)?;
            if markdown {
                if let Some(flags) = self.tree.flags_mut(node) {
                    flags.render = RenderMode::Rendered;
                }
            }
        } else {
            self.insert_fragment_contents(&parsed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxy_tree::CursorPosition;

    #[test]
    fn test_chat_history() {
        let rows = ["hello | hi there", "  how are you  ", "a|b|c"];
        assert_eq!(
            chat_history(&rows),
            vec![
                ChatMessage::new(Role::User, "hello"),
                ChatMessage::new(Role::Assistant, "hi there"),
                ChatMessage::new(Role::User, "how are you"),
                ChatMessage::new(Role::User, "a"),
                ChatMessage::new(Role::Assistant, "b"),
            ]
        );
        assert!(chat_history::<&str>(&[]).is_empty());
    }

    #[test]
    fn test_kill_response() {
        let mut doc = Document::from_text("q1 | old answer\nq2").unwrap();
        assert_eq!(doc.current_row_prompt(), "q1");
        assert!(doc.kill_response().unwrap());
        assert_eq!(doc.text(), "q1\nq2");
        assert_eq!(doc.cursor_position().offset, 2);
        assert!(!doc.kill_response().unwrap());
        doc.tree().validate().unwrap();
    }

    #[test]
    fn test_kill_response_with_boxed_answer() {
        let mut doc = Document::from_text("q | [line\nmore] \nnext").unwrap();
        assert!(doc.kill_response().unwrap());
        assert_eq!(doc.text(), "q\nnext");
    }

    #[test]
    fn test_insert_single_line_response() {
        let mut doc = Document::from_text("what?").unwrap();
        doc.insert_response("  fine (really)  ", false).unwrap();
        assert_eq!(doc.text(), "what? | fine (really)");
        assert_eq!(doc.current_row_prompt(), "what?");
    }

    #[test]
    fn test_response_after_trailing_box_has_one_space() {
        let mut doc = Document::from_text("see [box]").unwrap();
        doc.insert_response("ok", false).unwrap();
        assert_eq!(doc.text(), "see [box] | ok");

        let mut spaced = Document::from_text("q  ").unwrap();
        spaced.insert_response("a", false).unwrap();
        assert_eq!(spaced.text(), "q  | a");

        assert!(doc.kill_response().unwrap());
        assert_eq!(doc.text(), "see [box]");
    }

    #[test]
    fn test_insert_multi_line_response() {
        let mut doc = Document::from_text("list?\nnext").unwrap();
        doc.insert_response("# A\n\n- x\n", true).unwrap();
        assert_eq!(doc.text(), "list? | [# A\n\n- x]\nnext");
        let root = doc.tree().root();
        let boxed = doc.tree().children(root)[1];
        assert_eq!(doc.tree().flags(boxed).unwrap().render, RenderMode::Rendered);

        doc.set_cursor_position(CursorPosition {
            container: root,
            offset: 0,
        });
        assert!(doc.kill_response().unwrap());
        assert_eq!(doc.text(), "list?\nnext");
    }

    #[test]
    fn test_malformed_response_changes_nothing() {
        let mut doc = Document::from_text("q").unwrap();
        assert!(doc.insert_response("broken [", false).is_err());
        assert_eq!(doc.text(), "q");
    }
}
