//! Bracketed-text serialization.
//!
//! ## Format
//!
//! ```text
//! text            literal characters
//! [ ... ]         plain box
//! ( ... )         code box (when the dialect enables parentheses)
//! ```lang\n       markdown box; the body is kept verbatim and closed by a
//! ...\n```        newline plus a fence at least as long as the opener
//! ```
//!
//! A fence is three or more backticks. The serializer picks a fence longer
//! than any backtick run inside the body, so nested fences are always
//! shorter than the one around them and a closer cannot be mistaken for a
//! nested opener.
//!
//! ## Learning: Recursive Descent
//!
//! Each bracket opens a nested call of [`Parser::sequence`] that returns when
//! it sees the matching closer. The call stack *is* the stack of open
//! delimiters, so a mismatched or missing closer is reported right where it
//! is detected, together with its character offset.

use serde::{Deserialize, Serialize};

use crate::fragment::Fragment;
use crate::tree::{BoxFlags, BoxKind, NodeId, NodeKind, Tree};
use crate::{CodecError, CodecResult};

pub const FENCE: &str = "```";

/// Delimiter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    /// Treat `(`/`)` as code-box delimiters. When off, code boxes are
    /// written with square brackets and parentheses are plain text.
    pub code_parens: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self { code_parens: true }
    }
}

/// Converts between trees and bracketed text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    dialect: Dialect,
}

impl Codec {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Opening and closing delimiters of a box with `flags`. Markdown boxes
    /// get the shortest fence; [`Codec::serialize`] lengthens it when the
    /// body needs that.
    pub fn delimiters(&self, flags: &BoxFlags) -> (String, String) {
        match &flags.kind {
            BoxKind::Plain => ("[".into(), "]".into()),
            BoxKind::Code if self.dialect.code_parens => ("(".into(), ")".into()),
            BoxKind::Code => ("[".into(), "]".into()),
            BoxKind::Markdown { language } => (
                format!("{FENCE}{}\n", language.as_deref().unwrap_or("")),
                format!("\n{FENCE}"),
            ),
        }
    }

    // ==================== Serialization ====================

    /// Serializes the *contents* of a box, without its own delimiters.
    pub fn serialize(&self, tree: &Tree, container: NodeId) -> String {
        let mut out = String::new();
        for &child in tree.children(container) {
            self.write_node(tree, child, &mut out);
        }
        out
    }

    /// Serializes a node including its delimiters.
    pub fn serialize_node(&self, tree: &Tree, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(tree, id, &mut out);
        out
    }

    fn write_node(&self, tree: &Tree, id: NodeId, out: &mut String) {
        match tree.kind(id) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            Some(NodeKind::Box(b)) => {
                let inner = self.serialize(tree, id);
                self.write_delimited(&b.flags, &inner, out);
            }
            None => {}
        }
    }

    /// Serializes the contents of a box fragment, or the text of a text
    /// fragment.
    pub fn serialize_fragment(&self, fragment: &Fragment) -> String {
        let mut out = String::new();
        match fragment {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Box { children, .. } => {
                for child in children {
                    self.write_fragment(child, &mut out);
                }
            }
        }
        out
    }

    fn write_fragment(&self, fragment: &Fragment, out: &mut String) {
        match fragment {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Box { flags, .. } => {
                let inner = self.serialize_fragment(fragment);
                self.write_delimited(flags, &inner, out);
            }
        }
    }

    fn write_delimited(&self, flags: &BoxFlags, inner: &str, out: &mut String) {
        if let BoxKind::Markdown { language } = &flags.kind {
            let fence = "`".repeat(fence_len(inner));
            out.push_str(&fence);
            out.push_str(language.as_deref().unwrap_or(""));
            out.push('\n');
            out.push_str(inner);
            out.push('\n');
            out.push_str(&fence);
            return;
        }
        let (open, close) = self.delimiters(flags);
        out.push_str(&open);
        out.push_str(inner);
        out.push_str(&close);
    }

    // ==================== Deserialization ====================

    /// Parses text into a plain box fragment holding the parsed children.
    pub fn deserialize(&self, text: &str) -> CodecResult<Fragment> {
        let children = Parser::new(text, self.dialect).parse()?;
        Ok(Fragment::plain(children))
    }
}

/// Fence length for a markdown body: one more backtick than its longest
/// run, and never shorter than [`FENCE`].
fn fence_len(inner: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for ch in inner.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    if longest >= FENCE.len() {
        longest + 1
    } else {
        FENCE.len()
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    dialect: Dialect,
}

impl Parser {
    fn new(text: &str, dialect: Dialect) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            dialect,
        }
    }

    fn parse(mut self) -> CodecResult<Vec<Fragment>> {
        self.sequence(None)
    }

    fn backtick_run(&self, at: usize) -> usize {
        self.chars[at.min(self.chars.len())..]
            .iter()
            .take_while(|&&c| c == '`')
            .count()
    }

    /// Fence and tag length of the opener at `at`: three or more backticks,
    /// an optional tag without whitespace, then a newline.
    fn opener(&self, at: usize) -> Option<(usize, usize)> {
        let len = self.backtick_run(at);
        if len < FENCE.len() {
            return None;
        }
        let tag = self.chars[at + len..]
            .iter()
            .take_while(|c| !c.is_whitespace() && **c != '`')
            .count();
        (self.chars.get(at + len + tag) == Some(&'\n')).then_some((len, tag))
    }

    /// Parses children until `closer` (char and opening offset) or the end.
    fn sequence(&mut self, closer: Option<(char, usize)>) -> CodecResult<Vec<Fragment>> {
        let mut children = Vec::new();
        let mut text = String::new();

        fn flush(text: &mut String, children: &mut Vec<Fragment>) {
            if !text.is_empty() {
                children.push(Fragment::Text(std::mem::take(text)));
            }
        }

        while self.pos < self.chars.len() {
            if self.chars[self.pos] == '`' {
                if let Some((len, tag)) = self.opener(self.pos) {
                    flush(&mut text, &mut children);
                    children.push(self.fence(len, tag)?);
                } else {
                    let run = self.backtick_run(self.pos);
                    text.push_str(&"`".repeat(run));
                    self.pos += run;
                }
                continue;
            }
            let ch = self.chars[self.pos];
            match ch {
                '[' => {
                    flush(&mut text, &mut children);
                    let open = self.pos;
                    self.pos += 1;
                    let inner = self.sequence(Some((']', open)))?;
                    children.push(Fragment::plain(inner));
                }
                '(' if self.dialect.code_parens => {
                    flush(&mut text, &mut children);
                    let open = self.pos;
                    self.pos += 1;
                    let inner = self.sequence(Some((')', open)))?;
                    children.push(Fragment::code(inner));
                }
                ']' | ')' if ch == ']' || self.dialect.code_parens => {
                    return match closer {
                        Some((expected, _)) if expected == ch => {
                            self.pos += 1;
                            flush(&mut text, &mut children);
                            Ok(children)
                        }
                        Some((expected, _)) => Err(CodecError::MismatchedDelimiter {
                            expected,
                            found: ch,
                            offset: self.pos,
                        }),
                        None => Err(CodecError::UnexpectedCloser {
                            found: ch,
                            offset: self.pos,
                        }),
                    };
                }
                _ => {
                    text.push(ch);
                    self.pos += 1;
                }
            }
        }

        match closer {
            Some((expected, open)) => Err(CodecError::UnclosedDelimiter {
                delimiter: if expected == ']' { '[' } else { '(' },
                offset: open,
            }),
            None => {
                flush(&mut text, &mut children);
                Ok(children)
            }
        }
    }

    /// Parses a fenced block whose opener (`len` backticks and a `tag`
    /// characters long tag) starts at `self.pos`.
    ///
    /// The body ends at the first newline followed by at least `len`
    /// backticks; exactly `len` of them are consumed as the closer. An empty
    /// body may also be closed right after the opener's newline.
    fn fence(&mut self, len: usize, tag: usize) -> CodecResult<Fragment> {
        let start = self.pos;
        let language: String = self.chars[start + len..start + len + tag].iter().collect();
        let body_start = start + len + tag + 1;

        let (body_end, closer) = if self.backtick_run(body_start) >= len {
            (body_start, body_start)
        } else {
            let Some(newline) = (body_start..self.chars.len())
                .find(|&i| self.chars[i] == '\n' && self.backtick_run(i + 1) >= len)
            else {
                return Err(CodecError::UnclosedFence { offset: start });
            };
            (newline, newline + 1)
        };
        self.pos = closer + len;

        let body: String = self.chars[body_start..body_end].iter().collect();
        let children = Parser::new(&body, self.dialect)
            .parse()
            .map_err(|e| e.shifted(body_start))?;
        let language = (!language.is_empty()).then_some(language);
        Ok(Fragment::boxed(BoxFlags::markdown(language), children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> Codec {
        Codec::default()
    }

    #[test]
    fn test_serialize_nested() {
        let tree = Tree::from_fragment(&Fragment::plain(vec![
            "ab".into(),
            Fragment::plain(vec!["cd".into(), Fragment::code(vec!["x".into()])]),
            "ef".into(),
        ]));
        assert_eq!(codec().serialize(&tree, tree.root()), "ab[cd(x)]ef");
        let square = Codec::new(Dialect { code_parens: false });
        assert_eq!(square.serialize(&tree, tree.root()), "ab[cd[x]]ef");
    }

    fn md(language: Option<&str>, children: Vec<Fragment>) -> Fragment {
        Fragment::boxed(BoxFlags::markdown(language.map(str::to_string)), children)
    }

    #[test]
    fn test_markdown_body_kept_verbatim() {
        let frag = Fragment::plain(vec![md(Some("rust"), vec!["\n  fn main() {}\n\n".into()])]);
        let text = codec().serialize_fragment(&frag);
        assert_eq!(text, "```rust\n\n  fn main() {}\n\n\n```");
        assert_eq!(codec().deserialize(&text).unwrap(), frag);
    }

    #[test]
    fn test_text_after_markdown_box() {
        let frag = Fragment::plain(vec![md(Some("md"), vec!["x".into()]), "abc\nmore".into()]);
        let text = codec().serialize_fragment(&frag);
        assert_eq!(text, "```md\nx\n```abc\nmore");
        assert_eq!(codec().deserialize(&text).unwrap(), frag);
    }

    #[test]
    fn test_untagged_markdown_inside_markdown() {
        let frag = Fragment::plain(vec![md(
            Some("md"),
            vec!["a\n".into(), md(None, vec!["b".into()])],
        )]);
        let text = codec().serialize_fragment(&frag);
        assert_eq!(text, "````md\na\n```\nb\n```\n````");
        assert_eq!(codec().deserialize(&text).unwrap(), frag);
    }

    #[test]
    fn test_adjacent_and_empty_markdown_boxes() {
        let frag = Fragment::plain(vec![
            md(None, vec![]),
            md(None, vec!["a".into()]),
            md(Some("c++"), vec![" ".into()]),
        ]);
        let text = codec().serialize_fragment(&frag);
        assert_eq!(codec().deserialize(&text).unwrap(), frag);
        assert_eq!(
            codec().deserialize("```md\n```").unwrap(),
            Fragment::plain(vec![md(Some("md"), vec![])])
        );
    }

    #[test]
    fn test_backticks_in_text() {
        let frag = codec().deserialize("a `b` and ```c").unwrap();
        assert_eq!(frag, Fragment::plain(vec!["a `b` and ```c".into()]));
        let fenced = Fragment::plain(vec![md(None, vec!["x ``` y".into()])]);
        let text = codec().serialize_fragment(&fenced);
        assert!(text.starts_with("````\n"));
        assert_eq!(codec().deserialize(&text).unwrap(), fenced);
    }

    #[test]
    fn test_deserialize_brackets() {
        let frag = codec().deserialize("a[b(c)]d").unwrap();
        assert_eq!(
            frag,
            Fragment::plain(vec![
                "a".into(),
                Fragment::plain(vec!["b".into(), Fragment::code(vec!["c".into()])]),
                "d".into(),
            ])
        );
    }

    #[test]
    fn test_parens_as_text_when_disabled() {
        let square = Codec::new(Dialect { code_parens: false });
        let frag = square.deserialize("f(x) [y]").unwrap();
        assert_eq!(
            frag,
            Fragment::plain(vec!["f(x) ".into(), Fragment::plain(vec!["y".into()])])
        );
    }

    #[test]
    fn test_deserialize_fences() {
        let frag = codec()
            .deserialize("see ```md\n  # Title\n[x]\n``` done")
            .unwrap();
        assert_eq!(
            frag,
            Fragment::plain(vec![
                "see ".into(),
                Fragment::boxed(
                    BoxFlags::markdown(Some("md".into())),
                    vec!["  # Title\n".into(), Fragment::plain(vec!["x".into()])],
                ),
                " done".into(),
            ])
        );
    }

    #[test]
    fn test_nested_fences() {
        let text = "````md\nouter\n```rust\ninner\n```\n````";
        let frag = codec().deserialize(text).unwrap();
        let outer = &frag.children()[0];
        assert_eq!(outer.flags(), Some(&BoxFlags::markdown(Some("md".into()))));
        assert_eq!(outer.children()[0], Fragment::text("outer\n"));
        assert_eq!(outer.children()[1], md(Some("rust"), vec!["inner".into()]));
        assert_eq!(codec().serialize_fragment(&frag), text);
    }

    #[test]
    fn test_equal_fence_closes_outer_block() {
        let frag = codec().deserialize("```md\nouter\n```rust\n").unwrap();
        assert_eq!(
            frag,
            Fragment::plain(vec![md(Some("md"), vec!["outer".into()]), "rust\n".into()])
        );
    }

    #[test]
    fn test_errors_carry_offsets() {
        assert_eq!(
            codec().deserialize("ab[cd").unwrap_err(),
            CodecError::UnclosedDelimiter {
                delimiter: '[',
                offset: 2
            }
        );
        assert_eq!(
            codec().deserialize("ab]").unwrap_err(),
            CodecError::UnexpectedCloser {
                found: ']',
                offset: 2
            }
        );
        assert_eq!(
            codec().deserialize("[a)").unwrap_err(),
            CodecError::MismatchedDelimiter {
                expected: ']',
                found: ')',
                offset: 2
            }
        );
        assert_eq!(
            codec().deserialize("x ```md\nnever closed").unwrap_err(),
            CodecError::UnclosedFence { offset: 2 }
        );
        assert_eq!(
            codec().deserialize("```md\n  [oops\n```").unwrap_err(),
            CodecError::UnclosedDelimiter {
                delimiter: '[',
                offset: 8
            }
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(codec().deserialize("").unwrap(), Fragment::plain(vec![]));
        assert_eq!(
            codec().deserialize("[]").unwrap(),
            Fragment::plain(vec![Fragment::plain(vec![])])
        );
    }
}
