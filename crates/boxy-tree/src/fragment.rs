//! Owned, detached subtrees.
//!
//! ## Learning: Owned Snapshots vs Handles
//!
//! A [`NodeId`](crate::NodeId) is only a handle into one arena and becomes
//! meaningless once its node is freed. Anything that must outlive a node
//! (a kill-ring entry, a parsed document, a test expectation) is stored as a
//! `Fragment` instead: a plain recursive enum that owns all of its data and
//! can be compared with `==`.

use serde::{Deserialize, Serialize};

use crate::tree::BoxFlags;

/// A subtree that does not belong to any [`Tree`](crate::Tree).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fragment {
    Text(String),
    Box {
        flags: BoxFlags,
        children: Vec<Fragment>,
    },
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Fragment::Text(text.into())
    }

    pub fn boxed(flags: BoxFlags, children: Vec<Fragment>) -> Self {
        Fragment::Box { flags, children }
    }

    /// A plain `[ ... ]` box.
    pub fn plain(children: Vec<Fragment>) -> Self {
        Self::boxed(BoxFlags::plain(), children)
    }

    /// A code `( ... )` box.
    pub fn code(children: Vec<Fragment>) -> Self {
        Self::boxed(BoxFlags::code(), children)
    }

    pub fn is_box(&self) -> bool {
        matches!(self, Fragment::Box { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Fragment::Text(_))
    }

    pub fn flags(&self) -> Option<&BoxFlags> {
        match self {
            Fragment::Box { flags, .. } => Some(flags),
            Fragment::Text(_) => None,
        }
    }

    /// Children of a box fragment; empty for text.
    pub fn children(&self) -> &[Fragment] {
        match self {
            Fragment::Box { children, .. } => children,
            Fragment::Text(_) => &[],
        }
    }

    /// Unwraps a box into its children; a text fragment yields itself.
    pub fn into_children(self) -> Vec<Fragment> {
        match self {
            Fragment::Box { children, .. } => children,
            text @ Fragment::Text(_) => vec![text],
        }
    }

    /// Concatenated text of this fragment, descending into boxes.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Fragment::Text(text) => out.push_str(text),
            Fragment::Box { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Canonical form: empty text runs dropped, adjacent runs merged,
    /// recursively. Two trees that serialize identically normalize to the
    /// same fragment.
    pub fn normalized(self) -> Self {
        match self {
            Fragment::Text(_) => self,
            Fragment::Box { flags, children } => {
                let mut merged: Vec<Fragment> = Vec::with_capacity(children.len());
                for child in children {
                    match child.normalized() {
                        Fragment::Text(text) if text.is_empty() => {}
                        Fragment::Text(text) => match merged.last_mut() {
                            Some(Fragment::Text(prev)) => prev.push_str(&text),
                            _ => merged.push(Fragment::Text(text)),
                        },
                        boxed => merged.push(boxed),
                    }
                }
                Fragment::Box {
                    flags,
                    children: merged,
                }
            }
        }
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_merges_and_drops() {
        let messy = Fragment::plain(vec![
            "a".into(),
            "".into(),
            "b".into(),
            Fragment::code(vec!["".into(), "x".into(), "y".into()]),
            "c".into(),
        ]);
        assert_eq!(
            messy.normalized(),
            Fragment::plain(vec![
                "ab".into(),
                Fragment::code(vec!["xy".into()]),
                "c".into(),
            ])
        );
    }

    #[test]
    fn test_into_children_and_plain_text() {
        let frag = Fragment::plain(vec!["ab".into(), Fragment::plain(vec!["cd".into()])]);
        assert_eq!(frag.plain_text(), "abcd");
        assert_eq!(frag.clone().into_children().len(), 2);
        assert_eq!(Fragment::text("x").into_children(), vec![Fragment::text("x")]);
    }
}
