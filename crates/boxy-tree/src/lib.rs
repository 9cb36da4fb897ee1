//! # Boxy Tree
//!
//! The structural document model of the box editor: a tree of boxes and
//! text runs, plus the value types and views built on top of it.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Ownership & Borrowing
//! - `Tree` owns every node; callers hold `NodeId` handles, not references
//! - Queries take `&self` and hand out borrowed `&str` / `&[NodeId]`
//! - Structural edits take `&mut self`, so no query can observe a half-done edit
//!
//! ### Owned Snapshots
//! - `Fragment` is a self-contained copy of a subtree
//! - It is what the kill ring stores and what the codec produces

mod codec;
mod cursor;
mod fragment;
mod kill_ring;
mod layout;
mod selection;
mod tree;

pub use codec::{Codec, Dialect, FENCE};
pub use cursor::{Cursor, CursorPosition, Gravity, Location};
pub use fragment::Fragment;
pub use kill_ring::{Clip, KillRing};
pub use layout::{Cell, Layout};
pub use selection::Selection;
pub use tree::{Ancestors, BoxFlags, BoxKind, BoxNode, NodeId, NodeKind, RenderMode, Tree};

/// Result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Result type for parsing
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised by structural edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Node {0} does not exist")]
    Dangling(NodeId),

    #[error("Node {0} is not a box")]
    NotABox(NodeId),

    #[error("Node {0} is not a text run")]
    NotText(NodeId),

    #[error("Node {0} already has a parent")]
    AlreadyAttached(NodeId),

    #[error("Node {0} has no parent")]
    Detached(NodeId),

    #[error("Inserting {child} into {parent} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },

    #[error("Child index {index} is out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Cannot split {node} at {offset} (len {len})")]
    SplitOutOfRange {
        node: NodeId,
        offset: usize,
        len: usize,
    },

    #[error("The root box cannot be moved or removed")]
    RootIsFixed,

    #[error("Text run {0} is empty")]
    EmptyText(NodeId),

    #[error("Parent link between {parent} and {child} is broken")]
    BrokenLink { parent: NodeId, child: NodeId },

    #[error("Node {0} is not reachable from the root")]
    Orphan(NodeId),
}

/// Errors raised while parsing bracketed text. Offsets count characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Unclosed '{delimiter}' opened at offset {offset}")]
    UnclosedDelimiter { delimiter: char, offset: usize },

    #[error("Unexpected '{found}' at offset {offset}")]
    UnexpectedCloser { found: char, offset: usize },

    #[error("Expected '{expected}' but found '{found}' at offset {offset}")]
    MismatchedDelimiter {
        expected: char,
        found: char,
        offset: usize,
    },

    #[error("Unterminated code fence opened at offset {offset}")]
    UnclosedFence { offset: usize },
}

impl CodecError {
    /// The character offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            CodecError::UnclosedDelimiter { offset, .. }
            | CodecError::UnexpectedCloser { offset, .. }
            | CodecError::MismatchedDelimiter { offset, .. }
            | CodecError::UnclosedFence { offset } => *offset,
        }
    }

    /// Moves the offset of an error found in a sub-slice into the
    /// coordinates of the enclosing text.
    pub(crate) fn shifted(self, by: usize) -> Self {
        match self {
            CodecError::UnclosedDelimiter { delimiter, offset } => CodecError::UnclosedDelimiter {
                delimiter,
                offset: offset + by,
            },
            CodecError::UnexpectedCloser { found, offset } => CodecError::UnexpectedCloser {
                found,
                offset: offset + by,
            },
            CodecError::MismatchedDelimiter {
                expected,
                found,
                offset,
            } => CodecError::MismatchedDelimiter {
                expected,
                found,
                offset: offset + by,
            },
            CodecError::UnclosedFence { offset } => CodecError::UnclosedFence {
                offset: offset + by,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn text_strategy() -> impl Strategy<Value = String> {
        "[a-z \n]{1,6}"
    }

    fn fragment_strategy() -> impl Strategy<Value = Fragment> {
        let leaf = text_strategy().prop_map(Fragment::Text);
        leaf.prop_recursive(4, 32, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Fragment::plain),
                prop::collection::vec(inner.clone(), 0..5).prop_map(Fragment::code),
                (
                    prop::option::of("[a-z+]{1,4}"),
                    prop::collection::vec(inner, 0..5)
                )
                    .prop_map(|(language, children)| {
                        Fragment::boxed(BoxFlags::markdown(language), children)
                    }),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_codec_roundtrip(children in prop::collection::vec(fragment_strategy(), 0..6)) {
            let codec = Codec::default();
            let original = Fragment::plain(children).normalized();
            let text = codec.serialize_fragment(&original);
            let parsed = codec.deserialize(&text).unwrap();
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn prop_tree_and_fragment_agree(children in prop::collection::vec(fragment_strategy(), 0..6)) {
            let codec = Codec::default();
            let fragment = Fragment::plain(children);
            let tree = Tree::from_fragment(&fragment);
            tree.validate().unwrap();
            prop_assert_eq!(codec.serialize(&tree, tree.root()), codec.serialize_fragment(&fragment));
        }
    }

    #[test]
    fn test_error_offsets() {
        let err = CodecError::UnclosedFence { offset: 3 }.shifted(4);
        assert_eq!(err.offset(), 7);
        assert_eq!(
            err.to_string(),
            "Unterminated code fence opened at offset 7"
        );
    }
}
