//! Arena-backed box tree.
//!
//! ## Learning: Arenas Instead of Pointers
//!
//! A box owns its children, and every child knows its parent. Modelling that
//! with `Rc<RefCell<_>>` invites reference cycles and runtime borrow panics.
//! Instead every node lives in a single `Vec` and refers to its neighbours by
//! [`NodeId`], a plain index. Moving a subtree is just rewriting two links.
//!
//! ```text
//! slots: [ root(Box) | "ab"(Text) | Box | "cd"(Text) | "ef"(Text) ]
//!            │  children: [1, 2, 4]   │
//!            │                        └─ children: [3]
//! ```

use serde::{Deserialize, Serialize};

use crate::fragment::Fragment;
use crate::{TreeError, TreeResult};

/// Stable handle to a node in a [`Tree`].
///
/// Handles are only meaningful for the tree that issued them. Slots are
/// recycled after [`Tree::remove`], so a handle must not be kept across the
/// removal of its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the raw slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which delimiter family a box belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoxKind {
    /// `[ ... ]`
    #[default]
    Plain,
    /// `( ... )`
    Code,
    /// A fenced block, optionally tagged with a language.
    Markdown { language: Option<String> },
}

/// How a markdown box is presented by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    #[default]
    Raw,
    Rendered,
}

/// Structural flags carried by every box.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoxFlags {
    pub kind: BoxKind,
    /// Shrunken boxes are opaque: the cursor never enters them.
    pub shrunken: bool,
    pub render: RenderMode,
}

impl BoxFlags {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn code() -> Self {
        Self {
            kind: BoxKind::Code,
            ..Self::default()
        }
    }

    /// Markdown flags. An empty language tag is stored as `None`.
    pub fn markdown(language: Option<String>) -> Self {
        Self {
            kind: BoxKind::Markdown {
                language: language.filter(|l| !l.is_empty()),
            },
            ..Self::default()
        }
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self.kind, BoxKind::Markdown { .. })
    }
}

/// Payload of a node.
///
/// ## Learning: Making Bad States Unrepresentable
///
/// A box may only contain text runs and boxes. Because `NodeKind` has
/// exactly these two variants, every `match` is exhaustive and there is no
/// "unexpected child" case left to handle at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Text(String),
    Box(BoxNode),
}

/// A container node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxNode {
    pub flags: BoxFlags,
    children: Vec<NodeId>,
}

impl BoxNode {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone)]
struct Slot {
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// The document tree: a root box plus every node reachable from it.
#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Tree {
    /// Creates a tree holding a single empty root box.
    pub fn new() -> Self {
        let root = Slot {
            parent: None,
            kind: NodeKind::Box(BoxNode::default()),
        };
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Builds a tree whose root holds the children of `fragment`.
    ///
    /// A text fragment becomes the root's only child.
    pub fn from_fragment(fragment: &Fragment) -> Self {
        let mut tree = Self::new();
        let root = tree.root;
        let children: Vec<NodeId> = match fragment {
            Fragment::Box { flags, children } => {
                if let Some(root_flags) = tree.flags_mut(root) {
                    root_flags.kind = flags.kind.clone();
                }
                children.iter().map(|c| tree.materialize(c)).collect()
            }
            Fragment::Text(_) => vec![tree.materialize(fragment)],
        };
        for child in children {
            tree.attach_unchecked(root, child);
        }
        tree
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn slot(&self, id: NodeId) -> Option<&Slot> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: NodeId) -> Option<&mut Slot> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    // ==================== Queries ====================

    /// Returns true if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// A tree always holds its root, so it is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.slot(id).map(|s| &s.kind)
    }

    pub fn is_box(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Box(_)))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// Length of a text run in characters; zero for anything else.
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, |t| t.chars().count())
    }

    pub fn flags(&self, id: NodeId) -> Option<&BoxFlags> {
        match self.kind(id) {
            Some(NodeKind::Box(b)) => Some(&b.flags),
            _ => None,
        }
    }

    pub fn flags_mut(&mut self, id: NodeId) -> Option<&mut BoxFlags> {
        match self.slot_mut(id).map(|s| &mut s.kind) {
            Some(NodeKind::Box(b)) => Some(&mut b.flags),
            _ => None,
        }
    }

    /// Children of a box; empty for text runs and dead handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            Some(NodeKind::Box(b)) => &b.children,
            _ => &[],
        }
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).and_then(|s| s.parent)
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Iterates over the proper ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Returns true if `ancestor` strictly contains `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Returns true if `id` is the root or hangs below it.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Returns true if `id` is a shrunken box or sits inside one.
    pub fn is_within_shrunken(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .any(|n| self.flags(n).is_some_and(|f| f.shrunken))
    }

    // ==================== Construction ====================

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let slot = Slot { parent: None, kind };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(slot));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Allocates a detached text run.
    pub fn new_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    /// Allocates a detached, empty box.
    pub fn new_box(&mut self, flags: BoxFlags) -> NodeId {
        self.alloc(NodeKind::Box(BoxNode {
            flags,
            children: Vec::new(),
        }))
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match self.slot_mut(id).map(|s| &mut s.kind) {
            Some(NodeKind::Text(t)) => Some(t),
            _ => None,
        }
    }

    /// Allocates `fragment` as a detached subtree and returns its top node.
    pub fn materialize(&mut self, fragment: &Fragment) -> NodeId {
        match fragment {
            Fragment::Text(text) => self.new_text(text.clone()),
            Fragment::Box { flags, children } => {
                let id = self.new_box(flags.clone());
                for child in children {
                    let child_id = self.materialize(child);
                    self.attach_unchecked(id, child_id);
                }
                id
            }
        }
    }

    fn attach_unchecked(&mut self, parent: NodeId, child: NodeId) {
        if let Some(Slot {
            kind: NodeKind::Box(b),
            ..
        }) = self.slot_mut(parent)
        {
            b.children.push(child);
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
    }

    // ==================== Structural Edits ====================

    /// Inserts a detached node as child `index` of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> TreeResult<()> {
        if !self.contains(child) {
            return Err(TreeError::Dangling(child));
        }
        if child == self.root {
            return Err(TreeError::RootIsFixed);
        }
        if self.parent(child).is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        match self.slot_mut(parent).map(|s| &mut s.kind) {
            None => return Err(TreeError::Dangling(parent)),
            Some(NodeKind::Text(_)) => return Err(TreeError::NotABox(parent)),
            Some(NodeKind::Box(b)) => {
                if index > b.children.len() {
                    return Err(TreeError::IndexOutOfBounds {
                        index,
                        len: b.children.len(),
                    });
                }
                b.children.insert(index, child);
            }
        }
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = Some(parent);
        }
        Ok(())
    }

    /// Appends a detached node to `parent`.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        let index = self.child_count(parent);
        self.insert_child(parent, index, child)
    }

    /// Unlinks `id` from its parent, returning the former parent and index.
    pub fn detach(&mut self, id: NodeId) -> TreeResult<(NodeId, usize)> {
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self
            .index_in_parent(id)
            .ok_or(TreeError::BrokenLink { parent, child: id })?;
        self.remove_child(parent, index)?;
        Ok((parent, index))
    }

    /// Unlinks child `index` of `parent` and returns it (still allocated).
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> TreeResult<NodeId> {
        let child = match self.slot_mut(parent).map(|s| &mut s.kind) {
            None => return Err(TreeError::Dangling(parent)),
            Some(NodeKind::Text(_)) => return Err(TreeError::NotABox(parent)),
            Some(NodeKind::Box(b)) => {
                if index >= b.children.len() {
                    return Err(TreeError::IndexOutOfBounds {
                        index,
                        len: b.children.len(),
                    });
                }
                b.children.remove(index)
            }
        };
        if let Some(slot) = self.slot_mut(child) {
            slot.parent = None;
        }
        Ok(child)
    }

    /// Unlinks every child of a box, in order.
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = match self.slot_mut(id).map(|s| &mut s.kind) {
            Some(NodeKind::Box(b)) => std::mem::take(&mut b.children),
            _ => Vec::new(),
        };
        for &child in &children {
            if let Some(slot) = self.slot_mut(child) {
                slot.parent = None;
            }
        }
        children
    }

    /// Detaches `id` (if attached) and frees it with its whole subtree.
    pub fn remove(&mut self, id: NodeId) -> TreeResult<()> {
        if id == self.root {
            return Err(TreeError::RootIsFixed);
        }
        if !self.contains(id) {
            return Err(TreeError::Dangling(id));
        }
        if self.parent(id).is_some() {
            self.detach(id)?;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            if let Some(slot) = self.slots.get_mut(node.0).and_then(Option::take) {
                if let NodeKind::Box(b) = slot.kind {
                    stack.extend(b.children);
                }
                self.free.push(node.0);
            }
        }
        Ok(())
    }

    /// Splits a text run at a character offset.
    ///
    /// The run keeps `[..offset]`; a new run holding `[offset..]` is inserted
    /// right after it and returned. Both halves are non-empty, so `offset`
    /// must lie strictly inside the run.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> TreeResult<NodeId> {
        let len = self.text_len(id);
        if !self.is_text(id) {
            return Err(TreeError::NotText(id));
        }
        if offset == 0 || offset >= len {
            return Err(TreeError::SplitOutOfRange {
                node: id,
                offset,
                len,
            });
        }
        let parent = self.parent(id).ok_or(TreeError::Detached(id))?;
        let index = self
            .index_in_parent(id)
            .ok_or(TreeError::BrokenLink { parent, child: id })?;
        let tail = match self.text_mut(id) {
            Some(text) => {
                let at = byte_offset(text, offset);
                text.split_off(at)
            }
            None => return Err(TreeError::NotText(id)),
        };
        let tail_id = self.new_text(tail);
        self.insert_child(parent, index + 1, tail_id)?;
        Ok(tail_id)
    }

    // ==================== Fragments ====================

    /// Copies the subtree at `id` into an owned [`Fragment`].
    pub fn to_fragment(&self, id: NodeId) -> Option<Fragment> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(Fragment::Text(text.clone())),
            NodeKind::Box(b) => Some(Fragment::Box {
                flags: b.flags.clone(),
                children: b
                    .children
                    .iter()
                    .filter_map(|&c| self.to_fragment(c))
                    .collect(),
            }),
        }
    }

    /// Removes the subtree at `id` and returns it as a [`Fragment`].
    pub fn extract(&mut self, id: NodeId) -> TreeResult<Fragment> {
        let fragment = self.to_fragment(id).ok_or(TreeError::Dangling(id))?;
        self.remove(id)?;
        Ok(fragment)
    }

    // ==================== Invariants ====================

    /// Checks the structural invariants of the whole arena.
    ///
    /// * every child link is mirrored by a parent link and vice versa
    /// * no text run is empty
    /// * every live node is reachable from the root
    pub fn validate(&self) -> TreeResult<()> {
        for (index, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let id = NodeId(index);
            match &slot.kind {
                NodeKind::Text(text) if text.is_empty() => return Err(TreeError::EmptyText(id)),
                NodeKind::Text(_) => {}
                NodeKind::Box(b) => {
                    for &child in &b.children {
                        if self.parent(child) != Some(id) {
                            return Err(TreeError::BrokenLink { parent: id, child });
                        }
                    }
                }
            }
            if let Some(parent) = slot.parent {
                if !self.children(parent).contains(&id) {
                    return Err(TreeError::BrokenLink { parent, child: id });
                }
            }
            if !self.is_attached(id) {
                return Err(TreeError::Orphan(id));
            }
        }
        Ok(())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator returned by [`Tree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Converts a character offset into a byte offset, clamping at the end.
pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}
