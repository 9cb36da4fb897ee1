//! Document: a box tree plus its single cursor.
//!
//! ## Learning: Splitting `impl` Blocks Across Modules
//!
//! `Document` is large, so its behavior is spread over several files, each
//! adding its own `impl Document` block:
//!
//! - `document.rs` (this file): construction, file I/O and the low-level
//!   edit helpers that keep the cursor consistent
//! - `addressing.rs`: locations and cursor placement
//! - `navigation.rs`: movement commands
//! - `mutation.rs`: editing commands
//! - `rows.rs`: row text and serialization queries
//!
//! Fields are `pub(crate)` so sibling modules can reach them while the public
//! API stays method-only.

use boxy_tree::{Codec, Cursor, Dialect, Fragment, Gravity, Layout, NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A box document being edited.
///
/// ## Learning: Composition over Inheritance
///
/// `Document` composes a [`Tree`] and a [`Cursor`] and adds the rules that
/// tie them together: every structural edit goes through a helper here that
/// shifts the cursor's child index, so the cursor can never point at a gap
/// that no longer exists.
pub struct Document {
    id: DocumentId,
    pub(crate) tree: Tree,
    pub(crate) cursor: Cursor,
    pub(crate) codec: Codec,
    /// Synthesize a trailing `" "` run at end-of-line after a final box.
    pub(crate) pad_trailing_box: bool,
    path: Option<PathBuf>,
    name: String,
    modified: bool,
    revision: u64,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        let tree = Tree::new();
        let cursor = Cursor::new(tree.root(), 0);
        Self {
            id: DocumentId::new(),
            tree,
            cursor,
            codec: Codec::default(),
            pad_trailing_box: true,
            path: None,
            name: "Untitled".to_string(),
            modified: false,
            revision: 0,
        }
    }

    /// Parses serialized text into a new document with the cursor at the
    /// start.
    pub fn from_text(text: &str) -> CoreResult<Self> {
        Self::from_text_with(text, Codec::default())
    }

    /// Like [`Document::from_text`] with an explicit dialect.
    pub fn from_text_with(text: &str, codec: Codec) -> CoreResult<Self> {
        let fragment = codec.deserialize(text)?;
        let tree = Tree::from_fragment(&fragment);
        let cursor = Cursor::new(tree.root(), 0);
        Ok(Self {
            tree,
            cursor,
            codec,
            ..Self::new()
        })
    }

    /// Opens a document from a `.box` file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::from_file_with(path, Codec::default())
    }

    pub fn from_file_with(path: impl AsRef<Path>, codec: Codec) -> CoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CoreError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let mut doc = Self::from_text_with(&text, codec)?;
        doc.name = file_name(path);
        doc.path = Some(path.to_path_buf());
        tracing::info!("Loaded {} ({} nodes)", path.display(), doc.tree.len());
        Ok(doc)
    }

    // ==================== Getters ====================

    /// Returns the document ID.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the document has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Counter bumped by every edit. Motion alone leaves it unchanged.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn set_dialect(&mut self, dialect: Dialect) {
        self.codec = Codec::new(dialect);
    }

    pub fn set_pad_trailing_box(&mut self, pad: bool) {
        self.pad_trailing_box = pad;
    }

    /// The box currently holding the cursor.
    pub fn current_box(&self) -> NodeId {
        self.cursor.parent
    }

    /// Serialization of the whole document.
    pub fn text(&self) -> String {
        self.codec.serialize(&self.tree, self.tree.root())
    }

    /// Structural snapshot of the whole document.
    pub fn snapshot(&self) -> Fragment {
        self.tree
            .to_fragment(self.tree.root())
            .unwrap_or_else(|| Fragment::plain(Vec::new()))
    }

    // ==================== File Operations ====================

    /// Saves the document to its path.
    pub fn save(&mut self) -> CoreResult<()> {
        let path = self.path.clone().ok_or(CoreError::NoPath)?;
        self.save_as(path)
    }

    /// Saves the document to a new path.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        write_atomic(path, &self.text())?;
        self.path = Some(path.to_path_buf());
        self.name = file_name(path);
        self.modified = false;
        tracing::info!("Saved {}", path.display());
        Ok(())
    }

    /// Writes the serialization of one box to `path`.
    pub fn export_box(&self, container: NodeId, path: impl AsRef<Path>) -> CoreResult<()> {
        if !self.tree.is_box(container) {
            return Err(CoreError::NotABox(container));
        }
        let path = path.as_ref();
        write_atomic(path, &self.codec.serialize(&self.tree, container))?;
        tracing::info!("Exported {} to {}", container, path.display());
        Ok(())
    }

    // ==================== Edit Helpers ====================

    pub(crate) fn touch(&mut self) {
        self.modified = true;
        self.revision += 1;
    }

    /// Inserts a detached node and shifts the cursor gap.
    pub(crate) fn insert_node(
        &mut self,
        parent: NodeId,
        index: usize,
        node: NodeId,
        gravity: Gravity,
    ) -> CoreResult<()> {
        self.tree.insert_child(parent, index, node)?;
        self.cursor.after_insert(parent, index, gravity);
        self.touch();
        Ok(())
    }

    /// Unlinks an attached node. A cursor inside it is first moved to the
    /// node's former gap.
    pub(crate) fn detach_node(&mut self, node: NodeId) -> CoreResult<(NodeId, usize)> {
        let parent = self
            .tree
            .parent(node)
            .ok_or(boxy_tree::TreeError::Detached(node))?;
        let index = self
            .tree
            .index_in_parent(node)
            .ok_or(boxy_tree::TreeError::BrokenLink { parent, child: node })?;
        if self.cursor.parent == node || self.tree.is_ancestor(node, self.cursor.parent) {
            self.cursor.place(parent, index);
        }
        self.tree.remove_child(parent, index)?;
        self.cursor.after_remove(parent, index);
        self.touch();
        Ok((parent, index))
    }

    /// Unlinks and frees an attached node.
    pub(crate) fn remove_node(&mut self, node: NodeId) -> CoreResult<(NodeId, usize)> {
        let at = self.detach_node(node)?;
        self.tree.remove(node)?;
        Ok(at)
    }

    /// Splits a run so that a cursor after the run stays after both halves.
    pub(crate) fn split_run(&mut self, run: NodeId, offset: usize) -> CoreResult<NodeId> {
        let tail = self.tree.split_text(run, offset)?;
        if let (Some(parent), Some(index)) = (self.tree.parent(tail), self.tree.index_in_parent(tail)) {
            self.cursor.after_insert(parent, index, Gravity::Before);
        }
        Ok(tail)
    }

    /// Makes `flat` a child boundary of `container` and returns the gap
    /// index there.
    pub(crate) fn gap_at(&mut self, container: NodeId, flat: usize) -> CoreResult<usize> {
        let loc = Layout::of(&self.tree, container).location_at(flat);
        if loc.node == container {
            return Ok(loc.offset);
        }
        self.split_run(loc.node, loc.offset)?;
        self.tree
            .index_in_parent(loc.node)
            .map(|i| i + 1)
            .ok_or(CoreError::Tree(boxy_tree::TreeError::Detached(loc.node)))
    }

    /// Detaches the cells `[from, to)` of `container`, in order.
    pub(crate) fn detach_range(
        &mut self,
        container: NodeId,
        from: usize,
        to: usize,
    ) -> CoreResult<Vec<Fragment>> {
        let (from, to) = (from.min(to), from.max(to));
        let start = self.gap_at(container, from)?;
        let end = self.gap_at(container, to)?;
        let mut taken = Vec::with_capacity(end.saturating_sub(start));
        for _ in start..end {
            let Some(child) = self.tree.child(container, start) else {
                break;
            };
            taken.push(
                self.tree
                    .to_fragment(child)
                    .ok_or(boxy_tree::TreeError::Dangling(child))?,
            );
            self.remove_node(child)?;
        }
        Ok(taken)
    }

    /// Materializes fragments at the cursor, in order, before the cursor.
    pub(crate) fn splice_at_cursor(&mut self, fragments: &[Fragment]) -> CoreResult<()> {
        for fragment in fragments {
            if matches!(fragment, Fragment::Text(t) if t.is_empty()) {
                continue;
            }
            let node = self.tree.materialize(fragment);
            let (parent, index) = (self.cursor.parent, self.cursor.index);
            self.insert_node(parent, index, node, Gravity::Before)?;
        }
        Ok(())
    }

    /// Removes empty runs directly inside `container`.
    pub(crate) fn strip_empty_runs(&mut self, container: NodeId) -> CoreResult<()> {
        let empties: Vec<NodeId> = self
            .tree
            .children(container)
            .iter()
            .copied()
            .filter(|&c| self.tree.text(c).is_some_and(str::is_empty))
            .collect();
        for run in empties {
            self.remove_node(run)?;
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("Unknown")
        .to_string()
}

/// Writes to a uniquely named temporary file in the target directory, then
/// renames it over `path`.
fn write_atomic(path: &Path, text: &str) -> CoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(text.as_bytes())?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_new_document_is_empty() {
        let doc = Document::new();
        assert_eq!(doc.text(), "");
        assert_eq!(doc.current_box(), doc.tree().root());
        assert!(!doc.is_modified());
    }

    #[test]
    fn test_from_text_and_back() {
        let doc = Document::from_text("ab[cd(e)]f").unwrap();
        assert_eq!(doc.text(), "ab[cd(e)]f");
        assert_eq!(doc.cursor().index, 0);
        assert!(Document::from_text("ab[").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.box");
        let mut doc = Document::from_text("x[y]").unwrap();
        doc.touch();
        doc.save_as(&path).unwrap();
        assert!(!doc.is_modified());
        assert_eq!(doc.name(), "notes.box");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let reloaded = Document::from_file(&path).unwrap();
        assert_eq!(reloaded.text(), "x[y]");
        assert_eq!(reloaded.path(), Some(path.as_path()));
    }

    #[test]
    fn test_save_keeps_files_with_similar_names_apart() {
        let dir = tempdir().unwrap();
        let names = ["draft", "draft.md", "draft.tmp"];
        for (i, name) in names.iter().enumerate() {
            let mut doc = Document::from_text(&format!("doc{}", i)).unwrap();
            doc.save_as(dir.path().join(name)).unwrap();
        }
        for (i, name) in names.iter().enumerate() {
            let text = std::fs::read_to_string(dir.path().join(name)).unwrap();
            assert_eq!(text, format!("doc{}", i));
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), names.len());
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut doc = Document::new();
        assert!(matches!(doc.save(), Err(CoreError::NoPath)));
        assert!(matches!(
            Document::from_file("/definitely/not/here.box"),
            Err(CoreError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_export_box() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inner.box");
        let doc = Document::from_text("a[b[c]]").unwrap();
        let inner = doc.tree().children(doc.tree().root())[1];
        doc.export_box(inner, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b[c]");
    }

    #[test]
    fn test_detach_range_keeps_cursor() {
        let mut doc = Document::from_text("abc[x]def").unwrap();
        let root = doc.tree().root();
        doc.cursor.place(root, 3);
        let taken = doc.detach_range(root, 1, 5).unwrap();
        assert_eq!(
            taken,
            vec![
                Fragment::text("bc"),
                Fragment::plain(vec!["x".into()]),
                Fragment::text("d")
            ]
        );
        assert_eq!(doc.text(), "aef");
        assert_eq!(doc.cursor().index, 2);
        doc.tree().validate().unwrap();
    }
}
