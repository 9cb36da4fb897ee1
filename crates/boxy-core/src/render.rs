//! Display views of boxes.
//!
//! A box is shown one of three ways: as its raw serialization, collapsed
//! (shrunken), or as rendered markdown. The choice is a pure function of the
//! box flags, so front ends never have to swap the document's content for
//! HTML and back.

use boxy_tree::{Codec, NodeId, RenderMode, Tree};

use crate::document::Document;
use crate::{CoreError, CoreResult};

/// How a box should be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Serialized contents, shown as editable text
    Raw(String),
    /// A shrunken box, shown as a placeholder
    Collapsed,
    /// Rendered markdown
    Html(String),
}

/// Computes the view of `container`. `None` if it is not a box.
pub fn view(tree: &Tree, codec: &Codec, container: NodeId) -> Option<View> {
    let flags = tree.flags(container)?;
    let text = codec.serialize(tree, container);
    Some(if flags.shrunken {
        View::Collapsed
    } else if flags.render == RenderMode::Rendered {
        View::Html(markdown_html(&text))
    } else {
        View::Raw(text)
    })
}

/// Converts markdown to HTML after collapsing blank lines and trimming.
pub fn markdown_html(text: &str) -> String {
    let collapsed = text.replace("\n\n", "\n");
    comrak::markdown_to_html(collapsed.trim(), &comrak::Options::default())
}

impl Document {
    /// The view of one box of this document.
    pub fn view(&self, container: NodeId) -> Option<View> {
        view(&self.tree, &self.codec, container)
    }

    /// Shows the current box as rendered markdown and exits it to the
    /// right.
    pub fn format_markdown_box(&mut self) -> CoreResult<()> {
        let current = self.cursor.parent;
        if current == self.tree.root() {
            return Err(CoreError::InvalidOperation(
                "Cannot format toplevel box as markdown".into(),
            ));
        }
        let Some(flags) = self.tree.flags_mut(current) else {
            return Err(CoreError::NotABox(current));
        };
        if flags.render == RenderMode::Rendered {
            return Err(CoreError::InvalidOperation("Box is already markdown".into()));
        }
        flags.render = RenderMode::Rendered;
        self.touch();
        self.exit_box_right();
        tracing::debug!("Rendering {} as markdown", current);
        Ok(())
    }

    /// Switches a rendered box back to raw text.
    pub fn show_raw(&mut self, container: NodeId) -> bool {
        match self.tree.flags_mut(container) {
            Some(flags) if flags.render == RenderMode::Rendered => {
                flags.render = RenderMode::Raw;
                self.touch();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_html_collapses_blank_lines() {
        let html = markdown_html("\n# Title\n\nbody\n\n");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn test_format_and_show_raw() {
        let mut doc = Document::from_text("[# Hi]").unwrap();
        assert!(matches!(
            doc.format_markdown_box(),
            Err(CoreError::InvalidOperation(msg)) if msg.contains("toplevel")
        ));

        doc.enter_box();
        let inner = doc.current_box();
        assert_eq!(doc.view(inner), Some(View::Raw("# Hi".into())));
        doc.format_markdown_box().unwrap();
        assert_eq!(doc.current_box(), doc.tree().root());
        assert!(matches!(doc.view(inner), Some(View::Html(html)) if html.contains("<h1>Hi</h1>")));
        assert_eq!(doc.text(), "[# Hi]");

        doc.enter_box();
        assert!(doc.format_markdown_box().is_err());
        assert!(doc.show_raw(inner));
        assert!(!doc.show_raw(inner));
        assert_eq!(doc.view(inner), Some(View::Raw("# Hi".into())));
    }

    #[test]
    fn test_shrunken_view() {
        let mut doc = Document::from_text("[abc]").unwrap();
        doc.enter_box();
        let inner = doc.current_box();
        doc.shrink_box();
        assert_eq!(doc.view(inner), Some(View::Collapsed));
        let run = doc.tree().children(doc.tree().root())[0];
        assert_eq!(doc.view(run), None);
        assert_eq!(doc.view(doc.tree().root()), Some(View::Raw("[abc]".into())));
    }
}
