//! End-to-end editing scenarios and structural properties.

use boxy_core::{
    BoxFlags, BoxKind, Clip, Command, CursorPosition, Document, Editor, Fragment, Location, NodeId,
};
use boxy_tree::Codec;
use proptest::prelude::*;

fn all_nodes(doc: &Document) -> Vec<NodeId> {
    let tree = doc.tree();
    let mut out = vec![tree.root()];
    let mut i = 0;
    while i < out.len() {
        out.extend_from_slice(tree.children(out[i]));
        i += 1;
    }
    out
}

/// The cursor sits in a live, visible box at a valid gap.
fn assert_cursor_valid(doc: &Document) {
    let tree = doc.tree();
    let cursor = doc.cursor();
    assert!(tree.is_box(cursor.parent));
    assert!(tree.is_attached(cursor.parent));
    assert!(cursor.index <= tree.child_count(cursor.parent));
    assert!(!tree.is_within_shrunken(cursor.parent));
}

#[test]
fn scenario_build_a_box_from_empty() {
    let mut editor = Editor::new();
    editor
        .execute(&Command::InsertBox {
            kind: BoxKind::Plain,
        })
        .unwrap();
    editor
        .execute(&Command::InsertText("hello".into()))
        .unwrap();
    editor.execute(&Command::ExitBoxRight).unwrap();
    assert_eq!(editor.document().text(), "[hello]");
    assert_eq!(editor.document().current_box(), editor.document().tree().root());
}

#[test]
fn scenario_forward_skips_a_box_in_one_step() {
    let mut doc = Document::from_text("ab[cd]ef").unwrap();
    let root = doc.tree().root();
    let mut offsets = Vec::new();
    for _ in 0..6 {
        doc.move_forward();
        offsets.push(doc.cursor_position().offset);
        assert_eq!(doc.current_box(), root);
    }
    // a, b, then the whole box; the cursor stops before `e` after three moves
    assert_eq!(offsets, vec![1, 2, 3, 4, 5, 5]);
    assert_eq!(doc.text(), "ab[cd]ef");
}

#[test]
fn scenario_kill_line_after_separator() {
    let mut editor = Editor::new();
    editor.open_text("[foo | bar]").unwrap();
    editor.execute(&Command::EnterBox).unwrap();
    let inner = editor.document().current_box();
    assert!(editor.document_mut().set_cursor_position(CursorPosition {
        container: inner,
        offset: 6,
    }));
    editor.execute(&Command::KillLine).unwrap();

    assert_eq!(editor.document().current_row_text(), "foo | ");
    assert_eq!(
        editor.kill_ring().peek(),
        Some(&Clip::Span(Fragment::plain(vec!["bar".into()])))
    );
    editor.document().tree().validate().unwrap();
}

#[test]
fn scenario_move_up_keeps_column() {
    let mut doc = Document::from_text("[one\ntwo]").unwrap();
    assert!(doc.enter_box());
    let inner = doc.current_box();
    assert!(doc.set_cursor_position(CursorPosition {
        container: inner,
        offset: 5,
    }));
    assert!(doc.move_up());
    assert_eq!(
        doc.cursor_position(),
        CursorPosition {
            container: inner,
            offset: 1
        }
    );
    assert!(!doc.move_up());
    assert_eq!(doc.cursor_position().offset, 1);
}

#[test]
fn boundaries_are_silent_noops() {
    let mut doc = Document::from_text("x[y]z").unwrap();
    assert!(!doc.move_backward());
    assert!(!doc.exit_box_right());
    assert!(!doc.exit_box_left());
    assert_eq!(doc.delete_current_box().unwrap(), None);
    doc.move_to_end_of_box();
    assert!(!doc.move_forward());
    assert_eq!(doc.text(), "x[y]z");
}

#[test]
fn malformed_content_leaves_box_untouched() {
    let mut doc = Document::from_text("keep [this]").unwrap();
    let inner = doc.find_box_by_content("this").unwrap();
    assert!(doc.set_box_content(inner, "(unbalanced]").is_err());
    assert_eq!(doc.text(), "keep [this]");
}

#[test]
fn markdown_boxes_round_trip() {
    let text = "intro\n```rust\nfn main() {}\n```";
    let doc = Document::from_text(text).unwrap();
    assert_eq!(doc.text(), text);
    let root = doc.tree().root();
    let fenced = doc.tree().children(root)[1];
    assert_eq!(
        doc.tree().flags(fenced),
        Some(&BoxFlags::markdown(Some("rust".into())))
    );
}

#[test]
fn text_after_markdown_box_reloads() {
    let text = "```md\nx\n```abc\nmore";
    let doc = Document::from_text(text).unwrap();
    assert_eq!(doc.text(), text);
    let root = doc.tree().root();
    assert_eq!(doc.tree().child_count(root), 2);
    assert_eq!(doc.tree().text(doc.tree().children(root)[1]), Some("abc\nmore"));
}

#[test]
fn nested_markdown_keeps_its_content() {
    let nested = Fragment::plain(vec![Fragment::boxed(
        BoxFlags::markdown(Some("md".into())),
        vec![
            " a\n".into(),
            Fragment::boxed(BoxFlags::markdown(None), vec!["b\n".into()]),
        ],
    )]);
    let text = Codec::default().serialize_fragment(&nested);
    let doc = Document::from_text(&text).unwrap();
    assert_eq!(doc.snapshot(), nested);
    assert_eq!(Document::from_text(&doc.text()).unwrap().snapshot(), nested);
}

// ==================== Properties ====================

fn text_strategy() -> impl Strategy<Value = String> {
    "[a-z \n]{1,6}"
}

fn fragment_strategy(markdown: bool) -> BoxedStrategy<Fragment> {
    let leaf = text_strategy().prop_map(Fragment::Text);
    leaf.prop_recursive(3, 24, 4, move |inner| {
        let plain = prop::collection::vec(inner.clone(), 0..4).prop_map(Fragment::plain);
        let code = prop::collection::vec(inner.clone(), 0..4).prop_map(Fragment::code);
        if !markdown {
            return prop_oneof![plain, code].boxed();
        }
        let fenced = (
            prop::option::of("[a-z]{1,5}"),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(language, children)| {
                Fragment::boxed(BoxFlags::markdown(language), children)
            });
        prop_oneof![plain, code, fenced].boxed()
    })
    .boxed()
}

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::MoveForward),
        Just(Command::MoveBackward),
        Just(Command::MoveUp),
        Just(Command::MoveDown),
        Just(Command::EnterBox),
        Just(Command::ExitBoxLeft),
        Just(Command::ExitBoxRight),
        Just(Command::MoveToStartOfLine),
        Just(Command::MoveToEndOfLine),
        Just(Command::MoveToStartOfBox),
        Just(Command::MoveToEndOfBox),
        "[a-z \n]{0,3}".prop_map(Command::InsertText),
        Just(Command::InsertNewline),
        Just(Command::DeleteBackward),
        Just(Command::DeleteForward),
        Just(Command::KillLine),
        Just(Command::Yank),
        Just(Command::InsertBox {
            kind: BoxKind::Plain
        }),
        Just(Command::InsertBox { kind: BoxKind::Code }),
        Just(Command::DeleteCurrentBox),
        Just(Command::ExplodeBox),
        Just(Command::ShrinkBox),
        Just(Command::ExpandBox),
        Just(Command::SetMark),
    ]
}

proptest! {
    #[test]
    fn prop_document_round_trip(children in prop::collection::vec(fragment_strategy(true), 0..5)) {
        let original = Fragment::plain(children).normalized();
        let text = Codec::default().serialize_fragment(&original);
        let doc = Document::from_text(&text).unwrap();
        prop_assert_eq!(doc.snapshot(), original.clone());
        prop_assert_eq!(doc.text(), text);
        let again = Document::from_text(&doc.text()).unwrap();
        prop_assert_eq!(again.snapshot(), original);
    }

    #[test]
    fn prop_resolve_position_is_idempotent(
        children in prop::collection::vec(fragment_strategy(true), 0..5),
        pick in any::<prop::sample::Index>(),
        offset in 0usize..12,
    ) {
        let mut doc = Document::from_text("").unwrap();
        doc.insert_fragment_contents(&Fragment::plain(children)).unwrap();
        let nodes = all_nodes(&doc);
        let node = nodes[pick.index(nodes.len())];
        let once = doc.resolve_position(Location::new(node, offset));
        let twice = doc.resolve_position(once);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_motion_never_enters_boxes(children in prop::collection::vec(fragment_strategy(true), 0..5)) {
        let mut doc = Document::from_text("").unwrap();
        doc.insert_fragment_contents(&Fragment::plain(children)).unwrap();
        doc.move_to_start_of_box();
        let text = doc.text();
        for _ in 0..500 {
            let before = doc.current_box();
            if !doc.move_forward() {
                break;
            }
            let after = doc.current_box();
            prop_assert!(after == before || doc.tree().is_ancestor(after, before));
        }
        prop_assert!(!doc.move_forward());
        for _ in 0..500 {
            let before = doc.current_box();
            if !doc.move_backward() {
                break;
            }
            let after = doc.current_box();
            prop_assert!(after == before || doc.tree().is_ancestor(after, before));
        }
        prop_assert!(!doc.move_backward());
        prop_assert_eq!(doc.text(), text);
    }

    #[test]
    fn prop_edits_keep_tree_well_formed(
        children in prop::collection::vec(fragment_strategy(false), 0..4),
        commands in prop::collection::vec(command_strategy(), 1..40),
    ) {
        let mut editor = Editor::new();
        editor
            .document_mut()
            .insert_fragment_contents(&Fragment::plain(children))
            .unwrap();
        editor.document_mut().move_to_start_of_box();
        for command in &commands {
            let _ = editor.execute(command);
            let doc = editor.document();
            prop_assert!(doc.tree().validate().is_ok(), "after {:?}", command);
            assert_cursor_valid(doc);
            prop_assert!(Document::from_text(&doc.text()).is_ok());
        }
    }
}
