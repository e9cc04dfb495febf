use plate_core::{
    Document, Editor, EditorConfig, Node, Op, PluginRegistry, Point, Selection, TextRange,
    Transaction,
};
use pretty_assertions::assert_eq;

fn editor_with_text(text: &str, offset: usize) -> Editor {
    let doc = Document {
        children: vec![Node::paragraph(text)],
    };
    Editor::new(
        doc,
        Selection::collapsed(Point::new(vec![0, 0], offset)),
        PluginRegistry::core(),
    )
}

#[test]
fn chain_runs_steps_as_one_undo_step() {
    let mut editor = editor_with_text("/para", 5);

    let ok = editor
        .chain()
        .focus()
        .delete_range(TextRange::new(vec![0, 0], 0..5))
        .insert_content_at(vec![1], vec![Node::paragraph("next")], true)
        .run();

    assert!(ok);
    assert!(editor.is_focused());
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph(""), Node::paragraph("next")]
    );
    assert_eq!(editor.selection().focus, Point::new(vec![1, 0], 0));

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("/para")]);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 5));
    assert!(!editor.can_undo());

    assert!(editor.redo());
    assert_eq!(editor.doc().children.len(), 2);
}

#[test]
fn failed_step_rolls_back_earlier_steps() {
    let mut editor = editor_with_text("/para", 5);

    let ok = editor
        .chain()
        .focus()
        .delete_range(TextRange::new(vec![0, 0], 0..5))
        .command("does.not_exist", None)
        .run();

    assert!(!ok);
    assert!(!editor.is_focused());
    assert_eq!(editor.doc().children, vec![Node::paragraph("/para")]);
    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 5));
    assert!(!editor.can_undo());
    assert!(!editor.can_redo());
}

#[test]
fn focus_at_requests_scroll() {
    let mut editor = editor_with_text("abc", 0);

    assert!(editor.chain().focus_at(Point::new(vec![0, 0], 2), true).run());

    assert_eq!(editor.selection().focus, Point::new(vec![0, 0], 2));
    assert_eq!(editor.take_scroll_request(), Some(Point::new(vec![0, 0], 2)));
    assert!(!editor.can_undo());
}

#[test]
fn failed_chain_keeps_prior_history() {
    let mut editor = editor_with_text("ab", 2);
    editor
        .run_command(
            "core.delete_range",
            Some(serde_json::json!({ "path": [0, 0], "start": 1, "end": 2 })),
        )
        .unwrap();

    let ok = editor
        .chain()
        .delete_range(TextRange::new(vec![0, 0], 0..1))
        .delete_range(TextRange::new(vec![9, 0], 0..1))
        .run();

    assert!(!ok);
    assert_eq!(editor.doc().children, vec![Node::paragraph("a")]);
    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
}

/// "/para!!" with both bangs in a history capped at two records.
fn editor_with_full_history() -> Editor {
    let mut editor = editor_with_text("/para", 5).with_config(EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    });
    for offset in [5, 6] {
        let tx = Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset,
            text: "!".to_string(),
        }])
        .selection_after(Selection::collapsed(Point::new(vec![0, 0], offset + 1)));
        editor.apply(tx).unwrap();
    }
    editor
}

#[test]
fn failed_chain_rolls_back_with_full_history() {
    let mut editor = editor_with_full_history();

    let ok = editor
        .chain()
        .focus()
        .delete_range(TextRange::new(vec![0, 0], 0..5))
        .command("does.not_exist", None)
        .run();

    assert!(!ok);
    assert_eq!(editor.doc().children, vec![Node::paragraph("/para!!")]);
    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("/para")]);
}

#[test]
fn chain_is_one_undo_step_with_full_history() {
    let mut editor = editor_with_full_history();

    let ok = editor
        .chain()
        .delete_range(TextRange::new(vec![0, 0], 0..5))
        .insert_content_at(vec![1], vec![Node::paragraph("next")], true)
        .run();

    assert!(ok);
    assert_eq!(
        editor.doc().children,
        vec![Node::paragraph("!!"), Node::paragraph("next")]
    );

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("/para!!")]);
    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("/para!")]);
    assert!(!editor.can_undo());
}
