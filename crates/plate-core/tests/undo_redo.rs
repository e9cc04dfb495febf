use plate_core::{
    ApplyError, Document, Editor, EditorConfig, Node, NormalizePass, Op, PlatePlugin,
    PluginRegistry, Point, Selection, Transaction,
};

fn editor_with_text(text: &str) -> Editor {
    let doc = Document {
        children: vec![Node::paragraph(text)],
    };
    let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
    Editor::new(doc, selection, PluginRegistry::core())
}

#[test]
fn undo_redo_handles_multi_op_insert_order() {
    let mut editor = editor_with_text("");

    let tx = Transaction::new(vec![
        Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "a".to_string(),
        },
        Op::InsertText {
            path: vec![0, 0],
            offset: 1,
            text: "b".to_string(),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(vec![0, 0], 2)))
    .source("test:multi_insert");

    editor.apply(tx).unwrap();
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
    assert_eq!(editor.selection().focus.offset, 2);

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert_eq!(editor.selection().focus.offset, 0);

    assert!(editor.redo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
    assert_eq!(editor.selection().focus.offset, 2);
}

#[test]
fn undo_redo_handles_multi_op_paste_newline_shape() {
    let mut editor = editor_with_text("XYZ");
    let selection_before = editor.selection().clone();

    let tx = Transaction::new(vec![
        Op::RemoveText {
            path: vec![0, 0],
            range: 0..3,
        },
        Op::InsertText {
            path: vec![0, 0],
            offset: 0,
            text: "a".to_string(),
        },
        Op::InsertNode {
            path: vec![1],
            node: Node::paragraph("bXYZ"),
        },
    ])
    .selection_after(Selection::collapsed(Point::new(vec![1, 0], 1)))
    .source("test:paste_newline");

    editor.apply(tx).unwrap();
    let doc_after = editor.doc().clone();
    let selection_after = editor.selection().clone();

    assert_eq!(doc_after.children.len(), 2);
    assert_eq!(selection_after.focus.path, vec![1, 0]);
    assert_eq!(selection_after.focus.offset, 1);

    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("XYZ")]);
    assert_eq!(editor.selection(), &selection_before);

    assert!(editor.redo());
    assert_eq!(editor.doc(), &doc_after);
    assert_eq!(editor.selection(), &selection_after);
}

#[test]
fn preview_leaves_the_editor_untouched() {
    let editor = editor_with_text("ab");

    let tx = Transaction::new(vec![Op::InsertNode {
        path: vec![1],
        node: Node::paragraph("c"),
    }])
    .selection_after(Selection::collapsed(Point::new(vec![1, 0], 1)));

    let preview = editor.preview_transaction(&tx).unwrap();
    assert_eq!(
        preview.doc.children,
        vec![Node::paragraph("ab"), Node::paragraph("c")]
    );
    assert_eq!(preview.selection.focus, Point::new(vec![1, 0], 1));
    assert!(preview.selection.is_collapsed());

    assert_eq!(editor.doc().children, vec![Node::paragraph("ab")]);
    assert!(!editor.can_undo());
}

#[test]
fn preview_reports_invalid_paths() {
    let editor = editor_with_text("");
    let tx = Transaction::new(vec![Op::RemoveNode { path: vec![3] }]);
    assert!(editor.preview_transaction(&tx).is_err());
}

#[test]
fn undo_history_is_capped() {
    let mut editor = editor_with_text("").with_config(EditorConfig {
        max_undo: 2,
        ..EditorConfig::default()
    });

    for (ix, ch) in ["a", "b", "c"].into_iter().enumerate() {
        let tx = Transaction::new(vec![Op::InsertText {
            path: vec![0, 0],
            offset: ix,
            text: ch.to_string(),
        }])
        .selection_after(Selection::collapsed(Point::new(vec![0, 0], ix + 1)));
        editor.apply(tx).unwrap();
    }

    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("a")]);
}

#[test]
fn single_normalize_round_fits_the_limit() {
    let mut editor = editor_with_text("a").with_config(EditorConfig {
        max_normalize_iterations: 1,
        ..EditorConfig::default()
    });

    editor
        .apply(Transaction::new(vec![Op::RemoveNode { path: vec![0] }]))
        .unwrap();

    assert_eq!(editor.doc().children, vec![Node::paragraph("")]);
    assert!(editor.undo());
    assert_eq!(editor.doc().children, vec![Node::paragraph("a")]);
}

/// Keeps prepending "!" to a paragraph that starts with one.
struct RunawayPass;

impl NormalizePass for RunawayPass {
    fn id(&self) -> &'static str {
        "test.runaway"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        match doc.children.first() {
            Some(block) if block.text_content().starts_with('!') => vec![Op::InsertText {
                path: vec![0, 0],
                offset: 0,
                text: "!".to_string(),
            }],
            _ => Vec::new(),
        }
    }
}

struct RunawayPlugin;

impl PlatePlugin for RunawayPlugin {
    fn id(&self) -> &'static str {
        "test.runaway"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(RunawayPass)]
    }
}

#[test]
fn non_converging_normalize_restores_the_document() {
    let mut registry = PluginRegistry::core();
    registry.register_plugin(Box::new(RunawayPlugin)).unwrap();
    let before = Selection::collapsed(Point::new(vec![0, 0], 1));
    let mut editor = Editor::new(
        Document {
            children: vec![Node::paragraph("a")],
        },
        before.clone(),
        registry,
    )
    .with_config(EditorConfig {
        max_normalize_iterations: 3,
        ..EditorConfig::default()
    });

    let err = editor
        .apply(
            Transaction::new(vec![Op::InsertText {
                path: vec![0, 0],
                offset: 0,
                text: "!".to_string(),
            }])
            .selection_after(Selection::collapsed(Point::new(vec![0, 0], 0))),
        )
        .unwrap_err();

    assert!(matches!(err, ApplyError::NormalizeDidNotConverge));
    assert_eq!(editor.doc().children, vec![Node::paragraph("a")]);
    assert_eq!(editor.selection(), &before);
    assert!(!editor.can_undo());
}
