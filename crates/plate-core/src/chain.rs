use serde_json::Value;

use crate::core::{Editor, Node, Point};
use crate::ops::{Path, TextRange};
use crate::plugin::CommandError;

enum Step {
    Focus {
        at: Option<Point>,
        scroll_into_view: bool,
    },
    DeleteRange(TextRange),
    InsertContentAt {
        path: Path,
        nodes: Vec<Node>,
        update_selection: bool,
    },
    Command {
        id: String,
        args: Option<Value>,
    },
}

/// A batch of editor commands that succeeds or fails as a whole.
///
/// Steps run in order when [`Chain::run`] is called. If any step fails,
/// the steps before it are undone and `run` returns false; on success the
/// whole chain becomes a single undo step.
pub struct Chain<'a> {
    editor: &'a mut Editor,
    steps: Vec<Step>,
}

impl<'a> Chain<'a> {
    pub(crate) fn new(editor: &'a mut Editor) -> Self {
        Self {
            editor,
            steps: Vec::new(),
        }
    }

    pub fn focus(mut self) -> Self {
        self.steps.push(Step::Focus {
            at: None,
            scroll_into_view: false,
        });
        self
    }

    pub fn focus_at(mut self, at: Point, scroll_into_view: bool) -> Self {
        self.steps.push(Step::Focus {
            at: Some(at),
            scroll_into_view,
        });
        self
    }

    pub fn delete_range(mut self, range: TextRange) -> Self {
        self.steps.push(Step::DeleteRange(range));
        self
    }

    pub fn insert_content_at(
        mut self,
        path: Path,
        nodes: Vec<Node>,
        update_selection: bool,
    ) -> Self {
        self.steps.push(Step::InsertContentAt {
            path,
            nodes,
            update_selection,
        });
        self
    }

    pub fn command(mut self, id: impl Into<String>, args: Option<Value>) -> Self {
        self.steps.push(Step::Command {
            id: id.into(),
            args,
        });
        self
    }

    pub fn run(self) -> bool {
        let Chain { editor, steps } = self;
        let checkpoint = editor.undo_checkpoint();
        let was_focused = editor.is_focused();

        for step in steps {
            if let Err(err) = run_step(editor, step) {
                tracing::debug!(error = err.message(), "command chain failed, rolling back");
                editor.rollback_to(checkpoint);
                if !was_focused {
                    editor.blur();
                }
                return false;
            }
        }

        editor.squash_undo_since(checkpoint);
        true
    }
}

fn run_step(editor: &mut Editor, step: Step) -> Result<(), CommandError> {
    match step {
        Step::Focus {
            at,
            scroll_into_view,
        } => {
            editor.focus(at, scroll_into_view);
            Ok(())
        }
        Step::DeleteRange(TextRange { path, range }) => editor.run_command(
            "core.delete_range",
            Some(serde_json::json!({
                "path": path,
                "start": range.start,
                "end": range.end,
            })),
        ),
        Step::InsertContentAt {
            path,
            nodes,
            update_selection,
        } => editor.run_command(
            "core.insert_content_at",
            Some(serde_json::json!({
                "path": path,
                "nodes": nodes,
                "update_selection": update_selection,
            })),
        ),
        Step::Command { id, args } => editor.run_command(&id, args),
    }
}
