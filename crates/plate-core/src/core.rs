use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::Chain;
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError, TransactionPreview};
use crate::ui::NodeViewProps;

pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::Element(ElementNode {
            kind: "paragraph".to_string(),
            attrs: Attrs::default(),
            children: vec![Node::text(text)],
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode { text: text.into() })
    }

    pub fn void(kind: impl Into<String>, attrs: Attrs) -> Self {
        Node::Void(VoidNode {
            kind: kind.into(),
            attrs,
        })
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Node::Element(el) => Some(&el.kind),
            Node::Void(v) => Some(&v.kind),
            Node::Text(_) => None,
        }
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Node::Element(el) => Some(&el.attrs),
            Node::Void(v) => Some(&v.attrs),
            Node::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.text.clone(),
            Node::Void(_) => String::new(),
            Node::Element(el) => el.children.iter().map(Node::text_content).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn node(path: Path) -> Self {
        Self::collapsed(Point::new(path, 0))
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EditorConfig {
    pub max_undo: usize,
    pub max_normalize_iterations: usize,
}

impl EditorConfig {
    fn with_defaults(mut self) -> Self {
        if self.max_undo == 0 {
            self.max_undo = 200;
        }
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self
    }
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    config: EditorConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    focused: bool,
    scroll_request: Option<Point>,
    open_chains: usize,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        let config = EditorConfig::default().with_defaults();
        let mut editor = Self {
            doc,
            selection,
            registry,
            config,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            focused: false,
            scroll_request: None,
            open_chains: 0,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config.with_defaults();
        self.trim_undo_history();
        self
    }

    pub fn with_core_plugins() -> Self {
        Self::with_registry(PluginRegistry::core())
    }

    pub fn with_registry(registry: PluginRegistry) -> Self {
        let doc = Document {
            children: vec![Node::paragraph("")],
        };
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, selection, registry)
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self, at: Option<Point>, scroll_into_view: bool) {
        if let Some(point) = at {
            self.set_selection(Selection::collapsed(point));
        }
        self.focused = true;
        if scroll_into_view {
            self.scroll_request = Some(self.selection.focus.clone());
        }
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn take_scroll_request(&mut self) -> Option<Point> {
        self.scroll_request.take()
    }

    pub fn chain(&mut self) -> Chain<'_> {
        Chain::new(self)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut redo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op) {
                redo_ops.push(inv);
            } else {
                break;
            }
        }
        redo_ops.reverse();

        self.selection = selection_before.clone();
        self.normalize_in_place();

        self.redo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: redo_ops,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut undo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            if let Ok(inv) = self.apply_op(op) {
                undo_ops.push(inv);
            } else {
                break;
            }
        }
        undo_ops.reverse();

        self.selection = selection_after.clone();
        self.normalize_in_place();

        self.undo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: undo_ops,
        });
        true
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let selection_before = self.selection.clone();

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops.iter().cloned() {
            match self.apply_op(op) {
                Ok(inv) => inverse_ops.push(inv),
                Err(err) => {
                    self.revert(inverse_ops, selection_before);
                    return Err(err);
                }
            }
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        if let Err(err) = self.normalize_into(&mut inverse_ops) {
            self.revert(inverse_ops, selection_before);
            return Err(err);
        }
        inverse_ops.reverse();

        self.normalize_selection_in_place();

        if tx.meta.scroll_into_view {
            self.scroll_request = Some(self.selection.focus.clone());
        }

        let selection_after = self.selection.clone();

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        });
        self.redo_stack.clear();
        if self.open_chains == 0 {
            self.trim_undo_history();
        }

        Ok(())
    }

    fn revert(&mut self, inverse_ops: Vec<Op>, selection: Selection) {
        for inv in inverse_ops.into_iter().rev() {
            let _ = self.apply_op(inv);
        }
        self.selection = selection;
    }

    fn trim_undo_history(&mut self) {
        if self.undo_stack.len() > self.config.max_undo {
            let excess = self.undo_stack.len() - self.config.max_undo;
            self.undo_stack.drain(..excess);
        }
    }

    pub fn preview_transaction(&self, tx: &Transaction) -> Result<TransactionPreview, ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();

        for op in tx.ops.iter().cloned() {
            let _ = apply_op_to(&mut doc, &mut selection, op)?;
        }

        if let Some(sel) = &tx.selection_after {
            selection = sel.clone();
        }

        let mut converged = false;
        for round in 0..=self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&doc);
            if ops.is_empty() {
                converged = true;
                break;
            }
            if round == self.config.max_normalize_iterations {
                break;
            }
            for op in ops {
                let _ = apply_op_to(&mut doc, &mut selection, op)?;
            }
        }

        if !converged {
            return Err(ApplyError::NormalizeDidNotConverge);
        }

        selection = self.registry.normalize_selection(&doc, &selection);

        Ok(TransactionPreview { doc, selection })
    }

    pub fn run_command(
        &mut self,
        id: &str,
        args: Option<serde_json::Value>,
    ) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        tracing::debug!(command = id, "running editor command");
        let result = (command.handler)(self, args);
        if let Err(err) = &result {
            tracing::debug!(command = id, error = err.message(), "editor command failed");
        }
        result
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        node_at_path(&self.doc, path)
    }

    pub fn selected_node_path(&self) -> Option<Path> {
        let path = &self.selection.focus.path;
        match node_at_path(&self.doc, path) {
            Some(Node::Void(_)) => Some(path.clone()),
            _ => None,
        }
    }

    pub fn active_node_path(&self, kind: &str) -> Option<Path> {
        let focus_path = &self.selection.focus.path;
        (1..=focus_path.len()).rev().find_map(|len| {
            let path = &focus_path[..len];
            match node_at_path(&self.doc, path)? {
                Node::Element(el) if el.kind == kind => Some(path.to_vec()),
                Node::Void(v) if v.kind == kind => Some(path.to_vec()),
                _ => None,
            }
        })
    }

    pub fn is_active(&self, kind: &str) -> bool {
        self.active_node_path(kind).is_some()
    }

    pub fn node_view_props(&self, path: &[usize]) -> Option<NodeViewProps> {
        let node = node_at_path(&self.doc, path)?;
        let kind = node.kind()?;
        let selected = self.selected_node_path().as_deref() == Some(path);
        Some(NodeViewProps {
            kind: kind.to_string(),
            path: path.to_vec(),
            attrs: node.attrs().cloned().unwrap_or_default(),
            selected,
        })
    }

    pub(crate) fn undo_checkpoint(&mut self) -> usize {
        self.open_chains += 1;
        self.undo_stack.len()
    }

    fn close_chain(&mut self) {
        self.open_chains = self.open_chains.saturating_sub(1);
        if self.open_chains == 0 {
            self.trim_undo_history();
        }
    }

    pub(crate) fn rollback_to(&mut self, checkpoint: usize) {
        while self.undo_stack.len() > checkpoint {
            if !self.undo() {
                break;
            }
        }
        self.redo_stack.clear();
        self.close_chain();
    }

    pub(crate) fn squash_undo_since(&mut self, checkpoint: usize) {
        if self.undo_stack.len() > checkpoint + 1 {
            self.squash_records(checkpoint);
        }
        self.close_chain();
    }

    fn squash_records(&mut self, checkpoint: usize) {
        let records = self.undo_stack.split_off(checkpoint);
        let selection_before = records[0].selection_before.clone();
        let selection_after = records[records.len() - 1].selection_after.clone();
        let inverse_ops = records
            .into_iter()
            .rev()
            .flat_map(|record| record.inverse_ops)
            .collect();
        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        });
    }

    fn normalize_in_place(&mut self) {
        let _ = self.normalize_into(&mut Vec::new());
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = self
            .registry
            .normalize_selection(&self.doc, &self.selection);
    }

    fn normalize_into(&mut self, inverse_ops: &mut Vec<Op>) -> Result<(), ApplyError> {
        for round in 0..=self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&self.doc);
            if ops.is_empty() {
                return Ok(());
            }
            if round == self.config.max_normalize_iterations {
                break;
            }
            tracing::trace!(count = ops.len(), "applying normalize ops");
            for op in ops {
                inverse_ops.push(self.apply_op(op)?);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op)
    }
}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            transform_selection_remove_text(selection, &path, start..end);
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path);
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::SetNodeAttrs { path, patch } => {
            let node = node_mut(doc, &path)?;
            let old = match node {
                Node::Element(el) => patch_apply(&mut el.attrs, &patch),
                Node::Void(v) => patch_apply(&mut v.attrs, &patch),
                Node::Text(_) => return Err(ApplyError::InvalidPath("Text has no attrs".into())),
            };
            Ok(Op::SetNodeAttrs { path, patch: old })
        }
    }
}

#[derive(Debug)]
pub enum ApplyError {
    InvalidPath(String),
    NormalizeDidNotConverge,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug)]
pub struct PathError(pub String);

fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path || point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(selection: &mut Selection, path: &[usize]) {
    let Some((&index, parent_path)) = path.split_last() else {
        return;
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() || !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
        } else if ix == index {
            // The point lived inside the removed subtree; park it on the
            // previous sibling and let selection normalization resolve it.
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

pub fn node_at_path<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    let (&first, rest) = path.split_first()?;
    let mut node = doc.children.get(first)?;
    for &ix in rest {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Void(_) | Node::Text(_) => return None,
        };
    }
    Some(node)
}

pub fn children_at_path<'a>(doc: &'a Document, parent_path: &[usize]) -> Option<&'a [Node]> {
    if parent_path.is_empty() {
        return Some(&doc.children);
    }
    match node_at_path(doc, parent_path)? {
        Node::Element(el) => Some(&el.children),
        Node::Void(_) | Node::Text(_) => None,
    }
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (&first, rest) = path
        .split_first()
        .ok_or_else(|| PathError("Empty path".into()))?;

    let len = doc.children.len();
    let mut node = doc.children.get_mut(first).ok_or_else(|| {
        PathError(format!("Path out of bounds at depth 0: {first} >= {len}"))
    })?;

    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => {
                let len = el.children.len();
                el.children.get_mut(ix).ok_or_else(|| {
                    PathError(format!(
                        "Path out of bounds at depth {}: {ix} >= {len}",
                        depth + 1
                    ))
                })?
            }
            Node::Void(_) | Node::Text(_) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }
    Ok(node)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError("Expected Text node".into())),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Void(_) | Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty insert path".into()))?;

    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| PathError("Empty remove path".into()))?;

    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrPatch {
    #[serde(default)]
    pub set: Attrs,
    #[serde(default)]
    pub remove: Vec<String>,
}

impl AttrPatch {
    pub fn set(key: impl Into<String>, value: Value) -> Self {
        let mut set = Attrs::new();
        set.insert(key.into(), value);
        Self {
            set,
            remove: Vec::new(),
        }
    }
}

fn patch_apply(attrs: &mut Attrs, patch: &AttrPatch) -> AttrPatch {
    let mut old_set: Attrs = Attrs::new();
    let mut old_remove: Vec<String> = Vec::new();

    for (k, v) in &patch.set {
        if let Some(prev) = attrs.insert(k.clone(), v.clone()) {
            old_set.insert(k.clone(), prev);
        } else {
            old_remove.push(k.clone());
        }
    }

    for key in &patch.remove {
        if let Some(prev) = attrs.remove(key) {
            old_set.insert(key.clone(), prev);
        }
    }

    AttrPatch {
        set: old_set,
        remove: old_remove,
    }
}
