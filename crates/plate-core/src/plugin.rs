use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{
    AttrPatch, Attrs, Document, Editor, Node, Point, Selection, children_at_path, node_at_path,
};
use crate::extension::ExtensionPoints;
use crate::html::HtmlSpec;
use crate::ops::{Op, Path, Transaction};
use crate::ui::{BubbleMenu, CommandMenuItem, NodeViewSpec, ToolboxItem};

#[derive(Debug, Clone)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug, Clone)]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CommandHandler =
    std::sync::Arc<dyn Fn(&mut Editor, Option<Value>) -> Result<(), CommandError> + Send + Sync>;

pub type QueryHandler =
    std::sync::Arc<dyn Fn(&Editor, Option<Value>) -> Result<Value, QueryError> + Send + Sync>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub args_example: Option<serde_json::Value>,
    pub hidden: bool,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<serde_json::Value>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            args_example: None,
            hidden: false,
            handler: std::sync::Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn args_example(mut self, args_example: serde_json::Value) -> Self {
        self.args_example = Some(args_example);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<Value>) -> Result<Value, QueryError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: std::sync::Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
}

impl ChildConstraint {
    pub fn accepts_blocks(&self) -> bool {
        matches!(self, ChildConstraint::BlockOnly | ChildConstraint::Any)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub is_void: bool,
    pub children: ChildConstraint,
    #[serde(default)]
    pub selectable: bool,
    #[serde(default)]
    pub draggable: bool,
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

#[derive(Debug, Clone)]
pub struct TransactionPreview {
    pub doc: Document,
    pub selection: Selection,
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn html_specs(&self) -> Vec<HtmlSpec> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
    fn toolbox_items(&self) -> Vec<ToolboxItem> {
        Vec::new()
    }
    fn command_menu_items(&self) -> Vec<CommandMenuItem> {
        Vec::new()
    }
    fn bubble_menus(&self) -> Vec<BubbleMenu> {
        Vec::new()
    }
    fn node_views(&self) -> Vec<NodeViewSpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<String, NodeSpec>,
    html_specs: HashMap<String, HtmlSpec>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
    toolbox_items: Vec<ToolboxItem>,
    command_menu_items: Vec<CommandMenuItem>,
    bubble_menus: Vec<BubbleMenu>,
    node_views: HashMap<String, NodeViewSpec>,
}

impl PluginRegistry {
    pub fn new(plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>) -> Result<Self, String> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core() -> Self {
        Self::new(core_plugins()).expect("core registry must be valid")
    }

    pub fn with_extensions(points: &ExtensionPoints) -> Result<Self, String> {
        let mut registry = Self::new(core_plugins())?;
        for plugin in points.create_editor_extensions() {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), String> {
        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(format!("Duplicate node spec kind: {}", spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        for spec in plugin.html_specs() {
            if self.html_specs.values().any(|s| s.tag == spec.tag) {
                return Err(format!("Duplicate html tag: {}", spec.tag));
            }
            self.html_specs.insert(spec.kind.clone(), spec);
        }

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(format!("Duplicate command id: {}", cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(format!("Duplicate query id: {}", query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        self.toolbox_items.extend(plugin.toolbox_items());
        self.toolbox_items.sort_by_key(|item| item.priority);

        self.command_menu_items.extend(plugin.command_menu_items());
        self.command_menu_items.sort_by_key(|item| item.priority);

        for menu in plugin.bubble_menus() {
            if self
                .bubble_menus
                .iter()
                .any(|m| m.plugin_key == menu.plugin_key)
            {
                return Err(format!("Duplicate bubble menu key: {}", menu.plugin_key));
            }
            self.bubble_menus.push(menu);
        }

        for view in plugin.node_views() {
            self.node_views.insert(view.kind.clone(), view);
        }

        tracing::trace!(plugin = plugin.id(), "registered editor plugin");
        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn node_spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.node_specs.get(kind)
    }

    pub fn html_spec(&self, kind: &str) -> Option<&HtmlSpec> {
        self.html_specs.get(kind)
    }

    pub fn html_spec_for_tag(&self, tag: &str) -> Option<&HtmlSpec> {
        self.html_specs
            .values()
            .find(|spec| spec.tag.eq_ignore_ascii_case(tag))
    }


    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn toolbox_items(&self) -> &[ToolboxItem] {
        &self.toolbox_items
    }

    pub fn command_menu_items(&self) -> &[CommandMenuItem] {
        &self.command_menu_items
    }

    pub fn search_command_menu(&self, query: &str) -> Vec<&CommandMenuItem> {
        self.command_menu_items
            .iter()
            .filter(|item| item.matches(query))
            .collect()
    }

    pub fn bubble_menus(&self) -> &[BubbleMenu] {
        &self.bubble_menus
    }

    pub fn bubble_menu(&self, plugin_key: &str) -> Option<&BubbleMenu> {
        self.bubble_menus.iter().find(|m| m.plugin_key == plugin_key)
    }

    pub fn node_view(&self, kind: &str) -> Option<&NodeViewSpec> {
        self.node_views.get(kind)
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let mut ops: Vec<Op> = Vec::new();
        for pass in &self.normalize_passes {
            ops.extend(pass.run(doc, self));
        }
        ops
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor = self
            .normalize_point(doc, &selection.anchor)
            .unwrap_or_else(|| {
                self.normalize_point(doc, &selection.focus)
                    .unwrap_or_else(|| fallback.clone())
            });
        let focus = self
            .normalize_point(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }

    pub fn is_selectable_void(&self, kind: &str) -> bool {
        self.node_specs
            .get(kind)
            .is_some_and(|spec| spec.is_void && spec.selectable)
    }

    pub fn accepts_blocks_at(&self, doc: &Document, parent_path: &[usize]) -> bool {
        if parent_path.is_empty() {
            return true;
        }
        match node_at_path(doc, parent_path) {
            Some(Node::Element(el)) => self
                .node_specs
                .get(&el.kind)
                .map(|spec| spec.children.accepts_blocks())
                .unwrap_or(false),
            _ => false,
        }
    }

    fn child_constraint(&self, kind: &str) -> ChildConstraint {
        self.node_specs
            .get(kind)
            .map(|s| s.children.clone())
            .unwrap_or(ChildConstraint::Any)
    }

    fn normalize_point(&self, doc: &Document, point: &Point) -> Option<Point> {
        if point.path.is_empty() || doc.children.is_empty() {
            return None;
        }

        let mut resolved_path: Vec<usize> = Vec::new();
        let mut children: &[Node] = &doc.children;

        for &wanted in &point.path {
            if children.is_empty() {
                break;
            }
            let ix = wanted.min(children.len() - 1);
            resolved_path.push(ix);
            match &children[ix] {
                Node::Text(t) => {
                    return Some(Point {
                        path: resolved_path,
                        offset: point.offset.min(t.text.len()),
                    });
                }
                Node::Element(el) => {
                    children = &el.children;
                }
                Node::Void(_) => break,
            }
        }

        match node_at_path(doc, &resolved_path)? {
            Node::Text(t) => Some(Point {
                path: resolved_path,
                offset: point.offset.min(t.text.len()),
            }),
            Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
            Node::Void(v) if self.is_selectable_void(&v.kind) => Some(Point {
                path: resolved_path,
                offset: 0,
            }),
            Node::Void(_) => None,
        }
    }
}

fn core_plugins() -> Vec<Box<dyn PlatePlugin>> {
    vec![
        Box::new(CoreParagraphPlugin),
        Box::new(CoreNormalizePlugin),
        Box::new(CoreCommandsPlugin),
    ]
}

fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        match node {
            Node::Text(_) => {
                return Some(Point {
                    path: path.clone(),
                    offset: 0,
                });
            }
            Node::Element(el) => {
                if let Some(point) = first_text_descendant(&el.children, path) {
                    return Some(point);
                }
            }
            Node::Void(_) => {}
        }
        path.pop();
    }
    None
}

fn first_text_point(doc: &Document) -> Option<Point> {
    first_text_descendant(&doc.children, &mut Vec::new())
}

struct CoreParagraphPlugin;

impl PlatePlugin for CoreParagraphPlugin {
    fn id(&self) -> &'static str {
        "core.paragraph"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: "paragraph".to_string(),
            role: NodeRole::Block,
            is_void: false,
            children: ChildConstraint::InlineOnly,
            selectable: false,
            draggable: true,
        }]
    }

    fn html_specs(&self) -> Vec<HtmlSpec> {
        vec![HtmlSpec::new("paragraph", "p")]
    }
}

struct CoreNormalizePlugin;

impl PlatePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureParagraphHasTextLeaf),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

struct EnsureParagraphHasTextLeaf;

impl NormalizePass for EnsureParagraphHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_inline_only_blocks_have_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(
            children: &[Node],
            path: &mut Vec<usize>,
            registry: &PluginRegistry,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                if registry.child_constraint(&el.kind) == ChildConstraint::InlineOnly {
                    let has_text = el.children.iter().any(|n| matches!(n, Node::Text(_)));
                    if !has_text {
                        let mut insert_path = path.clone();
                        insert_path.push(0);
                        ops.push(Op::InsertNode {
                            path: insert_path,
                            node: Node::text(""),
                        });
                    }
                } else {
                    walk(&el.children, path, registry, ops);
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), registry, &mut ops);
        ops
    }
}

struct CoreCommandsPlugin;

impl PlatePlugin for CoreCommandsPlugin {
    fn id(&self) -> &'static str {
        "core.commands"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("core.insert_content", "Insert content", |editor, args| {
                let node = parse_node_arg(args.as_ref(), "node")
                    .ok_or_else(|| CommandError::new("Missing args.node"))?;
                insert_block(editor, node, "command:core.insert_content")
                    .map_err(CommandError::new)
                    .and_then(|tx| apply_or_fail(editor, tx, "insert content"))
            })
            .description("Insert a block node at the caret, replacing an empty paragraph.")
            .keywords(["insert", "content", "block"])
            .args_example(serde_json::json!({
                "node": { "node": "element", "kind": "paragraph" }
            })),
            CommandSpec::new("core.insert_content_at", "Insert content at", |editor, args| {
                let path = parse_path_arg(args.as_ref())
                    .ok_or_else(|| CommandError::new("Missing args.path"))?;
                let nodes = parse_nodes_arg(args.as_ref())
                    .ok_or_else(|| CommandError::new("Missing args.nodes (array)"))?;
                let update_selection = args
                    .as_ref()
                    .and_then(|v| v.get("update_selection"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                insert_content_at(editor, path, nodes, update_selection)
                    .map_err(CommandError::new)
                    .and_then(|tx| apply_or_fail(editor, tx, "insert content"))
            })
            .description("Insert nodes at an explicit path, optionally moving the caret into them.")
            .keywords(["insert", "content", "position"])
            .args_example(serde_json::json!({
                "path": [1],
                "nodes": [{ "node": "element", "kind": "paragraph" }],
                "update_selection": true
            })),
            CommandSpec::new(
                "core.update_attributes",
                "Update node attributes",
                |editor, args| {
                    let kind = parse_kind_arg(args.as_ref())
                        .ok_or_else(|| CommandError::new("Missing args.kind"))?;
                    let attrs: Attrs = args
                        .as_ref()
                        .and_then(|v| v.get("attrs"))
                        .and_then(|v| v.as_object())
                        .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .ok_or_else(|| CommandError::new("Missing args.attrs (object)"))?;
                    update_attributes(editor, &kind, args.as_ref(), attrs)
                        .map_err(CommandError::new)
                        .and_then(|tx| apply_or_fail(editor, tx, "update attributes"))
                },
            )
            .description("Set attributes on the addressed node of a kind.")
            .keywords(["attributes", "attrs", "update"])
            .args_example(serde_json::json!({
                "kind": "paragraph",
                "attrs": { "align": "center" }
            })),
            CommandSpec::new("core.delete_node", "Delete node", |editor, args| {
                let kind = parse_kind_arg(args.as_ref())
                    .ok_or_else(|| CommandError::new("Missing args.kind"))?;
                delete_node(editor, &kind, args.as_ref())
                    .map_err(CommandError::new)
                    .and_then(|tx| apply_or_fail(editor, tx, "delete node"))
            })
            .description("Remove the addressed node of a kind from the document.")
            .keywords(["delete", "remove", "node"]),
            CommandSpec::new("core.delete_range", "Delete range", |editor, args| {
                let path = parse_path_arg(args.as_ref())
                    .ok_or_else(|| CommandError::new("Missing args.path"))?;
                let start = args
                    .as_ref()
                    .and_then(|v| v.get("start"))
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| CommandError::new("Missing args.start"))?
                    as usize;
                let end = args
                    .as_ref()
                    .and_then(|v| v.get("end"))
                    .and_then(|v| v.as_u64())
                    .ok_or_else(|| CommandError::new("Missing args.end"))?
                    as usize;
                delete_range(editor, path, start, end)
                    .map_err(CommandError::new)
                    .and_then(|tx| apply_or_fail(editor, tx, "delete range"))
            })
            .description("Remove a text range inside a single text leaf.")
            .keywords(["delete", "range", "text"])
            .hidden(true),
        ]
    }
}

pub fn apply_or_fail(editor: &mut Editor, tx: Transaction, what: &str) -> Result<(), CommandError> {
    editor
        .apply(tx)
        .map_err(|e| CommandError::new(format!("Failed to {what}: {e:?}")))
}

pub fn parse_path_arg(args: Option<&Value>) -> Option<Vec<usize>> {
    let path = args?.get("path")?.as_array()?;
    let mut out = Vec::with_capacity(path.len());
    for v in path {
        out.push(v.as_u64()? as usize);
    }
    Some(out)
}

fn parse_kind_arg(args: Option<&Value>) -> Option<String> {
    args?
        .get("kind")?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_node_arg(args: Option<&Value>, key: &str) -> Option<Node> {
    serde_json::from_value(args?.get(key)?.clone()).ok()
}

fn parse_nodes_arg(args: Option<&Value>) -> Option<Vec<Node>> {
    let nodes = args?.get("nodes")?.as_array()?;
    nodes
        .iter()
        .map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInsertion {
    pub path: Path,
    pub replace_empty: bool,
}

pub fn block_insertion(editor: &Editor) -> Result<BlockInsertion, String> {
    let doc = editor.doc();

    if let Some(node_path) = editor.selected_node_path() {
        let (&ix, parent) = node_path.split_last().ok_or("Empty selection path")?;
        if !editor.registry().accepts_blocks_at(doc, parent) {
            return Err("Blocks are not allowed here".into());
        }
        let mut path = parent.to_vec();
        path.push(ix + 1);
        return Ok(BlockInsertion {
            path,
            replace_empty: false,
        });
    }

    let focus = &editor.selection().focus;
    let block_path = focus.path.split_last().map(|(_, p)| p).unwrap_or(&[]);
    let Some((&block_ix, parent)) = block_path.split_last() else {
        return Ok(BlockInsertion {
            path: vec![doc.children.len()],
            replace_empty: false,
        });
    };

    if !editor.registry().accepts_blocks_at(doc, parent) {
        return Err("Blocks are not allowed here".into());
    }

    let replace_empty = matches!(
        node_at_path(doc, block_path),
        Some(Node::Element(el))
            if el.kind == "paragraph"
                && el.children.iter().all(|n| n.text_content().is_empty())
    );

    let mut path = parent.to_vec();
    path.push(if replace_empty { block_ix } else { block_ix + 1 });
    Ok(BlockInsertion {
        path,
        replace_empty,
    })
}

fn selection_on_inserted(editor: &Editor, path: &[usize], node: &Node) -> Selection {
    match node {
        Node::Void(v) if editor.registry().is_selectable_void(&v.kind) => {
            Selection::node(path.to_vec())
        }
        _ => {
            let mut caret = path.to_vec();
            caret.push(0);
            Selection::collapsed(Point::new(caret, 0))
        }
    }
}

pub fn insert_block(editor: &Editor, node: Node, source: &str) -> Result<Transaction, String> {
    let Some(kind) = node.kind() else {
        return Err("Only element or void nodes can be inserted as blocks".into());
    };
    let Some(spec) = editor.registry().node_spec(kind) else {
        return Err(format!("Unknown node kind: {kind}"));
    };
    if spec.role != NodeRole::Block {
        return Err(format!("Not a block node: {kind}"));
    }

    let insertion = block_insertion(editor)?;
    let selection_after = selection_on_inserted(editor, &insertion.path, &node);

    let mut ops = Vec::new();
    if insertion.replace_empty {
        ops.push(Op::RemoveNode {
            path: insertion.path.clone(),
        });
    }
    ops.push(Op::InsertNode {
        path: insertion.path,
        node,
    });

    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source(source))
}

pub fn insert_content_at(
    editor: &Editor,
    path: Path,
    nodes: Vec<Node>,
    update_selection: bool,
) -> Result<Transaction, String> {
    let Some((&start, parent)) = path.split_last() else {
        return Err("Empty insert path".into());
    };
    let Some(siblings) = children_at_path(editor.doc(), parent) else {
        return Err("Insert parent is not a container".into());
    };
    if start > siblings.len() {
        return Err(format!(
            "Insert index out of bounds: {start} > {}",
            siblings.len()
        ));
    }
    if nodes.is_empty() {
        return Err("Nothing to insert".into());
    }

    let mut ops = Vec::with_capacity(nodes.len());
    let mut last: Option<(Path, Node)> = None;
    for (i, node) in nodes.into_iter().enumerate() {
        let mut node_path = parent.to_vec();
        node_path.push(start + i);
        last = Some((node_path.clone(), node.clone()));
        ops.push(Op::InsertNode {
            path: node_path,
            node,
        });
    }

    let mut tx = Transaction::new(ops).source("command:core.insert_content_at");
    if update_selection {
        if let Some((last_path, last_node)) = last {
            tx = tx.selection_after(selection_on_inserted(editor, &last_path, &last_node));
        }
    }
    Ok(tx)
}

pub fn resolve_target(editor: &Editor, kind: &str, args: Option<&Value>) -> Result<Path, String> {
    if let Some(path) = parse_path_arg(args) {
        return match editor.node_at(&path).and_then(Node::kind) {
            Some(k) if k == kind => Ok(path),
            _ => Err(format!("No {kind} node at {path:?}")),
        };
    }
    editor
        .active_node_path(kind)
        .ok_or_else(|| format!("No active {kind} node"))
}

fn update_attributes(
    editor: &Editor,
    kind: &str,
    args: Option<&Value>,
    attrs: Attrs,
) -> Result<Transaction, String> {
    let path = resolve_target(editor, kind, args)?;
    Ok(Transaction::new(vec![Op::SetNodeAttrs {
        path,
        patch: AttrPatch {
            set: attrs,
            remove: Vec::new(),
        },
    }])
    .selection_after(editor.selection().clone())
    .source("command:core.update_attributes"))
}

fn delete_node(editor: &Editor, kind: &str, args: Option<&Value>) -> Result<Transaction, String> {
    let path = resolve_target(editor, kind, args)?;
    let (&ix, parent) = path.split_last().ok_or("Empty node path")?;
    let remaining = children_at_path(editor.doc(), parent)
        .map(|c| c.len().saturating_sub(1))
        .unwrap_or(0);

    let mut caret_path = parent.to_vec();
    caret_path.push(if ix < remaining { ix } else { ix.saturating_sub(1) });

    Ok(Transaction::new(vec![Op::RemoveNode { path }])
        .selection_after(Selection::collapsed(Point::new(caret_path, 0)))
        .source("command:core.delete_node"))
}

fn delete_range(
    editor: &Editor,
    path: Path,
    start: usize,
    end: usize,
) -> Result<Transaction, String> {
    if !matches!(editor.node_at(&path), Some(Node::Text(_))) {
        return Err(format!("No text leaf at {path:?}"));
    }
    if start > end {
        return Err("Range start is after its end".into());
    }
    Ok(Transaction::new(vec![Op::RemoveText {
        path: path.clone(),
        range: start..end,
    }])
    .selection_after(Selection::collapsed(Point::new(path, start)))
    .source("command:core.delete_range"))
}
