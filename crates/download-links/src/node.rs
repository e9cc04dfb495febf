use serde_json::Value;

use plate_core::html::{AttributeSpec, HtmlAttrs, HtmlElement, HtmlSpec};
use plate_core::{
    AttrPatch, Attrs, BubbleMenu, Chain, ChildConstraint, CommandError, CommandMenuItem,
    CommandSpec, Document, Editor, Node, NodeRole, NodeSpec, NodeViewFactory, NodeViewSpec,
    NormalizePass, Op, PlatePlugin, PluginRegistry, QuerySpec, ToolboxItem, Transaction,
    apply_or_fail, insert_block, resolve_target,
};

use crate::drag::resolve_drag_container;
use crate::entry::{LinkEntry, decode_links, encode_links, links_from_value, links_to_value};
use crate::menu;

pub const NODE_KIND: &str = "download-links";
pub const HTML_TAG: &str = "download-links";
pub const LINKS_ATTR: &str = "links";
pub const DATA_LINKS_ATTR: &str = "data-links";

pub const ADD_COMMAND: &str = "download_links.add";
pub const SET_ATTRS_COMMAND: &str = "download_links.set_attrs";
pub const IS_ACTIVE_QUERY: &str = "download_links.is_active";
pub const ACTIVE_LINKS_QUERY: &str = "download_links.active_links";

fn parse_links_attr(element: &HtmlElement) -> Value {
    links_to_value(&decode_links(element.get_attribute(DATA_LINKS_ATTR)))
}

fn render_links_attr(value: &Value) -> HtmlAttrs {
    let links = links_from_value(value).unwrap_or_default();
    let mut attrs = HtmlAttrs::new();
    attrs.insert(DATA_LINKS_ATTR.to_string(), encode_links(&links));
    attrs
}

/// A fresh, empty download-links node.
pub fn download_links_node() -> Node {
    let mut attrs = Attrs::new();
    attrs.insert(LINKS_ATTR.to_string(), Value::Array(Vec::new()));
    Node::void(NODE_KIND, attrs)
}

/// Editor plugin for the download-links block: schema, HTML form,
/// commands, queries and the menus that expose them.
#[derive(Default)]
pub struct DownloadLinksPlugin {
    view: Option<NodeViewFactory>,
}

impl DownloadLinksPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `view` to render mounted blocks.
    pub fn with_view(view: NodeViewFactory) -> Self {
        Self { view: Some(view) }
    }
}

impl PlatePlugin for DownloadLinksPlugin {
    fn id(&self) -> &'static str {
        "download_links"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: NODE_KIND.to_string(),
            role: NodeRole::Block,
            is_void: true,
            children: ChildConstraint::None,
            selectable: true,
            draggable: true,
        }]
    }

    fn html_specs(&self) -> Vec<HtmlSpec> {
        vec![
            HtmlSpec::new(NODE_KIND, HTML_TAG).attribute(
                AttributeSpec::new(LINKS_ATTR, Value::Array(Vec::new()))
                    .parse_html(parse_links_attr)
                    .render_html(render_links_attr),
            ),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeLinksAttr)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new(ADD_COMMAND, "Insert download links", |editor, _args| {
                insert_block(editor, download_links_node(), "command:download_links.add")
                    .map_err(CommandError::new)
                    .and_then(|tx| apply_or_fail(editor, tx, "insert download links"))
            })
            .description("Insert an empty download-links block at the caret.")
            .keywords(["url", "download", "云盘"]),
            CommandSpec::new(
                SET_ATTRS_COMMAND,
                "Set download links",
                |editor, args| {
                    let links = args
                        .as_ref()
                        .and_then(|v| v.get(LINKS_ATTR))
                        .and_then(links_from_value)
                        .ok_or_else(|| CommandError::new("Missing or invalid args.links"))?;
                    set_links(editor, args.as_ref(), &links)
                        .map_err(CommandError::new)
                        .and_then(|tx| apply_or_fail(editor, tx, "set download links"))
                },
            )
            .description("Replace the whole list of the addressed download-links block.")
            .keywords(["download", "links", "attrs"])
            .args_example(serde_json::json!({
                "path": [0],
                "links": [{
                    "url": "https://example.com/file.zip",
                    "filename": "file.zip",
                    "source": "example",
                    "code": "abcd"
                }]
            })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new(IS_ACTIVE_QUERY, |editor, _args| {
                Ok(Value::Bool(editor.is_active(NODE_KIND)))
            }),
            QuerySpec::new(ACTIVE_LINKS_QUERY, |editor, args| {
                let Ok(path) = resolve_target(editor, NODE_KIND, args.as_ref()) else {
                    return Ok(Value::Null);
                };
                Ok(editor
                    .node_at(&path)
                    .and_then(Node::attrs)
                    .and_then(|attrs| attrs.get(LINKS_ATTR))
                    .cloned()
                    .unwrap_or(Value::Null))
            }),
        ]
    }

    fn toolbox_items(&self) -> Vec<ToolboxItem> {
        vec![menu::toolbox_item()]
    }

    fn command_menu_items(&self) -> Vec<CommandMenuItem> {
        vec![menu::command_menu_item()]
    }

    fn bubble_menus(&self) -> Vec<BubbleMenu> {
        vec![menu::bubble_menu()]
    }

    fn node_views(&self) -> Vec<NodeViewSpec> {
        vec![NodeViewSpec {
            kind: NODE_KIND.to_string(),
            render: self.view.clone(),
            drag_container: Some(resolve_drag_container),
        }]
    }
}

fn set_links(
    editor: &Editor,
    args: Option<&Value>,
    links: &[LinkEntry],
) -> Result<Transaction, String> {
    let path = resolve_target(editor, NODE_KIND, args)?;
    Ok(Transaction::new(vec![Op::SetNodeAttrs {
        path,
        patch: AttrPatch::set(LINKS_ATTR, links_to_value(links)),
    }])
    .selection_after(editor.selection().clone())
    .source("command:download_links.set_attrs"))
}

/// Rewrites a missing or malformed `links` attribute to an empty list.
struct NormalizeLinksAttr;

impl NormalizePass for NormalizeLinksAttr {
    fn id(&self) -> &'static str {
        "download_links.normalize_links_attr"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Void(v) if v.kind == NODE_KIND => {
                        let valid = v.attrs.get(LINKS_ATTR).and_then(links_from_value).is_some();
                        if !valid {
                            tracing::trace!(?path, "resetting malformed download links");
                            ops.push(Op::SetNodeAttrs {
                                path: path.clone(),
                                patch: AttrPatch::set(LINKS_ATTR, Value::Array(Vec::new())),
                            });
                        }
                    }
                    Node::Element(el) => walk(&el.children, path, ops),
                    _ => {}
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// Typed entry points for the two download-links commands.
pub trait DownloadLinksCommands {
    /// Insert an empty block at the caret.
    fn add_download_links(&mut self) -> Result<(), CommandError>;
    /// Replace the list of the block at or around the selection.
    fn set_download_links_attrs(&mut self, links: &[LinkEntry]) -> Result<(), CommandError>;
}

impl DownloadLinksCommands for Editor {
    fn add_download_links(&mut self) -> Result<(), CommandError> {
        self.run_command(ADD_COMMAND, None)
    }

    fn set_download_links_attrs(&mut self, links: &[LinkEntry]) -> Result<(), CommandError> {
        self.run_command(
            SET_ATTRS_COMMAND,
            Some(serde_json::json!({ LINKS_ATTR: links })),
        )
    }
}

/// The download-links commands as chain steps.
pub trait DownloadLinksChain {
    fn add_download_links(self) -> Self;
    fn set_download_links_attrs(self, links: &[LinkEntry]) -> Self;
}

impl DownloadLinksChain for Chain<'_> {
    fn add_download_links(self) -> Self {
        self.command(ADD_COMMAND, None)
    }

    fn set_download_links_attrs(self, links: &[LinkEntry]) -> Self {
        self.command(
            SET_ATTRS_COMMAND,
            Some(serde_json::json!({ LINKS_ATTR: links })),
        )
    }
}
