use std::sync::Arc;

use crate::core::{Attrs, Editor};
use crate::html::HtmlAttrs;
use crate::ops::{Path, TextRange};

pub type EditorAction = Arc<dyn Fn(&mut Editor) -> bool + Send + Sync>;
pub type RangeAction = Arc<dyn Fn(&mut Editor, TextRange) -> bool + Send + Sync>;
pub type VisibilityPredicate = Arc<dyn Fn(&Editor) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    ZhCn,
    EnUs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizedText {
    pub zh_cn: &'static str,
    pub en_us: &'static str,
}

impl LocalizedText {
    pub const fn new(zh_cn: &'static str, en_us: &'static str) -> Self {
        Self { zh_cn, en_us }
    }

    pub fn get(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::ZhCn => self.zh_cn,
            Locale::EnUs => self.en_us,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconName(pub &'static str);

impl IconName {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

#[derive(Clone)]
pub struct ToolboxItem {
    pub priority: i64,
    pub icon: IconName,
    pub title: LocalizedText,
    pub action: EditorAction,
}

impl ToolboxItem {
    pub fn run(&self, editor: &mut Editor) -> bool {
        (self.action)(editor)
    }
}

#[derive(Clone)]
pub struct CommandMenuItem {
    pub priority: i64,
    pub icon: IconName,
    pub title: LocalizedText,
    pub keywords: Vec<&'static str>,
    pub command: RangeAction,
}

impl CommandMenuItem {
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        [self.title.zh_cn, self.title.en_us]
            .into_iter()
            .chain(self.keywords.iter().copied())
            .any(|text| text.to_lowercase().contains(&query))
    }

    pub fn run(&self, editor: &mut Editor, range: TextRange) -> bool {
        (self.command)(editor, range)
    }
}

#[derive(Clone)]
pub struct BubbleMenuItem {
    pub priority: i64,
    pub icon: IconName,
    pub title: LocalizedText,
    pub action: EditorAction,
}

#[derive(Clone)]
pub struct BubbleMenu {
    pub plugin_key: &'static str,
    should_show: VisibilityPredicate,
    items: Vec<BubbleMenuItem>,
}

impl BubbleMenu {
    pub fn new(
        plugin_key: &'static str,
        should_show: impl Fn(&Editor) -> bool + Send + Sync + 'static,
        mut items: Vec<BubbleMenuItem>,
    ) -> Self {
        items.sort_by_key(|item| item.priority);
        Self {
            plugin_key,
            should_show: Arc::new(should_show),
            items,
        }
    }

    pub fn is_visible(&self, editor: &Editor) -> bool {
        (self.should_show)(editor)
    }

    pub fn items(&self) -> &[BubbleMenuItem] {
        &self.items
    }

    pub fn invoke(&self, editor: &mut Editor, index: usize) -> bool {
        if !self.is_visible(editor) {
            return false;
        }
        match self.items.get(index) {
            Some(item) => (item.action)(editor),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeViewProps {
    pub kind: String,
    pub path: Path,
    pub attrs: Attrs,
    pub selected: bool,
}

pub trait NodeView {
    fn update(&mut self, _props: &NodeViewProps) -> bool {
        true
    }

    fn dom(&self) -> Option<ViewId> {
        None
    }
}

pub type NodeViewFactory = Arc<dyn Fn(&NodeViewProps) -> Box<dyn NodeView> + Send + Sync>;

pub type DragContainerResolver = fn(&ViewTree, ViewId) -> Option<DragContainer>;

#[derive(Clone)]
pub struct NodeViewSpec {
    pub kind: String,
    pub render: Option<NodeViewFactory>,
    pub drag_container: Option<DragContainerResolver>,
}

impl Editor {
    pub fn mount_node_view(&self, path: &[usize]) -> Option<Box<dyn NodeView>> {
        let props = self.node_view_props(path)?;
        let spec = self.registry().node_view(&props.kind)?;
        let render = spec.render.as_ref()?;
        Some(render(&props))
    }

    pub fn drag_container(
        &self,
        kind: &str,
        tree: &ViewTree,
        root: ViewId,
    ) -> Option<DragContainer> {
        let resolve = self.registry().node_view(kind)?.drag_container?;
        resolve(tree, root)
    }
}

pub const NODE_VIEW_WRAPPER_ATTR: &str = "data-node-view-wrapper";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewElement {
    pub tag: String,
    pub parent: Option<ViewId>,
    pub attrs: HtmlAttrs,
}

#[derive(Debug, Clone, Default)]
pub struct ViewTree {
    elements: Vec<ViewElement>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tag: impl Into<String>, parent: Option<ViewId>) -> ViewId {
        self.elements.push(ViewElement {
            tag: tag.into(),
            parent,
            attrs: HtmlAttrs::new(),
        });
        ViewId(self.elements.len() - 1)
    }

    pub fn set_attr(&mut self, id: ViewId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(el) = self.elements.get_mut(id.0) {
            el.attrs.insert(name.into(), value.into());
        }
    }

    pub fn element(&self, id: ViewId) -> Option<&ViewElement> {
        self.elements.get(id.0)
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.element(id)?.parent
    }

    pub fn has_attr(&self, id: ViewId, name: &str) -> bool {
        self.element(id).is_some_and(|el| el.attrs.contains_key(name))
    }

    pub fn ancestors(&self, id: ViewId) -> impl Iterator<Item = ViewId> + '_ {
        std::iter::successors(self.element(id).map(|_| id), move |&cur| self.parent(cur))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragContainer {
    pub element: ViewId,
    pub propagate_down: bool,
}
