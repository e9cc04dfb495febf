use std::sync::Arc;

use plate_core::{CommandError, Editor, NodeView, NodeViewFactory, NodeViewProps, Path, ViewId};

use crate::entry::{LinkEntry, links_from_value};
use crate::node::{LINKS_ATTR, NODE_KIND, SET_ATTRS_COMMAND};

/// What an editing view for one download-links block is given.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkListViewProps {
    /// Path of the node the view is bound to.
    pub path: Path,
    pub links: Vec<LinkEntry>,
    pub selected: bool,
}

impl LinkListViewProps {
    pub fn from_node(props: &NodeViewProps) -> Option<Self> {
        if props.kind != NODE_KIND {
            return None;
        }
        let links = props
            .attrs
            .get(LINKS_ATTR)
            .and_then(links_from_value)
            .unwrap_or_default();
        Some(Self {
            path: props.path.clone(),
            links,
            selected: props.selected,
        })
    }

    /// Replace the bound node's list with `links`.
    pub fn update(&self, editor: &mut Editor, links: &[LinkEntry]) -> Result<(), CommandError> {
        update_links(editor, &self.path, links)
    }
}

pub fn update_links(
    editor: &mut Editor,
    path: &[usize],
    links: &[LinkEntry],
) -> Result<(), CommandError> {
    editor.run_command(
        SET_ATTRS_COMMAND,
        Some(serde_json::json!({ "path": path, LINKS_ATTR: links })),
    )
}

/// An editing view for the block's link list.
pub trait LinkListView {
    fn render(&mut self, props: &LinkListViewProps);

    fn dom(&self) -> Option<ViewId> {
        None
    }
}

struct LinkListNodeView<V> {
    view: V,
}

impl<V: LinkListView> NodeView for LinkListNodeView<V> {
    fn update(&mut self, props: &NodeViewProps) -> bool {
        match LinkListViewProps::from_node(props) {
            Some(props) => {
                self.view.render(&props);
                true
            }
            None => false,
        }
    }

    fn dom(&self) -> Option<ViewId> {
        self.view.dom()
    }
}

/// Wraps a [`LinkListView`] constructor as a node view factory. `make` is
/// called once per mounted block and the view is rendered right away.
pub fn view_factory<V, F>(make: F) -> NodeViewFactory
where
    V: LinkListView + 'static,
    F: Fn(&LinkListViewProps) -> V + Send + Sync + 'static,
{
    Arc::new(move |props: &NodeViewProps| {
        let props = LinkListViewProps::from_node(props).unwrap_or_else(|| LinkListViewProps {
            path: props.path.clone(),
            links: Vec::new(),
            selected: props.selected,
        });
        let mut view = make(&props);
        view.render(&props);
        Box::new(LinkListNodeView { view }) as Box<dyn NodeView>
    })
}
