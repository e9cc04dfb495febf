use plate_core::{DragContainer, NODE_VIEW_WRAPPER_ATTR, ViewId, ViewTree};

/// The host wrapper around a mounted download-links view. Drags started
/// anywhere inside the card move the whole block, while clicks still reach
/// the card's own controls.
pub fn resolve_drag_container(tree: &ViewTree, root: ViewId) -> Option<DragContainer> {
    tree.ancestors(root)
        .find(|&id| tree.has_attr(id, NODE_VIEW_WRAPPER_ATTR))
        .map(|element| DragContainer {
            element,
            propagate_down: true,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nearest_wrapper() {
        let mut tree = ViewTree::new();
        let outer = tree.push("div", None);
        tree.set_attr(outer, NODE_VIEW_WRAPPER_ATTR, "");
        let inner = tree.push("div", Some(outer));
        tree.set_attr(inner, NODE_VIEW_WRAPPER_ATTR, "");
        let card = tree.push("section", Some(inner));
        let button = tree.push("button", Some(card));

        let container = resolve_drag_container(&tree, button).unwrap();
        assert_eq!(container.element, inner);
        assert!(container.propagate_down);
    }

    #[test]
    fn unwrapped_view_has_no_container() {
        let mut tree = ViewTree::new();
        let card = tree.push("section", None);
        assert_eq!(resolve_drag_container(&tree, card), None);
    }
}
