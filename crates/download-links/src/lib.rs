mod drag;
mod entry;
mod handler;
mod menu;
mod node;
mod render;
mod settings;
mod view;

pub use drag::resolve_drag_container;
pub use entry::*;
pub use handler::*;
pub use menu::*;
pub use node::*;
pub use render::*;
pub use settings::*;
pub use view::*;

use plate_core::{ExtensionPoints, NodeViewFactory, PlatePlugin};

pub const PLUGIN_NAME: &str = "download-links";

/// Contribute the download-links block to the editor extension point.
pub fn register(points: &mut ExtensionPoints) {
    points.contribute_editor_extensions(PLUGIN_NAME, || {
        vec![Box::new(DownloadLinksPlugin::new()) as Box<dyn PlatePlugin>]
    });
}

/// Like [`register`], mounting `view` for every block.
pub fn register_with_view(points: &mut ExtensionPoints, view: NodeViewFactory) {
    points.contribute_editor_extensions(PLUGIN_NAME, move || {
        vec![Box::new(DownloadLinksPlugin::with_view(view.clone())) as Box<dyn PlatePlugin>]
    });
}
