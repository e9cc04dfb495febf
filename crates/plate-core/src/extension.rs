use crate::plugin::PlatePlugin;

pub const EDITOR_EXTENSION_CREATE: &str = "editor:extension:create";

type EditorExtensionFactory = Box<dyn Fn() -> Vec<Box<dyn PlatePlugin>> + Send + Sync>;

struct Contribution {
    owner: String,
    create: EditorExtensionFactory,
}

#[derive(Default)]
pub struct ExtensionPoints {
    editor_extensions: Vec<Contribution>,
}

impl ExtensionPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contribute_editor_extensions(
        &mut self,
        owner: impl Into<String>,
        create: impl Fn() -> Vec<Box<dyn PlatePlugin>> + Send + Sync + 'static,
    ) {
        let owner = owner.into();
        tracing::debug!(point = EDITOR_EXTENSION_CREATE, owner = %owner, "extension contributed");
        self.editor_extensions.push(Contribution {
            owner,
            create: Box::new(create),
        });
    }

    pub fn contributors(&self, point: &str) -> Vec<&str> {
        if point != EDITOR_EXTENSION_CREATE {
            return Vec::new();
        }
        self.editor_extensions
            .iter()
            .map(|c| c.owner.as_str())
            .collect()
    }

    pub fn create_editor_extensions(&self) -> Vec<Box<dyn PlatePlugin>> {
        self.editor_extensions
            .iter()
            .flat_map(|c| (c.create)())
            .collect()
    }
}
