use crate::render::DownloadLinksRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    SinglePage,
}

/// A piece of published content on its way to the theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentContext {
    pub kind: ContentKind,
    /// Source HTML as stored by the editor.
    pub raw: String,
    pub content: String,
}

impl ContentContext {
    pub fn post(raw: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Post,
            raw: raw.into(),
            content: content.into(),
        }
    }

    pub fn single_page(raw: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::SinglePage,
            raw: raw.into(),
            content: content.into(),
        }
    }
}

pub trait ContentHandler: Send + Sync {
    fn handles(&self, _kind: ContentKind) -> bool {
        true
    }

    fn handle(&self, content: ContentContext) -> ContentContext;
}

/// Renders download-links blocks in both fields of posts and single pages.
pub struct DownloadLinksContentHandler {
    renderer: DownloadLinksRenderer,
}

impl DownloadLinksContentHandler {
    pub fn new(renderer: DownloadLinksRenderer) -> Self {
        Self { renderer }
    }
}

impl ContentHandler for DownloadLinksContentHandler {
    fn handles(&self, kind: ContentKind) -> bool {
        matches!(kind, ContentKind::Post | ContentKind::SinglePage)
    }

    fn handle(&self, mut content: ContentContext) -> ContentContext {
        tracing::debug!(kind = ?content.kind, "rendering download links in content");
        content.raw = self.renderer.render(&content.raw);
        content.content = self.renderer.render(&content.content);
        content
    }
}

/// Run every applicable handler over `content`, in order.
pub fn apply_handlers(
    handlers: &[Box<dyn ContentHandler>],
    content: ContentContext,
) -> ContentContext {
    let kind = content.kind;
    handlers
        .iter()
        .filter(|handler| handler.handles(kind))
        .fold(content, |content, handler| handler.handle(content))
}
