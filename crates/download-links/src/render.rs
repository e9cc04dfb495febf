use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::entry::{LinkEntry, decode_links};
use crate::settings::DownloadSettings;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<download-links\b([^>]*)>.*?</download-links>")
        .expect("download-links tag pattern must compile")
});

static DATA_LINKS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-links\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("data-links attribute pattern must compile")
});

pub const STYLE_ID: &str = "tools-download-links-style";
pub const STYLE_MARKER: &str = "<!-- tools-download-links-style -->";
pub const CONTAINER_ID_PREFIX: &str = "tools-download-links--";

type ContainerIds = Box<dyn Fn() -> String + Send + Sync>;

pub struct DownloadLinksRenderer {
    settings: DownloadSettings,
    container_ids: ContainerIds,
}

impl Default for DownloadLinksRenderer {
    fn default() -> Self {
        Self::new(DownloadSettings::default())
    }
}

impl DownloadLinksRenderer {
    pub fn new(settings: DownloadSettings) -> Self {
        Self {
            settings,
            container_ids: Box::new(|| uuid::Uuid::new_v4().simple().to_string()),
        }
    }

    /// Replace the random suffix of card container ids.
    pub fn with_container_ids(
        mut self,
        ids: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.container_ids = Box::new(ids);
        self
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Rewrite every download-links block in `html` into a card. Input
    /// without any block is returned unchanged.
    pub fn render(&self, html: &str) -> String {
        if html.trim().is_empty() || !TAG_PATTERN.is_match(html) {
            return html.to_string();
        }

        let needs_style = !html.contains(STYLE_ID) && !html.contains(STYLE_MARKER);
        let style_block = if needs_style {
            self.style_block()
        } else {
            String::new()
        };

        let mut style_injected = false;
        let mut blocks = 0usize;
        let mut result = TAG_PATTERN
            .replace_all(html, |caps: &Captures<'_>| {
                blocks += 1;
                let links = extract_links(&caps[1]);
                let card = self.card(&links);
                if needs_style && !style_injected && !card.is_empty() {
                    style_injected = true;
                    return format!("{style_block}\n{card}");
                }
                card
            })
            .into_owned();

        if needs_style && !style_injected {
            result = match result.find("</head>") {
                Some(ix) => {
                    let mut out = String::with_capacity(result.len() + style_block.len() + 1);
                    out.push_str(&result[..ix]);
                    out.push_str(&style_block);
                    out.push('\n');
                    out.push_str(&result[ix..]);
                    out
                }
                None => format!("{style_block}\n{result}"),
            };
        }

        tracing::trace!(blocks, style_injected, "rendered download links");
        result
    }

    fn style_block(&self) -> String {
        format!(
            r#"<style id="{STYLE_ID}">{STYLE_MARKER}
.tools-download-links, .tools-download-links * {{ box-sizing: border-box; }}
.tools-download-links button {{ margin: 0; padding: 0; font: inherit; background: none; border: 0; color: inherit; }}
.tools-download-links {{ border: 1px solid var(--tools-dl-border) !important; border-radius: 10px !important; background: var(--tools-dl-bg) !important; overflow: hidden !important; margin: 12px 0 !important; }}
.tools-download-links .tools-download-links__header {{ display: flex !important; align-items: center !important; gap: 6px !important; padding: 10px 12px !important; background: var(--tools-dl-header-bg) !important; border-bottom: 1px solid var(--tools-dl-border) !important; font-weight: 600 !important; color: var(--tools-dl-header-color) !important; font-size: 13px !important; }}
.tools-download-links .tools-download-links__list {{ margin: 0 !important; padding: 10px 12px !important; }}
.tools-download-links .tools-download-links__item {{ display: flex !important; align-items: center !important; justify-content: space-between !important; gap: 12px !important; padding: 12px 14px !important; border: 1px solid var(--tools-dl-border) !important; border-radius: 10px !important; margin: 10px 0 !important; background: var(--tools-dl-item-bg) !important; }}
.tools-download-links .tools-download-links__left {{ display: flex !important; align-items: center !important; gap: 10px !important; min-width: 0 !important; flex: 1 !important; }}
.tools-download-links .tools-download-links__icon {{ width: 40px !important; height: 40px !important; border-radius: 10px !important; background-color: var(--tools-dl-icon-bg) !important; flex-shrink: 0 !important; background-size: contain !important; background-position: center !important; background-repeat: no-repeat !important; display: block !important; }}
.tools-download-links .tools-download-links__info {{ display: grid !important; gap: 4px !important; min-width: 0 !important; flex: 1 !important; }}
.tools-download-links .tools-download-links__title {{ font-weight: 600 !important; white-space: nowrap !important; overflow: hidden !important; text-overflow: ellipsis !important; font-size: 14px !important; }}
.tools-download-links .tools-download-links__title-link {{ color: var(--tools-dl-title-link) !important; cursor: pointer !important; }}
.tools-download-links .tools-download-links__title-link:hover {{ color: var(--tools-dl-title-link-hover) !important; text-decoration: underline !important; }}
.tools-download-links .tools-download-links__meta {{ color: var(--tools-dl-meta) !important; font-size: 12px !important; }}
.tools-download-links button.tools-download-links__btn {{ margin-left: auto !important; display: inline-flex !important; align-items: center !important; justify-content: center !important; width: 36px !important; height: 36px !important; border-radius: 9999px !important; background: var(--tools-dl-btn-bg) !important; border: 1px solid var(--tools-dl-btn-border) !important; color: #ffffff !important; flex-shrink: 0 !important; transition: background .2s ease, border-color .2s ease !important; cursor: pointer !important; padding: 0 !important; font: inherit !important; }}
.tools-download-links button.tools-download-links__btn:hover {{ background: var(--tools-dl-btn-bg-hover) !important; border-color: var(--tools-dl-btn-border-hover) !important; }}
.tools-download-links button.tools-download-links__btn svg {{ width: 22px !important; height: 22px !important; }}
:root {{
{light}}}
{light_selector} {{
{light}}}
{dark_selector} {{
{dark}}}
</style>"#,
            light = theme_vars(&LIGHT_THEME),
            dark = theme_vars(&DARK_THEME),
            light_selector = self.settings.light_mode_selector,
            dark_selector = self.settings.dark_mode_selector,
        )
    }

    fn card(&self, links: &[LinkEntry]) -> String {
        if links.is_empty() {
            return String::new();
        }

        let container_id = format!("{CONTAINER_ID_PREFIX}{}", (self.container_ids)());
        let mut items = String::new();
        let mut icon_rules = String::new();

        for (index, link) in links.iter().enumerate() {
            let icon_class = format!("tools-download-links__icon--{index}");
            items.push_str(&link_item(link, &icon_class));

            let icon = link
                .icon
                .as_deref()
                .filter(|icon| !icon.trim().is_empty())
                .or_else(|| self.settings.icon_for_source(&link.source));
            if let Some(icon) = icon {
                let _ = write!(
                    icon_rules,
                    "#{container_id} .{icon_class}{{background-image:url('{}') !important;}}",
                    escape_css_url(icon)
                );
            }
        }

        let icon_style = if icon_rules.is_empty() {
            String::new()
        } else {
            format!("<style>{icon_rules}</style>\n")
        };

        format!(
            r#"<div id="{container_id}" class="tools-download-links">
<div class="tools-download-links__header">下载地址</div>
{icon_style}<div class="tools-download-links__list" role="list">
{items}</div>
</div>
"#
        )
    }
}

const THEME_VARS: [&str; 13] = [
    "border",
    "bg",
    "header-bg",
    "header-color",
    "item-bg",
    "icon-bg",
    "title-link",
    "title-link-hover",
    "meta",
    "btn-bg",
    "btn-border",
    "btn-bg-hover",
    "btn-border-hover",
];

const LIGHT_THEME: [&str; 13] = [
    "#edf2f7", "#fafcff", "#f7fbff", "#0f172a", "#ffffff", "#eef2f7", "#1d4ed8", "#1e40af",
    "#6b7280", "#60a5fa", "#93c5fd", "#3b82f6", "#60a5fa",
];

const DARK_THEME: [&str; 13] = [
    "#374151", "#1f2937", "#374151", "#f9fafb", "#374151", "#4b5563", "#60a5fa", "#93c5fd",
    "#9ca3af", "#3b82f6", "#60a5fa", "#2563eb", "#3b82f6",
];

fn theme_vars(values: &[&str; 13]) -> String {
    THEME_VARS
        .iter()
        .zip(values)
        .fold(String::new(), |mut out, (name, value)| {
            let _ = writeln!(out, "  --tools-dl-{name}: {value};");
            out
        })
}

fn extract_links(attrs: &str) -> Vec<LinkEntry> {
    let Some(caps) = DATA_LINKS_PATTERN.captures(attrs) else {
        return Vec::new();
    };
    let data = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
    decode_links(Some(&unescape_html(data)))
}

fn link_item(link: &LinkEntry, icon_class: &str) -> String {
    let source = escape_html(&link.source);
    let display_name = escape_html(link.display_name());
    let aria_label = escape_html(&format!("下载 {}", link.display_name()));
    let url = escape_html(&escape_js_string(&link.url));
    let code_info = match link.code.as_deref() {
        Some(code) if !code.trim().is_empty() => format!("  ·  提取码: {}", escape_html(code)),
        _ => String::new(),
    };

    format!(
        r##"<div class="tools-download-links__item" role="listitem">
<div class="tools-download-links__left">
<div class="tools-download-links__icon {icon_class}" role="img" aria-label="{source}"></div>
<div class="tools-download-links__info">
<div class="tools-download-links__title">
<button class="tools-download-links__title-link" type="button" role="link" aria-label="{aria_label}" onclick="window.open('{url}', '_blank', 'noopener,noreferrer')">{display_name}</button>
</div>
<div class="tools-download-links__meta">{source}{code_info}</div>
</div>
</div>
<button class="tools-download-links__btn" type="button" aria-label="{aria_label}" onclick="window.open('{url}', '_blank', 'noopener,noreferrer')">
<svg width="22" height="22" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg"><path d="M12 3v10m0 0 4-4m-4 4-4-4M5 21h14" stroke="#fff" stroke-width="2" stroke-linecap="round" stroke-linejoin="round"/></svg>
</button>
</div>
"##
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse of [`escape_html`], also accepting `&#x27;` and `&apos;`.
/// `&amp;` is decoded last so escaped entities stay literal.
pub fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Escape for a single-quoted JavaScript string literal.
pub fn escape_js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape for a single-quoted CSS `url()` inside a `<style>` element.
pub fn escape_css_url(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' | '\'' | '"' | '(' | ')' => {
                out.push('\\');
                out.push(ch);
            }
            '<' => out.push_str("\\3c "),
            '>' => out.push_str("\\3e "),
            _ => out.push(ch),
        }
    }
    out
}
