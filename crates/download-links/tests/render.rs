use std::sync::atomic::{AtomicUsize, Ordering};

use plate_core::html::to_html;
use plate_core::{Document, Editor, ExtensionPoints, PluginRegistry};
use plate_download_links::{
    ContentContext, ContentHandler, ContentKind, DownloadLinksCommands, DownloadLinksContentHandler,
    DownloadLinksRenderer, DownloadSettings, DownloadSource, LinkEntry, STYLE_ID, STYLE_MARKER,
    apply_handlers, register,
};

fn renderer(settings: DownloadSettings) -> DownloadLinksRenderer {
    let next = AtomicUsize::new(0);
    DownloadLinksRenderer::new(settings)
        .with_container_ids(move || format!("id{}", next.fetch_add(1, Ordering::Relaxed)))
}

fn block(json: &str) -> String {
    format!("<download-links data-links='{json}'></download-links>")
}

#[test]
fn input_without_blocks_is_untouched() {
    let renderer = renderer(DownloadSettings::default());
    for html in ["", "   ", "<p>plain</p>", "<download-links data-links='[]'>"] {
        assert_eq!(renderer.render(html), html);
    }
}

#[test]
fn renders_card_with_style_block_first() {
    let renderer = renderer(DownloadSettings::default());
    let html = format!(
        "<p>before</p>{}<p>after</p>",
        block(
            r#"[{"url":"https://pan.example.com/s/1","filename":"book.pdf","source":"网盘","code":"ab12"}]"#
        )
    );

    let out = renderer.render(&html);

    assert!(out.starts_with("<p>before</p><style id=\"tools-download-links-style\">"));
    assert_eq!(out.matches(STYLE_ID).count(), 2, "style id plus marker");
    assert!(out.contains(STYLE_MARKER));
    assert!(out.contains("<div id=\"tools-download-links--id0\" class=\"tools-download-links\">"));
    assert!(out.contains("<div class=\"tools-download-links__header\">下载地址</div>"));
    assert!(out.contains(">book.pdf</button>"));
    assert!(out.contains("aria-label=\"下载 book.pdf\""));
    assert!(out.contains("网盘  ·  提取码: ab12"));
    assert!(out.contains(
        "onclick=\"window.open('https://pan.example.com/s/1', '_blank', 'noopener,noreferrer')\""
    ));
    assert!(out.contains("html:not(.dark) {"));
    assert!(out.contains("html.dark {"));
    assert!(out.contains("stroke=\"#fff\" stroke-width=\"2\""));
    assert!(out.contains("</svg>\n</button>\n</div>\n"));
    assert!(out.ends_with("<p>after</p>"));
    assert!(!out.contains("<download-links"));
}

#[test]
fn card_text_is_escaped() {
    let renderer = renderer(DownloadSettings::default());
    let html = block(
        r#"[{"url":"https://x.test/?a=1&b=it&#39;s","filename":"&lt;b&gt;f&lt;/b&gt;.zip","source":"s&s"}]"#,
    );

    let out = renderer.render(&html);

    assert!(out.contains(">&lt;b&gt;f&lt;/b&gt;.zip</button>"));
    assert!(out.contains("window.open('https://x.test/?a=1&amp;b=it\\&#39;s', '_blank'"));
    assert!(out.contains("role=\"img\" aria-label=\"s&amp;s\""));
    assert!(!out.contains("提取码"));
}

#[test]
fn url_is_shown_when_filename_is_blank() {
    let renderer = renderer(DownloadSettings::default());
    let out = renderer.render(&block(
        r#"[{"url":"https://example.com/x.zip","filename":"  ","source":""}]"#,
    ));
    assert!(out.contains(">https://example.com/x.zip</button>"));
}

#[test]
fn icons_come_from_entry_or_configured_source() {
    let settings = DownloadSettings {
        download_sources: vec![DownloadSource {
            name: "Baidu".to_string(),
            icon: "/icons/baidu.png".to_string(),
        }],
        ..DownloadSettings::default()
    };
    let renderer = renderer(settings);
    let out = renderer.render(&block(
        r#"[{"url":"a","source":"baidu"},{"url":"b","source":"x","icon":"/i/(x).png"},{"url":"c","source":"none"}]"#,
    ));

    assert!(out.contains(
        "#tools-download-links--id0 .tools-download-links__icon--0{background-image:url('/icons/baidu.png') !important;}"
    ));
    assert!(out.contains(
        "#tools-download-links--id0 .tools-download-links__icon--1{background-image:url('/i/\\(x\\).png') !important;}"
    ));
    assert!(!out.contains("tools-download-links__icon--2{"));
    assert!(out.contains("class=\"tools-download-links__icon tools-download-links__icon--2\""));
}

#[test]
fn empty_or_attributeless_blocks_render_nothing() {
    let renderer = renderer(DownloadSettings::default());

    let page = concat!(
        "<html><head><title>t</title></head><body>",
        "<download-links></download-links>",
        "<download-links data-links=\"[]\"></download-links>",
        "</body></html>"
    );
    let out = renderer.render(page);
    assert!(out.contains("</style>\n</head>"));
    assert!(out.ends_with("<body></body></html>"));

    let out = renderer.render("<p>x</p><download-links data-links=\"oops\"></download-links>");
    assert!(out.starts_with("<style id="));
    assert!(out.ends_with("</style>\n<p>x</p>"));
}

#[test]
fn style_is_injected_once_and_not_twice() {
    let renderer = renderer(DownloadSettings::default());
    let one = block(r#"[{"url":"a"}]"#);
    let out = renderer.render(&format!("{one}{one}"));

    assert_eq!(out.matches("<style id=").count(), 1);
    assert!(out.contains("tools-download-links--id0"));
    assert!(out.contains("tools-download-links--id1"));

    let again = renderer.render(&format!("{out}{one}"));
    assert_eq!(again.matches("<style id=").count(), 1);
    assert!(again.contains("tools-download-links--id2"));
}

#[test]
fn custom_theme_selectors_are_used() {
    let settings = DownloadSettings {
        light_mode_selector: "[data-theme=light]".to_string(),
        dark_mode_selector: "[data-theme=dark]".to_string(),
        ..DownloadSettings::default()
    };
    let out = renderer(settings).render(&block(r#"[{"url":"a"}]"#));
    assert!(out.contains("[data-theme=light] {\n  --tools-dl-border: #edf2f7;"));
    assert!(out.contains("[data-theme=dark] {\n  --tools-dl-border: #374151;"));
}

#[test]
fn default_container_ids_are_unique() {
    let renderer = DownloadLinksRenderer::default();
    let one = block(r#"[{"url":"a"}]"#);
    let out = renderer.render(&format!("{one}{one}"));

    let ids: Vec<&str> = out
        .match_indices("id=\"tools-download-links--")
        .map(|(ix, m)| &out[ix + m.len()..ix + m.len() + 32])
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert!(ids.iter().all(|id| id.chars().all(|c| c.is_ascii_hexdigit())));
}

#[test]
fn renders_html_written_by_the_editor() {
    let mut points = ExtensionPoints::new();
    register(&mut points);
    let mut editor = Editor::with_registry(PluginRegistry::with_extensions(&points).unwrap());
    editor.add_download_links().unwrap();
    editor
        .set_download_links_attrs(&[LinkEntry::new("https://e.test/?q=\"x\"&y", "f & g", "s")])
        .unwrap();

    let html = to_html(editor.doc(), editor.registry());
    let out = renderer(DownloadSettings::default()).render(&html);

    assert!(out.contains(">f &amp; g</button>"));
    assert!(out.contains("window.open('https://e.test/?q=\\&quot;x\\&quot;&amp;y', '_blank'"));
}

#[test]
fn content_handler_renders_raw_and_content() {
    let handler = DownloadLinksContentHandler::new(renderer(DownloadSettings::default()));
    let one = block(r#"[{"url":"a"}]"#);

    for ctx in [
        ContentContext::post(one.clone(), format!("<p>{one}</p>")),
        ContentContext::single_page(one.clone(), one.clone()),
    ] {
        let kind = ctx.kind;
        assert!(handler.handles(kind));
        let out = handler.handle(ctx);
        assert_eq!(out.kind, kind);
        assert!(out.raw.contains("tools-download-links__list"));
        assert!(out.content.contains("tools-download-links__list"));
        assert!(!out.raw.contains("<download-links"));
        assert!(!out.content.contains("<download-links"));
    }

    let handlers: Vec<Box<dyn ContentHandler>> = vec![Box::new(handler)];
    let out = apply_handlers(&handlers, ContentContext::post("<p>x</p>", "<p>y</p>"));
    assert_eq!(out, ContentContext::post("<p>x</p>", "<p>y</p>"));
    assert_eq!(out.kind, ContentKind::Post);
}
