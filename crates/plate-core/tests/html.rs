use plate_core::html::{AttributeSpec, HtmlAttrs, HtmlSpec, from_html, to_html};
use plate_core::{
    Attrs, ChildConstraint, Document, Node, NodeRole, NodeSpec, PlatePlugin, PluginRegistry,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

struct EmbedPlugin;

fn embed_static_attrs() -> HtmlAttrs {
    [("class".to_string(), "embed".to_string())].into_iter().collect()
}

impl PlatePlugin for EmbedPlugin {
    fn id(&self) -> &'static str {
        "test.embed"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec {
            kind: "embed".to_string(),
            role: NodeRole::Block,
            is_void: true,
            children: ChildConstraint::None,
            selectable: true,
            draggable: true,
        }]
    }

    fn html_specs(&self) -> Vec<HtmlSpec> {
        vec![
            HtmlSpec::new("embed", "x-embed")
                .attribute(AttributeSpec::new("src", Value::Null))
                .attribute(AttributeSpec::new("height", json!(100)).parse_html(|el| {
                    el.get_attribute("data-height")
                        .and_then(|h| h.parse::<u64>().ok())
                        .map(Value::from)
                        .unwrap_or(json!(100))
                }).render_html(|value| {
                    [("data-height".to_string(), value.to_string())]
                        .into_iter()
                        .collect()
                }))
                .html_attributes(embed_static_attrs()),
        ]
    }
}

fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::core();
    registry.register_plugin(Box::new(EmbedPlugin)).unwrap();
    registry
}

fn embed(src: &str, height: u64) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("src".to_string(), json!(src));
    attrs.insert("height".to_string(), json!(height));
    Node::void("embed", attrs)
}

#[test]
fn paragraphs_escape_text() {
    let doc = Document {
        children: vec![Node::paragraph("a < b & c")],
    };
    assert_eq!(to_html(&doc, &registry()), "<p>a &lt; b &amp; c</p>");
}

#[test]
fn void_node_round_trips_through_html() {
    let registry = registry();
    let doc = Document {
        children: vec![Node::paragraph("before"), embed("https://x.test/?a=1&b=\"2\"", 240)],
    };

    let html = to_html(&doc, &registry);
    assert_eq!(
        html,
        "<p>before</p><x-embed class=\"embed\" data-height=\"240\" src=\"https://x.test/?a=1&amp;b=&quot;2&quot;\"></x-embed>"
    );
    assert_eq!(from_html(&html, &registry), doc);
}

#[test]
fn missing_attributes_fall_back_to_defaults() {
    let doc = from_html("<x-embed></x-embed>", &registry());
    let mut attrs = Attrs::new();
    attrs.insert("src".to_string(), Value::Null);
    attrs.insert("height".to_string(), json!(100));
    assert_eq!(doc.children, vec![Node::void("embed", attrs)]);
}

#[test]
fn single_quoted_attributes_are_read() {
    let doc = from_html("<x-embed src='a.png' data-height='7'></x-embed>", &registry());
    assert_eq!(doc.children, vec![embed("a.png", 7)]);
}

#[test]
fn unknown_markup_is_flattened() {
    let doc = from_html(
        "<div><p>one</p><section><p>two</p></section></div>loose text<!-- note -->",
        &registry(),
    );
    assert_eq!(
        doc.children,
        vec![
            Node::paragraph("one"),
            Node::paragraph("two"),
            Node::paragraph("loose text"),
        ]
    );
}

#[test]
fn inline_markup_inside_paragraph_becomes_text() {
    let doc = from_html("<p>hello <b>bold</b> world</p>", &registry());
    assert_eq!(doc.children, vec![Node::paragraph("hello bold world")]);
}
