use std::collections::BTreeMap;

use serde_json::Value;

use crate::core::{Attrs, Document, ElementNode, Node};
use crate::plugin::{ChildConstraint, PluginRegistry};

pub type HtmlAttrs = BTreeMap<String, String>;

pub type ParseAttrFn = fn(&HtmlElement) -> Value;

pub type RenderAttrFn = fn(&Value) -> HtmlAttrs;

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlElement {
    pub tag: String,
    pub attrs: HtmlAttrs,
}

impl HtmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: HtmlAttrs::new(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,
    pub default: Value,
    pub parse_html: Option<ParseAttrFn>,
    pub render_html: Option<RenderAttrFn>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            default,
            parse_html: None,
            render_html: None,
        }
    }

    pub fn parse_html(mut self, parse: ParseAttrFn) -> Self {
        self.parse_html = Some(parse);
        self
    }

    pub fn render_html(mut self, render: RenderAttrFn) -> Self {
        self.render_html = Some(render);
        self
    }

    fn parse(&self, element: &HtmlElement) -> Value {
        match self.parse_html {
            Some(parse) => parse(element),
            None => element
                .get_attribute(&self.name)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or_else(|| self.default.clone()),
        }
    }

    fn render(&self, value: &Value) -> HtmlAttrs {
        if let Some(render) = self.render_html {
            return render(value);
        }
        let mut out = HtmlAttrs::new();
        match value {
            Value::Null => {}
            Value::String(s) => {
                out.insert(self.name.clone(), s.clone());
            }
            other => {
                out.insert(self.name.clone(), other.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct HtmlSpec {
    pub kind: String,
    pub tag: String,
    pub attributes: Vec<AttributeSpec>,
    pub html_attributes: HtmlAttrs,
}

impl HtmlSpec {
    pub fn new(kind: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            tag: tag.into(),
            attributes: Vec::new(),
            html_attributes: HtmlAttrs::new(),
        }
    }

    pub fn attribute(mut self, spec: AttributeSpec) -> Self {
        self.attributes.push(spec);
        self
    }

    pub fn html_attributes(mut self, attrs: HtmlAttrs) -> Self {
        self.html_attributes = attrs;
        self
    }

    pub fn parse_attrs(&self, element: &HtmlElement) -> Attrs {
        self.attributes
            .iter()
            .map(|spec| (spec.name.clone(), spec.parse(element)))
            .collect()
    }

    pub fn render_element(&self, attrs: &Attrs) -> HtmlElement {
        let mut rendered = HtmlAttrs::new();
        for spec in &self.attributes {
            let value = attrs.get(&spec.name).unwrap_or(&spec.default);
            rendered.extend(spec.render(value));
        }
        HtmlElement {
            tag: self.tag.clone(),
            attrs: merge_attributes(self.html_attributes.clone(), rendered),
        }
    }
}

pub fn merge_attributes(base: HtmlAttrs, extra: HtmlAttrs) -> HtmlAttrs {
    let mut merged = base;
    for (key, value) in extra {
        match (key.as_str(), merged.get(&key)) {
            ("class", Some(prev)) if !prev.is_empty() => {
                let joined = format!("{prev} {value}");
                merged.insert(key, joined);
            }
            ("style", Some(prev)) if !prev.is_empty() => {
                let joined = format!("{}; {}", prev.trim_end_matches(';'), value);
                merged.insert(key, joined);
            }
            _ => {
                merged.insert(key, value);
            }
        }
    }
    merged
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&ix| ix <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity.strip_prefix('#').and_then(|num| {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                    None => num.parse::<u32>().ok()?,
                };
                char::from_u32(code)
            }),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn write_open_tag(out: &mut String, element: &HtmlElement) {
    out.push('<');
    out.push_str(&element.tag);
    for (name, value) in &element.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
}

pub fn to_html(doc: &Document, registry: &PluginRegistry) -> String {
    let mut out = String::new();
    for node in &doc.children {
        write_node(&mut out, node, registry);
    }
    out
}

fn write_node(out: &mut String, node: &Node, registry: &PluginRegistry) {
    match node {
        Node::Text(t) => out.push_str(&escape_text(&t.text)),
        Node::Element(el) => match registry.html_spec(&el.kind) {
            Some(spec) => {
                let element = spec.render_element(&el.attrs);
                write_open_tag(out, &element);
                for child in &el.children {
                    write_node(out, child, registry);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
            None => {
                for child in &el.children {
                    write_node(out, child, registry);
                }
            }
        },
        Node::Void(v) => {
            if let Some(spec) = registry.html_spec(&v.kind) {
                let element = spec.render_element(&v.attrs);
                write_open_tag(out, &element);
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

pub fn from_html(html: &str, registry: &PluginRegistry) -> Document {
    let tree = build_tree(tokenize(html));
    Document {
        children: convert_blocks(&tree, registry),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Start {
        name: String,
        attrs: HtmlAttrs,
        self_closing: bool,
    },
    End(String),
    Text(String),
}

fn push_text(tokens: &mut Vec<Token>, raw: &str) {
    if !raw.is_empty() {
        tokens.push(Token::Text(unescape(raw)));
    }
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            push_text(&mut tokens, rest);
            break;
        };
        push_text(&mut tokens, &rest[..lt]);
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map(|end| &after[end + 3..]).unwrap_or("");
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map(|end| &rest[end + 1..]).unwrap_or("");
            continue;
        }
        if let Some(after) = rest.strip_prefix("</") {
            match after.find('>') {
                Some(end) => {
                    tokens.push(Token::End(after[..end].trim().to_ascii_lowercase()));
                    rest = &after[end + 1..];
                }
                None => rest = "",
            }
            continue;
        }

        match scan_start_tag(&rest[1..]) {
            Some((token, consumed)) => {
                tokens.push(token);
                rest = &rest[1 + consumed..];
            }
            None => {
                push_text(&mut tokens, "<");
                rest = &rest[1..];
            }
        }
    }

    tokens
}

fn scan_start_tag(s: &str) -> Option<(Token, usize)> {
    let bytes = s.as_bytes();
    let name_len = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')))
        .unwrap_or(s.len());
    if name_len == 0 {
        return None;
    }
    let name = s[..name_len].to_ascii_lowercase();
    let mut attrs = HtmlAttrs::new();
    let mut i = name_len;

    let skip_ws = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    loop {
        i = skip_ws(i);
        if i >= bytes.len() {
            return None;
        }
        match bytes[i] {
            b'>' => {
                let token = Token::Start {
                    name,
                    attrs,
                    self_closing: false,
                };
                return Some((token, i + 1));
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                let token = Token::Start {
                    name,
                    attrs,
                    self_closing: true,
                };
                return Some((token, i + 2));
            }
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = s[attr_start..i].to_ascii_lowercase();
        i = skip_ws(i);

        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i = skip_ws(i + 1);
            if i >= bytes.len() {
                return None;
            }
            match bytes[i] {
                quote @ (b'"' | b'\'') => {
                    let close = s[i + 1..].find(quote as char)? + i + 1;
                    value = unescape(&s[i + 1..close]);
                    i = close + 1;
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = unescape(&s[start..i]);
                }
            }
        }

        if !attr_name.is_empty() {
            attrs.entry(attr_name).or_insert(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum HtmlNode {
    Element {
        element: HtmlElement,
        children: Vec<HtmlNode>,
    },
    Text(String),
}

impl HtmlNode {
    fn text_content(&self) -> String {
        match self {
            HtmlNode::Text(t) => t.clone(),
            HtmlNode::Element { children, .. } => {
                children.iter().map(HtmlNode::text_content).collect()
            }
        }
    }
}

struct OpenElement {
    element: HtmlElement,
    children: Vec<HtmlNode>,
}

fn build_tree(tokens: Vec<Token>) -> Vec<HtmlNode> {
    let mut stack: Vec<OpenElement> = vec![OpenElement {
        element: HtmlElement::default(),
        children: Vec::new(),
    }];

    fn close_top(stack: &mut Vec<OpenElement>) {
        if let Some(open) = stack.pop() {
            let node = HtmlNode::Element {
                element: open.element,
                children: open.children,
            };
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }
        }
    }

    for token in tokens {
        match token {
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                let element = HtmlElement { tag: name, attrs };
                if self_closing || VOID_TAGS.contains(&element.tag.as_str()) {
                    if let Some(top) = stack.last_mut() {
                        top.children.push(HtmlNode::Element {
                            element,
                            children: Vec::new(),
                        });
                    }
                } else {
                    stack.push(OpenElement {
                        element,
                        children: Vec::new(),
                    });
                }
            }
            Token::End(name) => {
                let open_at = stack
                    .iter()
                    .rposition(|open| open.element.tag == name)
                    .filter(|&pos| pos > 0);
                if let Some(pos) = open_at {
                    while stack.len() > pos {
                        close_top(&mut stack);
                    }
                }
            }
            Token::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.children.push(HtmlNode::Text(text));
                }
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn convert_blocks(nodes: &[HtmlNode], registry: &PluginRegistry) -> Vec<Node> {
    let mut out = Vec::new();
    for node in nodes {
        match node {
            HtmlNode::Text(text) => {
                if !text.trim().is_empty() {
                    out.push(Node::paragraph(text.clone()));
                }
            }
            HtmlNode::Element { element, children } => {
                let Some(spec) = registry.html_spec_for_tag(&element.tag) else {
                    tracing::trace!(tag = %element.tag, "flattening unknown html element");
                    out.extend(convert_blocks(children, registry));
                    continue;
                };
                let attrs = spec.parse_attrs(element);
                let node_spec = registry.node_spec(&spec.kind);
                if node_spec.is_some_and(|s| s.is_void) {
                    out.push(Node::void(spec.kind.clone(), attrs));
                    continue;
                }
                let children = match node_spec.map(|s| &s.children) {
                    Some(ChildConstraint::InlineOnly) | None => {
                        let text: String = children.iter().map(HtmlNode::text_content).collect();
                        vec![Node::text(text)]
                    }
                    Some(_) => convert_blocks(children, registry),
                };
                out.push(Node::Element(ElementNode {
                    kind: spec.kind.clone(),
                    attrs,
                    children,
                }));
            }
        }
    }
    out
}
