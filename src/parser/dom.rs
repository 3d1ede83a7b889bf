use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::selector::Selector;

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});").unwrap());

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub enum NodeKind {
    Root,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
}

/// Forgiving HTML tree. Nodes live in an arena in document order, so a
/// node's descendants always occupy the ids directly after it.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    pub fn parse(html: &str) -> Document {
        let mut builder = TreeBuilder::new();
        builder.run(html);
        Document {
            nodes: builder.nodes,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Tag name for element nodes; `None` for text and the root.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn classes(&self, id: NodeId) -> impl Iterator<Item = &str> {
        self.attr(id, "class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        (id + 1..self.nodes.len()).take_while(move |&d| self.is_descendant(d, id))
    }

    /// Concatenated text of every text node under `id`, untrimmed.
    pub fn text(&self, id: NodeId) -> String {
        if let NodeKind::Text(t) = &self.nodes[id].kind {
            return t.clone();
        }
        self.descendants(id)
            .filter_map(|d| match &self.nodes[d].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        (1..self.nodes.len())
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    pub fn select_one(&self, selector: &Selector) -> Option<NodeId> {
        (1..self.nodes.len()).find(|&id| selector.matches(self, id))
    }

    pub fn select_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&id| selector.matches(self, id))
            .collect()
    }

    pub fn select_one_within(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope).find(|&id| selector.matches(self, id))
    }
}

struct TreeBuilder {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        TreeBuilder {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
            }],
            open: vec![0],
        }
    }

    fn current(&self) -> NodeId {
        *self.open.last().unwrap_or(&0)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let parent = self.current();
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
        });
        id
    }

    fn push_text(&mut self, raw: &str, decode: bool) {
        if raw.is_empty() {
            return;
        }
        let text = if decode {
            decode_entities(raw)
        } else {
            raw.to_string()
        };
        self.push(NodeKind::Text(text));
    }

    fn close(&mut self, tag: &str) {
        // Stray end tags with no matching open element are dropped.
        let found = self
            .open
            .iter()
            .rposition(|&id| matches!(&self.nodes[id].kind, NodeKind::Element { tag: t, .. } if t == tag));
        if let Some(pos) = found {
            self.open.truncate(pos);
        }
    }

    fn run(&mut self, html: &str) {
        let bytes = html.as_bytes();
        let mut pos = 0;

        while pos < bytes.len() {
            let rest = &html[pos..];

            if rest.starts_with("<!--") {
                pos = match rest[4..].find("-->") {
                    Some(end) => pos + 4 + end + 3,
                    None => bytes.len(),
                };
                continue;
            }

            if rest.starts_with("<!") || rest.starts_with("<?") {
                pos = skip_past(html, pos, b'>');
                continue;
            }

            if rest.starts_with("</") {
                let (name, _) = read_name(html, pos + 2);
                if !name.is_empty() {
                    self.close(&name);
                }
                pos = skip_past(html, pos, b'>');
                continue;
            }

            if bytes[pos] == b'<' && bytes.get(pos + 1).is_some_and(|b| b.is_ascii_alphabetic()) {
                let tag = read_start_tag(html, pos);
                pos = tag.end;
                let name = tag.name.clone();
                let id = self.push(NodeKind::Element {
                    tag: tag.name,
                    attrs: tag.attrs,
                });

                if tag.self_closing || VOID_TAGS.contains(&name.as_str()) {
                    continue;
                }

                if RAW_TEXT_TAGS.contains(&name.as_str()) {
                    let close = find_ci(html, pos, &format!("</{}", name));
                    let body_end = close.unwrap_or(bytes.len());
                    self.open.push(id);
                    self.push_text(&html[pos..body_end], name == "title" || name == "textarea");
                    self.open.pop();
                    pos = match close {
                        Some(c) => skip_past(html, c, b'>'),
                        None => bytes.len(),
                    };
                    continue;
                }

                self.open.push(id);
                continue;
            }

            // Text run up to the next '<' (a lone '<' that starts no tag is text).
            let search_from = if bytes[pos] == b'<' { pos + 1 } else { pos };
            let end = html[search_from..]
                .find('<')
                .map(|i| search_from + i)
                .unwrap_or(bytes.len());
            self.push_text(&html[pos..end], true);
            pos = end;
        }
    }
}

struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
    self_closing: bool,
    end: usize,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

fn read_name(html: &str, start: usize) -> (String, usize) {
    let bytes = html.as_bytes();
    let mut end = start;
    while end < bytes.len() && is_name_byte(bytes[end]) {
        end += 1;
    }
    (html[start..end].to_ascii_lowercase(), end)
}

fn skip_past(html: &str, from: usize, byte: u8) -> usize {
    html.as_bytes()[from..]
        .iter()
        .position(|&b| b == byte)
        .map(|i| from + i + 1)
        .unwrap_or(html.len())
}

fn find_ci(html: &str, from: usize, needle: &str) -> Option<usize> {
    let hay = &html.as_bytes()[from..];
    let needle = needle.as_bytes();
    hay.windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| from + i)
}

fn read_start_tag(html: &str, start: usize) -> StartTag {
    let bytes = html.as_bytes();
    let (name, mut i) = read_name(html, start + 1);
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                if bytes.get(i + 1) == Some(&b'>') {
                    self_closing = true;
                    i += 2;
                    break;
                }
                i += 1;
                continue;
            }
            _ => {}
        }

        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let attr_name = html[name_start..i].to_ascii_lowercase();
        if attr_name.is_empty() {
            // Unparseable byte such as a stray '='; step over it.
            i += 1;
            continue;
        }

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let close = html.as_bytes()[i + 1..]
                        .iter()
                        .position(|&b| b == q)
                        .map(|p| i + 1 + p)
                        .unwrap_or(bytes.len());
                    value = decode_entities(&html[i + 1..close]);
                    i = (close + 1).min(bytes.len());
                }
                _ => {
                    let v_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&html[v_start..i]);
                }
            }
        }
        attrs.push((attr_name, value));
    }

    StartTag {
        name,
        attrs,
        self_closing,
        end: i,
    }
}

/// Decode named and numeric character references; unknown names are kept verbatim.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    "mdash" => Some('—'),
                    "ndash" => Some('–'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(s: &str) -> Selector {
        s.parse().unwrap()
    }

    #[test]
    fn nested_text() {
        let doc = Document::parse("<div id=a><span>Hello</span> <b>world</b></div>");
        let div = doc.select_one(&sel("#a")).unwrap();
        assert_eq!(doc.text(div), "Hello world");
    }

    #[test]
    fn attributes_quoted_unquoted_bare() {
        let doc = Document::parse(r#"<input type=checkbox checked data-cy='x-1' class="a  b">"#);
        let input = doc.select_one(&sel("input")).unwrap();
        assert_eq!(doc.attr(input, "type"), Some("checkbox"));
        assert_eq!(doc.attr(input, "checked"), Some(""));
        assert_eq!(doc.attr(input, "data-cy"), Some("x-1"));
        assert!(doc.has_class(input, "b"));
    }

    #[test]
    fn void_and_self_closing_do_not_nest() {
        let doc = Document::parse("<div><img src=x><br/><p>text</p></div><p>after</p>");
        let p = doc.select(&sel("div p"));
        assert_eq!(p.len(), 1);
        assert_eq!(doc.select(&sel("p")).len(), 2);
    }

    #[test]
    fn script_body_is_raw_text() {
        let doc = Document::parse("<script>if (a < b) { x = '<div>'; }</script><div>real</div>");
        assert_eq!(doc.select(&sel("div")).len(), 1);
        let script = doc.select_one(&sel("script")).unwrap();
        assert!(doc.text(script).contains("'<div>'"));
    }

    #[test]
    fn stray_and_unclosed_tags() {
        let doc = Document::parse("</span><div><p>one<div>two</p></div>tail");
        let divs = doc.select(&sel("div"));
        assert_eq!(divs.len(), 2);
        assert_eq!(doc.text(divs[1]), "two");
        assert!(doc.is_descendant(divs[1], divs[0]));
    }

    #[test]
    fn comments_and_doctype_skipped() {
        let doc = Document::parse("<!DOCTYPE html><!-- <div>hidden</div> --><div>shown</div>");
        let divs = doc.select(&sel("div"));
        assert_eq!(divs.len(), 1);
        assert_eq!(doc.text(divs[0]), "shown");
    }

    #[test]
    fn entities_decoded() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt; &#39;d&#x27; &bogus;"), "a & b <c> 'd' &bogus;");
        let doc = Document::parse("<p title=\"x &quot;y&quot;\">1 &lt; 2</p>");
        let p = doc.select_one(&sel("p")).unwrap();
        assert_eq!(doc.attr(p, "title"), Some("x \"y\""));
        assert_eq!(doc.text(p), "1 < 2");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let doc = Document::parse("<p>a < b</p>");
        let p = doc.select_one(&sel("p")).unwrap();
        assert_eq!(doc.text(p), "a < b");
    }

    #[test]
    fn truncated_input_does_not_panic() {
        for html in ["<div class=\"a", "<div", "<", "<!--", "<script>x", "<a href='x'>é", "</", "<p a=", "<p a='"] {
            let doc = Document::parse(html);
            let _ = doc.select(&sel("*"));
        }
    }

    #[test]
    fn non_ascii_attributes_and_text() {
        let doc = Document::parse(
            "<div data-cy=\"joueur-Élodie\" title='名前' lang=ü class=\"ä  b\">Šachy 日本</div><é>x</é>",
        );
        let div = doc.select_one(&sel("div")).unwrap();
        assert_eq!(doc.attr(div, "data-cy"), Some("joueur-Élodie"));
        assert_eq!(doc.attr(div, "title"), Some("名前"));
        assert_eq!(doc.attr(div, "lang"), Some("ü"));
        assert!(doc.has_class(div, "ä"));
        assert_eq!(doc.text(div), "Šachy 日本");
        assert_eq!(doc.select(&sel("[data-cy$='Élodie']")).len(), 1);
    }

    #[test]
    fn script_end_tag_without_bracket() {
        let doc = Document::parse("<script>var a = 1;</script<div>after</div><p>tail</p>");
        let script = doc.select_one(&sel("script")).unwrap();
        assert_eq!(doc.text(script), "var a = 1;");
        // The unterminated end tag runs to the next '>', swallowing `<div`.
        assert!(doc.select(&sel("div")).is_empty());
        assert_eq!(doc.text(doc.select_one(&sel("p")).unwrap()), "tail");

        let doc = Document::parse("<script>x</script");
        let script = doc.select_one(&sel("script")).unwrap();
        assert_eq!(doc.text(script), "x");
    }
}
