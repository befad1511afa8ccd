//! Owned markup tree parsed from a string.
//!
//! This is the detached tree the markup-string strategy renders into. Markup
//! is read with the `quick_xml` event reader, end-name checks relaxed so
//! HTML leniency holds: stray close tags are dropped, void elements never
//! open a scope, and unclosed elements close at end of input. Character
//! references are decoded into text leaves and re-encoded on output, so
//! offsets count what a reader sees.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::HighlightConfig;
use crate::tree::{Fragment, HighlightMark, TextTree};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("malformed markup near byte {position}: {message}")]
    Malformed { position: usize, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    Text(String),
    /// Comments, doctypes and raw-text element bodies, emitted verbatim
    Raw(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed markup tree. Replaced nodes stay in the arena, detached, so
/// handles held by callers never dangle.
#[derive(Debug, Clone)]
pub struct MarkupTree {
    nodes: Vec<NodeData>,
    root: NodeId,
    config: HighlightConfig,
}

impl MarkupTree {
    pub fn parse(markup: &str, config: &HighlightConfig) -> Result<Self, MarkupError> {
        let mut tree = MarkupTree {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            config: config.clone(),
        };
        let mut reader = Reader::from_str(markup);
        reader.trim_text(false).check_end_names(false);

        let mut open = vec![tree.root];
        loop {
            let parent = open.last().copied().unwrap_or(tree.root);
            let event = reader.read_event().map_err(|e| malformed(&reader, e))?;
            match event {
                Event::Start(start) => {
                    let Some(name) = tag_name(&start) else {
                        tree.append_text(parent, &format!("<{}>", String::from_utf8_lossy(&start)));
                        continue;
                    };
                    let element = tree.append(
                        NodeKind::Element {
                            name: name.clone(),
                            attributes: attributes(&start),
                            self_closing: false,
                        },
                        parent,
                    );
                    if is_raw_text(&name) {
                        // The body is consumed up to and including the close tag
                        let body = reader
                            .read_text(start.name())
                            .map_err(|e| malformed(&reader, e))?;
                        if !body.is_empty() {
                            tree.append(NodeKind::Raw(body.into_owned()), element);
                        }
                    } else if !is_void(&name) {
                        open.push(element);
                    }
                }
                Event::Empty(start) => match tag_name(&start) {
                    Some(name) => {
                        tree.append(
                            NodeKind::Element {
                                name,
                                attributes: attributes(&start),
                                self_closing: true,
                            },
                            parent,
                        );
                    }
                    None => {
                        tree.append_text(parent, &format!("<{}/>", String::from_utf8_lossy(&start)));
                    }
                },
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    let matching = open.iter().rposition(|node| {
                        tree.element_name(*node)
                            .is_some_and(|n| n.eq_ignore_ascii_case(&name))
                    });
                    match matching {
                        Some(index) => open.truncate(index),
                        None => debug!(tag = %name, "dropping stray close tag"),
                    }
                }
                Event::Text(text) => tree.append_text(parent, &String::from_utf8_lossy(&text)),
                Event::CData(data) => {
                    let raw = format!("<![CDATA[{}]]>", String::from_utf8_lossy(&data));
                    tree.append(NodeKind::Raw(raw), parent);
                }
                Event::Comment(text) => {
                    let raw = format!("<!--{}-->", String::from_utf8_lossy(&text));
                    tree.append(NodeKind::Raw(raw), parent);
                }
                Event::DocType(text) => {
                    let raw = format!("<!DOCTYPE {}>", String::from_utf8_lossy(&text));
                    tree.append(NodeKind::Raw(raw), parent);
                }
                Event::Decl(decl) => {
                    let raw = format!("<?{}?>", String::from_utf8_lossy(&decl));
                    tree.append(NodeKind::Raw(raw), parent);
                }
                Event::PI(text) => {
                    let raw = format!("<?{}?>", String::from_utf8_lossy(&text));
                    tree.append(NodeKind::Raw(raw), parent);
                }
                Event::Eof => break,
            }
        }
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Container ids in document order
    pub fn container_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.walk(self.root, &mut |tree, node| {
            if let Some(id) = tree.attribute(node, &tree.config.container_attribute) {
                ids.push(id.to_string());
            }
        });
        ids
    }

    pub fn element_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|a| a.name.eq_ignore_ascii_case(name))
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for child in &self.nodes[self.root.0].children {
            self.write_node(*child, &mut out);
        }
        out
    }

    fn walk(&self, node: NodeId, visit: &mut dyn FnMut(&MarkupTree, NodeId)) {
        visit(self, node);
        for child in &self.nodes[node.0].children {
            self.walk(*child, visit);
        }
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        let data = &self.nodes[node.0];
        match &data.kind {
            NodeKind::Root => {
                for child in &data.children {
                    self.write_node(*child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Raw(raw) => out.push_str(raw),
            NodeKind::Element {
                name,
                attributes,
                self_closing,
            } => {
                out.push('<');
                out.push_str(name);
                for attr in attributes {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(&attr.value));
                    out.push('"');
                }
                if *self_closing {
                    out.push_str(" />");
                    return;
                }
                out.push('>');
                if is_void(name) {
                    return;
                }
                for child in &data.children {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }

    fn push_node(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        id
    }

    fn append(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = self.push_node(kind, parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append entity-decoded text, joining a preceding text leaf
    fn append_text(&mut self, parent: NodeId, raw: &str) {
        let decoded = html_escape::decode_html_entities(raw);
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(&decoded);
                return;
            }
        }
        self.append(NodeKind::Text(decoded.into_owned()), parent);
    }

    fn build_fragment(&mut self, fragment: Fragment, parent: NodeId) -> NodeId {
        match fragment {
            Fragment::Text(text) => self.push_node(NodeKind::Text(text), parent),
            Fragment::Highlight { mark, text } => {
                let attributes = vec![
                    Attribute {
                        name: "class".to_string(),
                        value: self.config.class_for(mark.color),
                    },
                    Attribute {
                        name: self.config.id_attribute.clone(),
                        value: mark.id.to_string(),
                    },
                    Attribute {
                        name: self.config.color_attribute.clone(),
                        value: mark.color.as_str().to_string(),
                    },
                ];
                let wrapper = self.push_node(
                    NodeKind::Element {
                        name: self.config.wrapper_tag.clone(),
                        attributes,
                        self_closing: false,
                    },
                    parent,
                );
                let leaf = self.push_node(NodeKind::Text(text), wrapper);
                self.nodes[wrapper.0].children.push(leaf);
                wrapper
            }
        }
    }
}

impl TextTree for MarkupTree {
    type Node = NodeId;

    fn find_container(&self, id: &str) -> Option<NodeId> {
        let mut found = None;
        self.walk(self.root, &mut |tree, node| {
            if found.is_none() && tree.attribute(node, &tree.config.container_attribute) == Some(id) {
                found = Some(node);
            }
        });
        found
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    fn highlight_mark(&self, node: &NodeId) -> Option<HighlightMark> {
        let name = self.element_name(*node)?;
        if !name.eq_ignore_ascii_case(&self.config.wrapper_tag) {
            return None;
        }
        let id = Uuid::parse_str(self.attribute(*node, &self.config.id_attribute)?).ok()?;
        let color = self.attribute(*node, &self.config.color_attribute)?.parse().ok()?;
        Some(HighlightMark { id, color })
    }

    fn replace_node(&mut self, node: &NodeId, fragments: Vec<Fragment>) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        let Some(index) = self.nodes[parent.0].children.iter().position(|c| c == node) else {
            return;
        };
        let replacements: Vec<NodeId> = fragments
            .into_iter()
            .map(|fragment| self.build_fragment(fragment, parent))
            .collect();
        self.nodes[parent.0]
            .children
            .splice(index..=index, replacements);
        self.nodes[node.0].parent = None;
    }
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Element name, or `None` when a `<` does not open a real tag
fn tag_name(start: &BytesStart) -> Option<String> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    name.starts_with(|c: char| c.is_ascii_alphabetic()).then_some(name)
}

fn attributes(start: &BytesStart) -> Vec<Attribute> {
    let mut attrs = start.html_attributes();
    attrs.with_checks(false);
    attrs
        .filter_map(|attr| match attr {
            Ok(attr) => Some(Attribute {
                name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                value: html_escape::decode_html_entities(&String::from_utf8_lossy(&attr.value))
                    .into_owned(),
            }),
            Err(e) => {
                debug!(error = %e, "dropping malformed attribute");
                None
            }
        })
        .collect()
}

fn malformed(reader: &Reader<&[u8]>, error: quick_xml::Error) -> MarkupError {
    MarkupError::Malformed {
        position: reader.buffer_position(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HighlightColor;
    use crate::tree::leaves;
    use pretty_assertions::assert_eq;

    fn parse(markup: &str) -> MarkupTree {
        MarkupTree::parse(markup, &HighlightConfig::default()).unwrap()
    }

    #[test]
    fn test_roundtrip_simple_markup() {
        let markup = r#"<div data-container-id="p1"><p>The <em>quick</em> fox</p><br></div>"#;
        assert_eq!(parse(markup).to_markup(), markup);
    }

    #[test]
    fn test_leaves_in_document_order() {
        let tree = parse("<p>The <em>quick</em> fox</p>");
        let texts: Vec<String> = leaves(&tree, &tree.root())
            .iter()
            .filter_map(|n| tree.text(n))
            .collect();
        assert_eq!(texts, vec!["The ", "quick", " fox"]);
    }

    #[test]
    fn test_entities_decoded_in_text() {
        let tree = parse("<p>a &amp; b &lt; c</p>");
        let leaf = leaves(&tree, &tree.root())[0];
        assert_eq!(tree.text(&leaf).unwrap(), "a & b < c");
        assert_eq!(tree.to_markup(), "<p>a &amp; b &lt; c</p>");
    }

    #[test]
    fn test_comments_and_scripts_are_not_text() {
        let tree = parse("<p>a<!-- note -->b</p><script>var x = '<p>';</script>");
        let texts: Vec<String> = leaves(&tree, &tree.root())
            .iter()
            .filter_map(|n| tree.text(n))
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert!(tree.to_markup().contains("var x = '<p>';"));
    }

    #[test]
    fn test_find_container() {
        let tree = parse(r#"<section data-container-id="p1">x</section><section data-container-id="p2">y</section>"#);
        let p2 = tree.find_container("p2").unwrap();
        assert_eq!(tree.element_name(p2), Some("section"));
        assert!(tree.find_container("p3").is_none());
        assert_eq!(tree.container_ids(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_stray_close_tag_dropped() {
        let tree = parse("<p>a</span>b</p>");
        assert_eq!(tree.to_markup(), "<p>ab</p>");
    }

    #[test]
    fn test_unclosed_comment_is_error() {
        let err = MarkupTree::parse("<p><!-- oops</p>", &HighlightConfig::default()).unwrap_err();
        assert!(matches!(err, MarkupError::Malformed { .. }));
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        let err = MarkupTree::parse("<p>ok</p><em class=\"x\"", &HighlightConfig::default()).unwrap_err();
        assert!(matches!(err, MarkupError::Malformed { .. }));
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        let tree = parse("<div><p>one<b>two");
        assert_eq!(tree.to_markup(), "<div><p>one<b>two</b></p></div>");
    }

    #[test]
    fn test_attributes_decoded_and_reencoded() {
        let tree = parse(r#"<p data-container-id='a&amp;b' hidden>x</p>"#);
        assert_eq!(tree.container_ids(), vec!["a&b"]);
        assert_eq!(
            tree.to_markup(),
            r#"<p data-container-id="a&amp;b" hidden="">x</p>"#
        );
    }

    #[test]
    fn test_doctype_and_self_closing_kept() {
        let markup = "<!DOCTYPE html><p>a<br />b</p>";
        let tree = parse(markup);
        assert_eq!(tree.to_markup(), markup);
        let texts: Vec<String> = leaves(&tree, &tree.root())
            .iter()
            .filter_map(|n| tree.text(n))
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_replace_node_with_highlight() {
        let mut tree = parse("<p>hello</p>");
        let leaf = leaves(&tree, &tree.root())[0];
        let mark = HighlightMark {
            id: Uuid::nil(),
            color: HighlightColor::Green,
        };
        tree.replace_node(
            &leaf,
            vec![
                Fragment::Text("he".to_string()),
                Fragment::Highlight { mark, text: "ll".to_string() },
                Fragment::Text("o".to_string()),
            ],
        );
        assert_eq!(
            tree.to_markup(),
            "<p>he<mark class=\"ink-highlight ink-highlight-green\" \
             data-highlight-id=\"00000000-0000-0000-0000-000000000000\" \
             data-highlight-color=\"green\">ll</mark>o</p>"
        );

        let wrappers = crate::tree::outer_highlights(&tree, &tree.root());
        assert_eq!(wrappers.len(), 1);
        assert_eq!(tree.highlight_mark(&wrappers[0]), Some(mark));
    }
}
