//! [`TextTree`] over the live browser DOM

use tracing::warn;
use uuid::Uuid;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, DocumentFragment, Element, Node};

use inkmark_core::offsets::TreePoint;
use inkmark_core::{Fragment, HighlightColor, HighlightConfig, HighlightMark, TextTree};

/// Elements whose text is not reader-visible content
const OPAQUE_ELEMENTS: [&str; 4] = ["SCRIPT", "STYLE", "TEMPLATE", "NOSCRIPT"];

pub struct DomTree {
    document: Document,
    config: HighlightConfig,
}

impl DomTree {
    pub fn new(document: Document, config: HighlightConfig) -> Self {
        Self { document, config }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Ids of every marked container currently in the page
    pub fn container_ids(&self) -> Vec<String> {
        let selector = format!("[{}]", self.config.container_attribute);
        let Ok(nodes) = self.document.query_selector_all(&selector) else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .filter_map(|element| element.get_attribute(&self.config.container_attribute))
            .collect()
    }

    /// Selection endpoint from a DOM `Range` boundary. Text offsets arrive in
    /// UTF-16 code units and are converted to chars.
    pub fn point(&self, node: Node, dom_offset: u32) -> TreePoint<Node> {
        let offset = match self.text(&node) {
            Some(text) => utf16_to_chars(&text, dom_offset as usize),
            None => dom_offset as usize,
        };
        TreePoint::new(node, offset)
    }

    /// Container id and highlight id for a click on `target`
    pub fn hit_test(&self, target: &Element) -> Option<(String, Uuid)> {
        let wrapper = target
            .closest(&format!("[{}]", self.config.id_attribute))
            .ok()??;
        let id = wrapper
            .get_attribute(&self.config.id_attribute)?
            .parse::<Uuid>()
            .ok()?;
        let container = wrapper
            .closest(&format!("[{}]", self.config.container_attribute))
            .ok()??;
        let container_id = container.get_attribute(&self.config.container_attribute)?;
        Some((container_id, id))
    }

    fn build_fragment(&self, fragments: Vec<Fragment>) -> Result<DocumentFragment, JsValue> {
        let out = self.document.create_document_fragment();
        for fragment in fragments {
            let child: Node = match fragment {
                Fragment::Text(text) => self.document.create_text_node(&text).into(),
                Fragment::Highlight { mark, text } => {
                    let wrapper = self.document.create_element(&self.config.wrapper_tag)?;
                    wrapper.set_attribute("class", &self.config.class_for(mark.color))?;
                    wrapper.set_attribute(&self.config.id_attribute, &mark.id.to_string())?;
                    wrapper.set_attribute(&self.config.color_attribute, mark.color.as_str())?;
                    wrapper.append_child(&self.document.create_text_node(&text))?;
                    wrapper.into()
                }
            };
            out.append_child(&child)?;
        }
        Ok(out)
    }

    fn try_replace(&self, node: &Node, fragments: Vec<Fragment>) -> Result<(), JsValue> {
        let Some(parent) = node.parent_node() else {
            return Ok(());
        };
        if fragments.is_empty() {
            parent.remove_child(node)?;
        } else {
            let replacement = self.build_fragment(fragments)?;
            parent.replace_child(&replacement, node)?;
        }
        Ok(())
    }
}

impl TextTree for DomTree {
    type Node = Node;

    fn find_container(&self, id: &str) -> Option<Node> {
        let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
        let selector = format!("[{}=\"{}\"]", self.config.container_attribute, escaped);
        self.document
            .query_selector(&selector)
            .ok()
            .flatten()
            .map(Node::from)
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        if let Some(element) = node.dyn_ref::<Element>() {
            let tag = element.tag_name();
            if OPAQUE_ELEMENTS.iter().any(|t| tag.eq_ignore_ascii_case(t)) {
                return Vec::new();
            }
        }
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() == Node::TEXT_NODE {
            Some(node.node_value().unwrap_or_default())
        } else {
            None
        }
    }

    fn highlight_mark(&self, node: &Node) -> Option<HighlightMark> {
        let element = node.dyn_ref::<Element>()?;
        if !element.tag_name().eq_ignore_ascii_case(&self.config.wrapper_tag) {
            return None;
        }
        let id = element
            .get_attribute(&self.config.id_attribute)?
            .parse::<Uuid>()
            .ok()?;
        let color = element
            .get_attribute(&self.config.color_attribute)?
            .parse::<HighlightColor>()
            .ok()?;
        Some(HighlightMark { id, color })
    }

    fn replace_node(&mut self, node: &Node, fragments: Vec<Fragment>) {
        if let Err(e) = self.try_replace(node, fragments) {
            warn!(error = ?e, "DOM node replacement failed");
        }
    }
}

/// Char count covering the first `units` UTF-16 code units of `text`
pub fn utf16_to_chars(text: &str, units: usize) -> usize {
    let mut seen = 0;
    let mut chars = 0;
    for c in text.chars() {
        if seen >= units {
            break;
        }
        seen += c.len_utf16();
        chars += 1;
    }
    chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_to_chars() {
        assert_eq!(utf16_to_chars("quick", 3), 3);
        assert_eq!(utf16_to_chars("héllo", 2), 2);
        // U+1F600 is two UTF-16 units
        assert_eq!(utf16_to_chars("a\u{1F600}b", 3), 2);
        assert_eq!(utf16_to_chars("ab", 10), 2);
    }
}
