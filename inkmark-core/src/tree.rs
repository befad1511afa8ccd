//! Minimal tree capability the highlight algorithms run over.
//!
//! Offset mapping, reconciliation and unannotation only ever ask a tree for
//! its children, the text of its leaves, and to replace one node with a run
//! of fragments. Anything that can answer those questions (an owned markup
//! arena, a browser DOM, a plain segment list) can carry highlights.

use uuid::Uuid;

use crate::model::HighlightColor;

/// Identity of a highlight wrapper left by a previous render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightMark {
    pub id: Uuid,
    pub color: HighlightColor,
}

/// Replacement content for [`TextTree::replace_node`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Highlight { mark: HighlightMark, text: String },
}

pub trait TextTree {
    /// Cheap handle to a node; must stay valid while siblings are replaced
    type Node: Clone + PartialEq;

    /// Locate a host-marked container
    fn find_container(&self, id: &str) -> Option<Self::Node>;

    /// Children in document order; empty for leaves
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Text content, `Some` exactly when the node is a text leaf
    fn text(&self, node: &Self::Node) -> Option<String>;

    /// Whether the node is a highlight wrapper produced by this engine
    fn highlight_mark(&self, node: &Self::Node) -> Option<HighlightMark>;

    /// Replace `node` in its parent with `fragments` (possibly none)
    fn replace_node(&mut self, node: &Self::Node, fragments: Vec<Fragment>);
}

/// Text leaves under `node`, in document order
pub fn leaves<T: TextTree>(tree: &T, node: &T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    collect_leaves(tree, node, &mut out);
    out
}

fn collect_leaves<T: TextTree>(tree: &T, node: &T::Node, out: &mut Vec<T::Node>) {
    if tree.text(node).is_some() {
        out.push(node.clone());
        return;
    }
    for child in tree.children(node) {
        collect_leaves(tree, &child, out);
    }
}

/// Highlight wrappers under `node` that are not nested in another wrapper
pub fn outer_highlights<T: TextTree>(tree: &T, node: &T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    for child in tree.children(node) {
        collect_outer_highlights(tree, &child, &mut out);
    }
    out
}

fn collect_outer_highlights<T: TextTree>(tree: &T, node: &T::Node, out: &mut Vec<T::Node>) {
    if tree.highlight_mark(node).is_some() {
        out.push(node.clone());
        return;
    }
    for child in tree.children(node) {
        collect_outer_highlights(tree, &child, out);
    }
}
