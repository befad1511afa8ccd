//! Offset mapping between tree positions and flattened-text offsets.
//!
//! A container's flattened text is the in-order concatenation of its text
//! leaves. Offsets count Unicode scalar values, not bytes. Nothing here is
//! cached: each call walks the tree as it is right now.

use crate::error::{HighlightError, Result};
use crate::model::TextRange;
use crate::tree::{leaves, TextTree};

/// A selection endpoint, as a host reports it.
///
/// When `node` is a text leaf, `offset` is a character offset inside it.
/// When `node` is an element, `offset` is a child index.
#[derive(Debug, Clone, PartialEq)]
pub struct TreePoint<N> {
    pub node: N,
    pub offset: usize,
}

impl<N> TreePoint<N> {
    pub fn new(node: N, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection as anchor and focus; either may come first in the document
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRange<N> {
    pub start: TreePoint<N>,
    pub end: TreePoint<N>,
}

impl<N> TreeRange<N> {
    pub fn new(start: TreePoint<N>, end: TreePoint<N>) -> Self {
        Self { start, end }
    }
}

/// A selection resolved into container coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedSelection {
    pub range: TextRange,
    pub text: String,
}

/// Part of one text leaf covered by an offset range
#[derive(Debug, Clone, PartialEq)]
pub struct LeafSlice<N> {
    pub node: N,
    pub local_start: usize,
    pub local_end: usize,
}

pub fn flattened_text<T: TextTree>(tree: &T, container: &T::Node) -> String {
    leaves(tree, container)
        .iter()
        .filter_map(|leaf| tree.text(leaf))
        .collect()
}

pub fn text_length<T: TextTree>(tree: &T, container: &T::Node) -> usize {
    leaves(tree, container)
        .iter()
        .filter_map(|leaf| tree.text(leaf))
        .map(|text| text.chars().count())
        .sum()
}

/// Flattened offset of a tree point, or `None` if it is not inside `container`
pub fn point_to_offset<T: TextTree>(
    tree: &T,
    container: &T::Node,
    point: &TreePoint<T::Node>,
) -> Option<usize> {
    let mut counter = 0;
    resolve_point(tree, container, point, &mut counter)
}

fn resolve_point<T: TextTree>(
    tree: &T,
    node: &T::Node,
    point: &TreePoint<T::Node>,
    counter: &mut usize,
) -> Option<usize> {
    if let Some(text) = tree.text(node) {
        let len = text.chars().count();
        if *node == point.node {
            return Some(*counter + point.offset.min(len));
        }
        *counter += len;
        return None;
    }

    let children = tree.children(node);
    if *node == point.node {
        for child in children.iter().take(point.offset) {
            *counter += text_length(tree, child);
        }
        return Some(*counter);
    }
    children
        .iter()
        .find_map(|child| resolve_point(tree, child, point, counter))
}

/// Resolve a selection, saying why it was rejected
pub fn resolve_selection<T: TextTree>(
    tree: &T,
    container: &T::Node,
    range: &TreeRange<T::Node>,
) -> Result<MappedSelection> {
    let anchor = point_to_offset(tree, container, &range.start)
        .ok_or(HighlightError::SelectionOutOfContainer)?;
    let focus = point_to_offset(tree, container, &range.end)
        .ok_or(HighlightError::SelectionOutOfContainer)?;

    let range = TextRange::new(anchor, focus);
    if range.is_empty() {
        return Err(HighlightError::EmptySelection);
    }
    let text = char_slice(&flattened_text(tree, container), range.start_offset, range.end_offset);
    Ok(MappedSelection { range, text })
}

/// Selection → `(startOffset, endOffset, text)`; `None` when outside the
/// container or collapsed
pub fn map_selection_to_offsets<T: TextTree>(
    tree: &T,
    container: &T::Node,
    range: &TreeRange<T::Node>,
) -> Option<MappedSelection> {
    resolve_selection(tree, container, range).ok()
}

/// Text leaves covered, even partially, by `[start, end)`
pub fn locate_offsets_in_container<T: TextTree>(
    tree: &T,
    container: &T::Node,
    start: usize,
    end: usize,
) -> Vec<LeafSlice<T::Node>> {
    let mut slices = Vec::new();
    let mut counter = 0;
    for leaf in leaves(tree, container) {
        if counter >= end {
            break;
        }
        let Some(text) = tree.text(&leaf) else {
            continue;
        };
        let len = text.chars().count();
        let leaf_start = counter;
        let leaf_end = counter + len;
        counter = leaf_end;

        let from = start.max(leaf_start);
        let to = end.min(leaf_end);
        if from < to {
            slices.push(LeafSlice {
                node: leaf,
                local_start: from - leaf_start,
                local_end: to - leaf_start,
            });
        }
    }
    slices
}

/// Characters `[start, end)` of `text`
pub fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}

/// Split `text` into three parts at two character offsets
pub(crate) fn split_at_chars(text: &str, start: usize, end: usize) -> (String, String, String) {
    let before: String = text.chars().take(start).collect();
    let middle = char_slice(text, start, end);
    let after: String = text.chars().skip(end).collect();
    (before, middle, after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HighlightConfig;
    use crate::markup::MarkupTree;
    use pretty_assertions::assert_eq;

    fn tree(markup: &str) -> MarkupTree {
        MarkupTree::parse(markup, &HighlightConfig::default()).unwrap()
    }

    #[test]
    fn test_select_word_in_single_leaf() {
        let tree = tree(r#"<p data-container-id="p1">The quick fox</p>"#);
        let container = tree.find_container("p1").unwrap();
        let leaf = leaves(&tree, &container)[0];

        let mapped = map_selection_to_offsets(
            &tree,
            &container,
            &TreeRange::new(TreePoint::new(leaf, 4), TreePoint::new(leaf, 9)),
        )
        .unwrap();

        assert_eq!(mapped.range, TextRange::new(4, 9));
        assert_eq!(mapped.text, "quick");
    }

    #[test]
    fn test_selection_across_nested_markup() {
        let tree = tree(r#"<div data-container-id="p1"><p>The <b>qu<i>ick</i></b> fox</p></div>"#);
        let container = tree.find_container("p1").unwrap();
        let leafs = leaves(&tree, &container);
        // "The " | "qu" | "ick" | " fox"
        let mapped = map_selection_to_offsets(
            &tree,
            &container,
            &TreeRange::new(TreePoint::new(leafs[1], 1), TreePoint::new(leafs[3], 2)),
        )
        .unwrap();

        assert_eq!(mapped.range, TextRange::new(5, 11));
        assert_eq!(mapped.text, "uick f");
    }

    #[test]
    fn test_backwards_selection_is_normalized() {
        let tree = tree(r#"<p data-container-id="p1">The quick fox</p>"#);
        let container = tree.find_container("p1").unwrap();
        let leaf = leaves(&tree, &container)[0];

        let mapped = map_selection_to_offsets(
            &tree,
            &container,
            &TreeRange::new(TreePoint::new(leaf, 9), TreePoint::new(leaf, 4)),
        )
        .unwrap();
        assert_eq!(mapped.range, TextRange::new(4, 9));
    }

    #[test]
    fn test_element_anchor_uses_child_index() {
        let tree = tree(r#"<p data-container-id="p1">ab<b>cd</b>ef</p>"#);
        let container = tree.find_container("p1").unwrap();

        let mapped = map_selection_to_offsets(
            &tree,
            &container,
            &TreeRange::new(TreePoint::new(container, 1), TreePoint::new(container, 3)),
        )
        .unwrap();
        assert_eq!(mapped.text, "cdef");
    }

    #[test]
    fn test_collapsed_selection_is_rejected() {
        let tree = tree(r#"<p data-container-id="p1">The quick fox</p>"#);
        let container = tree.find_container("p1").unwrap();
        let leaf = leaves(&tree, &container)[0];

        let range = TreeRange::new(TreePoint::new(leaf, 3), TreePoint::new(leaf, 3));
        assert!(map_selection_to_offsets(&tree, &container, &range).is_none());
        assert!(matches!(
            resolve_selection(&tree, &container, &range),
            Err(HighlightError::EmptySelection)
        ));
    }

    #[test]
    fn test_anchor_outside_container_is_rejected() {
        let tree = tree(r#"<p data-container-id="p1">inside</p><p>outside</p>"#);
        let container = tree.find_container("p1").unwrap();
        let inside = leaves(&tree, &container)[0];
        let outside = *leaves(&tree, &tree.root()).last().unwrap();

        let range = TreeRange::new(TreePoint::new(inside, 0), TreePoint::new(outside, 3));
        assert!(matches!(
            resolve_selection(&tree, &container, &range),
            Err(HighlightError::SelectionOutOfContainer)
        ));
    }

    #[test]
    fn test_locate_partial_leaves() {
        let tree = tree(r#"<p data-container-id="p1">The <b>quick</b> fox</p>"#);
        let container = tree.find_container("p1").unwrap();
        let leafs = leaves(&tree, &container);

        let slices = locate_offsets_in_container(&tree, &container, 2, 11);
        assert_eq!(
            slices,
            vec![
                LeafSlice { node: leafs[0], local_start: 2, local_end: 4 },
                LeafSlice { node: leafs[1], local_start: 0, local_end: 5 },
                LeafSlice { node: leafs[2], local_start: 0, local_end: 2 },
            ]
        );
    }

    #[test]
    fn test_locate_counts_chars_not_bytes() {
        let tree = tree(r#"<p data-container-id="p1">naïve <b>café</b></p>"#);
        let container = tree.find_container("p1").unwrap();
        assert_eq!(text_length(&tree, &container), 10);

        let slices = locate_offsets_in_container(&tree, &container, 6, 10);
        assert_eq!(slices.len(), 1);
        assert_eq!((slices[0].local_start, slices[0].local_end), (0, 4));
    }

    #[test]
    fn test_split_at_chars() {
        assert_eq!(
            split_at_chars("héllo", 1, 3),
            ("h".to_string(), "él".to_string(), "lo".to_string())
        );
    }
}
