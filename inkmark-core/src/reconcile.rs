//! Applying a highlight set onto content.
//!
//! One [`Reconciler`] serves both ways content arrives:
//!
//! - **Markup strings** are parsed into a detached [`MarkupTree`], annotated
//!   and serialized back ([`Reconciler::render_markup`]).
//! - **Live trees** the engine does not own (a browser DOM) are patched in
//!   place ([`Reconciler::reconcile_live`]).
//!
//! Either way the container is first stripped of wrappers left by an earlier
//! pass and its text leaves are normalized, because the host may regenerate
//! content at any time and stale wrappers would drift. Then each annotation,
//! in [`paint_order`], has the leaf segments it covers split into
//! `(before, wrapped, after)`. Stripping and wrapping never change the
//! flattened text.

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::HighlightConfig;
use crate::error::{HighlightError, Result};
use crate::markup::MarkupTree;
use crate::merge::paint_order;
use crate::model::Annotation;
use crate::offsets::{char_slice, flattened_text, locate_offsets_in_container, split_at_chars};
use crate::session::Session;
use crate::storage::KeyValueStore;
use crate::tree::{outer_highlights, Fragment, HighlightMark, TextTree};

/// What a reconcile pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Annotations wrapped
    pub applied: usize,
    /// Stale wrappers removed before applying
    pub stripped: usize,
    /// Annotations whose range no longer fits the container text
    pub skipped: Vec<Uuid>,
    /// Annotations applied over text that differs from what was selected
    pub drifted: Vec<Uuid>,
}

impl ReconcileReport {
    fn absorb(&mut self, other: ReconcileReport) {
        self.applied += other.applied;
        self.stripped += other.stripped;
        self.skipped.extend(other.skipped);
        self.drifted.extend(other.drifted);
    }
}

/// Serialized output of the markup-string strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMarkup {
    pub markup: String,
    pub report: ReconcileReport,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: HighlightConfig,
}

impl Reconciler {
    pub fn new(config: HighlightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Remove every highlight wrapper under `container`, then normalize its
    /// text leaves. Returns how many wrappers were removed.
    pub fn unannotate<T: TextTree>(&self, tree: &mut T, container: &T::Node) -> usize {
        let wrappers = outer_highlights(tree, container);
        for wrapper in &wrappers {
            let text = flattened_text(tree, wrapper);
            tree.replace_node(wrapper, vec![Fragment::Text(text)]);
        }
        normalize(tree, container);
        wrappers.len()
    }

    /// Strip, then wrap every annotation that still fits the container
    pub fn apply<T: TextTree>(
        &self,
        tree: &mut T,
        container: &T::Node,
        annotations: &[Annotation],
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            stripped: self.unannotate(tree, container),
            ..ReconcileReport::default()
        };
        let text = flattened_text(tree, container);
        let length = text.chars().count();

        for annotation in paint_order(annotations) {
            let range = annotation.range;
            if range.is_empty() || range.end_offset > length {
                warn!(
                    id = %annotation.id,
                    ?range,
                    length,
                    "highlight no longer fits container text, skipping"
                );
                report.skipped.push(annotation.id);
                continue;
            }
            if !annotation.source_text.is_empty()
                && char_slice(&text, range.start_offset, range.end_offset) != annotation.source_text
            {
                debug!(id = %annotation.id, "highlighted text changed since selection");
                report.drifted.push(annotation.id);
            }

            let mark = HighlightMark {
                id: annotation.id,
                color: annotation.color,
            };
            wrap_range(tree, container, range.start_offset, range.end_offset, mark);
            report.applied += 1;
        }
        report
    }

    /// Live-tree strategy: re-apply `annotations` to a container the host
    /// has (re)rendered. Safe to call on every content refresh.
    pub fn reconcile_live<T: TextTree>(
        &self,
        tree: &mut T,
        container_id: &str,
        annotations: &[Annotation],
    ) -> Result<ReconcileReport> {
        let container = tree.find_container(container_id).ok_or_else(|| {
            debug!(container = container_id, "container not rendered, nothing to reconcile");
            HighlightError::ContainerNotFound(container_id.to_string())
        })?;
        Ok(self.apply(tree, &container, annotations))
    }

    /// Markup-string strategy for a fragment that is itself the container
    pub fn render_markup(&self, markup: &str, annotations: &[Annotation]) -> Result<RenderedMarkup> {
        let mut tree = MarkupTree::parse(markup, &self.config)?;
        let root = tree.root();
        let report = self.apply(&mut tree, &root, annotations);
        Ok(RenderedMarkup {
            markup: tree.to_markup(),
            report,
        })
    }

    /// Markup-string strategy for a document holding marked containers;
    /// each container gets the session's highlights for its id
    pub fn render_markup_all<S: KeyValueStore>(
        &self,
        markup: &str,
        session: &Session<S>,
    ) -> Result<RenderedMarkup> {
        let mut tree = MarkupTree::parse(markup, &self.config)?;
        let mut report = ReconcileReport::default();
        for container_id in tree.container_ids() {
            let Some(container) = tree.find_container(&container_id) else {
                continue;
            };
            report.absorb(self.apply(&mut tree, &container, session.list(&container_id)));
        }
        Ok(RenderedMarkup {
            markup: tree.to_markup(),
            report,
        })
    }

    /// Remove every highlight wrapper from a markup string
    pub fn strip_markup(&self, markup: &str) -> Result<String> {
        let mut tree = MarkupTree::parse(markup, &self.config)?;
        let root = tree.root();
        self.unannotate(&mut tree, &root);
        Ok(tree.to_markup())
    }
}

fn wrap_range<T: TextTree>(tree: &mut T, container: &T::Node, start: usize, end: usize, mark: HighlightMark) {
    for slice in locate_offsets_in_container(tree, container, start, end) {
        let Some(text) = tree.text(&slice.node) else {
            continue;
        };
        let (before, middle, after) = split_at_chars(&text, slice.local_start, slice.local_end);

        let mut fragments = Vec::with_capacity(3);
        if !before.is_empty() {
            fragments.push(Fragment::Text(before));
        }
        fragments.push(Fragment::Highlight { mark, text: middle });
        if !after.is_empty() {
            fragments.push(Fragment::Text(after));
        }
        tree.replace_node(&slice.node, fragments);
    }
}

/// Merge adjacent text leaves and drop empty ones, recursively
pub fn normalize<T: TextTree>(tree: &mut T, node: &T::Node) {
    let mut run: Vec<(T::Node, String)> = Vec::new();
    for child in tree.children(node) {
        match tree.text(&child) {
            Some(text) => run.push((child, text)),
            None => {
                flush_text_run(tree, &mut run);
                normalize(tree, &child);
            }
        }
    }
    flush_text_run(tree, &mut run);
}

fn flush_text_run<T: TextTree>(tree: &mut T, run: &mut Vec<(T::Node, String)>) {
    if run.len() == 1 && !run[0].1.is_empty() {
        run.clear();
        return;
    }
    let joined: String = run.iter().map(|(_, text)| text.as_str()).collect();
    let mut nodes = run.drain(..).map(|(node, _)| node);
    if let Some(first) = nodes.next() {
        let fragments = if joined.is_empty() {
            Vec::new()
        } else {
            vec![Fragment::Text(joined)]
        };
        tree.replace_node(&first, fragments);
    }
    for node in nodes {
        tree.replace_node(&node, Vec::new());
    }
}
