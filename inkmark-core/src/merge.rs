//! Interval merging and paint order.
//!
//! Same-color annotations in a container are kept as a minimal sorted set:
//! anything overlapping or touching collapses into one. Different colors are
//! never merged; where they overlap, [`paint_order`] decides which one the
//! reader sees.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::model::{Annotation, HighlightColor, TextRange};

/// Collapse overlapping or touching same-color annotations.
///
/// The merged annotation keeps the id of its earliest-starting member (on a
/// tie, whichever came first in the input). Output is sorted by start
/// offset, then color.
pub fn merge(annotations: Vec<Annotation>) -> Vec<Annotation> {
    let mut by_color: BTreeMap<HighlightColor, Vec<Annotation>> = BTreeMap::new();
    for annotation in annotations {
        by_color.entry(annotation.color).or_default().push(annotation);
    }

    let mut merged = Vec::new();
    for (_, mut group) in by_color {
        // Stable, so equal starts keep input order
        group.sort_by_key(|a| a.range.start_offset);

        let mut iter = group.into_iter();
        let Some(mut current) = iter.next() else {
            continue;
        };
        for next in iter {
            if current.range.touches(&next.range) {
                absorb(&mut current, next);
            } else {
                merged.push(std::mem::replace(&mut current, next));
            }
        }
        merged.push(current);
    }

    merged.sort_by_key(|a| (a.range.start_offset, a.color));
    merged
}

fn absorb(current: &mut Annotation, next: Annotation) {
    if next.range.end_offset > current.range.end_offset {
        let overlap = current.range.end_offset - next.range.start_offset;
        current.source_text.extend(next.source_text.chars().skip(overlap));
    }
    current.range = current.range.union(&next.range);
}

/// True when no two same-color entries overlap or touch and the list is
/// sorted by start offset
pub fn is_minimal(annotations: &[Annotation]) -> bool {
    let sorted = annotations
        .windows(2)
        .all(|w| w[0].range.start_offset <= w[1].range.start_offset);
    let separated = HighlightColor::all().iter().all(|color| {
        let same: Vec<&TextRange> = annotations
            .iter()
            .filter(|a| a.color == *color)
            .map(|a| &a.range)
            .collect();
        same.windows(2).all(|w| w[1].start_offset > w[0].end_offset)
    });
    sorted && separated
}

/// Order in which wrappers are applied to a tree.
///
/// Later-applied wrappers nest inside earlier ones, so longer ranges go
/// first and any range contained in another ends up innermost and stays
/// clickable. Equal lengths apply by ascending start, so the later-starting
/// range wins the overlap. Identical ranges apply green first, leaving
/// yellow innermost.
pub fn paint_order(annotations: &[Annotation]) -> Vec<&Annotation> {
    let mut ordered: Vec<&Annotation> = annotations.iter().collect();
    ordered.sort_by_key(|a| (Reverse(a.range.len()), a.range.start_offset, Reverse(a.color)));
    ordered
}

/// The annotation painted at `offset`: the innermost wrapper covering it
pub fn color_at(annotations: &[Annotation], offset: usize) -> Option<&Annotation> {
    paint_order(annotations)
        .into_iter()
        .filter(|a| a.range.contains(offset))
        .last()
}
