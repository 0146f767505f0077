//! Highlight rendering for search matches
//!
//! Materializes a `SearchResultSet` as `<mark>` elements inside the live
//! document and removes them again without leaving anything behind. None
//! of these functions keep state between calls: given the same document,
//! results, and current index they always produce the same tree.

use super::locator::{text_nodes, SearchResultSet};
use crate::dom::{DocumentTree, Element, Fragment, NodeId};
use crate::preview::{DocumentHost, ScrollAlign};
use log::debug;

/// Tag used for marker elements.
pub const MARKER_TAG: &str = "mark";

/// Class carried by every marker.
pub const MARKER_CLASS: &str = "search-highlight";

/// Extra class carried by the current marker.
pub const CURRENT_CLASS: &str = "search-highlight-current";

/// Boolean attribute flagging whether a marker is current.
pub const CURRENT_ATTR: &str = "data-current";

/// Summary of a paint pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintReport {
    /// Markers created
    pub painted: usize,
    /// Spans that no longer matched the document and were left alone
    pub skipped: usize,
    /// The marker flagged as current, if any
    pub current: Option<NodeId>,
}

/// Outcome of a request to scroll the current marker into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// The marker was brought into view
    Scrolled,
    /// No current marker is attached to the document yet
    Detached,
    /// The document itself is unreachable
    Unavailable,
}

fn marker_element(is_current: bool) -> Element {
    let mut element = Element::new(MARKER_TAG).with_attr("class", MARKER_CLASS);
    set_current_flag(&mut element, is_current);
    element
}

fn set_current_flag(element: &mut Element, is_current: bool) {
    if is_current {
        element.add_class(CURRENT_CLASS);
    } else {
        element.remove_class(CURRENT_CLASS);
    }
    element.set_attr(CURRENT_ATTR, if is_current { "true" } else { "false" });
}

fn is_marker(element: &Element) -> bool {
    element.tag == MARKER_TAG && element.has_class(MARKER_CLASS)
}

/// Every marker in the document, in document order.
pub fn markers(tree: &DocumentTree) -> Vec<NodeId> {
    tree.find_elements(is_marker)
}

/// The marker currently flagged as current.
pub fn current_marker(tree: &DocumentTree) -> Option<NodeId> {
    tree.find_elements(|element| is_marker(element) && element.has_class(CURRENT_CLASS))
        .into_iter()
        .next()
}

// ─────────────────────────────────────────────────────────────────────────────
// Clear
// ─────────────────────────────────────────────────────────────────────────────

/// Remove every marker from the hosted document.
///
/// Returns the number of markers removed. A no-op if the document is
/// unreachable.
pub fn clear<H: DocumentHost + ?Sized>(host: &mut H) -> usize {
    match host.document_mut() {
        Some(tree) => clear_tree(tree),
        None => {
            debug!("Clear skipped: document unreachable");
            0
        }
    }
}

/// Remove every marker from a document tree.
///
/// Each marker is replaced by its own text and the affected parents are
/// normalized, so the tree's text nodes are exactly those it had before
/// painting.
pub fn clear_tree(tree: &mut DocumentTree) -> usize {
    let found = markers(tree);
    let mut parents = Vec::with_capacity(found.len());
    for marker in &found {
        if let Some(parent) = tree.unwrap(*marker) {
            parents.push(parent);
        }
    }
    parents.sort();
    parents.dedup();
    for parent in parents {
        tree.normalize_children(parent);
    }
    found.len()
}

// ─────────────────────────────────────────────────────────────────────────────
// Paint
// ─────────────────────────────────────────────────────────────────────────────

/// Paint `results` into the hosted document, flagging `current`.
///
/// A no-op returning an empty report if the document is unreachable.
pub fn paint<H: DocumentHost + ?Sized>(
    host: &mut H,
    results: &SearchResultSet,
    current: Option<usize>,
) -> PaintReport {
    match host.document_mut() {
        Some(tree) => paint_tree(tree, results, current),
        None => {
            debug!("Paint skipped: document unreachable");
            PaintReport::default()
        }
    }
}

/// Paint `results` into a document tree, flagging `current`.
///
/// Existing markers are cleared first. Spans are re-validated against the
/// text they point at; any span that no longer fits (stale results) is
/// skipped rather than corrupting the node.
pub fn paint_tree(
    tree: &mut DocumentTree,
    results: &SearchResultSet,
    current: Option<usize>,
) -> PaintReport {
    clear_tree(tree);

    let mut report = PaintReport::default();
    if results.is_empty() {
        return report;
    }

    let nodes = text_nodes(tree);
    let spans = results.spans();
    let mut index = 0;

    while index < spans.len() {
        let ordinal = spans[index].text_node;
        let group_end = spans[index..]
            .iter()
            .position(|span| span.text_node != ordinal)
            .map(|offset| index + offset)
            .unwrap_or(spans.len());

        let Some(node) = nodes.get(ordinal).copied() else {
            report.skipped += group_end - index;
            index = group_end;
            continue;
        };
        let Some(text) = tree.text(node).map(str::to_string) else {
            report.skipped += group_end - index;
            index = group_end;
            continue;
        };

        let mut fragments = Vec::new();
        let mut wrapped_indices = Vec::new();
        let mut cursor = 0;

        for (global, span) in spans.iter().enumerate().take(group_end).skip(index) {
            let fits = span.start >= cursor
                && span.start < span.end
                && span.end <= text.len()
                && text.is_char_boundary(span.start)
                && text.is_char_boundary(span.end)
                && text[span.start..span.end] == span.source_text;
            if !fits {
                report.skipped += 1;
                continue;
            }
            if span.start > cursor {
                fragments.push(Fragment::Text(text[cursor..span.start].to_string()));
            }
            let is_current = current == Some(global);
            fragments.push(Fragment::Wrapped {
                element: marker_element(is_current),
                text: span.source_text.clone(),
            });
            wrapped_indices.push((fragments.len() - 1, is_current));
            cursor = span.end;
        }

        if !wrapped_indices.is_empty() {
            if cursor < text.len() {
                fragments.push(Fragment::Text(text[cursor..].to_string()));
            }
            let created = tree.replace_with(node, fragments);
            for (position, is_current) in wrapped_indices {
                report.painted += 1;
                if is_current {
                    report.current = created.get(position).copied();
                }
            }
        }

        index = group_end;
    }

    if report.skipped > 0 {
        debug!("Paint skipped {} stale spans", report.skipped);
    }
    report
}

// ─────────────────────────────────────────────────────────────────────────────
// Current-only Repaint
// ─────────────────────────────────────────────────────────────────────────────

/// Move the current flag to the marker at `current`, leaving text untouched.
///
/// Returns the marker now flagged as current. Returns `None` if the document
/// is unreachable or `current` is out of range of the painted markers.
pub fn set_current<H: DocumentHost + ?Sized>(host: &mut H, current: Option<usize>) -> Option<NodeId> {
    let tree = host.document_mut()?;
    let found = markers(tree);
    let mut flagged = None;
    for (index, marker) in found.iter().enumerate() {
        let is_current = current == Some(index);
        if let Some(element) = tree.element_mut(*marker) {
            set_current_flag(element, is_current);
        }
        if is_current {
            flagged = Some(*marker);
        }
    }
    flagged
}

/// Number of markers in the hosted document (0 if unreachable).
pub fn marker_count<H: DocumentHost + ?Sized>(host: &H) -> usize {
    host.document().map(|tree| markers(tree).len()).unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Scrolling
// ─────────────────────────────────────────────────────────────────────────────

/// Scroll the current marker to the center of the viewport.
pub fn scroll_to_current<H: DocumentHost + ?Sized>(host: &mut H) -> ScrollOutcome {
    let Some(tree) = host.document() else {
        return ScrollOutcome::Unavailable;
    };
    let Some(marker) = current_marker(tree) else {
        return ScrollOutcome::Detached;
    };
    if host.scroll_into_view(marker, ScrollAlign::Center) {
        ScrollOutcome::Scrolled
    } else {
        ScrollOutcome::Detached
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
