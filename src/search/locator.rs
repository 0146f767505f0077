//! Match location over a document tree
//!
//! Walks the text nodes of a document in depth-first pre-order, skipping
//! verbatim containers, and records every non-overlapping occurrence of the
//! query. Query text is always literal: it is escaped before any pattern is
//! built, so no input can be malformed.

use crate::dom::{DocumentTree, NodeId};
use crate::preview::DocumentHost;
use log::{debug, warn};
use regex::{Regex, RegexBuilder};

/// Elements whose subtrees are never scanned or highlighted.
pub const SKIPPED_TAGS: &[&str] = &["script", "style", "pre", "code"];

// ─────────────────────────────────────────────────────────────────────────────
// Query and Result Types
// ─────────────────────────────────────────────────────────────────────────────

/// A single search run's query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub text: String,
    pub case_sensitive: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            text: text.into(),
            case_sensitive,
        }
    }
}

/// One occurrence of the query inside a single text node.
///
/// `text_node` is the ordinal of the containing node among the searchable
/// text nodes of the document; `start` and `end` are byte offsets into that
/// node's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    pub text_node: usize,
    pub start: usize,
    pub end: usize,
    pub source_text: String,
}

/// All matches of a query, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultSet {
    query: SearchQuery,
    spans: Vec<MatchSpan>,
    available: bool,
}

impl Default for SearchResultSet {
    fn default() -> Self {
        Self::empty(SearchQuery::default())
    }
}

impl SearchResultSet {
    /// An empty result for a reachable document.
    pub fn empty(query: SearchQuery) -> Self {
        Self {
            query,
            spans: Vec::new(),
            available: true,
        }
    }

    /// An empty result because no document could be reached.
    pub fn unavailable(query: SearchQuery) -> Self {
        Self {
            query,
            spans: Vec::new(),
            available: false,
        }
    }

    /// The query these results were computed for.
    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Whether the document was reachable when the scan ran.
    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn spans(&self) -> &[MatchSpan] {
        &self.spans
    }

    pub fn get(&self, index: usize) -> Option<&MatchSpan> {
        self.spans.get(index)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Matcher
// ─────────────────────────────────────────────────────────────────────────────

/// Literal substring matcher, optionally case-folded.
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Folded(Regex),
}

impl Matcher {
    /// Build a matcher for `query`. Returns `None` for an empty query.
    pub fn new(query: &SearchQuery) -> Option<Self> {
        if query.text.is_empty() {
            return None;
        }
        if query.case_sensitive {
            return Some(Matcher::Exact(query.text.clone()));
        }
        match RegexBuilder::new(&regex::escape(&query.text))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => Some(Matcher::Folded(re)),
            Err(e) => {
                // Escaped input only fails on size limits
                warn!("Could not build matcher for query: {}", e);
                None
            }
        }
    }

    /// Non-overlapping (start, end) byte ranges, left to right.
    pub fn find_all(&self, text: &str) -> Vec<(usize, usize)> {
        match self {
            Matcher::Exact(needle) => text
                .match_indices(needle.as_str())
                .map(|(start, m)| (start, start + m.len()))
                .collect(),
            Matcher::Folded(re) => re
                .find_iter(text)
                .filter(|m| m.start() < m.end())
                .map(|m| (m.start(), m.end()))
                .collect(),
        }
    }

    /// First match at or after byte offset `from`.
    pub fn find_at(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        if from > text.len() || !text.is_char_boundary(from) {
            return None;
        }
        match self {
            Matcher::Exact(needle) => text[from..]
                .find(needle.as_str())
                .map(|pos| (from + pos, from + pos + needle.len())),
            Matcher::Folded(re) => re.find_at(text, from).map(|m| (m.start(), m.end())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Traversal
// ─────────────────────────────────────────────────────────────────────────────

/// Whether an element's subtree is excluded from search.
fn is_skipped(tree: &DocumentTree, id: NodeId) -> bool {
    tree.element(id)
        .map(|element| SKIPPED_TAGS.contains(&element.tag.as_str()))
        .unwrap_or(false)
}

/// Searchable text nodes in depth-first pre-order.
///
/// Both the locator and the highlighter use this ordering, which is what
/// makes a `MatchSpan::text_node` ordinal meaningful to both.
pub fn text_nodes(tree: &DocumentTree) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(current) = stack.pop() {
        if is_skipped(tree, current) {
            continue;
        }
        if tree.text(current).is_some() {
            nodes.push(current);
            continue;
        }
        stack.extend(tree.children(current).iter().rev().copied());
    }
    nodes
}

// ─────────────────────────────────────────────────────────────────────────────
// Locate
// ─────────────────────────────────────────────────────────────────────────────

/// Locate every match of `query` in the hosted document.
///
/// Never fails: an unreachable document yields an empty set flagged as
/// unavailable, and an empty query yields an empty set.
pub fn locate<H: DocumentHost + ?Sized>(host: &H, query: &SearchQuery) -> SearchResultSet {
    match host.document() {
        Some(tree) => locate_in(tree, query),
        None => {
            debug!("Document unreachable, no matches for {:?}", query.text);
            SearchResultSet::unavailable(query.clone())
        }
    }
}

/// Locate every match of `query` in a document tree.
pub fn locate_in(tree: &DocumentTree, query: &SearchQuery) -> SearchResultSet {
    let Some(matcher) = Matcher::new(query) else {
        return SearchResultSet::empty(query.clone());
    };

    let mut spans = Vec::new();
    for (ordinal, node) in text_nodes(tree).into_iter().enumerate() {
        let Some(text) = tree.text(node) else {
            continue;
        };
        for (start, end) in matcher.find_all(text) {
            spans.push(MatchSpan {
                text_node: ordinal,
                start,
                end,
                source_text: text[start..end].to_string(),
            });
        }
    }

    debug!(
        "Located {} matches for {:?} (case_sensitive: {})",
        spans.len(),
        query.text,
        query.case_sensitive
    );

    SearchResultSet {
        query: query.clone(),
        spans,
        available: true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
